//! HTTP request and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use evalrun_core::sanitize_message;

/// Version reported by `/version`.
pub const API_VERSION: &str = "v0.1";

// ============================================================================
// Request types
// ============================================================================

/// Request body for the init endpoint.
#[derive(Debug, Deserialize)]
pub struct InitRequest {
    /// CDP endpoint of the browser to attach to.
    pub cdp_url: String,
}

// ============================================================================
// Response types
// ============================================================================

/// `{status: "ok", timestamp}`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,

    /// Response time (ISO 8601).
    pub timestamp: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok",
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
}

// ============================================================================
// Error types
// ============================================================================

/// `{status: "error", message}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
        }
    }
}

/// Errors returned by the JSON endpoints.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request body.
    BadRequest { message: String },
    /// The session could not be created.
    InitializationFailed { message: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            ApiError::InitializationFailed { message } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(ErrorResponse::new(sanitize_message(&message)))).into_response()
    }
}
