//! Health and version handlers.

use axum::{response::IntoResponse, Json};

use crate::http::responses::{StatusResponse, VersionResponse, API_VERSION};

/// Health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    Json(StatusResponse::ok())
}

pub async fn version() -> impl IntoResponse {
    Json(VersionResponse {
        version: API_VERSION,
    })
}
