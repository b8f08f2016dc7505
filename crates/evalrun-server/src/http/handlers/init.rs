//! Session check handler.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::{error, info, warn};
use url::Url;

use evalrun_core::{AvailableModel, EvalLogger};
use evalrun_driver::SessionConfig;

use crate::http::responses::{ApiError, InitRequest, StatusResponse};
use crate::state::AppState;

/// Model the check session is created with.
const INIT_MODEL: AvailableModel = AvailableModel::Gpt4oMini;

/// Create a session against `cdp_url` and close it again.
pub async fn init_session(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InitRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(req) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected init request");
        ApiError::BadRequest {
            message: rejection.body_text(),
        }
    })?;

    let cdp_url = Url::parse(&req.cdp_url).map_err(|e| ApiError::BadRequest {
        message: format!("Invalid field 'cdp_url': {}", e),
    })?;

    let config = SessionConfig::remote(INIT_MODEL, EvalLogger::new(), cdp_url.as_str())
        .with_debug_dom(false);
    let initialized = evalrun_driver::init_session(state.launcher.as_ref(), config)
        .await
        .map_err(|e| {
            error!(cdp_url = %cdp_url, error = %e, "Session check failed");
            ApiError::InitializationFailed {
                message: e.to_string(),
            }
        })?;

    if let Err(e) = initialized.session.close().await {
        warn!(cdp_url = %cdp_url, error = %e, "Failed to close check session");
    }

    info!(cdp_url = %cdp_url, "Session check succeeded");
    Ok(Json(StatusResponse::ok()))
}
