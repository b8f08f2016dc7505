//! HTTP server for the command API.
//!
//! Provides endpoints for:
//! - Session check (`/init`)
//! - Command streaming (`/test`)
//! - Version (`/version`)
//! - Health check (`/health`)

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::fault::catch_panic_layer;
use crate::state::AppState;

mod handlers;
pub mod responses;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/init", post(handlers::init_session))
        .route("/test", post(handlers::run_command))
        .route("/version", get(handlers::version))
        .route("/health", get(handlers::health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(catch_panic_layer())
        .with_state(state)
}
