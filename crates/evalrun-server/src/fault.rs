//! Process-wide fault boundary.
//!
//! Per-request failures are handled by the command pipeline. What escapes
//! a handler is turned into a generic 500 by [`catch_panic_layer`] and
//! logged by the hook from [`install_panic_hook`].

use std::any::Any;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::error;

use evalrun_core::panic_message;

use crate::http::responses::ErrorResponse;

/// Body returned for any panic that reaches the HTTP layer.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred";

type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response;

/// Layer converting handler panics into HTTP 500.
pub fn catch_panic_layer() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(panic_response as PanicHandler)
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    error!(panic = %panic_message(payload.as_ref()), "Handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(INTERNAL_ERROR_MESSAGE)),
    )
        .into_response()
}

/// Log every panic in the process through `tracing`.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            panic = %panic_message(info.payload()),
            location = %location,
            "Unhandled panic"
        );
    }));
}
