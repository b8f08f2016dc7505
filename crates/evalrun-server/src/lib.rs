//! evalrun Command Server
//!
//! HTTP front end that attaches to a caller's browser over CDP, runs one
//! natural-language command per request and streams the outcome back as
//! server-sent events.
//!
//! Endpoints:
//! - `POST /init`: check that a session can be created for a CDP endpoint
//! - `POST /test`: run a command and stream its events
//! - `GET /version`
//! - `GET /health`

pub mod command;
pub mod config;
pub mod fault;
pub mod http;
pub mod schema;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use command::{
    spawn_command, CommandError, CommandEvent, CommandMode, CommandPipeline, CommandState,
    ValidatedCommand, ValidationError,
};
pub use config::Config;
pub use fault::{catch_panic_layer, install_panic_hook, INTERNAL_ERROR_MESSAGE};
pub use http::create_router;
pub use schema::{OutputSchema, SchemaCompilationError, SchemaViolation};
pub use state::AppState;
