//! Error types for the browser automation driver.

use thiserror::Error;

/// Errors raised while talking to a browser session.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Failed to spawn the bridge process.
    #[error("Failed to spawn automation bridge: {0}")]
    SpawnError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Protocol error during communication.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// The automation library reported a failure for an operation.
    #[error("{method} failed: {message}")]
    OperationFailed { method: String, message: String },

    /// The session was closed or its bridge exited.
    #[error("Session closed")]
    SessionClosed,

    /// No session could be handed out.
    #[error("Session unavailable: {0}")]
    SessionUnavailable(String),
}

/// A session could not be created.
///
/// Carries the endpoint that was targeted so callers can report which
/// browser was unreachable.
#[derive(Debug, Error)]
#[error("Failed to initialize session for {endpoint}: {source}")]
pub struct InitializationError {
    pub endpoint: String,

    #[source]
    pub source: DriverError,
}
