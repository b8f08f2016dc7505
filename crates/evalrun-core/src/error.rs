//! Core domain errors.

use thiserror::Error;

/// Core domain errors for evalrun.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Model identifier is not one of the supported models.
    #[error("Unsupported model: {0}")]
    UnknownModel(String),

    /// Category label is not one of the fixed eval categories.
    #[error("Unknown eval category: {0}")]
    UnknownCategory(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
