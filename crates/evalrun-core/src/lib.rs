//! evalrun Core Eval Types
//!
//! This crate contains the pure parts of the eval harness with no dependencies on:
//! - The browser automation driver
//! - Network/HTTP
//! - Runtime specifics
//!
//! Everything here is deterministic given its inputs, apart from the
//! timestamps the logger stamps onto lines.

pub mod category;
pub mod compare;
pub mod error;
pub mod fault;
pub mod log;
pub mod logger;
pub mod model;
pub mod score;
pub mod task;

// Re-export commonly used types
pub use category::EvalCategory;
pub use compare::{compare, compare_default, normalize, Comparison, DEFAULT_SIMILARITY_THRESHOLD};
pub use error::CoreError;
pub use fault::{panic_message, sanitize_message};
pub use log::{AuxiliaryType, AuxiliaryValue, LogLine};
pub use logger::EvalLogger;
pub use model::AvailableModel;
pub use score::{error_match, exact_match, score_all, EvalArgs, ScoreRecord, Scorer, SCORERS};
pub use task::{EvalInput, TaskResult, Testcase, TestcaseMetadata};
