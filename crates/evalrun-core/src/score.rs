//! Scoring functions applied to every task result.
//!
//! Scorers are plain functions of their arguments. They never fail: a
//! malformed output scores 0 rather than raising.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::task::{EvalInput, TestcaseMetadata};

/// Arguments handed to every scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalArgs {
    pub input: EvalInput,

    /// Raw task output, usually a serialized `TaskResult`.
    pub output: Value,

    /// Expected output; `None` (or `null`) means "expects success".
    #[serde(default)]
    pub expected: Option<Value>,

    #[serde(default)]
    pub metadata: Option<TestcaseMetadata>,
}

/// A named score in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub name: String,
    pub score: f64,
}

impl ScoreRecord {
    fn new(name: &str, passed: bool) -> Self {
        Self {
            name: name.to_string(),
            score: if passed { 1.0 } else { 0.0 },
        }
    }
}

/// Signature shared by every scorer.
pub type Scorer = fn(&EvalArgs) -> ScoreRecord;

/// Every scorer, in reporting order.
pub const SCORERS: &[Scorer] = &[exact_match, error_match];

/// Apply every scorer in [`SCORERS`].
pub fn score_all(args: &EvalArgs) -> Vec<ScoreRecord> {
    SCORERS.iter().map(|scorer| scorer(args)).collect()
}

/// 1 if the output matches the expectation, 0 otherwise.
///
/// With no expectation (or an expectation of `true`) the output must signal
/// success: either the boolean `true` or an object whose `_success` is
/// `true`. Any other output, including objects without `_success` and
/// non-object values, scores 0. With any other expectation the output must
/// equal it.
pub fn exact_match(args: &EvalArgs) -> ScoreRecord {
    debug!(task = %args.input.name, output = %args.output, "Scoring exact match");

    let expects_success = match &args.expected {
        None | Some(Value::Null) | Some(Value::Bool(true)) => true,
        Some(_) => false,
    };

    let passed = if expects_success {
        match &args.output {
            Value::Bool(b) => *b,
            Value::Object(map) => matches!(map.get("_success"), Some(Value::Bool(true))),
            other => {
                warn!(
                    task = %args.input.name,
                    output_kind = value_kind(other),
                    "Output carries no success flag, scoring as failure"
                );
                false
            }
        }
    } else {
        args.expected.as_ref() == Some(&args.output)
    };

    ScoreRecord::new("Exact match", passed)
}

/// 0 if the output is an object carrying an `error` field, 1 otherwise.
pub fn error_match(args: &EvalArgs) -> ScoreRecord {
    debug!(task = %args.input.name, output = %args.output, "Scoring error rate");

    let has_error = args
        .output
        .as_object()
        .is_some_and(|map| map.contains_key("error"));

    ScoreRecord::new("Error rate", !has_error)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
