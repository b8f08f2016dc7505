//! Testcase and task result types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::category::EvalCategory;
use crate::log::LogLine;
use crate::model::AvailableModel;

/// Input handed to a task run: which task, with which model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalInput {
    pub name: String,
    pub model_name: AvailableModel,
}

/// Metadata reported alongside every score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestcaseMetadata {
    pub model: AvailableModel,

    /// `"<task>-<model>"`.
    pub test: String,
}

/// One (task, model) pairing scheduled by the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testcase {
    pub input: EvalInput,
    pub name: String,
    pub tags: Vec<EvalCategory>,
    pub metadata: TestcaseMetadata,

    /// Expected task output; `None` means "expects success".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
}

impl Testcase {
    /// Create a testcase for `name` run with `model`.
    pub fn new(name: impl Into<String>, model: AvailableModel, tags: Vec<EvalCategory>) -> Self {
        let name = name.into();
        Self {
            input: EvalInput {
                name: name.clone(),
                model_name: model,
            },
            metadata: TestcaseMetadata {
                model,
                test: format!("{}-{}", name, model),
            },
            name,
            tags,
            expected: None,
        }
    }

    /// Builder method to set an expected output.
    pub fn with_expected(mut self, expected: Value) -> Self {
        self.expected = Some(expected);
        self
    }
}

/// Serialized keys owned by [`TaskResult`]'s typed fields.
const RESERVED_FIELDS: &[&str] = &["_success", "logs", "error", "debugUrl", "sessionUrl"];

/// Result of one task execution.
///
/// Task-specific fields (extracted values, observed URLs, ...) live in
/// `payload` and are flattened into the serialized object next to
/// `_success`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    #[serde(rename = "_success")]
    pub success: bool,

    #[serde(flatten)]
    pub payload: Map<String, Value>,

    #[serde(default)]
    pub logs: Vec<LogLine>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_url: Option<String>,
}

impl TaskResult {
    /// Create a result with the given outcome and nothing else.
    pub fn new(success: bool) -> Self {
        Self {
            success,
            payload: Map::new(),
            logs: Vec::new(),
            error: None,
            debug_url: None,
            session_url: None,
        }
    }

    /// Create a failed result carrying `error`.
    pub fn failure(error: impl Into<Value>) -> Self {
        let mut result = Self::new(false);
        result.error = Some(error.into());
        result
    }

    /// Builder method to add a task-specific field.
    ///
    /// Keys that name a typed field (`_success`, `logs`, `error`,
    /// `debugUrl`, `sessionUrl`) are dropped with a warning.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if RESERVED_FIELDS.contains(&key.as_str()) {
            tracing::warn!(field = %key, "Ignoring payload field that shadows a result field");
            return self;
        }
        self.payload.insert(key, value.into());
        self
    }

    /// Builder method to set the error.
    pub fn with_error(mut self, error: impl Into<Value>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Builder method to attach the run's logs.
    pub fn with_logs(mut self, logs: Vec<LogLine>) -> Self {
        self.logs = logs;
        self
    }

    /// Builder method to set the remote session links.
    pub fn with_session_links(
        mut self,
        debug_url: Option<String>,
        session_url: Option<String>,
    ) -> Self {
        self.debug_url = debug_url;
        self.session_url = session_url;
        self
    }

    /// The result as the JSON object scorers consume.
    ///
    /// Typed fields always win over payload entries with the same key.
    pub fn to_output(&self) -> Value {
        let mut output: Map<String, Value> = self
            .payload
            .iter()
            .filter(|(key, _)| !RESERVED_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        output.insert("_success".to_string(), Value::Bool(self.success));
        output.insert(
            "logs".to_string(),
            serde_json::to_value(&self.logs).unwrap_or_else(|_| Value::Array(Vec::new())),
        );
        if let Some(error) = &self.error {
            output.insert("error".to_string(), error.clone());
        }
        if let Some(debug_url) = &self.debug_url {
            output.insert("debugUrl".to_string(), Value::String(debug_url.clone()));
        }
        if let Some(session_url) = &self.session_url {
            output.insert("sessionUrl".to_string(), Value::String(session_url.clone()));
        }
        Value::Object(output)
    }
}
