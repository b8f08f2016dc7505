//! Types exchanged with the automation library.
//!
//! Field names follow the library's camelCase wire format.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use evalrun_core::AvailableModel;

// ============================================================================
// Session types
// ============================================================================

/// Where the browser runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Environment {
    /// Browser launched on this machine.
    #[default]
    Local,
    /// Existing browser attached through a CDP endpoint.
    Remote,
    /// Hosted sandbox browser.
    Browserbase,
}

impl Environment {
    /// Environment selected by an `EVAL_ENV` value.
    ///
    /// `browserbase` (any case) selects the hosted sandbox, anything else
    /// runs locally.
    pub fn from_eval_env(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("browserbase") => Self::Browserbase,
            _ => Self::Local,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::Remote => "REMOTE",
            Self::Browserbase => "BROWSERBASE",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options sent to the library when a session is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchOptions {
    pub env: Environment,
    pub model_name: AvailableModel,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdp_url: Option<String>,

    pub headless: bool,
    pub verbose: u8,
    pub debug_dom: bool,
    pub enable_caching: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dom_settle_timeout_ms: Option<u64>,

    /// Custom instruction-following system prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// What the library reports once a session is up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitResponse {
    #[serde(default)]
    pub debug_url: Option<String>,

    #[serde(default)]
    pub session_url: Option<String>,

    #[serde(default)]
    pub session_id: Option<String>,
}

// ============================================================================
// Page operation types
// ============================================================================

/// Load state to wait for after navigation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    #[default]
    Load,
    DomContentLoaded,
    NetworkIdle,
}

/// Navigation options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GotoOptions {
    pub wait_until: WaitUntil,
}

impl GotoOptions {
    pub fn wait_until(wait_until: WaitUntil) -> Self {
        Self { wait_until }
    }
}

/// Perform one page interaction described in natural language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActOptions {
    pub action: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<AvailableModel>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_vision: Option<bool>,
}

impl ActOptions {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            model_name: None,
            use_vision: None,
        }
    }

    pub fn with_model(mut self, model: AvailableModel) -> Self {
        self.model_name = Some(model);
        self
    }
}

/// Outcome the library reports for an act call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActResult {
    pub success: bool,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub action: String,
}

impl ActResult {
    /// Read an act output, if it has the usual shape.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Pull structured data from the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractOptions {
    pub instruction: String,

    /// JSON Schema the extraction must conform to. `None` lets the library
    /// fall back to its default `{ extraction: string }` shape.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<AvailableModel>,

    pub use_text_extract: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dom_settle_timeout_ms: Option<u64>,
}

impl ExtractOptions {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            schema: None,
            model_name: None,
            use_text_extract: false,
            dom_settle_timeout_ms: None,
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_model(mut self, model: AvailableModel) -> Self {
        self.model_name = Some(model);
        self
    }

    pub fn with_text_extract(mut self, enabled: bool) -> Self {
        self.use_text_extract = enabled;
        self
    }
}

/// Enumerate interactive candidates on the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserveOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,

    pub only_visible: bool,
    pub use_accessibility_tree: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<AvailableModel>,
}

/// One candidate returned by observe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserveResult {
    pub selector: String,

    #[serde(default)]
    pub description: String,
}

// ============================================================================
// Bridge wire types
// ============================================================================

/// Request written to the bridge.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeRequest<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

/// Error body of a failed bridge response.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeErrorBody {
    pub message: String,
}

/// Anything the bridge writes to stdout.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BridgeMessage {
    /// Reply to a request, correlated by `id`.
    Response {
        id: u64,
        #[serde(default)]
        result: Value,
        #[serde(default)]
        error: Option<BridgeErrorBody>,
    },
    /// Unsolicited message, e.g. a `log` line.
    Notification {
        method: String,
        #[serde(default)]
        params: Value,
    },
}
