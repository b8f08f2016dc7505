//! Structured log lines recorded during a run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of a log line. Lower is more severe.
pub mod level {
    pub const ERROR: u8 = 0;
    pub const INFO: u8 = 1;
    pub const DEBUG: u8 = 2;
}

/// Declared type of an auxiliary value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuxiliaryType {
    Object,
    String,
    Html,
    Integer,
    Float,
    Boolean,
}

/// A typed diagnostic value attached to a log line.
///
/// Values are always carried as strings; `kind` says how to read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryValue {
    pub value: String,

    #[serde(rename = "type")]
    pub kind: AuxiliaryType,
}

impl AuxiliaryValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: AuxiliaryType::String,
        }
    }

    pub fn integer(value: i64) -> Self {
        Self {
            value: value.to_string(),
            kind: AuxiliaryType::Integer,
        }
    }

    pub fn float(value: f64) -> Self {
        Self {
            value: value.to_string(),
            kind: AuxiliaryType::Float,
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            value: value.to_string(),
            kind: AuxiliaryType::Boolean,
        }
    }

    /// Serialize a JSON value as an `object` auxiliary.
    pub fn object(value: &Value) -> Self {
        Self {
            value: value.to_string(),
            kind: AuxiliaryType::Object,
        }
    }

    pub fn html(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: AuxiliaryType::Html,
        }
    }

    /// Decode the carried string according to its declared type.
    ///
    /// Values that do not parse as their declared type fall back to a
    /// JSON string.
    pub fn parsed(&self) -> Value {
        let fallback = || Value::String(self.value.clone());
        match self.kind {
            AuxiliaryType::Object => {
                serde_json::from_str(&self.value).unwrap_or_else(|_| fallback())
            }
            AuxiliaryType::Integer => self
                .value
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| fallback()),
            AuxiliaryType::Float => self
                .value
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(fallback),
            AuxiliaryType::Boolean => self
                .value
                .parse::<bool>()
                .map(Value::Bool)
                .unwrap_or_else(|_| fallback()),
            AuxiliaryType::String | AuxiliaryType::Html => fallback(),
        }
    }
}

/// One structured log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    pub message: String,

    #[serde(default = "default_level")]
    pub level: u8,

    /// RFC 3339 timestamp, stamped by the logger when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub auxiliary: BTreeMap<String, AuxiliaryValue>,

    /// `auxiliary` with every value decoded, filled in by the logger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_auxiliary: Option<BTreeMap<String, Value>>,
}

fn default_level() -> u8 {
    level::INFO
}

impl LogLine {
    /// Create a line at the given level.
    pub fn new(message: impl Into<String>, level: u8) -> Self {
        Self {
            category: None,
            message: message.into(),
            level,
            timestamp: None,
            auxiliary: BTreeMap::new(),
            parsed_auxiliary: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, level::INFO)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, level::ERROR)
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(message, level::DEBUG)
    }

    /// Builder method to set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Builder method to add an auxiliary value.
    pub fn with_aux(mut self, key: impl Into<String>, value: AuxiliaryValue) -> Self {
        self.auxiliary.insert(key.into(), value);
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == level::ERROR
    }
}
