//! Supported model identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A model the automation library can be asked to use.
///
/// Identifiers serialize to the exact strings accepted on the wire
/// (`"gpt-4o"`, `"claude-3-5-sonnet-latest"`, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AvailableModel {
    #[default]
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
    #[serde(rename = "gpt-4o-2024-08-06")]
    Gpt4o20240806,
    #[serde(rename = "claude-3-5-sonnet-latest")]
    Claude35SonnetLatest,
    #[serde(rename = "claude-3-5-sonnet-20241022")]
    Claude35Sonnet20241022,
    #[serde(rename = "claude-3-5-sonnet-20240620")]
    Claude35Sonnet20240620,
    #[serde(rename = "o1-mini")]
    O1Mini,
    #[serde(rename = "o1-preview")]
    O1Preview,
}

impl AvailableModel {
    /// Every supported model, in declaration order.
    pub const ALL: [AvailableModel; 8] = [
        Self::Gpt4o,
        Self::Gpt4oMini,
        Self::Gpt4o20240806,
        Self::Claude35SonnetLatest,
        Self::Claude35Sonnet20241022,
        Self::Claude35Sonnet20240620,
        Self::O1Mini,
        Self::O1Preview,
    ];

    /// Wire identifier of the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gpt4o => "gpt-4o",
            Self::Gpt4oMini => "gpt-4o-mini",
            Self::Gpt4o20240806 => "gpt-4o-2024-08-06",
            Self::Claude35SonnetLatest => "claude-3-5-sonnet-latest",
            Self::Claude35Sonnet20241022 => "claude-3-5-sonnet-20241022",
            Self::Claude35Sonnet20240620 => "claude-3-5-sonnet-20240620",
            Self::O1Mini => "o1-mini",
            Self::O1Preview => "o1-preview",
        }
    }

    /// Provider name serving this model (e.g., "openai", "anthropic").
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Claude35SonnetLatest
            | Self::Claude35Sonnet20241022
            | Self::Claude35Sonnet20240620 => "anthropic",
            _ => "openai",
        }
    }
}

impl fmt::Display for AvailableModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AvailableModel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| CoreError::UnknownModel(s.to_string()))
    }
}
