//! Eval category labels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Category label attached to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalCategory {
    /// Enumerates interactive candidates without acting.
    Observe,
    /// Performs a single page interaction.
    Act,
    /// Chains several act/observe/extract steps.
    Combination,
    /// Pulls structured data from the page.
    Extract,
    /// Not yet stable enough to gate on.
    Experimental,
    /// Extraction through the text-based extractor.
    TextExtract,
}

impl EvalCategory {
    pub const ALL: [EvalCategory; 6] = [
        Self::Observe,
        Self::Act,
        Self::Combination,
        Self::Extract,
        Self::Experimental,
        Self::TextExtract,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Observe => "observe",
            Self::Act => "act",
            Self::Combination => "combination",
            Self::Extract => "extract",
            Self::Experimental => "experimental",
            Self::TextExtract => "text_extract",
        }
    }
}

impl fmt::Display for EvalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvalCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::UnknownCategory(s.to_string()))
    }
}
