//! Fuzzy string comparison for extraction assertions.
//!
//! Extraction output rarely matches the page byte for byte: casing,
//! punctuation and whitespace drift between runs. Assertions therefore go
//! through [`normalize`] and a Levenshtein similarity ratio instead of `==`.

use serde::{Deserialize, Serialize};

/// Threshold used when a task does not pick its own.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Result of comparing two strings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    /// Similarity in `[0, 1]`, 1 meaning identical after normalization.
    pub similarity: f64,

    /// Whether `similarity >= threshold`.
    pub meets_threshold: bool,
}

/// Normalize text for comparison.
///
/// Lowercases, drops every character that is neither alphanumeric nor
/// whitespace, collapses whitespace runs to a single space and trims.
/// Applying it twice gives the same result as applying it once.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Compare `actual` against `expected` after normalization.
///
/// The similarity is `1 - distance / max_len` over characters, so it is
/// symmetric in its arguments.
pub fn compare(actual: &str, expected: &str, threshold: f64) -> Comparison {
    let a: Vec<char> = normalize(actual).chars().collect();
    let b: Vec<char> = normalize(expected).chars().collect();

    let longest = a.len().max(b.len());
    let similarity = if longest == 0 {
        1.0
    } else {
        1.0 - levenshtein(&a, &b) as f64 / longest as f64
    };

    Comparison {
        similarity,
        meets_threshold: similarity >= threshold,
    }
}

/// [`compare`] with [`DEFAULT_SIMILARITY_THRESHOLD`].
pub fn compare_default(actual: &str, expected: &str) -> Comparison {
    compare(actual, expected, DEFAULT_SIMILARITY_THRESHOLD)
}

/// Levenshtein distance over characters.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    let n = b.len();

    // Single row with rolling updates.
    let mut prev_row: Vec<usize> = (0..=n).collect();
    let mut curr_row = vec![0usize; n + 1];

    for (i, a_ch) in a.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_ch) in b.iter().enumerate() {
            let cost = if a_ch == b_ch { 0 } else { 1 };
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[n]
}
