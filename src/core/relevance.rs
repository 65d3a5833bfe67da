//! Content rules that mark a span as never counting as signal.
//!
//! The pictographic rule is always on. Exclusion phrases and per-label
//! score floors are optional and come from configuration.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use unicode_properties::UnicodeEmoji;

use crate::domain::Span;

/// Whether a character is an emoji.
///
/// Uses the Unicode `Emoji` property. ASCII digits, `#` and `*` carry that
/// property only as keycap bases, so ASCII never counts.
pub fn is_pictographic(c: char) -> bool {
    !c.is_ascii() && c.is_emoji_char()
}

/// Whether text contains any pictographic symbol
pub fn contains_pictographic(text: &str) -> bool {
    text.chars().any(is_pictographic)
}

/// Rule that demoted a span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrelevanceReason {
    /// Text contains an emoji or other pictograph
    Pictographic,
    /// Text is on the exclusion list
    ExcludedPhrase,
    /// Score is below the label's minimum
    BelowThreshold,
}

/// Deterministic relevance rules
#[derive(Debug, Clone, Default)]
pub struct RelevanceFilter {
    /// Lowercased phrases that are never signal
    exclusions: HashSet<String>,
    /// Minimum detector score per label
    min_scores: HashMap<String, f64>,
}

impl RelevanceFilter {
    pub fn new(exclusions: impl IntoIterator<Item = String>, min_scores: HashMap<String, f64>) -> Self {
        Self {
            exclusions: exclusions
                .into_iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            min_scores,
        }
    }

    /// First rule the span trips, if any
    pub fn check(&self, span: &Span) -> Option<IrrelevanceReason> {
        if contains_pictographic(&span.text) {
            return Some(IrrelevanceReason::Pictographic);
        }

        if !self.exclusions.is_empty()
            && self.exclusions.contains(&span.text.trim().to_lowercase())
        {
            return Some(IrrelevanceReason::ExcludedPhrase);
        }

        match self.min_scores.get(&span.label) {
            Some(&min) if span.score < min => Some(IrrelevanceReason::BelowThreshold),
            _ => None,
        }
    }

    /// Demote the span if a rule fires
    pub fn apply(&self, span: &mut Span) -> Option<IrrelevanceReason> {
        let reason = self.check(span)?;
        tracing::debug!(text = %span.text, ?reason, "Marking span irrelevant");
        span.demote();
        Some(reason)
    }
}

/// Load an exclusion list: one phrase per line, blank lines ignored
pub fn load_exclusion_list(path: &Path) -> Result<HashSet<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read exclusion file: {}", path.display()))?;

    Ok(content
        .lines()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect())
}
