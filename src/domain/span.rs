//! Span record as emitted by the per-label detectors.
//!
//! Field names follow the detector output schema (`theme`, `theme_text`,
//! `theme_start_char`, ...). Any column the engine does not own is kept in
//! `extra` and written back untouched.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A character offset as it arrived on the wire.
///
/// Detectors normally emit integers, but upstream tables sometimes carry
/// offsets as strings or garbage. Malformed offsets are preserved verbatim
/// so the span can pass through unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Offset {
    Index(i64),
    Raw(Value),
}

impl Offset {
    /// Integer value of the offset, accepting numeric strings
    pub fn resolve(&self) -> Option<i64> {
        match self {
            Offset::Index(i) => Some(*i),
            Offset::Raw(Value::String(s)) => s.trim().parse().ok(),
            // Tables round-tripped through floats write 12.0
            Offset::Raw(Value::Number(n)) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64),
            Offset::Raw(_) => None,
        }
    }

    /// Raw textual form, used in log lines and error reports
    pub fn describe(&self) -> String {
        match self {
            Offset::Index(i) => i.to_string(),
            Offset::Raw(v) => v.to_string(),
        }
    }
}

impl From<usize> for Offset {
    fn from(value: usize) -> Self {
        Offset::Index(value as i64)
    }
}

/// A labelled substring of a source comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    /// Full text the span was extracted from
    #[serde(rename = "cleaned_comment")]
    pub source_text: String,

    /// Theme assigned by the detector
    #[serde(rename = "theme")]
    pub label: String,

    /// The span's substring of `source_text`
    #[serde(rename = "theme_text")]
    pub text: String,

    /// Start character offset (inclusive)
    #[serde(rename = "theme_start_char")]
    pub start_char: Offset,

    /// End character offset (exclusive)
    #[serde(rename = "theme_end_char")]
    pub end_char: Offset,

    /// Detector confidence, never recomputed
    #[serde(default)]
    pub score: f64,

    /// Whether the span still counts as signal
    #[serde(default = "default_relevant", with = "relevant_flag")]
    pub relevant: bool,

    /// Validator verdict (set by the engine)
    #[serde(default = "default_valid")]
    pub valid: bool,

    /// Passthrough columns (grouping key, token offsets, dates, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_relevant() -> bool {
    true
}

fn default_valid() -> bool {
    true
}

impl Span {
    /// Create a span from detector output for a single source text
    pub fn new(
        source_text: impl Into<String>,
        label: impl Into<String>,
        text: impl Into<String>,
        start_char: usize,
        end_char: usize,
        score: f64,
    ) -> Self {
        Self {
            source_text: source_text.into(),
            label: label.into(),
            text: text.into(),
            start_char: start_char.into(),
            end_char: end_char.into(),
            score,
            relevant: true,
            valid: true,
            extra: Map::new(),
        }
    }

    /// Attach a passthrough field (e.g. the grouping key)
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Both offsets as integers, if they resolve
    pub fn offsets(&self) -> Option<(i64, i64)> {
        Some((self.start_char.resolve()?, self.end_char.resolve()?))
    }

    /// Length of the span text in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Mark the span irrelevant. There is deliberately no inverse.
    pub fn demote(&mut self) {
        self.relevant = false;
    }

    /// Replace offsets and text together so they never drift apart
    pub(crate) fn set_bounds(&mut self, start: usize, end: usize, text: String) {
        self.start_char = start.into();
        self.end_char = end.into();
        self.text = text;
    }
}

/// Substring of `text` by character offsets, `None` when out of range
pub fn char_slice(text: &str, start: usize, end: usize) -> Option<String> {
    if start > end {
        return None;
    }
    let mut chars = text.chars();
    let mut out = String::new();
    for _ in 0..start {
        chars.next()?;
    }
    for _ in start..end {
        out.push(chars.next()?);
    }
    Some(out)
}

/// `relevant` is written as 0/1 for the downstream warehouse, but detectors
/// may emit either a number or a boolean.
mod relevant_flag {
    use super::*;

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Bool(b) => Ok(b),
            Value::Number(n) => Ok(n.as_f64().map(|f| f != 0.0).unwrap_or(true)),
            Value::Null => Ok(true),
            other => Err(serde::de::Error::custom(format!(
                "relevant must be a boolean or 0/1, got {}",
                other
            ))),
        }
    }
}
