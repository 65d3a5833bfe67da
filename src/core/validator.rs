//! Offset validation for incoming spans.
//!
//! A data-quality gate, not a fatal check: malformed spans are reported and
//! flagged but keep flowing through grouping and reconciliation.

use thiserror::Error;

use crate::domain::{char_slice, Span};

/// Why a span failed validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedSpan {
    #[error("Non-numeric {field}: {raw}")]
    NonNumericOffset { field: &'static str, raw: String },

    #[error("Offsets out of range: start={start} end={end} len={len}")]
    OffsetsOutOfRange { start: i64, end: i64, len: usize },

    #[error("Span text does not match source: expected {expected:?}, got {actual:?}")]
    TextMismatch { expected: String, actual: String },
}

/// Verify a span's offsets are in range and its text matches the source
pub fn validate_span(span: &Span) -> Result<(usize, usize), MalformedSpan> {
    let start = span
        .start_char
        .resolve()
        .ok_or_else(|| MalformedSpan::NonNumericOffset {
            field: "theme_start_char",
            raw: span.start_char.describe(),
        })?;
    let end = span
        .end_char
        .resolve()
        .ok_or_else(|| MalformedSpan::NonNumericOffset {
            field: "theme_end_char",
            raw: span.end_char.describe(),
        })?;

    let len = span.source_text.chars().count();
    if start < 0 || end as i128 > len as i128 || start > end {
        return Err(MalformedSpan::OffsetsOutOfRange { start, end, len });
    }

    let (start, end) = (start as usize, end as usize);
    // Range was checked above, so the slice always exists
    let expected = char_slice(&span.source_text, start, end).unwrap_or_default();
    if expected != span.text {
        return Err(MalformedSpan::TextMismatch {
            expected,
            actual: span.text.clone(),
        });
    }

    Ok((start, end))
}

/// Context around a character range, for reporting malformed spans.
///
/// Returns about `window` characters centred on the range, clamped to the
/// source, with "..." marking truncation on either side.
pub fn anchor_text(source: &str, start: usize, end: usize, window: usize) -> String {
    let chars: Vec<char> = source.chars().collect();
    let start = start.min(chars.len());
    let end = end.clamp(start, chars.len());

    let each_side = window.saturating_sub(end - start) / 2;
    let anchor_start = start.saturating_sub(each_side);
    let anchor_end = (end + each_side).min(chars.len());

    let prefix = if anchor_start > 0 { "..." } else { "" };
    let suffix = if anchor_end < chars.len() { "..." } else { "" };
    let anchor: String = chars[anchor_start..anchor_end].iter().collect();

    format!("{}{}{}", prefix, anchor, suffix)
}
