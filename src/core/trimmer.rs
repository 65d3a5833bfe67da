//! Boundary trimming of span ends.
//!
//! Trailing whitespace and ASCII punctuation are shaved off the end of a
//! span, except `!` and `?` which carry sentiment. A `!`/`?` sitting right
//! after the trimmed span in the source is pulled back in.

/// Result of trimming one span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trimmed {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

fn is_emphasis(c: char) -> bool {
    c == '!' || c == '?'
}

fn is_trimmable(c: char) -> bool {
    c.is_whitespace() || (c.is_ascii_punctuation() && !is_emphasis(c))
}

/// Trim the end of a span given its character offsets into `source`.
///
/// Offsets must already be validated against `source`.
pub fn trim_span(source: &str, start: usize, end: usize) -> Trimmed {
    let chars: Vec<char> = source.chars().collect();
    let start = start.min(chars.len());
    let mut end = end.clamp(start, chars.len());

    while end > start && is_trimmable(chars[end - 1]) {
        end -= 1;
    }

    // Only reabsorb when the span doesn't already end in emphasis, so a
    // second pass over "wow!!" never grows the span again.
    let ends_in_emphasis = end > start && is_emphasis(chars[end - 1]);
    if !ends_in_emphasis && end < chars.len() && is_emphasis(chars[end]) {
        end += 1;
    }

    Trimmed {
        text: chars[start..end].iter().collect(),
        start,
        end,
    }
}
