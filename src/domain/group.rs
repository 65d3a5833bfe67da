//! Document groups: spans bucketed by the comment they came from.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::span::Span;

/// How to key spans that lack the configured grouping field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyFallback {
    /// One synthetic group per input row
    #[default]
    RowPosition,
    /// Key-less spans with identical source text share a group
    SourceText,
}

/// Identifier of a document group
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentKey {
    /// Value of the caller-supplied key field
    Natural(String),
    /// Row position of the span in the input
    Row(usize),
    /// First row position of a shared source text
    Text(usize),
}

impl DocumentKey {
    pub fn is_synthetic(&self) -> bool {
        !matches!(self, DocumentKey::Natural(_))
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKey::Natural(k) => write!(f, "{}", k),
            DocumentKey::Row(i) => write!(f, "row:{}", i),
            DocumentKey::Text(i) => write!(f, "text:{}", i),
        }
    }
}

/// All spans sharing one document key, in insertion order
#[derive(Debug, Clone)]
pub struct DocumentGroup {
    pub key: DocumentKey,
    pub spans: Vec<Span>,
}

impl DocumentGroup {
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Render a key field value as a group identifier
fn key_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Bucket spans by document key.
///
/// Groups are returned in order of first appearance; spans keep their
/// relative input order within a group. Every span lands in exactly one
/// group.
///
/// Key values are compared by their text: a numeric `1` and a string `"1"`
/// name the same document. A `null` key counts as missing.
pub fn group_spans(
    spans: Vec<Span>,
    key_field: Option<&str>,
    fallback: KeyFallback,
) -> Vec<DocumentGroup> {
    let mut groups: Vec<DocumentGroup> = Vec::new();
    let mut index: HashMap<DocumentKey, usize> = HashMap::new();
    let mut first_row_for_text: HashMap<String, usize> = HashMap::new();

    for (row, span) in spans.into_iter().enumerate() {
        let natural = key_field
            .and_then(|field| span.extra.get(field))
            .and_then(key_value);

        let key = match natural {
            Some(k) => DocumentKey::Natural(k),
            None => match fallback {
                KeyFallback::RowPosition => DocumentKey::Row(row),
                KeyFallback::SourceText => {
                    let first = *first_row_for_text
                        .entry(span.source_text.clone())
                        .or_insert(row);
                    DocumentKey::Text(first)
                }
            },
        };

        match index.get(&key) {
            Some(&slot) => groups[slot].spans.push(span),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(DocumentGroup {
                    key,
                    spans: vec![span],
                });
            }
        }
    }

    groups
}

/// Flatten groups back into one collection, group by group
pub fn flatten_groups(groups: Vec<DocumentGroup>) -> Vec<Span> {
    groups.into_iter().flat_map(|g| g.spans).collect()
}
