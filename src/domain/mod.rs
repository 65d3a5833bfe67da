//! Domain types for the reconciliation engine.
//!
//! This module contains the core data structures:
//! - Span: a labelled substring with offsets, score and relevance flag
//! - DocumentGroup: spans sharing one source comment

pub mod group;
pub mod span;

// Re-export commonly used types
pub use group::{flatten_groups, group_spans, DocumentGroup, DocumentKey, KeyFallback};
pub use span::{char_slice, Offset, Span};
