//! spanrec - Deterministic reconciliation of overlapping labelled text spans
//!
//! Per-label span detectors run independently over the same comment and
//! produce spans that overlap, duplicate each other, or have ragged
//! boundaries. This crate reconciles them with a fixed set of explainable
//! passes.
//!
//! # Architecture
//!
//! Each pass consumes the output of the previous one:
//! - Validate offsets against the source text
//! - Demote spans that trip a content rule (emoji, exclusions, thresholds)
//! - Trim trailing punctuation and whitespace
//! - Group spans by document
//! - Resolve same-label overlaps, then cross-label overlaps
//! - Flatten the groups back into one batch
//!
//! Every input span comes out exactly once. Only `label`, the offsets and
//! text, `relevant` and `valid` ever change.
//!
//! # Modules
//!
//! - `adapters`: Embedding and classifier collaborators
//! - `core`: Reconciliation passes and the engine
//! - `domain`: Data structures (Span, DocumentGroup)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Reconcile a batch of detector output
//! spanrec reconcile -i spans.jsonl -o reconciled.jsonl --key-field comment_id
//!
//! # Check offsets only
//! spanrec validate -i spans.jsonl
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{CollaboratorError, Embedder, LabelClassifier, LabelEncoder, Relabeler};
pub use core::{Engine, OverlapDetector, Reconciliation, RelevanceFilter, RunReport};
pub use domain::{DocumentGroup, DocumentKey, KeyFallback, Offset, Span};
