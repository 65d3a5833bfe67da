//! Core reconciliation logic.
//!
//! This module contains:
//! - Validator: offset and text consistency checks
//! - Relevance: content rules that demote spans
//! - Trimmer: trailing punctuation/whitespace normalization
//! - Overlap: the three-stage overlap gate and similarity scorer
//! - SameLabel / CrossLabel: pairwise conflict resolution
//! - Engine: runs every pass and assembles the result

pub mod cross_label;
pub mod engine;
pub mod overlap;
pub mod relevance;
pub mod report;
pub mod same_label;
pub mod trimmer;
pub mod validator;

// Re-export commonly used types
pub use cross_label::{CrossLabelReconciler, CrossLabelStats};
pub use engine::{Engine, Reconciliation};
pub use overlap::{
    normalize, shares_token, OverlapDetector, PairwiseCountCosine, SimilarityError,
    SimilarityScorer, DEFAULT_SIMILARITY_THRESHOLD,
};
pub use relevance::{contains_pictographic, load_exclusion_list, IrrelevanceReason, RelevanceFilter};
pub use report::{PassTimings, RelevanceCounts, RunReport};
pub use same_label::reconcile_same_label;
pub use trimmer::{trim_span, Trimmed};
pub use validator::{anchor_text, validate_span, MalformedSpan};
