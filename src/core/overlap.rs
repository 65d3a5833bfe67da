//! Overlap detection between two spans.
//!
//! A pair overlaps when three gates pass, cheapest first:
//! 1. Character ranges intersect (touching ends count)
//! 2. Normalized token sets share at least one token
//! 3. Cosine similarity of term counts exceeds the threshold
//!
//! The similarity step is a strategy object so callers can swap the
//! pairwise vectorizer for a fixed global vocabulary.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use thiserror::Error;
use tracing::debug;

use crate::domain::Span;

/// Default cosine threshold for two spans to count as the same content
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Failure to score a pair; callers treat it as similarity 0
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimilarityError {
    #[error("Empty vocabulary: neither text has a countable token")]
    EmptyVocabulary,

    #[error("Zero vector: one text has no countable token")]
    ZeroVector,
}

/// Scores textual similarity of two normalized texts in `[0, 1]`
pub trait SimilarityScorer: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> Result<f64, SimilarityError>;
}

/// Cosine of term-count vectors over a vocabulary built from just the pair.
///
/// Tokens are runs of word characters at least two characters long,
/// lowercased. Rebuilding the vocabulary per pair is intentional: groups are
/// small and the result depends only on the two texts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairwiseCountCosine;

impl PairwiseCountCosine {
    fn term_counts(text: &str) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for token in text
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|t| t.chars().count() >= 2)
        {
            *counts.entry(token.to_lowercase()).or_insert(0) += 1;
        }
        counts
    }
}

impl SimilarityScorer for PairwiseCountCosine {
    fn similarity(&self, a: &str, b: &str) -> Result<f64, SimilarityError> {
        let counts_a = Self::term_counts(a);
        let counts_b = Self::term_counts(b);

        let vocabulary: BTreeSet<&String> = counts_a.keys().chain(counts_b.keys()).collect();
        if vocabulary.is_empty() {
            return Err(SimilarityError::EmptyVocabulary);
        }

        let mut dot = 0.0;
        let mut norm_a = 0.0;
        let mut norm_b = 0.0;
        for term in vocabulary {
            let x = counts_a.get(term).copied().unwrap_or(0) as f64;
            let y = counts_b.get(term).copied().unwrap_or(0) as f64;
            dot += x * y;
            norm_a += x * x;
            norm_b += y * y;
        }

        if norm_a == 0.0 || norm_b == 0.0 {
            return Err(SimilarityError::ZeroVector);
        }

        Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
    }
}

/// Strip ASCII punctuation and lowercase
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect::<String>()
        .to_lowercase()
}

/// Whether two normalized texts share a whitespace-separated token
pub fn shares_token(a: &str, b: &str) -> bool {
    let words: HashSet<&str> = a.split_whitespace().collect();
    b.split_whitespace().any(|w| words.contains(w))
}

/// Three-stage overlap gate
pub struct OverlapDetector {
    threshold: f64,
    scorer: Box<dyn SimilarityScorer>,
}

impl Default for OverlapDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl OverlapDetector {
    /// Detector with the pairwise count-cosine scorer
    pub fn new(threshold: f64) -> Self {
        Self::with_scorer(threshold, Box::new(PairwiseCountCosine))
    }

    pub fn with_scorer(threshold: f64, scorer: Box<dyn SimilarityScorer>) -> Self {
        Self { threshold, scorer }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Similarity of two raw texts, 0 when it cannot be computed
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        self.score_normalized(&normalize(a), &normalize(b))
    }

    fn score_normalized(&self, a: &str, b: &str) -> f64 {
        match self.scorer.similarity(a, b) {
            Ok(score) => score,
            Err(e) => {
                debug!(error = %e, "Similarity failed, treating as 0");
                0.0
            }
        }
    }

    /// Whether two spans overlap in position and content
    pub fn overlaps(&self, a: &Span, b: &Span) -> bool {
        let (Some((start_a, end_a)), Some((start_b, end_b))) = (a.offsets(), b.offsets()) else {
            debug!(a = %a.text, b = %b.text, "Non-numeric offsets, skipping overlap check");
            return false;
        };

        if !(end_a >= start_b && end_b >= start_a) {
            return false;
        }

        let text_a = normalize(&a.text);
        let text_b = normalize(&b.text);
        if !shares_token(&text_a, &text_b) {
            return false;
        }

        self.score_normalized(&text_a, &text_b) > self.threshold
    }
}
