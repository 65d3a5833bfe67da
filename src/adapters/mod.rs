//! External collaborators consulted during cross-label reconciliation.
//!
//! The engine only needs two capabilities: turn text into a vector, and
//! turn a vector into a label index. Both are traits so that any embedding
//! model or pre-trained classifier can be plugged in. This crate ships a
//! feature-hashing embedder and a k-nearest-neighbour classifier so the
//! binary works without an external model.

pub mod hashing;
pub mod knn;

use thiserror::Error;

pub use hashing::HashingEmbedder;
pub use knn::{KnnClassifier, ReferenceExample, ReferenceSet};

/// Collaborator failures. Any of these disables relabeling for the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollaboratorError {
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Classifier returned unknown class index {index} ({known} classes)")]
    UnknownClass { index: usize, known: usize },
}

/// Produces a vector representation of text
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError>;
}

/// Pre-trained classifier returning an encoded class index
pub trait LabelClassifier: Send + Sync {
    fn predict(&self, embedding: &[f32]) -> Result<usize, CollaboratorError>;
}

/// Maps encoded class indices back to label names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Build an encoder from labels; classes are sorted and deduplicated
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes: Vec<String> = labels.into_iter().map(Into::into).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn transform(&self, label: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(label)).ok()
    }

    pub fn inverse_transform(&self, index: usize) -> Result<&str, CollaboratorError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(CollaboratorError::UnknownClass {
                index,
                known: self.classes.len(),
            })
    }
}

/// Embedder + classifier + encoder, consulted once per cross-label conflict
pub struct Relabeler {
    embedder: Box<dyn Embedder>,
    classifier: Box<dyn LabelClassifier>,
    encoder: LabelEncoder,
}

impl Relabeler {
    pub fn new(
        embedder: Box<dyn Embedder>,
        classifier: Box<dyn LabelClassifier>,
        encoder: LabelEncoder,
    ) -> Self {
        Self {
            embedder,
            classifier,
            encoder,
        }
    }

    /// Predict a label for a span text
    pub fn classify(&self, text: &str) -> Result<String, CollaboratorError> {
        let embedding = self.embedder.embed(text)?;
        let index = self.classifier.predict(&embedding)?;
        Ok(self.encoder.inverse_transform(index)?.to_string())
    }
}

/// Cosine similarity of two vectors; 0 when either is all zeros
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
