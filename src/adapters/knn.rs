//! Cosine k-nearest-neighbour label classifier over a labelled reference set.
//!
//! The reference set is a JSON file:
//!
//! ```json
//! { "k": 5, "examples": [ { "text": "lovely nurses", "label": "Staff" } ] }
//! ```
//!
//! Example texts are embedded once at load time with the same embedder the
//! engine later uses for queries.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{cosine, CollaboratorError, Embedder, HashingEmbedder, LabelClassifier, LabelEncoder, Relabeler};

fn default_k() -> usize {
    5
}

/// One labelled reference text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceExample {
    pub text: String,
    pub label: String,
}

/// Reference file schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceSet {
    /// Neighbours consulted per prediction
    #[serde(default = "default_k")]
    pub k: usize,
    pub examples: Vec<ReferenceExample>,
}

impl ReferenceSet {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read reference set: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse reference set: {}", path.display()))
    }
}

/// Nearest-neighbour vote over embedded reference examples
#[derive(Debug, Clone)]
pub struct KnnClassifier {
    k: usize,
    points: Vec<(Vec<f32>, usize)>,
}

impl KnnClassifier {
    /// Embed a reference set; returns the classifier and its label encoder
    pub fn from_reference(
        set: &ReferenceSet,
        embedder: &dyn Embedder,
    ) -> Result<(Self, LabelEncoder), CollaboratorError> {
        if set.examples.is_empty() {
            return Err(CollaboratorError::Unavailable(
                "reference set has no examples".to_string(),
            ));
        }

        let encoder = LabelEncoder::fit(set.examples.iter().map(|e| e.label.clone()));
        let mut points = Vec::with_capacity(set.examples.len());
        for example in &set.examples {
            let class = encoder
                .transform(&example.label)
                .ok_or_else(|| CollaboratorError::Unavailable(example.label.clone()))?;
            points.push((embedder.embed(&example.text)?, class));
        }

        Ok((
            Self {
                k: set.k.max(1),
                points,
            },
            encoder,
        ))
    }
}

impl LabelClassifier for KnnClassifier {
    fn predict(&self, embedding: &[f32]) -> Result<usize, CollaboratorError> {
        if let Some((first, _)) = self.points.first() {
            if first.len() != embedding.len() {
                return Err(CollaboratorError::Classification(format!(
                    "embedding has {} dimensions, reference set has {}",
                    embedding.len(),
                    first.len()
                )));
            }
        }

        let mut scored: Vec<(f32, usize)> = self
            .points
            .iter()
            .map(|(point, class)| (cosine(point, embedding), *class))
            .collect();
        // Stable sort keeps reference order among equal similarities
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(self.k);

        // (votes, rank of best neighbour) per class; fewer rank wins ties
        let mut tally: Vec<(usize, usize, usize)> = Vec::new();
        for (rank, (_, class)) in scored.iter().enumerate() {
            match tally.iter_mut().find(|(c, _, _)| c == class) {
                Some((_, votes, _)) => *votes += 1,
                None => tally.push((*class, 1, rank)),
            }
        }

        tally
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)))
            .map(|(class, _, _)| class)
            .ok_or_else(|| CollaboratorError::Classification("no neighbours".to_string()))
    }
}

/// Build a relabeler backed by a hashing embedder and a kNN reference set
pub fn load_relabeler(path: &Path, dimensions: usize) -> Result<Relabeler> {
    let set = ReferenceSet::from_file(path)?;
    let embedder = HashingEmbedder::new(dimensions)?;
    let (classifier, encoder) = KnnClassifier::from_reference(&set, &embedder)
        .with_context(|| format!("Failed to build classifier from {}", path.display()))?;

    tracing::info!(
        examples = set.examples.len(),
        classes = encoder.classes().len(),
        k = set.k,
        dimensions = embedder.dimensions(),
        "Loaded kNN reference set"
    );

    Ok(Relabeler::new(
        Box::new(embedder),
        Box::new(classifier),
        encoder,
    ))
}
