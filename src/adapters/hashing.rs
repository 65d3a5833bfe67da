//! Feature-hashing bag-of-words embedder.
//!
//! Each lowercased word token is hashed with SHA-256 into one of a fixed
//! number of buckets, with the sign taken from a second hash bit. The
//! vector is L2-normalized. Stable across runs and platforms.

use sha2::{Digest, Sha256};

use super::{CollaboratorError, Embedder};

/// Default embedding width
pub const DEFAULT_DIMENSIONS: usize = 256;

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
        }
    }
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Result<Self, CollaboratorError> {
        if dimensions == 0 {
            return Err(CollaboratorError::Unavailable(
                "hashing embedder needs at least one dimension".to_string(),
            ));
        }
        Ok(Self { dimensions })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Bucket index and sign for a token
    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut word = [0u8; 8];
        word.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(word) % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in text
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|t| !t.is_empty())
        {
            let (index, sign) = self.bucket(&token.to_lowercase());
            vector[index] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cosine;

    #[test]
    fn test_deterministic_and_normalized() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("Friendly staff").unwrap();
        let b = embedder.embed("friendly STAFF!").unwrap();

        assert_eq!(a.len(), DEFAULT_DIMENSIONS);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_similar_texts_are_closer() {
        let embedder = HashingEmbedder::new(512).unwrap();
        let staff = embedder.embed("the staff were friendly").unwrap();
        let staff2 = embedder.embed("friendly staff").unwrap();
        let cost = embedder.embed("parking cost too much").unwrap();

        assert!(cosine(&staff, &staff2) > cosine(&staff, &cost));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(8).unwrap();
        assert_eq!(embedder.dimensions(), 8);
        assert_eq!(embedder.embed("...").unwrap(), vec![0.0; 8]);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(HashingEmbedder::new(0).is_err());
    }
}
