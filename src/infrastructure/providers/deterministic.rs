//! A deterministic embedding provider derived from a SHA-256 digest of
//! the input text, with no model, network, or subprocess dependency. Used
//! in tests and as a safe default when no real provider is configured:
//! identical text always produces an identical vector, which makes
//! pipeline behavior (caching, dedup, ranking) easy to assert on without
//! a real model in the loop.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::error::Result;
use crate::domain::ports::embedding::EmbeddingProvider;
use crate::domain::types::Embedding;

/// Hashes text to a fixed-dimension, L2-normalized vector.
pub struct DeterministicHashProvider {
    dimensions: usize,
}

impl DeterministicHashProvider {
    /// Build a provider with the given output dimensionality.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        if text.is_empty() {
            return vec![0.0; self.dimensions];
        }

        let mut vector = Vec::with_capacity(self.dimensions);
        let mut counter: u32 = 0;
        while vector.len() < self.dimensions {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hasher.update(counter.to_le_bytes());
            let digest = hasher.finalize();
            for byte in digest {
                if vector.len() == self.dimensions {
                    break;
                }
                // Map byte range [0, 255] to [-1.0, 1.0].
                vector.push((byte as f32 / 127.5) - 1.0);
            }
            counter += 1;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for DeterministicHashProvider {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for DeterministicHashProvider {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(Embedding::new(self.hash_to_vector(text)))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts
            .iter()
            .map(|text| Embedding::new(self.hash_to_vector(text)))
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "deterministic-hash"
    }
}
