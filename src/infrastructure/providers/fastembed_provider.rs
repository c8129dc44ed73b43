//! A local embedding provider backed by the `fastembed` crate's
//! `AllMiniLML6V2` model. Runs entirely on-device once the model is
//! downloaded; no network calls at embed time.

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::Mutex;

use crate::domain::error::{Error, Result};
use crate::domain::ports::embedding::EmbeddingProvider;
use crate::domain::types::Embedding;

const DIMENSIONS: usize = 384;

/// Wraps a `fastembed::TextEmbedding` model behind the
/// [`EmbeddingProvider`] contract. The model is not `Sync`-friendly to
/// call concurrently, so calls are serialized through a `tokio::Mutex`
/// rather than requiring `&mut self` all the way up the call stack.
pub struct FastEmbedProvider {
    model: Mutex<TextEmbedding>,
}

impl FastEmbedProvider {
    /// Load the `AllMiniLML6V2` model, downloading it on first use if it
    /// is not already cached locally.
    pub fn new() -> Result<Self> {
        let options = InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false);
        let model = TextEmbedding::try_new(options)
            .map_err(|e| Error::embedding_failed(format!("failed to initialize fastembed model: {e}")))?;
        Ok(Self {
            model: Mutex::new(model),
        })
    }

    fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        if text.is_empty() {
            return Ok(Embedding::new(vec![0.0; DIMENSIONS]));
        }
        let mut model = self.model.lock().await;
        let mut vectors = model
            .embed(vec![text.to_string()], None)
            .map_err(|e| Error::embedding_failed(e.to_string()))?;
        let vector = vectors.pop().ok_or_else(|| {
            Error::embedding_failed("fastembed returned no vectors for one input")
        })?;
        Ok(Embedding::new(Self::normalize(vector)))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut model = self.model.lock().await;
        let vectors = model
            .embed(texts.to_vec(), None)
            .map_err(|e| Error::embedding_failed(e.to_string()))?;
        Ok(vectors
            .into_iter()
            .map(|v| Embedding::new(Self::normalize(v)))
            .collect())
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn provider_name(&self) -> &str {
        "fastembed-all-minilm-l6-v2"
    }
}
