//! Text embedding provider contract.

use async_trait::async_trait;

use crate::domain::error::Result;
use crate::domain::types::Embedding;

/// External collaborator that turns chunk text into a dense vector.
///
/// Implementations must return an L2-normalized vector for non-empty
/// input and the zero vector of [`dimensions`](EmbeddingProvider::dimensions)
/// length for empty input, and must preserve input order in
/// [`embed_batch`](EmbeddingProvider::embed_batch). The embedding cache and
/// vector index both rely on these guarantees: the cache keys on text
/// content alone (not provider identity), and the index's cosine
/// similarity assumes unit-length vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single piece of text.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed a batch of texts, preserving input order in the output.
    ///
    /// Implementations should prefer this over repeated [`embed`](EmbeddingProvider::embed)
    /// calls when the provider can batch more efficiently (e.g. a single
    /// model forward pass over many inputs).
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Fixed output dimensionality of this provider.
    fn dimensions(&self) -> usize;

    /// Stable identifier used in logs and cache diagnostics.
    fn provider_name(&self) -> &str;

    /// Verify the provider is reachable and configured correctly.
    ///
    /// The default implementation embeds a fixed probe string; providers
    /// backed by a remote service should override this with a cheaper
    /// connectivity check where one exists.
    async fn health_check(&self) -> Result<()> {
        self.embed("health check").await?;
        Ok(())
    }
}
