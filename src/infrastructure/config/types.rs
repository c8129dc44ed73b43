//! # Configuration Types
//!
//! The root `Config` struct, deserialized from the layered TOML/env
//! sources assembled by [`ConfigLoader`](super::loader::ConfigLoader) and
//! validated before any component uses it.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Top-level configuration for the code search core.
///
/// `chunk_overlap < chunk_size` is enforced by [`validate_chunk_window`]
/// rather than left to panic inside the chunker, so a malformed config
/// file fails fast at startup with a clear message.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// Root directory for the embedding cache, chunk store, and project
    /// registry.
    pub cache_root: String,

    /// Soft ceiling on the in-memory vector index's resident size, in
    /// bytes. Exceeding it triggers LRU eviction of the least recently
    /// searched chunks, not an error.
    #[validate(range(min = 1))]
    pub max_memory_bytes: u64,

    /// Maximum number of indexing jobs the queue runs concurrently.
    #[validate(range(min = 1))]
    pub max_concurrent_indexers: usize,

    /// Lines per chunk.
    #[validate(range(min = 1))]
    pub chunk_size: usize,

    /// Lines of overlap between consecutive chunks. Must be strictly
    /// less than `chunk_size`.
    pub chunk_overlap: usize,

    /// Project roots to index when none is specified explicitly.
    pub project_paths: Vec<String>,

    /// Glob-style substring filter applied to project ids when a request
    /// does not name a project explicitly.
    pub default_project_filter: Option<String>,
}

impl Config {
    /// Cross-field validation not expressible with `validator` derive
    /// attributes alone.
    pub fn validate_chunk_window(&self) -> Result<(), validator::ValidationError> {
        if self.chunk_overlap >= self.chunk_size {
            let mut err = validator::ValidationError::new("chunk_overlap_too_large");
            err.message = Some("chunk_overlap must be less than chunk_size".into());
            return Err(err);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_root: default_cache_root(),
            max_memory_bytes: 100 * 1024 * 1024 * 1024, // 100 GiB
            max_concurrent_indexers: 1,
            chunk_size: 50,
            chunk_overlap: 10,
            project_paths: Vec::new(),
            default_project_filter: None,
        }
    }
}

fn default_cache_root() -> String {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("code-search-core")
        .to_string_lossy()
        .into_owned()
}
