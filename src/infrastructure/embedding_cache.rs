//! Content-addressed embedding cache.
//!
//! Keys on the SHA-256 hex digest of the chunk's text content, not on
//! chunk identity or provider identity: two chunks with byte-identical
//! content share one cache entry even across projects, and re-indexing an
//! unchanged file never re-embeds it. Writes go through a temp file and
//! atomic rename so a crash mid-write cannot leave a corrupt cache entry
//! where a reader would see one.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::error::{Error, Result};
use crate::domain::types::Embedding;

/// On-disk representation of a cached embedding: a thin JSON envelope
/// around the raw vector so a corrupt or truncated file is detectable
/// from a length check before the floats are trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedEmbeddingRecord {
    text_hash: String,
    dimensions: usize,
    vector: Vec<f32>,
}

/// A disk-backed, content-addressed store of embeddings.
pub struct EmbeddingCache {
    root: PathBuf,
}

impl EmbeddingCache {
    /// Open (creating if necessary) a cache rooted at `<cache_root>/embeddings`.
    pub fn new(cache_root: impl AsRef<Path>) -> Result<Self> {
        let root = cache_root.as_ref().join("embeddings");
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn entry_path(&self, text_hash: &str) -> PathBuf {
        self.root.join(format!("{text_hash}.json"))
    }

    /// Look up a cached embedding by the SHA-256 hex digest of its
    /// source text. A missing file is a plain cache miss (`Ok(None)`); a
    /// corrupt file also degrades to a miss rather than failing the
    /// caller, since re-embedding is always a safe fallback.
    pub fn get(&self, text_hash: &str) -> Result<Option<Embedding>> {
        let path = self.entry_path(text_hash);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: CachedEmbeddingRecord = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "embedding cache entry corrupt, treating as miss");
                return Ok(None);
            }
        };

        if record.vector.len() != record.dimensions || record.text_hash != text_hash {
            tracing::warn!(path = %path.display(), "embedding cache entry failed consistency check, treating as miss");
            return Ok(None);
        }

        Ok(Some(Embedding::new(record.vector)))
    }

    /// Persist an embedding under `text_hash`, replacing any existing
    /// entry. Writes to a sibling temp file then renames into place so
    /// concurrent readers never observe a partially written file.
    pub fn put(&self, text_hash: &str, embedding: &Embedding) -> Result<()> {
        let record = CachedEmbeddingRecord {
            text_hash: text_hash.to_string(),
            dimensions: embedding.dimensions(),
            vector: embedding.vector.clone(),
        };
        let bytes = serde_json::to_vec(&record)?;

        let final_path = self.entry_path(text_hash);
        let tmp_path = self.root.join(format!("{text_hash}.json.tmp-{}", std::process::id()));

        let write_result = (|| -> Result<()> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            fs::rename(&tmp_path, &final_path)?;
            fsync_dir(&self.root)?;
            Ok(())
        })();

        write_result.map_err(|err| {
            let _ = fs::remove_file(&tmp_path);
            match err {
                Error::Io { source } => Error::CacheWriteFailed {
                    path: final_path.to_string_lossy().into_owned(),
                    source,
                },
                other => other,
            }
        })
    }

    /// Returns `true` if an entry for `text_hash` exists, without
    /// deserializing it.
    pub fn contains(&self, text_hash: &str) -> bool {
        self.entry_path(text_hash).is_file()
    }

    /// Remove every cached embedding and recreate the (now empty) cache
    /// directory.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

#[cfg(unix)]
fn fsync_dir(dir: &Path) -> Result<()> {
    let dir_file = File::open(dir)?;
    nix::unistd::fsync(&dir_file)?;
    Ok(())
}

#[cfg(not(unix))]
fn fsync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
