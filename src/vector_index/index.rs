//! Concurrent in-memory vector storage, LRU eviction, and parallel
//! batched top-K search.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use rayon::prelude::*;

use crate::domain::error::Result;
use crate::domain::types::{ChunkRecord, Embedding, ScoredResult};
use crate::infrastructure::chunk_store::ChunkStore;
use crate::vector_index::simd::cosine_similarity;

/// Number of entries each parallel search worker scores per batch. Chosen
/// so a worker does enough work per task to amortize scheduling overhead
/// without making any single task dominate the search's wall-clock time.
const SEARCH_BATCH_SIZE: usize = 256;

/// Fixed overhead charged per resident entry against `max_bytes`, on top
/// of its vector and content bytes, to account for map/bookkeeping cost.
const ENTRY_OVERHEAD_BYTES: u64 = 128;

/// Eviction never drops the index below this many resident entries, even
/// while over `max_bytes`: a pathologically small `max_bytes` must still
/// leave the index usable rather than emptying it out entirely.
const MIN_RESIDENT_ENTRIES: usize = 100;

struct IndexEntry {
    chunk: ChunkRecord,
    embedding: Embedding,
    last_accessed: AtomicU64,
}

impl IndexEntry {
    fn size_bytes(&self) -> u64 {
        let vector_bytes = (self.embedding.vector.len() * std::mem::size_of::<f32>()) as u64;
        let content_bytes = self.chunk.content.len() as u64;
        vector_bytes + content_bytes + ENTRY_OVERHEAD_BYTES
    }
}

/// A concurrent, memory-bounded store of embedded chunks with exact
/// (not approximate) cosine-similarity search.
///
/// Every search batch scores the full set of entries assigned to it and
/// contributes its complete scored list to the merge step — unlike a
/// scheme that keeps only each batch's local best-K, which can drop a
/// true top-K result that happened to land in a batch containing several
/// other strong matches.
pub struct InMemoryVectorIndex {
    entries: DashMap<String, IndexEntry>,
    access_clock: AtomicU64,
    max_bytes: u64,
    current_bytes: AtomicU64,
}

impl InMemoryVectorIndex {
    /// Create an empty index with a soft resident-size ceiling.
    pub fn new(max_bytes: u64) -> Self {
        Self {
            entries: DashMap::new(),
            access_clock: AtomicU64::new(0),
            max_bytes,
            current_bytes: AtomicU64::new(0),
        }
    }

    /// Number of chunks currently resident.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no chunks are resident.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Approximate resident size in bytes.
    pub fn resident_bytes(&self) -> u64 {
        self.current_bytes.load(Ordering::Relaxed)
    }

    /// Insert or replace a chunk's embedding. Evicts least-recently-used
    /// entries afterward if this insertion pushed resident size over
    /// `max_bytes`.
    pub fn insert(&self, chunk: ChunkRecord, embedding: Embedding) {
        let entry = IndexEntry {
            chunk,
            embedding,
            last_accessed: AtomicU64::new(self.access_clock.fetch_add(1, Ordering::Relaxed)),
        };
        let added = entry.size_bytes();

        if let Some((_, old)) = self.entries.remove(&entry.chunk.id) {
            self.current_bytes.fetch_sub(old.size_bytes(), Ordering::Relaxed);
        }
        self.entries.insert(entry.chunk.id.clone(), entry);
        self.current_bytes.fetch_add(added, Ordering::Relaxed);

        self.evict_to_fit();
    }

    /// Remove a single chunk by id, if present.
    pub fn remove(&self, chunk_id: &str) {
        if let Some((_, entry)) = self.entries.remove(chunk_id) {
            self.current_bytes.fetch_sub(entry.size_bytes(), Ordering::Relaxed);
        }
    }

    /// Remove every chunk belonging to `project`.
    pub fn remove_project(&self, project: &str) {
        let ids: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.chunk.project == project)
            .map(|e| e.key().clone())
            .collect();
        for id in ids {
            self.remove(&id);
        }
    }

    fn evict_to_fit(&self) {
        while self.current_bytes.load(Ordering::Relaxed) > self.max_bytes
            && self.entries.len() > MIN_RESIDENT_ENTRIES
        {
            let oldest = self
                .entries
                .iter()
                .map(|e| (e.key().clone(), e.last_accessed.load(Ordering::Relaxed)))
                .min_by_key(|(_, last_accessed)| *last_accessed);

            match oldest {
                Some((id, _)) => self.remove(&id),
                None => break,
            }
        }
    }

    /// Score `query` against every resident chunk (optionally restricted
    /// to one project) and return the top `limit` by cosine similarity,
    /// descending. Ties are broken by chunk id so results are
    /// deterministic across runs.
    ///
    /// Entries scored in a given call are batched across threads; every
    /// batch's complete score list is merged before truncating to
    /// `limit`, so the global top-K is always exact, not an
    /// approximation of each batch's local best.
    pub fn search(&self, project: Option<&str>, query: &Embedding, limit: usize) -> Vec<ScoredResult> {
        let candidates: Vec<dashmap::mapref::multiple::RefMulti<'_, String, IndexEntry>> = self
            .entries
            .iter()
            .filter(|e| project.is_none_or(|p| e.chunk.project == p))
            .collect();

        let mut scored: Vec<ScoredResult> = candidates
            .par_chunks(SEARCH_BATCH_SIZE)
            .flat_map_iter(|batch| {
                batch.iter().map(|entry| ScoredResult {
                    chunk_id: entry.chunk.id.clone(),
                    project: entry.chunk.project.clone(),
                    file_path: entry.chunk.file_path.clone(),
                    start_line: entry.chunk.start_line,
                    end_line: entry.chunk.end_line,
                    content: entry.chunk.content.clone(),
                    score: cosine_similarity(&query.vector, &entry.embedding.vector),
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        scored.truncate(limit);

        let tick = self.access_clock.fetch_add(1, Ordering::Relaxed);
        for result in &scored {
            if let Some(entry) = self.entries.get(&result.chunk_id) {
                entry.last_accessed.store(tick, Ordering::Relaxed);
            }
        }

        scored
    }

    /// Load every chunk with a persisted embedding out of `chunk_store`
    /// into the hot index, so search is warm immediately after startup
    /// rather than only after the next indexing pass touches a chunk.
    /// Chunks with no embedding yet are skipped. Stops loading (and logs)
    /// as soon as resident size would exceed `max_bytes`, rather than
    /// loading everything and then evicting what was just loaded.
    pub fn preload(&self, chunk_store: &ChunkStore) -> Result<usize> {
        let mut loaded = 0;
        for chunk in chunk_store.load_all()? {
            let Some(embedding) = chunk.embedding.clone() else {
                continue;
            };
            if self.current_bytes.load(Ordering::Relaxed) >= self.max_bytes && !self.entries.is_empty() {
                tracing::warn!(loaded, "vector index preload stopped early, resident size limit reached");
                break;
            }
            self.insert(chunk, embedding);
            loaded += 1;
        }
        Ok(loaded)
    }
}
