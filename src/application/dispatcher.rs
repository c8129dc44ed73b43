//! Request dispatcher: the seven operations an external caller invokes,
//! composed from the vector index, chunk store, project registry, and
//! indexing queue.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::error::{Error, Result};
use crate::domain::ports::embedding::EmbeddingProvider;
use crate::domain::types::{
    FileSnippet, IndexingJob, JobPriority, ProjectMetadata, ScoredResult, SnippetLine,
};
use crate::indexing::queue::IndexingQueue;
use crate::infrastructure::chunk_store::ChunkStore;
use crate::infrastructure::project_registry::ProjectRegistry;
use crate::vector_index::index::InMemoryVectorIndex;

/// The over-fetch multiplier applied to a caller's `limit` before
/// deduplication, so that collapsing duplicate `(file_path, start_line)`
/// hits rarely leaves fewer than `limit` results. Clamped to `[20, 100]`
/// so a `limit` of 1 does not starve the search and a `limit` of 1000
/// does not make every request scan the whole index.
fn expanded_limit(limit: usize) -> usize {
    (limit * 2).clamp(20, 100)
}

/// Default number of lines of surrounding context added on each side of
/// a requested range when the caller does not specify `context_lines`.
const DEFAULT_CONTEXT_LINES: usize = 3;

/// Composes the core components into the operations an external caller
/// invokes.
pub struct RequestDispatcher {
    vector_index: Arc<InMemoryVectorIndex>,
    chunk_store: Arc<ChunkStore>,
    registry: Arc<ProjectRegistry>,
    queue: Arc<IndexingQueue>,
    provider: Arc<dyn EmbeddingProvider>,
}

impl RequestDispatcher {
    /// Wire a dispatcher from its collaborators.
    pub fn new(
        vector_index: Arc<InMemoryVectorIndex>,
        chunk_store: Arc<ChunkStore>,
        registry: Arc<ProjectRegistry>,
        queue: Arc<IndexingQueue>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            vector_index,
            chunk_store,
            registry,
            queue,
            provider,
        }
    }

    /// Embed `query` and return the top `limit` chunks by cosine
    /// similarity, optionally restricted to one project.
    ///
    /// Results are deduplicated by `(file_path, start_line)` before the
    /// final truncation: the same source location can otherwise appear
    /// twice if it was re-chunked into overlapping windows, and a caller
    /// asking for 10 distinct results should not see the same location
    /// twice at the expense of a tenth, different one.
    pub async fn semantic_search(
        &self,
        project: Option<&str>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredResult>> {
        if limit == 0 {
            return Err(Error::invalid_arguments("limit must be greater than zero"));
        }
        if query.trim().is_empty() {
            return Err(Error::invalid_arguments("query must not be empty"));
        }

        let embedding = self.provider.embed(query).await?;
        let raw = self
            .vector_index
            .search(project, &embedding, expanded_limit(limit));

        let mut deduped = dedupe_by_file_and_line(raw);
        deduped.truncate(limit);
        Ok(deduped)
    }

    /// Read `file_path` and return the requested line range (or the whole
    /// file when `start_line`/`end_line` are omitted) expanded by
    /// `context_lines` (default [`DEFAULT_CONTEXT_LINES`]) on each side,
    /// for a caller building up surrounding context around a search hit.
    ///
    /// `file_path` may be absolute, or relative to a project root: when
    /// `project` is given it is resolved against that project only; when
    /// omitted, every registered project is searched and more than one
    /// match is reported as an error asking the caller to disambiguate.
    pub fn file_context(
        &self,
        file_path: &str,
        project: Option<&str>,
        start_line: Option<usize>,
        end_line: Option<usize>,
        context_lines: Option<usize>,
    ) -> Result<FileSnippet> {
        let resolved = self.resolve_file_path(file_path, project)?;
        let content = std::fs::read_to_string(&resolved).map_err(|source| Error::FileReadFailed {
            path: resolved.to_string_lossy().into_owned(),
            source,
        })?;

        let lines: Vec<&str> = content.lines().collect();
        if lines.is_empty() {
            return Ok(FileSnippet {
                file_path: file_path.to_string(),
                lines: Vec::new(),
            });
        }

        let total_lines = lines.len();
        let start_line = start_line.unwrap_or(1).clamp(1, total_lines);
        let end_line = end_line.unwrap_or(total_lines).clamp(start_line, total_lines);
        let context = context_lines.unwrap_or(DEFAULT_CONTEXT_LINES);
        let window_start = start_line.saturating_sub(context).max(1);
        let window_end = (end_line + context).min(total_lines);

        let snippet_lines = lines[window_start - 1..window_end]
            .iter()
            .enumerate()
            .map(|(offset, text)| {
                let line_number = window_start + offset;
                SnippetLine {
                    line_number,
                    text: (*text).to_string(),
                    is_requested: line_number >= start_line && line_number <= end_line,
                }
            })
            .collect();

        Ok(FileSnippet {
            file_path: file_path.to_string(),
            lines: snippet_lines,
        })
    }

    /// Resolve `file_path` to an absolute path on disk, scoped to
    /// `project` when given. An absolute `file_path` is returned as-is.
    fn resolve_file_path(&self, file_path: &str, project: Option<&str>) -> Result<PathBuf> {
        let candidate = Path::new(file_path);
        if candidate.is_absolute() {
            return Ok(candidate.to_path_buf());
        }

        if let Some(project) = project {
            let metadata = self
                .registry
                .get(project)
                .ok_or_else(|| Error::project_not_found(project))?;
            return Ok(Path::new(&metadata.root_path).join(file_path));
        }

        let matches: Vec<PathBuf> = self
            .registry
            .list()
            .into_iter()
            .map(|metadata| Path::new(&metadata.root_path).join(file_path))
            .filter(|path| path.is_file())
            .collect();

        match matches.len() {
            0 => Err(Error::invalid_arguments(format!(
                "no registered project contains file {file_path}"
            ))),
            1 => Ok(matches.into_iter().next().expect("checked len == 1")),
            _ => Err(Error::invalid_arguments(format!(
                "{file_path} matches more than one registered project; specify a project"
            ))),
        }
    }

    /// Enqueue a (re-)indexing job for `project` and return its job id.
    pub fn reload_index(&self, project: &str, root_path: &Path, priority: JobPriority) -> String {
        self.queue.enqueue(project, root_path, priority)
    }

    /// Current state of a previously submitted indexing job.
    pub fn indexing_progress(&self, job_id: &str) -> Option<IndexingJob> {
        self.queue.status(job_id)
    }

    /// Every project currently known to the registry.
    pub fn list_projects(&self) -> Vec<ProjectMetadata> {
        self.registry.list()
    }

    /// Registry metadata for one project.
    pub fn index_status(&self, project: &str) -> Result<ProjectMetadata> {
        self.registry
            .get(project)
            .ok_or_else(|| Error::project_not_found(project))
    }

    /// Remove a project's chunks and embeddings from both the persisted
    /// store and the in-memory index, and drop it from the registry.
    /// A no-op unless `confirm` is `true`, so a caller cannot clear a
    /// project by a stray or malformed request.
    pub fn clear_index(&self, project: &str, confirm: bool) -> Result<()> {
        if !confirm {
            return Ok(());
        }
        self.chunk_store.clear_project(project)?;
        self.vector_index.remove_project(project);
        self.registry.remove(project)
    }
}

/// Keep only the highest-scoring result for each `(file_path, start_line)`
/// pair, preserving the input's descending-score order.
fn dedupe_by_file_and_line(results: Vec<ScoredResult>) -> Vec<ScoredResult> {
    let mut best: HashMap<(String, usize), usize> = HashMap::new();
    let mut kept: Vec<ScoredResult> = Vec::with_capacity(results.len());

    for result in results {
        let key = (result.file_path.clone(), result.start_line);
        match best.get(&key) {
            Some(&index) if kept[index].score >= result.score => {}
            Some(&index) => kept[index] = result,
            None => {
                best.insert(key, kept.len());
                kept.push(result);
            }
        }
    }

    kept.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chunking::subproject::SubprojectDetector;
    use crate::domain::chunking::windows::{Chunker, ChunkerConfig};
    use crate::domain::types::IndexStatus;
    use crate::indexing::indexer::Indexer;
    use crate::infrastructure::embedding_cache::EmbeddingCache;
    use crate::infrastructure::providers::deterministic::DeterministicHashProvider;
    use tempfile::tempdir;

    fn dedupe_fixture() -> Vec<ScoredResult> {
        vec![
            ScoredResult {
                chunk_id: "a".into(),
                project: "demo".into(),
                file_path: "lib.rs".into(),
                start_line: 1,
                end_line: 10,
                content: "first".into(),
                score: 0.5,
            },
            ScoredResult {
                chunk_id: "b".into(),
                project: "demo".into(),
                file_path: "lib.rs".into(),
                start_line: 1,
                end_line: 12,
                content: "second, overlapping window".into(),
                score: 0.9,
            },
            ScoredResult {
                chunk_id: "c".into(),
                project: "demo".into(),
                file_path: "main.rs".into(),
                start_line: 1,
                end_line: 10,
                content: "distinct file".into(),
                score: 0.3,
            },
        ]
    }

    #[test]
    fn dedupe_keeps_the_highest_scoring_duplicate() {
        let deduped = dedupe_by_file_and_line(dedupe_fixture());
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].chunk_id, "b");
        assert_eq!(deduped[1].chunk_id, "c");
    }

    fn build_dispatcher(cache_root: &Path) -> RequestDispatcher {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(DeterministicHashProvider::new(8));
        let cache = Arc::new(EmbeddingCache::new(cache_root).expect("cache"));
        let chunk_store = Arc::new(ChunkStore::new(cache_root).expect("chunk store"));
        let registry = Arc::new(ProjectRegistry::open(cache_root).expect("registry"));
        let vector_index = Arc::new(InMemoryVectorIndex::new(u64::MAX));

        let indexer = Arc::new(Indexer::new(
            Chunker::new(ChunkerConfig::default()),
            SubprojectDetector::default(),
            provider.clone(),
            cache,
            chunk_store.clone(),
            registry.clone(),
            vector_index.clone(),
        ));
        let queue = Arc::new(IndexingQueue::new(indexer, 1));

        RequestDispatcher::new(vector_index, chunk_store, registry, queue, provider)
    }

    #[tokio::test]
    async fn semantic_search_rejects_zero_limit() {
        let cache_root = tempdir().expect("cache root");
        let dispatcher = build_dispatcher(cache_root.path());
        let err = dispatcher
            .semantic_search(None, "hello", 0)
            .await
            .expect_err("zero limit must be rejected");
        assert_eq!(err.kind(), crate::domain::error::ErrorKind::InvalidArguments);
    }

    #[tokio::test]
    async fn semantic_search_rejects_empty_query() {
        let cache_root = tempdir().expect("cache root");
        let dispatcher = build_dispatcher(cache_root.path());
        let err = dispatcher
            .semantic_search(None, "   ", 5)
            .await
            .expect_err("blank query must be rejected");
        assert_eq!(err.kind(), crate::domain::error::ErrorKind::InvalidArguments);
    }

    #[tokio::test]
    async fn end_to_end_index_then_search_then_clear() {
        let cache_root = tempdir().expect("cache root");
        let project_root = tempdir().expect("project root");
        std::fs::write(project_root.path().join("lib.rs"), "fn search() {}\n").expect("write");

        let dispatcher = build_dispatcher(cache_root.path());
        let job_id = dispatcher.reload_index("demo", project_root.path(), JobPriority::High);

        for _ in 0..200 {
            if let Some(job) = dispatcher.indexing_progress(&job_id) {
                if matches!(
                    job.status,
                    crate::domain::types::JobStatus::Completed { .. }
                        | crate::domain::types::JobStatus::Failed { .. }
                ) {
                    break;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let status = dispatcher.index_status("demo").expect("status");
        assert_eq!(status.status, IndexStatus::Ready);

        let results = dispatcher
            .semantic_search(Some("demo"), "fn search() {}", 5)
            .await
            .expect("search");
        assert_eq!(results.len(), 1);

        let snippet = dispatcher
            .file_context("lib.rs", Some("demo"), None, None, None)
            .expect("file context");
        assert_eq!(snippet.lines.len(), 1);
        assert!(snippet.lines[0].is_requested);

        // A clear request without confirmation must be a no-op.
        dispatcher.clear_index("demo", false).expect("unconfirmed clear is a no-op");
        assert!(dispatcher.index_status("demo").is_ok());

        dispatcher.clear_index("demo", true).expect("clear");
        assert!(dispatcher.index_status("demo").is_err());
    }

    #[tokio::test]
    async fn file_context_expands_a_requested_range_with_surrounding_context() {
        let cache_root = tempdir().expect("cache root");
        let project_root = tempdir().expect("project root");
        let content = (1..=20).map(|n| format!("line {n}")).collect::<Vec<_>>().join("\n");
        std::fs::write(project_root.path().join("lib.rs"), format!("{content}\n")).expect("write");

        let dispatcher = build_dispatcher(cache_root.path());
        let job_id = dispatcher.reload_index("demo", project_root.path(), JobPriority::High);
        for _ in 0..200 {
            if let Some(job) = dispatcher.indexing_progress(&job_id) {
                if matches!(
                    job.status,
                    crate::domain::types::JobStatus::Completed { .. }
                        | crate::domain::types::JobStatus::Failed { .. }
                ) {
                    break;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let snippet = dispatcher
            .file_context("lib.rs", Some("demo"), Some(10), Some(10), Some(2))
            .expect("file context");

        assert_eq!(snippet.lines.first().expect("first line").line_number, 8);
        assert_eq!(snippet.lines.last().expect("last line").line_number, 12);
        let requested: Vec<usize> = snippet
            .lines
            .iter()
            .filter(|l| l.is_requested)
            .map(|l| l.line_number)
            .collect();
        assert_eq!(requested, vec![10]);
    }

    #[tokio::test]
    async fn file_context_rejects_an_ambiguous_relative_path_with_no_project_given() {
        let cache_root = tempdir().expect("cache root");
        let project_a = tempdir().expect("project a");
        let project_b = tempdir().expect("project b");
        std::fs::write(project_a.path().join("lib.rs"), "fn a() {}\n").expect("write a");
        std::fs::write(project_b.path().join("lib.rs"), "fn b() {}\n").expect("write b");

        let dispatcher = build_dispatcher(cache_root.path());
        dispatcher.reload_index("a", project_a.path(), JobPriority::High);
        dispatcher.reload_index("b", project_b.path(), JobPriority::High);

        for _ in 0..200 {
            if dispatcher.index_status("a").is_ok_and(|m| m.status == IndexStatus::Ready)
                && dispatcher.index_status("b").is_ok_and(|m| m.status == IndexStatus::Ready)
            {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let err = dispatcher
            .file_context("lib.rs", None, None, None, None)
            .expect_err("ambiguous path across projects must be rejected");
        assert_eq!(err.kind(), crate::domain::error::ErrorKind::InvalidArguments);
    }
}
