//! Walks a project root, chunks and embeds its files, and persists the
//! result to the embedding cache, chunk store, project registry, and
//! in-memory vector index.

use std::path::Path;
use std::sync::Arc;

use crate::domain::chunking::subproject::{SubprojectDetector, DEFAULT_EXCLUSIONS};
use crate::domain::chunking::windows::{content_hash, Chunker};
use crate::domain::error::{Error, Result};
use crate::domain::ports::embedding::EmbeddingProvider;
use crate::domain::types::{IndexStatus, Language, ProjectMetadata};
use crate::infrastructure::chunk_store::ChunkStore;
use crate::infrastructure::embedding_cache::EmbeddingCache;
use crate::infrastructure::project_registry::ProjectRegistry;
use crate::vector_index::index::InMemoryVectorIndex;

/// Extensions the chunker recognizes; anything else is skipped entirely
/// during a walk rather than chunked as [`Language::Other`], since
/// indexing binary or data files would only add noise to search results.
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "jsx", "mjs", "ts", "tsx", "go", "swift", "java", "c", "h", "cpp", "cc",
    "hpp", "hh", "cxx",
];

/// A registered project whose file count exceeds this at startup is
/// flagged for legacy auto-migration: it was indexed before sub-project
/// detection existed, as a single undifferentiated blob, and is
/// re-scheduled at high priority so it gets re-split on its next run.
const LEGACY_FILE_COUNT_THRESHOLD: usize = 5000;

/// Batch size for embedding calls within a single file. Bounds memory
/// and gives the provider a meaningful batch without holding an entire
/// large file's chunks in flight at once.
const EMBED_BATCH_SIZE: usize = 32;

/// Outcome of a single indexing pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexingOutcome {
    /// Files successfully walked and chunked.
    pub files_indexed: usize,
    /// Files skipped because they could not be read.
    pub files_skipped: usize,
    /// Total chunks written.
    pub chunks_indexed: usize,
}

/// Orchestrates the walk → chunk → embed → persist pipeline for one
/// project at a time.
pub struct Indexer {
    chunker: Chunker,
    detector: SubprojectDetector,
    provider: Arc<dyn EmbeddingProvider>,
    cache: Arc<EmbeddingCache>,
    chunk_store: Arc<ChunkStore>,
    registry: Arc<ProjectRegistry>,
    vector_index: Arc<InMemoryVectorIndex>,
}

impl Indexer {
    /// Wire an indexer from its collaborators.
    pub fn new(
        chunker: Chunker,
        detector: SubprojectDetector,
        provider: Arc<dyn EmbeddingProvider>,
        cache: Arc<EmbeddingCache>,
        chunk_store: Arc<ChunkStore>,
        registry: Arc<ProjectRegistry>,
        vector_index: Arc<InMemoryVectorIndex>,
    ) -> Self {
        Self {
            chunker,
            detector,
            provider,
            cache,
            chunk_store,
            registry,
            vector_index,
        }
    }

    /// Index `root_path` under `project`, first checking whether it is
    /// itself a container for multiple sub-projects.
    ///
    /// `root_path` must be an existing directory; anything else is an
    /// [`Error::InvalidProjectPath`] rather than a silent no-op pass that
    /// completes having indexed zero chunks. When the detector finds one
    /// or more sub-projects beneath `root_path`, each is indexed as its
    /// own project via [`Self::index_single`] and the original `project`
    /// entry (now superseded by its sub-projects) is removed from the
    /// registry. A failure indexing one sub-project is logged and does
    /// not stop the others. When no sub-projects are found, `root_path`
    /// is indexed directly as a single project.
    #[tracing::instrument(skip(self), fields(project = %project))]
    pub async fn index(&self, project: &str, root_path: &Path) -> Result<IndexingOutcome> {
        if !root_path.is_dir() {
            return Err(Error::invalid_project_path(root_path.to_string_lossy()));
        }

        let subprojects = self.detector.detect(root_path)?;
        if subprojects.is_empty() {
            return self.index_single(project, root_path).await;
        }

        let mut outcome = IndexingOutcome::default();
        for subproject in &subprojects {
            match self.index_single(&subproject.name, &subproject.path).await {
                Ok(sub_outcome) => {
                    outcome.files_indexed += sub_outcome.files_indexed;
                    outcome.files_skipped += sub_outcome.files_skipped;
                    outcome.chunks_indexed += sub_outcome.chunks_indexed;
                }
                Err(err) => {
                    tracing::warn!(
                        project = %project,
                        subproject = %subproject.name,
                        error = %err,
                        "failed to index sub-project, continuing with the others"
                    );
                }
            }
        }

        if let Err(err) = self.registry.remove(project) {
            tracing::warn!(project, error = %err, "failed to remove superseded parent project entry");
        }

        Ok(outcome)
    }

    /// Index (or re-index) a single project rooted at `root_path`, with
    /// no sub-project detection.
    #[tracing::instrument(skip(self), fields(project = %project))]
    pub async fn index_single(&self, project: &str, root_path: &Path) -> Result<IndexingOutcome> {
        self.registry.upsert(ProjectMetadata {
            project: project.to_string(),
            root_path: root_path.to_string_lossy().into_owned(),
            chunk_count: 0,
            file_count: 0,
            status: IndexStatus::Indexing,
            last_indexed_at: None,
        })?;

        let outcome = match self.walk_and_index(project, root_path).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.registry
                    .mark_status(project, IndexStatus::Failed, None, None)?;
                return Err(err);
            }
        };

        self.registry.mark_status(
            project,
            IndexStatus::Ready,
            Some(outcome.chunks_indexed),
            Some(outcome.files_indexed),
        )?;

        Ok(outcome)
    }

    /// Scan the registry for projects indexed before sub-project
    /// detection existed: anything with more than
    /// [`LEGACY_FILE_COUNT_THRESHOLD`] files and a root path that still
    /// exists on disk is a candidate for a high-priority re-index that
    /// re-splits it into sub-projects. A project whose `root_path` no
    /// longer exists is logged and skipped rather than scheduled.
    pub fn legacy_migration_candidates(&self) -> Vec<ProjectMetadata> {
        self.registry
            .list()
            .into_iter()
            .filter(|metadata| {
                if metadata.file_count <= LEGACY_FILE_COUNT_THRESHOLD {
                    return false;
                }
                let exists = Path::new(&metadata.root_path).is_dir();
                if !exists {
                    tracing::warn!(
                        project = %metadata.project,
                        root_path = %metadata.root_path,
                        "legacy migration candidate has no existing root path, skipping"
                    );
                }
                exists
            })
            .collect()
    }

    async fn walk_and_index(&self, project: &str, root_path: &Path) -> Result<IndexingOutcome> {
        let mut outcome = IndexingOutcome::default();

        for entry in walkdir::WalkDir::new(root_path)
            .into_iter()
            .filter_entry(|e| !is_excluded_dir(e))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(_) => {
                    outcome.files_skipped += 1;
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(extension) = entry.path().extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !SUPPORTED_EXTENSIONS.contains(&extension) {
                continue;
            }

            let relative_path = entry
                .path()
                .strip_prefix(root_path)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .into_owned();

            let content = match std::fs::read_to_string(entry.path()) {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!(path = %entry.path().display(), error = %err, "skipping unreadable file");
                    outcome.files_skipped += 1;
                    continue;
                }
            };

            let language = Language::from_extension(extension);
            let chunks = self.chunker.chunk(project, &relative_path, &content, language);
            if chunks.is_empty() {
                continue;
            }

            for batch in chunks.chunks(EMBED_BATCH_SIZE) {
                self.embed_and_persist_batch(batch).await?;
                outcome.chunks_indexed += batch.len();
            }
            outcome.files_indexed += 1;
        }

        Ok(outcome)
    }

    async fn embed_and_persist_batch(
        &self,
        batch: &[crate::domain::types::ChunkRecord],
    ) -> Result<()> {
        let hashes: Vec<String> = batch.iter().map(|chunk| content_hash(&chunk.content)).collect();

        let mut misses = Vec::new();
        let mut miss_indices = Vec::new();
        let mut embeddings: Vec<Option<crate::domain::types::Embedding>> =
            Vec::with_capacity(batch.len());

        for hash in &hashes {
            match self.cache.get(hash)? {
                Some(embedding) => embeddings.push(Some(embedding)),
                None => {
                    miss_indices.push(embeddings.len());
                    misses.push(batch[embeddings.len()].content.clone());
                    embeddings.push(None);
                }
            }
        }

        if !misses.is_empty() {
            let fresh = self.provider.embed_batch(&misses).await?;
            for (slot, embedding) in miss_indices.into_iter().zip(fresh.into_iter()) {
                self.cache.put(&hashes[slot], &embedding)?;
                embeddings[slot] = Some(embedding);
            }
        }

        for (chunk, embedding) in batch.iter().zip(embeddings.into_iter()) {
            let embedding = embedding.expect("every slot is filled by cache hit or fresh embed");
            let mut chunk = chunk.clone();
            chunk.embedding = Some(embedding.clone());
            self.chunk_store.put(&chunk)?;
            self.vector_index.insert(chunk, embedding);
        }

        Ok(())
    }
}

fn is_excluded_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| DEFAULT_EXCLUSIONS.contains(&name))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chunking::windows::ChunkerConfig;
    use crate::infrastructure::providers::deterministic::DeterministicHashProvider;
    use tempfile::tempdir;

    fn build_indexer(cache_root: &Path) -> Indexer {
        Indexer::new(
            Chunker::new(ChunkerConfig::default()),
            SubprojectDetector::default(),
            Arc::new(DeterministicHashProvider::new(16)),
            Arc::new(EmbeddingCache::new(cache_root).expect("cache")),
            Arc::new(ChunkStore::new(cache_root).expect("chunk store")),
            Arc::new(ProjectRegistry::open(cache_root).expect("registry")),
            Arc::new(InMemoryVectorIndex::new(u64::MAX)),
        )
    }

    #[tokio::test]
    async fn indexes_supported_files_and_skips_unsupported_ones() {
        let cache_root = tempdir().expect("cache root");
        let project_root = tempdir().expect("project root");
        std::fs::write(project_root.path().join("lib.rs"), "fn main() {}\n").expect("write rs");
        std::fs::write(project_root.path().join("notes.txt"), "hello\n").expect("write txt");

        let indexer = build_indexer(cache_root.path());
        let outcome = indexer
            .index_single("demo", project_root.path())
            .await
            .expect("index");

        assert_eq!(outcome.files_indexed, 1);
        assert_eq!(outcome.chunks_indexed, 1);
    }

    #[tokio::test]
    async fn excluded_directories_are_never_walked() {
        let cache_root = tempdir().expect("cache root");
        let project_root = tempdir().expect("project root");
        let nested = project_root.path().join("node_modules");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(nested.join("vendored.js"), "function f() {}\n").expect("write");

        let indexer = build_indexer(cache_root.path());
        let outcome = indexer
            .index_single("demo", project_root.path())
            .await
            .expect("index");

        assert_eq!(outcome.files_indexed, 0);
    }

    #[tokio::test]
    async fn registry_reflects_ready_status_after_a_successful_run() {
        let cache_root = tempdir().expect("cache root");
        let project_root = tempdir().expect("project root");
        std::fs::write(project_root.path().join("a.py"), "def f():\n    pass\n").expect("write");

        let indexer = build_indexer(cache_root.path());
        indexer
            .index_single("demo", project_root.path())
            .await
            .expect("index");

        let metadata = indexer.registry.get("demo").expect("registered");
        assert_eq!(metadata.status, IndexStatus::Ready);
        assert_eq!(metadata.file_count, 1);
    }

    #[tokio::test]
    async fn reindexing_reuses_cached_embeddings() {
        let cache_root = tempdir().expect("cache root");
        let project_root = tempdir().expect("project root");
        std::fs::write(project_root.path().join("a.rs"), "fn a() {}\n").expect("write");

        let indexer = build_indexer(cache_root.path());
        indexer.index_single("demo", project_root.path()).await.expect("first index");
        // Second pass must not error even though every chunk is now a
        // cache hit, exercising the hit path of embed_and_persist_batch.
        let outcome = indexer
            .index_single("demo", project_root.path())
            .await
            .expect("second index");
        assert_eq!(outcome.chunks_indexed, 1);
    }

    #[tokio::test]
    async fn index_rejects_a_path_that_is_not_a_directory() {
        let cache_root = tempdir().expect("cache root");
        let project_root = tempdir().expect("project root");
        let file = project_root.path().join("not_a_dir.rs");
        std::fs::write(&file, "fn a() {}\n").expect("write");

        let indexer = build_indexer(cache_root.path());
        let err = indexer.index("demo", &file).await.expect_err("must reject");
        assert_eq!(err.kind(), crate::domain::error::ErrorKind::InvalidProjectPath);
    }

    #[tokio::test]
    async fn index_fans_out_across_detected_subprojects_and_drops_the_parent_entry() {
        let cache_root = tempdir().expect("cache root");
        let workspace = tempdir().expect("workspace root");
        for name in ["a", "b", "c"] {
            let dir = workspace.path().join(name);
            std::fs::create_dir_all(&dir).expect("mkdir");
            std::fs::write(dir.join("Cargo.toml"), "[package]").expect("write marker");
            std::fs::write(dir.join("lib.rs"), "fn f() {}\n").expect("write source");
        }

        let indexer = build_indexer(cache_root.path());
        let outcome = indexer
            .index("workspace", workspace.path())
            .await
            .expect("index");

        assert_eq!(outcome.files_indexed, 3);
        assert!(indexer.registry.get("workspace").is_none());
        assert!(indexer.registry.get("a").is_some());
        assert!(indexer.registry.get("b").is_some());
        assert!(indexer.registry.get("c").is_some());
    }

    #[tokio::test]
    async fn index_with_no_detected_subprojects_indexes_the_root_directly() {
        let cache_root = tempdir().expect("cache root");
        let project_root = tempdir().expect("project root");
        std::fs::write(project_root.path().join("lib.rs"), "fn a() {}\n").expect("write");

        let indexer = build_indexer(cache_root.path());
        indexer.index("demo", project_root.path()).await.expect("index");

        assert!(indexer.registry.get("demo").is_some());
    }

    #[tokio::test]
    async fn legacy_migration_candidates_requires_both_file_count_and_an_existing_root() {
        let cache_root = tempdir().expect("cache root");
        let existing_root = tempdir().expect("existing root");

        let indexer = build_indexer(cache_root.path());
        indexer
            .registry
            .upsert(ProjectMetadata {
                project: "legacy-present".to_string(),
                root_path: existing_root.path().to_string_lossy().into_owned(),
                chunk_count: 0,
                file_count: LEGACY_FILE_COUNT_THRESHOLD + 1,
                status: IndexStatus::Ready,
                last_indexed_at: None,
            })
            .expect("upsert");
        indexer
            .registry
            .upsert(ProjectMetadata {
                project: "legacy-missing-root".to_string(),
                root_path: "/nonexistent/path/does/not/exist".to_string(),
                chunk_count: 0,
                file_count: LEGACY_FILE_COUNT_THRESHOLD + 1,
                status: IndexStatus::Ready,
                last_indexed_at: None,
            })
            .expect("upsert");
        indexer
            .registry
            .upsert(ProjectMetadata {
                project: "small-project".to_string(),
                root_path: existing_root.path().to_string_lossy().into_owned(),
                chunk_count: 0,
                file_count: 10,
                status: IndexStatus::Ready,
                last_indexed_at: None,
            })
            .expect("upsert");

        let candidates = indexer.legacy_migration_candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].project, "legacy-present");
    }
}
