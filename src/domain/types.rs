//! # Core Domain Types
//!
//! Value types shared by every layer of the code search core: the vector
//! representation produced by an embedding provider, the persisted chunk
//! record, project bookkeeping, background indexing jobs, and the scored
//! results returned from search.
//!
//! ```rust
//! use code_search_core::domain::types::{Embedding, Language};
//!
//! let embedding = Embedding::new(vec![0.6, 0.8]);
//! assert_eq!(embedding.dimensions(), 2);
//! assert_eq!(Language::from_extension("rs"), Language::Rust);
//! ```

use std::collections::HashMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// A dense embedding vector produced by an [`EmbeddingProvider`](crate::domain::ports::embedding::EmbeddingProvider).
///
/// Providers are contractually required to return L2-normalized vectors;
/// this type does not normalize on construction because doing so silently
/// would hide a non-conforming provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// The raw vector components.
    pub vector: Vec<f32>,
}

impl Embedding {
    /// Wrap a raw vector.
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }

    /// Number of components in the vector.
    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }

    /// Euclidean norm of the vector. Should be `1.0` (within float
    /// tolerance) for any embedding a provider returns; `0.0` is the
    /// defined representation of an empty-input embedding.
    pub fn norm(&self) -> f32 {
        self.vector.iter().map(|x| x * x).sum::<f32>().sqrt()
    }
}

/// Source languages recognized by the chunker and sub-project detector.
///
/// `Other` covers any extension the table below does not name; it is not
/// an error case, since unrecognized languages are still chunked with the
/// generic line-window strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// `.rs`
    Rust,
    /// `.py`
    Python,
    /// `.js`, `.jsx`, `.mjs`
    JavaScript,
    /// `.ts`, `.tsx`
    TypeScript,
    /// `.go`
    Go,
    /// `.swift`
    Swift,
    /// `.java`
    Java,
    /// `.c`, `.h`
    C,
    /// `.cpp`, `.cc`, `.hpp`, `.hh`
    Cpp,
    /// Anything without a recognized extension.
    Other,
}

impl Language {
    /// Map a file extension (without the leading dot) to a [`Language`].
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "rs" => Language::Rust,
            "py" => Language::Python,
            "js" | "jsx" | "mjs" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            "go" => Language::Go,
            "swift" => Language::Swift,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "hpp" | "hh" | "cxx" => Language::Cpp,
            _ => Language::Other,
        }
    }
}

/// The structural role a chunk plays within its source file, inferred by
/// the chunker from the first matching substring on each line of the
/// language-specific pattern table. Ordering within the table matters:
/// the first pattern to match wins. Languages with no pattern table
/// (most of them — the table only covers Swift, Python, JS/TS, and
/// Java) always infer `Block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    /// A function or free-standing procedure definition.
    Function,
    /// A class definition.
    Class,
    /// A struct definition.
    Struct,
    /// An enum definition.
    Enum,
    /// A protocol (or interface-like) definition.
    Protocol,
    /// A method defined inside a class body.
    Method,
    /// A variable or constant declaration.
    Declaration,
    /// Anything that does not match a more specific pattern.
    Block,
}

/// A windowed slice of source text, the unit persisted by the chunk store
/// and indexed for search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Stable identifier, derived from project, file path, and start line
    /// so re-indexing an unchanged file reproduces the same id.
    pub id: String,
    /// Identifier of the project this chunk belongs to.
    pub project: String,
    /// Path of the source file, relative to the project root.
    pub file_path: String,
    /// First line of the chunk, 1-indexed and inclusive.
    pub start_line: usize,
    /// Last line of the chunk, 1-indexed and inclusive.
    pub end_line: usize,
    /// The chunk's source text.
    pub content: String,
    /// Detected source language.
    pub language: Language,
    /// Structural role inferred for this chunk.
    pub chunk_type: ChunkType,
    /// Embedding vector for this chunk's content, once computed. `None`
    /// until the indexer's embed-and-persist stage fills it in; chunks
    /// without an embedding are skipped during vector index preload.
    pub embedding: Option<Embedding>,
}

/// A single line returned from [`file_context`](crate::application::dispatcher::RequestDispatcher::file_context),
/// marked as either part of the requested range or surrounding context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnippetLine {
    /// 1-indexed line number within the file.
    pub line_number: usize,
    /// The line's text, without a trailing newline.
    pub text: String,
    /// `true` if this line falls inside the caller's requested range,
    /// `false` if it was pulled in as surrounding context.
    pub is_requested: bool,
}

/// A contiguous slice of a source file, expanded from a requested line
/// range by the configured amount of surrounding context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSnippet {
    /// Path of the file the snippet was read from, relative to its
    /// project root when the project could be resolved.
    pub file_path: String,
    /// The lines making up the snippet, in file order.
    pub lines: Vec<SnippetLine>,
}

/// Lifecycle state of a project's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    /// Registered but never indexed.
    NotIndexed,
    /// An indexing job is queued or running for this project.
    Indexing,
    /// At least one successful indexing pass has completed.
    Ready,
    /// The most recent indexing attempt failed.
    Failed,
}

/// Registry entry describing a single project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Stable project identifier (not necessarily the directory name).
    pub project: String,
    /// Absolute path to the project root at the time it was registered.
    pub root_path: String,
    /// Number of chunks currently stored for this project.
    pub chunk_count: usize,
    /// Number of distinct source files last observed during indexing.
    pub file_count: usize,
    /// Current index lifecycle state.
    pub status: IndexStatus,
    /// Wall-clock time of the most recent successful index, if any.
    #[serde(with = "system_time_opt")]
    pub last_indexed_at: Option<SystemTime>,
}

/// The persisted document backing the project registry: every known
/// project keyed by its project id, written atomically as a single file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectRegistry {
    /// All registered projects, keyed by project id.
    pub projects: HashMap<String, ProjectMetadata>,
}

/// Relative priority of a queued indexing job. Jobs of equal priority run
/// in FIFO order; `High` jobs always run before any queued `Normal` or
/// `Low` job regardless of arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    /// Runs after every `High` and `Normal` job ahead of it.
    Low,
    /// The default priority for ordinary re-index requests.
    Normal,
    /// Runs ahead of any queued `Normal` or `Low` job.
    High,
}

/// Lifecycle state of a single indexing job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum JobStatus {
    /// Waiting for a free worker slot.
    Queued,
    /// Currently being processed.
    Running,
    /// Finished successfully.
    Completed {
        /// Number of chunks written during this job.
        chunks_indexed: usize,
    },
    /// Finished with an error.
    Failed {
        /// Human-readable failure description.
        message: String,
    },
}

/// A unit of work submitted to the indexing queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingJob {
    /// Unique job identifier, assigned at submission time.
    pub id: String,
    /// Project this job indexes.
    pub project: String,
    /// Absolute path to the project root to walk.
    pub root_path: String,
    /// Scheduling priority.
    pub priority: JobPriority,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Time the job was submitted to the queue.
    #[serde(with = "system_time")]
    pub submitted_at: SystemTime,
}

/// A scored match returned from vector index search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    /// Identifier of the matched chunk.
    pub chunk_id: String,
    /// Project the chunk belongs to.
    pub project: String,
    /// Source file path, relative to the project root.
    pub file_path: String,
    /// First line of the matched chunk.
    pub start_line: usize,
    /// Last line of the matched chunk.
    pub end_line: usize,
    /// The chunk's source text.
    pub content: String,
    /// Cosine similarity between the query and this chunk, in `[-1.0, 1.0]`.
    pub score: f32,
}

mod system_time {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn serialize<S: Serializer>(t: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
        let secs = t
            .duration_since(UNIX_EPOCH)
            .map_err(serde::ser::Error::custom)?
            .as_secs_f64();
        secs.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SystemTime, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(UNIX_EPOCH + std::time::Duration::from_secs_f64(secs))
    }
}

mod system_time_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::SystemTime;

    pub fn serialize<S: Serializer>(t: &Option<SystemTime>, s: S) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => super::system_time::serialize(t, s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<SystemTime>, D::Error> {
        let opt = Option::<f64>::deserialize(d)?;
        Ok(opt.map(|secs| std::time::UNIX_EPOCH + std::time::Duration::from_secs_f64(secs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_from_extension_covers_the_supported_table() {
        assert_eq!(Language::from_extension("rs"), Language::Rust);
        assert_eq!(Language::from_extension("TS"), Language::TypeScript);
        assert_eq!(Language::from_extension("jsx"), Language::JavaScript);
        assert_eq!(Language::from_extension("toml"), Language::Other);
    }

    #[test]
    fn embedding_norm_matches_manual_computation() {
        let e = Embedding::new(vec![3.0, 4.0]);
        assert!((e.norm() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn job_priority_orders_high_above_normal_above_low() {
        let mut priorities = vec![JobPriority::Low, JobPriority::High, JobPriority::Normal];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![JobPriority::Low, JobPriority::Normal, JobPriority::High]
        );
    }

    #[test]
    fn project_registry_round_trips_through_json() {
        let mut registry = ProjectRegistry::default();
        registry.projects.insert(
            "demo".to_string(),
            ProjectMetadata {
                project: "demo".to_string(),
                root_path: "/tmp/demo".to_string(),
                chunk_count: 3,
                file_count: 2,
                status: IndexStatus::Ready,
                last_indexed_at: Some(SystemTime::UNIX_EPOCH),
            },
        );
        let json = serde_json::to_string(&registry).expect("serialize");
        let parsed: ProjectRegistry = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.projects["demo"].chunk_count, 3);
    }
}
