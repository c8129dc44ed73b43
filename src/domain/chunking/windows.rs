//! Fixed-size overlapping line windows.

use sha2::{Digest, Sha256};

use crate::domain::types::{ChunkRecord, ChunkType, Language};

/// Parameters controlling how a file is split into windows.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Number of lines per chunk.
    pub chunk_size: usize,
    /// Number of lines shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            chunk_overlap: 10,
        }
    }
}

/// Splits source text into fixed-size, overlapping line windows.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Build a chunker from the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_overlap >= chunk_size`, which would never advance
    /// the window. Callers reach this constructor only after `Config`
    /// validation has already rejected that combination.
    pub fn new(config: ChunkerConfig) -> Self {
        assert!(
            config.chunk_overlap < config.chunk_size,
            "chunk_overlap ({}) must be less than chunk_size ({})",
            config.chunk_overlap,
            config.chunk_size
        );
        Self { config }
    }

    /// Split `content` into overlapping line windows, tagging each with a
    /// stable id and its detected [`ChunkType`].
    ///
    /// Returns an empty `Vec` for an empty file. The final window ends
    /// exactly at the last line rather than past it, so a file shorter
    /// than `chunk_size` produces exactly one chunk. A window whose text
    /// is empty after trimming whitespace is skipped entirely rather than
    /// persisted as a blank chunk.
    pub fn chunk(
        &self,
        project: &str,
        file_path: &str,
        content: &str,
        language: Language,
    ) -> Vec<ChunkRecord> {
        let lines: Vec<&str> = content.lines().collect();
        if lines.is_empty() {
            return Vec::new();
        }

        let stride = self.config.chunk_size - self.config.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0usize;

        loop {
            let end = (start + self.config.chunk_size).min(lines.len());
            let window = &lines[start..end];
            let text = window.join("\n");

            if text.trim().is_empty() {
                if end == lines.len() {
                    break;
                }
                start += stride;
                continue;
            }

            chunks.push(ChunkRecord {
                id: chunk_id(project, file_path, start + 1),
                project: project.to_string(),
                file_path: file_path.to_string(),
                start_line: start + 1,
                end_line: end,
                chunk_type: infer_chunk_type(window, language),
                language,
                embedding: None,
                content: text,
            });

            if end == lines.len() {
                break;
            }
            start += stride;
        }

        chunks
    }
}

fn chunk_id(project: &str, file_path: &str, start_line: usize) -> String {
    content_hash(&format!("{project}:{file_path}:{start_line}"))
}

/// SHA-256 hex digest of `text`, used both for chunk ids and as the
/// embedding cache key so re-indexing unchanged content reuses the cache.
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(digest)
}

/// Pattern table entry: a substring and the chunk type it implies. Tables
/// are ordered most-specific first since [`infer_chunk_type`] returns on
/// the first match.
type Pattern = (&'static str, ChunkType);

fn patterns_for(language: Language) -> &'static [Pattern] {
    match language {
        Language::Swift => &[
            ("func ", ChunkType::Function),
            ("class ", ChunkType::Class),
            ("struct ", ChunkType::Struct),
            ("enum ", ChunkType::Enum),
            ("protocol ", ChunkType::Protocol),
        ],
        Language::Python => &[("def ", ChunkType::Function), ("class ", ChunkType::Class)],
        Language::JavaScript | Language::TypeScript => &[
            ("function ", ChunkType::Function),
            ("class ", ChunkType::Class),
            ("const ", ChunkType::Declaration),
            ("let ", ChunkType::Declaration),
        ],
        Language::Java => &[
            ("public class ", ChunkType::Class),
            ("class ", ChunkType::Class),
            ("public void ", ChunkType::Method),
            ("private void ", ChunkType::Method),
        ],
        Language::Rust | Language::Go | Language::C | Language::Cpp | Language::Other => &[],
    }
}

/// Scan `window` top to bottom and return the [`ChunkType`] implied by the
/// first line that matches a pattern for `language`. Falls back to
/// [`ChunkType::Block`] when nothing matches, which is always the case for
/// languages with no pattern table.
pub fn infer_chunk_type(window: &[&str], language: Language) -> ChunkType {
    let patterns = patterns_for(language);
    for line in window {
        let trimmed = line.trim_start();
        for (pattern, chunk_type) in patterns {
            if trimmed.contains(pattern) {
                return *chunk_type;
            }
        }
    }
    ChunkType::Block
}
