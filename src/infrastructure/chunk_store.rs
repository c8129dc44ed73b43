//! Per-project chunk persistence.
//!
//! Each project gets its own subdirectory under `<cache_root>/chunks/`;
//! each chunk is one JSON file named after its stable id. This keeps
//! clearing a project's index a matter of removing one directory, and
//! keeps concurrent writers from different projects from contending on
//! the same files.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::error::Result;
use crate::domain::types::ChunkRecord;

/// A disk-backed, per-project store of [`ChunkRecord`]s.
pub struct ChunkStore {
    root: PathBuf,
}

impl ChunkStore {
    /// Open (creating if necessary) a store rooted at `<cache_root>/chunks`.
    pub fn new(cache_root: impl AsRef<Path>) -> Result<Self> {
        let root = cache_root.as_ref().join("chunks");
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn project_dir(&self, project: &str) -> PathBuf {
        self.root.join(project)
    }

    fn chunk_path(&self, project: &str, chunk_id: &str) -> PathBuf {
        self.project_dir(project).join(format!("{chunk_id}.json"))
    }

    /// Persist a chunk, overwriting any existing record with the same id.
    pub fn put(&self, chunk: &ChunkRecord) -> Result<()> {
        let dir = self.project_dir(&chunk.project);
        fs::create_dir_all(&dir)?;

        let bytes = serde_json::to_vec(chunk)?;
        let final_path = self.chunk_path(&chunk.project, &chunk.id);
        let tmp_path = dir.join(format!("{}.json.tmp-{}", chunk.id, std::process::id()));

        let mut file = File::create(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    /// Load a single chunk by id.
    pub fn get(&self, project: &str, chunk_id: &str) -> Result<Option<ChunkRecord>> {
        let path = self.chunk_path(project, chunk_id);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List every chunk currently stored for `project`. Returns an empty
    /// `Vec` for a project with no chunks rather than an error.
    pub fn list(&self, project: &str) -> Result<Vec<ChunkRecord>> {
        let dir = self.project_dir(project);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut chunks = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path)?;
            chunks.push(serde_json::from_slice(&bytes)?);
        }
        Ok(chunks)
    }

    /// Number of chunks currently stored for `project`.
    pub fn count(&self, project: &str) -> Result<usize> {
        Ok(self.list(project)?.len())
    }

    /// Load every chunk for every project, the union of [`Self::list`]
    /// across every project subdirectory. Returns an empty `Vec` if the
    /// store root does not exist yet rather than an error.
    pub fn load_all(&self) -> Result<Vec<ChunkRecord>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut chunks = Vec::new();
        for entry in entries.flatten() {
            if !entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                continue;
            }
            let project = entry.file_name().to_string_lossy().into_owned();
            chunks.extend(self.list(&project)?);
        }
        Ok(chunks)
    }

    /// Remove every chunk stored for `project`.
    pub fn clear_project(&self, project: &str) -> Result<()> {
        let dir = self.project_dir(project);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ChunkType, Language};
    use tempfile::tempdir;

    fn sample_chunk(project: &str, id: &str) -> ChunkRecord {
        ChunkRecord {
            id: id.to_string(),
            project: project.to_string(),
            file_path: "src/lib.rs".to_string(),
            start_line: 1,
            end_line: 10,
            content: "fn main() {}".to_string(),
            language: Language::Rust,
            chunk_type: ChunkType::Function,
            embedding: None,
        }
    }

    #[test]
    fn put_then_get_round_trips_a_chunk() {
        let dir = tempdir().expect("tempdir");
        let store = ChunkStore::new(dir.path()).expect("open store");
        let chunk = sample_chunk("demo", "c1");

        store.put(&chunk).expect("put");
        let fetched = store.get("demo", "c1").expect("get").expect("present");
        assert_eq!(fetched.file_path, "src/lib.rs");
    }

    #[test]
    fn missing_project_lists_as_empty_not_an_error() {
        let dir = tempdir().expect("tempdir");
        let store = ChunkStore::new(dir.path()).expect("open store");
        assert!(store.list("nonexistent").expect("list").is_empty());
    }

    #[test]
    fn clear_project_removes_all_its_chunks() {
        let dir = tempdir().expect("tempdir");
        let store = ChunkStore::new(dir.path()).expect("open store");
        store.put(&sample_chunk("demo", "c1")).expect("put c1");
        store.put(&sample_chunk("demo", "c2")).expect("put c2");
        assert_eq!(store.count("demo").expect("count"), 2);

        store.clear_project("demo").expect("clear");
        assert_eq!(store.count("demo").expect("count"), 0);
    }

    #[test]
    fn projects_do_not_interfere_with_each_other() {
        let dir = tempdir().expect("tempdir");
        let store = ChunkStore::new(dir.path()).expect("open store");
        store.put(&sample_chunk("a", "c1")).expect("put a/c1");
        store.put(&sample_chunk("b", "c1")).expect("put b/c1");

        assert_eq!(store.count("a").expect("count a"), 1);
        assert_eq!(store.count("b").expect("count b"), 1);
        store.clear_project("a").expect("clear a");
        assert_eq!(store.count("b").expect("count b"), 1, "clearing a must not affect b");
    }

    #[test]
    fn load_all_unions_every_project() {
        let dir = tempdir().expect("tempdir");
        let store = ChunkStore::new(dir.path()).expect("open store");
        store.put(&sample_chunk("a", "c1")).expect("put a/c1");
        store.put(&sample_chunk("b", "c1")).expect("put b/c1");
        store.put(&sample_chunk("b", "c2")).expect("put b/c2");

        let all = store.load_all().expect("load all");
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn load_all_on_an_empty_store_is_not_an_error() {
        let dir = tempdir().expect("tempdir");
        let store = ChunkStore::new(dir.path()).expect("open store");
        assert!(store.load_all().expect("load all").is_empty());
    }
}
