//! The project registry: a single atomic JSON document tracking every
//! known project's root path, chunk/file counts, and index status.
//!
//! Unlike the chunk store and embedding cache, the registry is one file
//! rather than one-file-per-entry, since callers routinely need the full
//! project list (`list_projects`) and keeping it in one document avoids a
//! directory scan on every such call. In-process writers serialize
//! through a `Mutex`; the on-disk write still goes through a temp file
//! and rename so an external reader never observes a half-written file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use crate::domain::error::Result;
use crate::domain::types::{IndexStatus, ProjectMetadata, ProjectRegistry as RegistryDoc};

/// Disk-backed, atomically-updated registry of project metadata.
pub struct ProjectRegistry {
    path: PathBuf,
    state: Mutex<RegistryDoc>,
}

impl ProjectRegistry {
    /// Open the registry at `<cache_root>/registry.json`, creating an
    /// empty one if it does not yet exist.
    pub fn open(cache_root: impl AsRef<Path>) -> Result<Self> {
        let cache_root = cache_root.as_ref();
        fs::create_dir_all(cache_root)?;
        let path = cache_root.join("registry.json");

        let state = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RegistryDoc::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    fn persist(&self, doc: &RegistryDoc) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(doc)?;
        let tmp_path = self
            .path
            .with_extension(format!("json.tmp-{}", std::process::id()));

        let mut file = File::create(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;
        if let Some(dir) = self.path.parent() {
            fsync_dir(dir)?;
        }
        Ok(())
    }

    /// Insert or replace a project's metadata and persist the change.
    pub fn upsert(&self, metadata: ProjectMetadata) -> Result<()> {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        state.projects.insert(metadata.project.clone(), metadata);
        self.persist(&state)
    }

    /// Update just the status (and, on success, the last-indexed
    /// timestamp and counts) of an already-registered project.
    pub fn mark_status(
        &self,
        project: &str,
        status: IndexStatus,
        chunk_count: Option<usize>,
        file_count: Option<usize>,
    ) -> Result<()> {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        if let Some(entry) = state.projects.get_mut(project) {
            entry.status = status;
            if let Some(chunk_count) = chunk_count {
                entry.chunk_count = chunk_count;
            }
            if let Some(file_count) = file_count {
                entry.file_count = file_count;
            }
            if matches!(status, IndexStatus::Ready) {
                entry.last_indexed_at = Some(SystemTime::now());
            }
        }
        self.persist(&state)
    }

    /// Fetch a single project's metadata.
    pub fn get(&self, project: &str) -> Option<ProjectMetadata> {
        let state = self.state.lock().expect("registry mutex poisoned");
        state.projects.get(project).cloned()
    }

    /// List every registered project.
    pub fn list(&self) -> Vec<ProjectMetadata> {
        let state = self.state.lock().expect("registry mutex poisoned");
        state.projects.values().cloned().collect()
    }

    /// Remove a project from the registry. Does not touch its chunks or
    /// cached embeddings; callers clear those separately before calling
    /// this.
    pub fn remove(&self, project: &str) -> Result<()> {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        state.projects.remove(project);
        self.persist(&state)
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample(project: &str) -> ProjectMetadata {
        ProjectMetadata {
            project: project.to_string(),
            root_path: format!("/tmp/{project}"),
            chunk_count: 0,
            file_count: 0,
            status: IndexStatus::NotIndexed,
            last_indexed_at: None,
        }
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let dir = tempdir().expect("tempdir");
        let registry = ProjectRegistry::open(dir.path()).expect("open");
        registry.upsert(sample("demo")).expect("upsert");

        let fetched = registry.get("demo").expect("present");
        assert_eq!(fetched.status, IndexStatus::NotIndexed);
    }

    #[test]
    fn mark_status_ready_stamps_last_indexed_at() {
        let dir = tempdir().expect("tempdir");
        let registry = ProjectRegistry::open(dir.path()).expect("open");
        registry.upsert(sample("demo")).expect("upsert");

        registry
            .mark_status("demo", IndexStatus::Ready, Some(5), Some(2))
            .expect("mark status");

        let fetched = registry.get("demo").expect("present");
        assert_eq!(fetched.status, IndexStatus::Ready);
        assert_eq!(fetched.chunk_count, 5);
        assert!(fetched.last_indexed_at.is_some());
    }

    #[test]
    fn reopening_the_registry_reloads_persisted_state() {
        let dir = tempdir().expect("tempdir");
        {
            let registry = ProjectRegistry::open(dir.path()).expect("open");
            registry.upsert(sample("demo")).expect("upsert");
        }
        let reopened = ProjectRegistry::open(dir.path()).expect("reopen");
        assert!(reopened.get("demo").is_some());
    }

    #[test]
    fn remove_drops_the_project_from_the_list() {
        let dir = tempdir().expect("tempdir");
        let registry = ProjectRegistry::open(dir.path()).expect("open");
        registry.upsert(sample("demo")).expect("upsert");
        registry.remove("demo").expect("remove");
        assert!(registry.get("demo").is_none());
        assert!(registry.list().is_empty());
    }
}
