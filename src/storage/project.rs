//! The "current project" collaborator
//!
//! Imports commit into a [`ProjectSource`], exports and backups read from it.
//! [`SharedProject`] keeps the project in memory; [`StoredProject`] persists it
//! in a key-value store under [`PROJECT_KEY`].

use std::sync::{Arc, RwLock};

use super::{write_value, KeyValueStore, PROJECT_KEY};
use crate::error::{ReelError, ReelResult};
use crate::models::ProjectData;

/// Where the project currently being edited lives
pub trait ProjectSource: Send + Sync {
    /// The current project, if any
    fn current(&self) -> ReelResult<Option<ProjectData>>;

    /// Replace the current project
    fn commit(&self, project: ProjectData) -> ReelResult<()>;
}

/// In-memory project holder
#[derive(Debug, Default)]
pub struct SharedProject {
    project: RwLock<Option<ProjectData>>,
}

impl SharedProject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(project: ProjectData) -> Self {
        Self {
            project: RwLock::new(Some(project)),
        }
    }
}

impl ProjectSource for SharedProject {
    fn current(&self) -> ReelResult<Option<ProjectData>> {
        let guard = self
            .project
            .read()
            .map_err(|e| ReelError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(guard.clone())
    }

    fn commit(&self, project: ProjectData) -> ReelResult<()> {
        let mut guard = self
            .project
            .write()
            .map_err(|e| ReelError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        *guard = Some(project);
        Ok(())
    }
}

/// Project persisted as JSON in a key-value store
#[derive(Clone)]
pub struct StoredProject {
    store: Arc<dyn KeyValueStore>,
}

impl StoredProject {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Forget the stored project
    pub fn clear(&self) -> ReelResult<()> {
        self.store.remove(PROJECT_KEY)
    }
}

impl ProjectSource for StoredProject {
    /// A corrupt stored project is an error, not an empty workspace
    fn current(&self) -> ReelResult<Option<ProjectData>> {
        match self.store.get(PROJECT_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| ReelError::Storage(format!("Stored project is corrupt: {}", e))),
            None => Ok(None),
        }
    }

    fn commit(&self, project: ProjectData) -> ReelResult<()> {
        write_value(self.store.as_ref(), PROJECT_KEY, &project)?;
        tracing::debug!(project_id = %project.metadata.id, "Committed project to store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, ProjectMetadata, Snapshot};
    use crate::storage::MemoryStore;

    fn project() -> ProjectData {
        ProjectData::new(
            ProjectMetadata::new("Demo"),
            Document::with_snapshots(vec![Snapshot::new("s1", "x", 1000)]),
        )
    }

    #[test]
    fn test_shared_project_commit() {
        let source = SharedProject::new();
        assert!(source.current().unwrap().is_none());

        let data = project();
        source.commit(data.clone()).unwrap();
        assert_eq!(source.current().unwrap(), Some(data));
    }

    #[test]
    fn test_stored_project_survives_new_handle() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let data = project();
        StoredProject::new(store.clone()).commit(data.clone()).unwrap();

        let reopened = StoredProject::new(store);
        assert_eq!(reopened.current().unwrap(), Some(data));

        reopened.clear().unwrap();
        assert!(reopened.current().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_stored_project_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        store.set(PROJECT_KEY, "{broken").unwrap();
        let source = StoredProject::new(store);
        assert!(source.current().is_err());
    }
}
