//! Directory-backed key-value store
//!
//! Each key maps to one file in the store directory. Writes go through
//! `write_bytes_atomic`, so a value is either fully replaced or untouched.

use std::fs;
use std::path::PathBuf;

use super::file_io::write_bytes_atomic;
use super::KeyValueStore;
use crate::error::{ReelError, ReelResult};

/// Key-value store keeping one file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir` (created lazily on first write)
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Directory holding the store files
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> ReelResult<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| ReelError::Storage(format!("Failed to read {}: {}", path.display(), e)))
    }

    fn set(&self, key: &str, value: &str) -> ReelResult<()> {
        write_bytes_atomic(self.path_for(key), value.as_bytes())
    }

    fn remove(&self, key: &str) -> ReelResult<()> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(());
        }
        fs::remove_file(&path)
            .map_err(|e| ReelError::Storage(format!("Failed to remove {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("store"));

        assert!(store.get("codereel.backups").unwrap().is_none());
        store.set("codereel.backups", "[]").unwrap();
        assert_eq!(store.get("codereel.backups").unwrap().as_deref(), Some("[]"));
        assert!(temp_dir.path().join("store").join("codereel.backups.json").exists());

        store.remove("codereel.backups").unwrap();
        assert!(store.get("codereel.backups").unwrap().is_none());
    }

    #[test]
    fn test_keys_are_sanitized() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf());

        store.set("../escape/attempt", "x").unwrap();
        assert!(temp_dir.path().join(".._escape_attempt.json").exists());
    }

    #[test]
    fn test_remove_missing_key_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf());
        store.remove("nothing").unwrap();
    }
}
