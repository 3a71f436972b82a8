//! Storage layer for codereel
//!
//! The engine persists backups, operation history, export templates and the
//! current project through a synchronous string-keyed key-value substrate.
//! Reads tolerate missing or corrupt values by degrading to an empty
//! collection; write failures are surfaced to the caller.

pub mod file_io;
pub mod file_store;
pub mod memory;
pub mod project;

pub use file_io::{write_bytes_atomic, write_json_atomic};
pub use file_store::FileStore;
pub use memory::MemoryStore;
pub use project::{ProjectSource, SharedProject, StoredProject};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{ReelError, ReelResult};

/// Key holding the backup list
pub const BACKUPS_KEY: &str = "codereel.backups";
/// Key holding the import history
pub const IMPORT_HISTORY_KEY: &str = "codereel.history.import";
/// Key holding the export history
pub const EXPORT_HISTORY_KEY: &str = "codereel.history.export";
/// Key holding saved export templates
pub const TEMPLATES_KEY: &str = "codereel.templates";
/// Key holding the current project of a stored workspace
pub const PROJECT_KEY: &str = "codereel.project";

/// Byte-oriented get/set/remove store keyed by string
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent
    fn get(&self, key: &str) -> ReelResult<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> ReelResult<()>;

    /// Remove a value; removing an absent key is not an error
    fn remove(&self, key: &str) -> ReelResult<()>;
}

/// Read a JSON collection, degrading to empty on any failure
pub fn read_collection<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Vec<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read store key, treating as empty");
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(key, error = %e, "Corrupt store value, treating as empty");
            Vec::new()
        }
    }
}

/// Serialize a value as JSON and write it under `key`
pub fn write_value<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> ReelResult<()> {
    let json = serde_json::to_string(value)
        .map_err(|e| ReelError::Storage(format!("Failed to serialize '{}': {}", key, e)))?;
    store.set(key, &json)
}
