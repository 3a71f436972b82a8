//! In-memory key-value store
//!
//! Used by tests and embedders that manage persistence themselves. An
//! optional byte quota mimics the storage limits of browser-style substrates.

use std::collections::HashMap;
use std::sync::RwLock;

use super::KeyValueStore;
use crate::error::{ReelError, ReelResult};

/// Key-value store backed by a `HashMap`
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, String>>,
    /// Maximum total size of all values, in bytes
    quota: Option<usize>,
}

impl MemoryStore {
    /// Create an empty, unbounded store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that rejects writes beyond `quota` bytes
    pub fn with_quota(quota: usize) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.data.read().map(|d| d.len()).unwrap_or(0)
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> ReelResult<Option<String>> {
        let data = self
            .data
            .read()
            .map_err(|e| ReelError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ReelResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| ReelError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        if let Some(quota) = self.quota {
            let others: usize = data
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            if others + value.len() > quota {
                return Err(ReelError::Storage(format!(
                    "Quota exceeded writing '{}': {} bytes over a {} byte quota",
                    key,
                    others + value.len(),
                    quota
                )));
            }
        }

        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ReelResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| ReelError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        data.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_remove() {
        let store = MemoryStore::new();
        assert!(store.get("k").unwrap().is_none());

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(store.len(), 1);

        store.remove("k").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_quota_rejects_oversized_writes() {
        let store = MemoryStore::with_quota(10);
        store.set("a", "12345").unwrap();
        assert!(store.set("b", "123456").is_err());

        // Overwriting a key only counts the new value
        store.set("a", "1234567890").unwrap();
    }
}
