//! Bounded, persisted operation history
//!
//! Import and export results are appended to separate histories. Each keeps
//! the newest [`MAX_HISTORY`] entries and is sorted by start time on read.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::ReelResult;
use crate::models::{ExportResult, ImportResult};
use crate::storage::{read_collection, write_value, KeyValueStore};

/// Maximum number of entries kept per history
pub const MAX_HISTORY: usize = 100;

/// A result that can live in a history
pub trait HistoryEntry: Serialize + DeserializeOwned + Clone {
    fn started_at(&self) -> DateTime<Utc>;
}

impl HistoryEntry for ImportResult {
    fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl HistoryEntry for ExportResult {
    fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// History of one operation kind stored under one key
pub struct OperationHistory<T> {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
    _entry: PhantomData<fn() -> T>,
}

impl<T: HistoryEntry> OperationHistory<T> {
    pub fn new(store: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            store,
            key,
            _entry: PhantomData,
        }
    }

    /// Entries, newest first
    pub fn list(&self) -> Vec<T> {
        let mut entries: Vec<T> = read_collection(self.store.as_ref(), self.key);
        entries.sort_by_key(|e| std::cmp::Reverse(e.started_at()));
        entries
    }

    /// Append an entry, dropping the oldest beyond the bound
    pub fn append(&self, entry: &T) -> ReelResult<()> {
        let mut entries = self.list();
        entries.insert(0, entry.clone());
        entries.sort_by_key(|e| std::cmp::Reverse(e.started_at()));
        entries.truncate(MAX_HISTORY);
        write_value(self.store.as_ref(), self.key, &entries)
    }

    /// Forget every entry
    pub fn clear(&self) -> ReelResult<()> {
        self.store.remove(self.key)
    }
}
