//! Backup manager for codereel
//!
//! Keeps point-in-time copies of the current project in the key-value store
//! and applies the retention policy after every new backup.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::restore::{encode_payload, restore_payload};
use crate::config::settings::BackupRetention;
use crate::error::{ReelError, ReelResult};
use crate::models::timestamp;
use crate::models::ProjectData;
use crate::storage::{read_collection, write_value, KeyValueStore, ProjectSource, BACKUPS_KEY};

/// Why a backup was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackupReason {
    /// Taken automatically before an import commits
    BeforeImport,
    /// Requested by the user
    Manual,
    /// Taken on a timer
    Auto,
    /// Taken before an application update
    BeforeUpdate,
}

impl fmt::Display for BackupReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeImport => write!(f, "before-import"),
            Self::Manual => write!(f, "manual"),
            Self::Auto => write!(f, "auto"),
            Self::BeforeUpdate => write!(f, "before-update"),
        }
    }
}

impl std::str::FromStr for BackupReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "before-import" => Ok(Self::BeforeImport),
            "manual" => Ok(Self::Manual),
            "auto" => Ok(Self::Auto),
            "before-update" => Ok(Self::BeforeUpdate),
            other => Err(format!("Unknown backup reason: {}", other)),
        }
    }
}

/// One stored backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupItem {
    /// Unique backup id
    pub id: String,
    /// When the backup was created
    #[serde(with = "timestamp::lenient")]
    pub timestamp: DateTime<Utc>,
    /// Why the backup was taken
    pub reason: BackupReason,
    /// Id of the backed-up project
    pub project_id: String,
    /// Name of the backed-up project
    pub project_name: String,
    /// Size of the uncompressed payload in bytes
    pub size: u64,
    /// Whether `data` is a base64 deflate archive instead of plain JSON
    pub compressed: bool,
    /// Whether `restore` may use this backup
    pub restorable: bool,
    /// Free-form notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Encoded project payload
    pub data: String,
}

impl BackupItem {
    /// Age of the backup relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }
}

/// Aggregate view of the stored backups
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BackupStats {
    pub total_backups: usize,
    /// Sum of uncompressed payload sizes, in bytes
    pub total_size: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub by_reason: BTreeMap<BackupReason, usize>,
}

/// Manages backup creation, restoration and retention
pub struct BackupManager {
    /// Substrate holding the backup list
    store: Arc<dyn KeyValueStore>,
    /// Retention policy
    retention: BackupRetention,
    /// Whether new payloads are compressed
    compress: bool,
    /// Fallback project for `create_backup` without explicit data
    source: Option<Arc<dyn ProjectSource>>,
}

impl BackupManager {
    /// Create a new BackupManager
    pub fn new(store: Arc<dyn KeyValueStore>, retention: BackupRetention, compress: bool) -> Self {
        Self {
            store,
            retention,
            compress,
            source: None,
        }
    }

    /// Use `source` when no project is passed to `create_backup`
    pub fn with_source(mut self, source: Arc<dyn ProjectSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// The retention policy in effect
    pub fn retention(&self) -> &BackupRetention {
        &self.retention
    }

    /// Create a backup of `data`, or of the current project when `None`
    ///
    /// Retention rules run afterwards, so the new backup may be the only
    /// survivor of a tight policy but is never evicted itself.
    pub fn create_backup(&self, reason: BackupReason, data: Option<&ProjectData>) -> ReelResult<BackupItem> {
        self.create_backup_with_notes(reason, data, None)
    }

    /// Create a backup carrying free-form notes
    pub fn create_backup_with_notes(
        &self,
        reason: BackupReason,
        data: Option<&ProjectData>,
        notes: Option<String>,
    ) -> ReelResult<BackupItem> {
        let current;
        let project = match data {
            Some(project) => project,
            None => {
                current = self.current_project()?;
                current
                    .as_ref()
                    .ok_or_else(|| ReelError::Backup("no project data to backup".into()))?
            }
        };

        let (payload, size) = encode_payload(project, self.compress)?;
        let item = BackupItem {
            id: format!("backup-{}", Uuid::new_v4()),
            timestamp: timestamp::now(),
            reason,
            project_id: project.metadata.id.clone(),
            project_name: project.metadata.name.clone(),
            size,
            compressed: self.compress,
            restorable: true,
            notes,
            data: payload,
        };

        let mut backups = self.list_backups();
        backups.insert(0, item.clone());
        self.save(&backups)
            .map_err(|e| ReelError::Backup(format!("backup creation failed: {}", e)))?;

        tracing::info!(
            backup_id = %item.id,
            reason = %reason,
            size = item.size,
            compressed = item.compressed,
            "Created backup"
        );

        self.apply_cleanup_rules()?;
        Ok(item)
    }

    fn current_project(&self) -> ReelResult<Option<ProjectData>> {
        match &self.source {
            Some(source) => source.current(),
            None => Ok(None),
        }
    }

    /// Restore the project stored in a backup
    pub fn restore(&self, id: &str) -> ReelResult<ProjectData> {
        let item = self.get_backup(id)?;
        if !item.restorable {
            return Err(ReelError::Backup(format!("backup {} is not restorable", id)));
        }

        let project = restore_payload(&item.data, item.compressed)?;
        tracing::info!(backup_id = %id, project_id = %project.metadata.id, "Restored backup");
        Ok(project)
    }

    /// Find one backup by id
    pub fn get_backup(&self, id: &str) -> ReelResult<BackupItem> {
        self.list_backups()
            .into_iter()
            .find(|b| b.id == id)
            .ok_or_else(|| ReelError::backup_not_found(id))
    }

    /// List all backups, newest first
    ///
    /// Unreadable or corrupt backup data yields an empty list.
    pub fn list_backups(&self) -> Vec<BackupItem> {
        let mut backups: Vec<BackupItem> = read_collection(self.store.as_ref(), BACKUPS_KEY);
        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        backups
    }

    /// Get the most recent backup
    pub fn get_latest_backup(&self) -> Option<BackupItem> {
        self.list_backups().into_iter().next()
    }

    /// Delete one backup
    pub fn delete_backup(&self, id: &str) -> ReelResult<()> {
        let mut backups = self.list_backups();
        let before = backups.len();
        backups.retain(|b| b.id != id);
        if backups.len() == before {
            return Err(ReelError::backup_not_found(id));
        }

        self.save(&backups)
            .map_err(|e| ReelError::Backup(format!("failed to delete backup: {}", e)))?;
        tracing::info!(backup_id = %id, "Deleted backup");
        Ok(())
    }

    /// Delete every backup
    pub fn delete_all_backups(&self) -> ReelResult<()> {
        self.store
            .remove(BACKUPS_KEY)
            .map_err(|e| ReelError::Backup(format!("failed to delete backup: {}", e)))?;
        tracing::info!("Deleted all backups");
        Ok(())
    }

    /// Aggregate count, size, age range and reasons
    pub fn get_backup_stats(&self) -> BackupStats {
        let backups = self.list_backups();
        let mut by_reason = BTreeMap::new();
        for backup in &backups {
            *by_reason.entry(backup.reason).or_insert(0) += 1;
        }

        BackupStats {
            total_backups: backups.len(),
            total_size: backups.iter().map(|b| b.size).sum(),
            newest: backups.first().map(|b| b.timestamp),
            oldest: backups.last().map(|b| b.timestamp),
            by_reason,
        }
    }

    /// Whether an automatic backup is due
    ///
    /// True when no automatic backup exists or the newest one is at least
    /// the configured interval old.
    pub fn should_create_auto_backup(&self) -> bool {
        let interval = Duration::hours(self.retention.auto_backup_interval_hours);
        match self
            .list_backups()
            .into_iter()
            .find(|b| b.reason == BackupReason::Auto)
        {
            Some(latest) => latest.age(timestamp::now()) >= interval,
            None => true,
        }
    }

    /// Create an automatic backup when one is due
    pub fn create_auto_backup_if_needed(&self) -> ReelResult<Option<BackupItem>> {
        if !self.should_create_auto_backup() {
            return Ok(None);
        }
        self.create_backup(BackupReason::Auto, None).map(Some)
    }

    /// Enforce the retention policy
    ///
    /// Non-manual backups older than the retention window are dropped, then
    /// the list is truncated to the maximum count, oldest first. Returns the
    /// removed backups.
    pub fn apply_cleanup_rules(&self) -> ReelResult<Vec<BackupItem>> {
        let (kept, removed) = self.partition_by_retention();

        if !removed.is_empty() {
            self.save(&kept)
                .map_err(|e| ReelError::Backup(format!("failed to delete backup: {}", e)))?;
            tracing::info!(count = removed.len(), "Removed expired backups");
        }

        Ok(removed)
    }

    /// Backups the retention policy would remove, without removing them
    pub fn expired_backups(&self) -> Vec<BackupItem> {
        self.partition_by_retention().1
    }

    fn partition_by_retention(&self) -> (Vec<BackupItem>, Vec<BackupItem>) {
        let now = timestamp::now();
        let window = Duration::days(self.retention.retention_days);

        // Count cap first (newest kept), then the age window on what is left
        let mut newest = self.list_backups();
        let mut removed = if newest.len() > self.retention.max_backups {
            newest.split_off(self.retention.max_backups)
        } else {
            Vec::new()
        };

        let (kept, expired): (Vec<_>, Vec<_>) = newest
            .into_iter()
            .partition(|b| b.reason == BackupReason::Manual || b.age(now) <= window);
        removed.extend(expired);
        (kept, removed)
    }

    fn save(&self, backups: &[BackupItem]) -> ReelResult<()> {
        write_value(self.store.as_ref(), BACKUPS_KEY, backups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, ProjectMetadata, Snapshot};
    use crate::storage::{FileStore, MemoryStore, SharedProject};
    use tempfile::TempDir;

    fn project(name: &str) -> ProjectData {
        ProjectData::new(
            ProjectMetadata::new(name),
            Document::with_snapshots(vec![Snapshot::new("s1", "print(1)", 1000)]),
        )
    }

    fn create_test_manager() -> (BackupManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::new(temp_dir.path().join("store")));
        let manager = BackupManager::new(store, BackupRetention::default(), false);
        (manager, temp_dir)
    }

    fn memory_manager(retention: BackupRetention) -> BackupManager {
        BackupManager::new(Arc::new(MemoryStore::new()), retention, false)
    }

    /// Rewrite the stored timestamp of a backup
    fn age_backup(manager: &BackupManager, id: &str, days: i64) {
        let mut backups = manager.list_backups();
        for backup in backups.iter_mut().filter(|b| b.id == id) {
            backup.timestamp = Utc::now() - Duration::days(days);
        }
        manager.save(&backups).unwrap();
    }

    #[test]
    fn test_create_and_list() {
        let (manager, _temp) = create_test_manager();
        let first = manager.create_backup(BackupReason::Manual, Some(&project("A"))).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = manager.create_backup(BackupReason::Auto, Some(&project("B"))).unwrap();

        let backups = manager.list_backups();
        assert_eq!(backups.len(), 2);
        assert_eq!(backups[0].id, second.id);
        assert_eq!(backups[1].id, first.id);
        assert_eq!(manager.get_latest_backup().unwrap().project_name, "B");
    }

    #[test]
    fn test_create_without_data_uses_source() {
        let manager = memory_manager(BackupRetention::default());
        let err = manager.create_backup(BackupReason::Manual, None).unwrap_err();
        assert!(err.to_string().contains("no project data to backup"));

        let source = Arc::new(SharedProject::with_project(project("Current")));
        let manager = memory_manager(BackupRetention::default()).with_source(source);
        let item = manager.create_backup(BackupReason::Manual, None).unwrap();
        assert_eq!(item.project_name, "Current");
    }

    #[test]
    fn test_restore_round_trip() {
        let (manager, _temp) = create_test_manager();
        let data = project("A");
        let item = manager.create_backup(BackupReason::Manual, Some(&data)).unwrap();
        assert_eq!(manager.restore(&item.id).unwrap().metadata.id, data.metadata.id);
    }

    #[test]
    fn test_compressed_restore() {
        let manager = BackupManager::new(Arc::new(MemoryStore::new()), BackupRetention::default(), true);
        let data = project("A");
        let item = manager.create_backup(BackupReason::Manual, Some(&data)).unwrap();
        assert!(item.compressed);
        assert_eq!(manager.restore(&item.id).unwrap().document, data.document);
    }

    #[test]
    fn test_restore_missing_or_unrestorable() {
        let manager = memory_manager(BackupRetention::default());
        assert!(manager.restore("backup-nope").unwrap_err().is_not_found());

        let item = manager.create_backup(BackupReason::Manual, Some(&project("A"))).unwrap();
        let mut backups = manager.list_backups();
        backups[0].restorable = false;
        manager.save(&backups).unwrap();
        assert!(manager.restore(&item.id).unwrap_err().to_string().contains("not restorable"));
    }

    #[test]
    fn test_restore_rejects_payload_without_snapshots() {
        let manager = memory_manager(BackupRetention::default());
        let mut data = project("A");
        data.document.snapshots.clear();
        let item = manager.create_backup(BackupReason::Manual, Some(&data)).unwrap();
        assert!(manager.restore(&item.id).is_err());
    }

    #[test]
    fn test_delete() {
        let manager = memory_manager(BackupRetention::default());
        let a = manager.create_backup(BackupReason::Manual, Some(&project("A"))).unwrap();
        manager.create_backup(BackupReason::Manual, Some(&project("B"))).unwrap();

        manager.delete_backup(&a.id).unwrap();
        assert_eq!(manager.list_backups().len(), 1);
        assert!(manager.delete_backup(&a.id).unwrap_err().is_not_found());

        manager.delete_all_backups().unwrap();
        assert!(manager.list_backups().is_empty());
    }

    #[test]
    fn test_count_cap_applies_to_everyone() {
        let retention = BackupRetention {
            max_backups: 3,
            ..Default::default()
        };
        let manager = memory_manager(retention);
        for i in 0..5 {
            let reason = if i % 2 == 0 { BackupReason::Manual } else { BackupReason::Auto };
            manager.create_backup(reason, Some(&project("A"))).unwrap();
        }
        assert_eq!(manager.list_backups().len(), 3);
    }

    #[test]
    fn test_age_eviction_spares_manual_backups() {
        let manager = memory_manager(BackupRetention::default());
        let manual = manager.create_backup(BackupReason::Manual, Some(&project("A"))).unwrap();
        let auto = manager.create_backup(BackupReason::Auto, Some(&project("A"))).unwrap();
        let import = manager.create_backup(BackupReason::BeforeImport, Some(&project("A"))).unwrap();

        age_backup(&manager, &manual.id, 90);
        age_backup(&manager, &auto.id, 31);

        let expired: Vec<String> = manager.expired_backups().into_iter().map(|b| b.id).collect();
        assert_eq!(expired, vec![auto.id.clone()]);
        assert_eq!(manager.list_backups().len(), 3);

        let removed = manager.apply_cleanup_rules().unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, auto.id);

        let ids: Vec<String> = manager.list_backups().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![import.id, manual.id]);
    }

    #[test]
    fn test_count_cap_runs_before_age_window() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let setup = BackupManager::new(store.clone(), BackupRetention::default(), false);
        let manual = setup.create_backup(BackupReason::Manual, Some(&project("A"))).unwrap();
        let stale = setup.create_backup(BackupReason::Auto, Some(&project("A"))).unwrap();
        let fresh = setup.create_backup(BackupReason::Auto, Some(&project("A"))).unwrap();
        age_backup(&setup, &manual.id, 60);
        age_backup(&setup, &stale.id, 31);

        let retention = BackupRetention {
            max_backups: 2,
            ..Default::default()
        };
        let manager = BackupManager::new(store, retention, false);

        // The manual backup falls outside the cap; the stale auto one outside the window
        let removed: Vec<String> = manager.apply_cleanup_rules().unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(removed, vec![manual.id, stale.id]);

        let ids: Vec<String> = manager.list_backups().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![fresh.id]);
    }

    #[test]
    fn test_auto_backup_schedule() {
        let manager = memory_manager(BackupRetention::default())
            .with_source(Arc::new(SharedProject::with_project(project("A"))));
        assert!(manager.should_create_auto_backup());

        let created = manager.create_auto_backup_if_needed().unwrap().unwrap();
        assert!(!manager.should_create_auto_backup());
        assert!(manager.create_auto_backup_if_needed().unwrap().is_none());

        age_backup(&manager, &created.id, 1);
        assert!(manager.should_create_auto_backup());
    }

    #[test]
    fn test_stats() {
        let manager = memory_manager(BackupRetention::default());
        assert_eq!(manager.get_backup_stats(), BackupStats::default());

        manager.create_backup(BackupReason::Manual, Some(&project("A"))).unwrap();
        manager.create_backup(BackupReason::Auto, Some(&project("B"))).unwrap();
        manager.create_backup(BackupReason::Auto, Some(&project("C"))).unwrap();

        let stats = manager.get_backup_stats();
        assert_eq!(stats.total_backups, 3);
        assert_eq!(stats.by_reason[&BackupReason::Auto], 2);
        assert_eq!(stats.by_reason[&BackupReason::Manual], 1);
        assert!(stats.total_size > 0);
        assert!(stats.oldest <= stats.newest);
    }

    #[test]
    fn test_corrupt_store_reads_as_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(BACKUPS_KEY, "[{\"id\":").unwrap();
        let manager = BackupManager::new(store, BackupRetention::default(), false);
        assert!(manager.list_backups().is_empty());
    }

    #[test]
    fn test_write_failure_propagates() {
        let store = Arc::new(MemoryStore::with_quota(16));
        let manager = BackupManager::new(store, BackupRetention::default(), false);
        let err = manager.create_backup(BackupReason::Manual, Some(&project("A"))).unwrap_err();
        assert!(err.to_string().contains("backup creation failed"));
    }
}
