//! Backup system for codereel
//!
//! Provides point-in-time project backups with a retention policy and
//! restore functionality.
//!
//! # Architecture
//!
//! - `BackupManager`: creates, lists, restores and deletes backups held in a
//!   [`KeyValueStore`](crate::storage::KeyValueStore) under
//!   [`BACKUPS_KEY`](crate::storage::BACKUPS_KEY)
//! - `restore`: payload encoding plus the structural checks run on restore
//!
//! # Retention Policy
//!
//! After every backup the manager drops non-manual backups older than the
//! retention window (30 days by default) and then truncates the list to the
//! maximum count (10 by default). The count cap applies to manual backups
//! too.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use codereel::backup::{BackupManager, BackupReason};
//! use codereel::config::BackupRetention;
//! use codereel::storage::MemoryStore;
//!
//! let manager = BackupManager::new(Arc::new(MemoryStore::new()), BackupRetention::default(), true);
//! let item = manager.create_backup(BackupReason::Manual, Some(&project))?;
//! let restored = manager.restore(&item.id)?;
//! ```

mod manager;
mod restore;

pub use manager::{BackupItem, BackupManager, BackupReason, BackupStats};
pub use restore::{encode_payload, restore_payload, validate_structure};
