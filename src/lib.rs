//! codereel - project interchange engine for code animation projects
//!
//! This library moves code animation projects (a document of ordered code
//! snapshots plus metadata, themes and presets) in and out of JSON, YAML,
//! CSV, XML and ZIP files. Imports are validated, checked for conflicts
//! against the current project and committed under a resolution strategy;
//! backups with retention guard every destructive step.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (projects, snapshots, conflicts, results)
//! - `formats`: Format codecs
//! - `validation`: Structural validation and filename rules
//! - `conflict`: Conflict detection, resolution and deep merge
//! - `storage`: Key-value substrate and the current-project source
//! - `backup`: Backup management with retention
//! - `services`: Import/export orchestration
//! - `cli`: Command handlers for the `codereel` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use codereel::config::settings::Settings;
//! use codereel::services::{ImportFile, ImportOptions, ProjectManager};
//! use codereel::storage::{MemoryStore, SharedProject};
//!
//! let manager = ProjectManager::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(SharedProject::new()),
//!     &Settings::default(),
//! );
//! let file = ImportFile::from_path("demo.json").await?;
//! let result = manager.import_file(file, ImportOptions::default()).await?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod conflict;
pub mod error;
pub mod formats;
pub mod models;
pub mod services;
pub mod storage;
pub mod validation;

pub use error::{ReelError, ReelResult};
