//! Configuration module for codereel
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - User settings persistence
//! - Backup retention and validation thresholds

pub mod paths;
pub mod settings;

pub use paths::ReelPaths;
pub use settings::{BackupRetention, Settings, ValidationLimits};
