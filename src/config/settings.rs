//! User settings for codereel
//!
//! Manages preferences including backup retention, validation limits and
//! import/export defaults.

use serde::{Deserialize, Serialize};

use super::paths::ReelPaths;
use crate::error::ReelError;
use crate::models::{FileFormat, ResolutionStrategy};
use crate::storage::file_io::write_json_atomic;

/// Backup retention settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRetention {
    /// Maximum number of backups kept, regardless of reason
    pub max_backups: usize,
    /// Age after which non-manual backups are evicted
    pub retention_days: i64,
    /// Minimum age of the newest automatic backup before another is taken
    #[serde(default = "default_auto_interval")]
    pub auto_backup_interval_hours: i64,
}

fn default_auto_interval() -> i64 {
    24
}

impl Default for BackupRetention {
    fn default() -> Self {
        Self {
            max_backups: 10,
            retention_days: 30,
            auto_backup_interval_hours: default_auto_interval(),
        }
    }
}

/// Thresholds for advisory validation warnings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationLimits {
    /// Files larger than this produce a warning
    pub max_file_size: u64,
    /// Documents with more snapshots than this produce a warning
    pub max_snapshots: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_snapshots: 1000,
        }
    }
}

/// User settings for codereel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Backup retention policy
    #[serde(default)]
    pub backup_retention: BackupRetention,

    /// Whether backups are stored compressed
    #[serde(default = "default_true")]
    pub compress_backups: bool,

    /// Validation thresholds
    #[serde(default)]
    pub validation_limits: ValidationLimits,

    /// Strategy used when an import does not name one
    #[serde(default)]
    pub default_strategy: ResolutionStrategy,

    /// Whether imports take a backup before committing
    #[serde(default = "default_true")]
    pub create_backup_before_import: bool,

    /// Format used when an export does not name one
    #[serde(default)]
    pub default_export_format: FileFormat,

    /// Pretty-print structured exports
    #[serde(default = "default_true")]
    pub pretty_print: bool,
}

fn default_schema_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            backup_retention: BackupRetention::default(),
            compress_backups: true,
            validation_limits: ValidationLimits::default(),
            default_strategy: ResolutionStrategy::default(),
            create_backup_before_import: true,
            default_export_format: FileFormat::default(),
            pretty_print: true,
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &ReelPaths) -> Result<Self, ReelError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
                ReelError::File(format!("Failed to read settings file: {}", e))
            })?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                ReelError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &ReelPaths) -> Result<(), ReelError> {
        paths.ensure_directories()?;
        write_json_atomic(paths.settings_file(), self)
            .map_err(|e| ReelError::Config(format!("Failed to save settings: {}", e)))
    }
}
