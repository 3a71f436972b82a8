//! Path management for codereel
//!
//! Provides XDG-compliant path resolution for settings and the file-backed
//! key-value store.
//!
//! ## Path Resolution Order
//!
//! 1. `CODEREEL_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/codereel` or `~/.config/codereel`
//! 3. Windows: `%APPDATA%\codereel`

use std::path::PathBuf;

use crate::error::ReelError;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "CODEREEL_DATA_DIR";

/// Manages all paths used by codereel
#[derive(Debug, Clone)]
pub struct ReelPaths {
    /// Base directory for all codereel data
    base_dir: PathBuf,
}

impl ReelPaths {
    /// Create a new ReelPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home/config directory can be determined.
    pub fn new() -> Result<Self, ReelError> {
        let base_dir = if let Ok(custom) = std::env::var(DATA_DIR_ENV) {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create ReelPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Directory holding one file per store key
    pub fn store_dir(&self) -> PathBuf {
        self.base_dir.join("store")
    }

    /// Default directory for exported files
    pub fn export_dir(&self) -> PathBuf {
        self.base_dir.join("exports")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), ReelError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| ReelError::File(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.store_dir())
            .map_err(|e| ReelError::File(format!("Failed to create store directory: {}", e)))?;

        Ok(())
    }
}

/// Resolve the default data directory path based on platform
#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, ReelError> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join("codereel"));
    }
    let home = std::env::var("HOME")
        .map_err(|_| ReelError::Config("Could not determine HOME directory".into()))?;
    Ok(PathBuf::from(home).join(".config").join("codereel"))
}

/// Resolve the default data directory path based on platform
#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, ReelError> {
    let appdata = std::env::var("APPDATA")
        .map_err(|_| ReelError::Config("Could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join("codereel"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ReelPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.store_dir(), temp_dir.path().join("store"));
        assert_eq!(paths.settings_file(), temp_dir.path().join("config.json"));
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ReelPaths::with_base_dir(temp_dir.path().join("nested"));

        paths.ensure_directories().unwrap();

        assert!(paths.base_dir().exists());
        assert!(paths.store_dir().exists());
    }
}
