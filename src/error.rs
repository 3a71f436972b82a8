//! Custom error types for codereel
//!
//! This module defines the error hierarchy for the interchange engine using
//! thiserror, plus the coarse [`ErrorKind`] taxonomy that structured
//! operation results report.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::FileFormat;

/// The main error type for codereel operations
#[derive(Error, Debug)]
pub enum ReelError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors on the input or output blob
    #[error("File error: {0}")]
    File(String),

    /// JSON serialization/deserialization errors outside the codec layer
    #[error("JSON error: {0}")]
    Json(String),

    /// Malformed input in one of the supported formats
    #[error("Failed to parse {format}: {message}")]
    Parse { format: FileFormat, message: String },

    /// An archive that contains nothing the codec layer understands
    #[error("No supported files found in archive")]
    EmptyArchive,

    /// Validation errors for project data
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict resolution errors
    #[error("Conflict error: {0}")]
    Conflict(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Backup errors
    #[error("Backup error: {0}")]
    Backup(String),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),

    /// Import errors
    #[error("Import error: {0}")]
    Import(String),

    /// Key-value storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// The operation's cancellation token fired
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// An operation with the same id is already in flight
    #[error("Operation already in progress: {0}")]
    OperationInProgress(String),

    /// Anything unanticipated
    #[error("System error: {0}")]
    System(String),
}

/// Coarse error taxonomy reported in operation results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Blocking data validation failure
    ValidationError,
    /// Malformed input format
    ParsingError,
    /// I/O on the input blob
    FileError,
    /// Unsupported conflict resolution
    ConflictError,
    /// Everything else, including cancellation
    SystemError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ValidationError => write!(f, "validation-error"),
            Self::ParsingError => write!(f, "parsing-error"),
            Self::FileError => write!(f, "file-error"),
            Self::ConflictError => write!(f, "conflict-error"),
            Self::SystemError => write!(f, "system-error"),
        }
    }
}

impl ReelError {
    /// Create a "not found" error for backups
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for export templates
    pub fn template_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Template",
            identifier: identifier.into(),
        }
    }

    /// Create a parse error for the given format
    pub fn parse(format: FileFormat, message: impl Into<String>) -> Self {
        Self::Parse {
            format,
            message: message.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error came from a cancellation token
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Map this error onto the result taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::Parse { .. } | Self::EmptyArchive | Self::Json(_) => ErrorKind::ParsingError,
            Self::File(_) => ErrorKind::FileError,
            Self::Conflict(_) => ErrorKind::ConflictError,
            _ => ErrorKind::SystemError,
        }
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for ReelError {
    fn from(err: std::io::Error) -> Self {
        Self::File(err.to_string())
    }
}

impl From<serde_json::Error> for ReelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<serde_yaml::Error> for ReelError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::parse(FileFormat::Yaml, err.to_string())
    }
}

impl From<csv::Error> for ReelError {
    fn from(err: csv::Error) -> Self {
        Self::parse(FileFormat::Csv, err.to_string())
    }
}

impl From<zip::result::ZipError> for ReelError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::parse(FileFormat::Zip, err.to_string())
    }
}

/// Result type alias for codereel operations
pub type ReelResult<T> = Result<T, ReelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReelError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_not_found_error() {
        let err = ReelError::backup_not_found("backup-123");
        assert_eq!(err.to_string(), "Backup not found: backup-123");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_parse_error_names_format() {
        let err = ReelError::parse(FileFormat::Csv, "row 2 has 1 column");
        assert_eq!(err.to_string(), "Failed to parse CSV: row 2 has 1 column");
        assert_eq!(err.kind(), ErrorKind::ParsingError);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ReelError::Validation("x".into()).kind(),
            ErrorKind::ValidationError
        );
        assert_eq!(ReelError::EmptyArchive.kind(), ErrorKind::ParsingError);
        assert_eq!(ReelError::Conflict("x".into()).kind(), ErrorKind::ConflictError);
        assert_eq!(ReelError::Cancelled("x".into()).kind(), ErrorKind::SystemError);
        assert_eq!(ErrorKind::FileError.to_string(), "file-error");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let reel_err: ReelError = io_err.into();
        assert!(matches!(reel_err, ReelError::File(_)));
    }
}
