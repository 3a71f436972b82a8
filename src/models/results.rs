//! Operation outcome records
//!
//! Import and export results are immutable snapshots of one operation. They
//! are appended to history as-is and never mutated afterward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::conflict::ConflictItem;
use super::format::FileFormat;
use super::ids::OperationId;
use crate::error::{ErrorKind, ReelError};

/// Kind of data moving through the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Project,
    Document,
    Snapshots,
    Themes,
    Presets,
    Settings,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project => write!(f, "project"),
            Self::Document => write!(f, "document"),
            Self::Snapshots => write!(f, "snapshots"),
            Self::Themes => write!(f, "themes"),
            Self::Presets => write!(f, "presets"),
            Self::Settings => write!(f, "settings"),
        }
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "project" => Ok(Self::Project),
            "document" => Ok(Self::Document),
            "snapshots" => Ok(Self::Snapshots),
            "themes" => Ok(Self::Themes),
            "presets" => Ok(Self::Presets),
            "settings" => Ok(Self::Settings),
            other => Err(format!("Unsupported data type: {}", other)),
        }
    }
}

/// A structured error inside an operation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationError {
    pub kind: ErrorKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    pub message: String,
    pub recoverable: bool,
}

impl OperationError {
    /// A blocking validation error on a field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ValidationError,
            field: Some(field.into()),
            message: message.into(),
            recoverable: false,
        }
    }

    /// Whether this error came from cancellation
    pub fn is_cancellation(&self) -> bool {
        self.kind == ErrorKind::SystemError && self.message.starts_with("Operation cancelled")
    }
}

impl From<&ReelError> for OperationError {
    fn from(err: &ReelError) -> Self {
        Self {
            kind: err.kind(),
            field: None,
            message: err.to_string(),
            recoverable: false,
        }
    }
}

/// An advisory message inside an operation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationWarning {
    pub field: String,
    pub message: String,
}

impl OperationWarning {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// An entity that was imported or exported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedItem {
    pub data_type: DataType,
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ProcessedItem {
    pub fn new(data_type: DataType, id: impl Into<String>) -> Self {
        Self {
            data_type,
            id: id.into(),
            name: None,
        }
    }

    pub fn named(data_type: DataType, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            data_type,
            id: id.into(),
            name: Some(name.into()),
        }
    }
}

/// An entity that was deliberately not imported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedItem {
    pub data_type: DataType,
    pub id: String,
    pub reason: String,
}

/// Aggregate statistics for one operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OperationStats {
    pub total_items: usize,
    pub items_by_type: BTreeMap<DataType, usize>,
    pub processing_time_ms: u64,
    pub average_item_time_ms: f64,
}

impl OperationStats {
    /// Build stats from processed items and elapsed time
    pub fn from_items(items: &[ProcessedItem], processing_time_ms: u64) -> Self {
        let mut items_by_type = BTreeMap::new();
        for item in items {
            *items_by_type.entry(item.data_type).or_insert(0) += 1;
        }
        let total_items = items.len();
        let average_item_time_ms = if total_items == 0 {
            0.0
        } else {
            processing_time_ms as f64 / total_items as f64
        };

        Self {
            total_items,
            items_by_type,
            processing_time_ms,
            average_item_time_ms,
        }
    }

    /// Count for one data type
    pub fn count(&self, data_type: DataType) -> usize {
        self.items_by_type.get(&data_type).copied().unwrap_or(0)
    }
}

/// Outcome of one import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub operation_id: OperationId,
    pub success: bool,
    pub file_name: String,
    pub format: FileFormat,
    pub imported: Vec<ProcessedItem>,
    pub skipped: Vec<SkippedItem>,
    pub conflicts: Vec<ConflictItem>,
    pub errors: Vec<OperationError>,
    pub warnings: Vec<OperationWarning>,
    pub stats: OperationStats,

    /// Backup taken before the import committed, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ImportResult {
    /// Whether the operation ended because it was cancelled
    pub fn was_cancelled(&self) -> bool {
        self.errors.iter().any(|e| e.is_cancellation())
    }

    /// Imported items of one type
    pub fn imported_of(&self, data_type: DataType) -> impl Iterator<Item = &ProcessedItem> {
        self.imported.iter().filter(move |i| i.data_type == data_type)
    }
}

/// Outcome of one export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub operation_id: OperationId,
    pub success: bool,
    pub format: FileFormat,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Size of the generated file in bytes
    pub size: u64,

    /// Generated bytes; not persisted into history
    #[serde(skip)]
    pub data: Option<Vec<u8>>,

    pub exported: Vec<ProcessedItem>,
    pub errors: Vec<OperationError>,
    pub warnings: Vec<OperationWarning>,
    pub stats: OperationStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ExportResult {
    /// Whether the operation ended because it was cancelled
    pub fn was_cancelled(&self) -> bool {
        self.errors.iter().any(|e| e.is_cancellation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_parsing() {
        assert_eq!("Snapshots".parse::<DataType>().unwrap(), DataType::Snapshots);
        assert!("widgets".parse::<DataType>().is_err());
    }

    #[test]
    fn test_stats_from_items() {
        let items = vec![
            ProcessedItem::new(DataType::Project, "p1"),
            ProcessedItem::new(DataType::Snapshots, "s1"),
            ProcessedItem::new(DataType::Snapshots, "s2"),
            ProcessedItem::new(DataType::Snapshots, "s3"),
        ];
        let stats = OperationStats::from_items(&items, 100);
        assert_eq!(stats.total_items, 4);
        assert_eq!(stats.count(DataType::Snapshots), 3);
        assert_eq!(stats.count(DataType::Themes), 0);
        assert!((stats.average_item_time_ms - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stats_with_no_items() {
        let stats = OperationStats::from_items(&[], 40);
        assert_eq!(stats.average_item_time_ms, 0.0);
    }

    #[test]
    fn test_operation_error_from_cancellation() {
        let err = ReelError::Cancelled("import op-1234".into());
        let op_err = OperationError::from(&err);
        assert_eq!(op_err.kind, ErrorKind::SystemError);
        assert!(op_err.is_cancellation());
        assert!(!op_err.recoverable);
    }
}
