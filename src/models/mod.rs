//! Core data models for codereel
//!
//! This module contains the data structures of the interchange domain:
//! projects, documents, snapshots, themes, presets, conflicts and the
//! outcome records of import/export operations.

pub mod conflict;
pub mod document;
pub mod format;
pub mod ids;
pub mod project;
pub mod results;
pub mod timestamp;

pub use conflict::{
    ConflictDifference, ConflictItem, ConflictResolution, ConflictType, DifferenceKind,
    EntityValue, ResolutionStrategy,
};
pub use document::{Document, Padding, Snapshot};
pub use format::{generate_filename, mime_for_extension, FileFormat};
pub use ids::{OperationId, TemplateId};
pub use project::{
    ExportSettings, PartialProject, Preset, ProjectBackupInfo, ProjectData, ProjectMetadata,
    Theme, VersionEntry,
};
pub use results::{
    DataType, ExportResult, ImportResult, OperationError, OperationStats, OperationWarning,
    ProcessedItem, SkippedItem,
};
