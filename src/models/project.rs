//! Project-level models
//!
//! `ProjectData` is the root unit for import, export and backup.
//! `PartialProject` is the same shape with every piece optional; it is what
//! the codec layer reads and writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::document::Document;
use super::format::FileFormat;
use super::timestamp;

/// Identity, provenance and derived statistics of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    pub id: String,
    pub name: String,
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(with = "timestamp::lenient")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "timestamp::lenient")]
    pub updated_at: DateTime<Utc>,

    /// Descriptive tags (set semantics, kept in insertion order)
    #[serde(default)]
    pub tags: Vec<String>,

    /// Size of the last imported or exported file, in bytes
    #[serde(default)]
    pub file_size: u64,

    #[serde(default)]
    pub snapshot_count: usize,

    /// Sum of snapshot durations, in milliseconds
    #[serde(default)]
    pub total_duration: u64,
}

impl ProjectMetadata {
    /// Create metadata for a brand-new project
    pub fn new(name: impl Into<String>) -> Self {
        let now = timestamp::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            version: "1.0.0".to_string(),
            author: None,
            description: None,
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
            file_size: 0,
            snapshot_count: 0,
            total_duration: 0,
        }
    }

    /// Recompute the derived fields from a document
    pub fn refresh_derived(&mut self, document: &Document) {
        self.snapshot_count = document.snapshots.len();
        self.total_duration = document.total_duration();
    }

    /// Add a tag unless already present
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }
}

/// A visual theme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark: Option<bool>,

    /// Color role -> CSS color
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
}

/// A reusable set of rendering overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,

    /// Default snapshot duration, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_time: Option<u64>,
}

/// Per-project export preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    #[serde(default)]
    pub format: FileFormat,

    #[serde(default = "default_true")]
    pub pretty: bool,

    #[serde(default = "default_true")]
    pub include_themes: bool,

    #[serde(default = "default_true")]
    pub include_presets: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: FileFormat::Json,
            pretty: true,
            include_themes: true,
            include_presets: true,
        }
    }
}

/// One entry of a project's version history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub version: String,

    #[serde(with = "timestamp::lenient")]
    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Backup bookkeeping carried on the project itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBackupInfo {
    #[serde(
        default,
        with = "timestamp::lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_backup_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub backup_count: usize,
}

/// A complete project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    pub metadata: ProjectMetadata,
    pub document: Document,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub themes: Option<Vec<Theme>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presets: Option<Vec<Preset>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_settings: Option<ExportSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_history: Option<Vec<VersionEntry>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_info: Option<ProjectBackupInfo>,
}

impl ProjectData {
    /// Create a project from metadata and a document
    pub fn new(metadata: ProjectMetadata, document: Document) -> Self {
        Self {
            metadata,
            document,
            themes: None,
            presets: None,
            export_settings: None,
            version_history: None,
            backup_info: None,
        }
    }

    /// Project id shortcut
    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    /// Themes, or an empty slice
    pub fn themes(&self) -> &[Theme] {
        self.themes.as_deref().unwrap_or_default()
    }

    /// Presets, or an empty slice
    pub fn presets(&self) -> &[Preset] {
        self.presets.as_deref().unwrap_or_default()
    }

    /// Recompute metadata derived from the document
    pub fn refresh_derived(&mut self) {
        self.metadata.refresh_derived(&self.document);
    }
}

/// A project with every component optional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PartialProject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ProjectMetadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub themes: Option<Vec<Theme>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presets: Option<Vec<Preset>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_settings: Option<ExportSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_history: Option<Vec<VersionEntry>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_info: Option<ProjectBackupInfo>,
}

impl PartialProject {
    /// Snapshots of the document, or an empty slice
    pub fn snapshots(&self) -> &[super::Snapshot] {
        self.document
            .as_ref()
            .map(|d| d.snapshots.as_slice())
            .unwrap_or_default()
    }

    /// Promote to a full project when metadata and document are present
    pub fn into_project(self) -> Option<ProjectData> {
        Some(ProjectData {
            metadata: self.metadata?,
            document: self.document?,
            themes: self.themes,
            presets: self.presets,
            export_settings: self.export_settings,
            version_history: self.version_history,
            backup_info: self.backup_info,
        })
    }
}

impl From<ProjectData> for PartialProject {
    fn from(data: ProjectData) -> Self {
        Self {
            metadata: Some(data.metadata),
            document: Some(data.document),
            themes: data.themes,
            presets: data.presets,
            export_settings: data.export_settings,
            version_history: data.version_history,
            backup_info: data.backup_info,
        }
    }
}
