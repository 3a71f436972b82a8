//! Import pipeline
//!
//! Turns an [`ImportFile`] into a committed project: read, parse, validate,
//! detect conflicts, resolve them, commit. Every stage boundary is a
//! cancellation checkpoint and nothing reaches the [`ProjectSource`] before
//! the final commit, so a failed or cancelled import leaves the current
//! project untouched.

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::operations::OperationHandle;
use super::progress::{ImportStage, ProgressEvent, ProgressObserver};
use crate::conflict::detector::Keyed;
use crate::conflict::{detect_conflicts, resolve_conflicts, ResolvedData};
use crate::error::{ReelError, ReelResult};
use crate::formats::{self, ParseOptions, ParsedPayload};
use crate::models::{
    timestamp, ConflictItem, DataType, Document, EntityValue, FileFormat, ImportResult, OperationError,
    OperationId, OperationStats, OperationWarning, PartialProject, ProcessedItem, ProjectData,
    ProjectMetadata, ResolutionStrategy, SkippedItem,
};
use crate::storage::ProjectSource;
use crate::validation::DataValidator;

/// An incoming file
#[derive(Debug, Clone, PartialEq)]
pub struct ImportFile {
    /// File name, used for format detection
    pub name: String,
    pub content: Vec<u8>,
    /// Declared MIME type, if the caller knows one
    pub content_type: Option<String>,
}

impl ImportFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read a file from disk
    pub async fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| ReelError::File(format!("Failed to read {}: {}", path.display(), e)))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, content))
    }

    /// Explicit format, else detection from name and content type
    pub fn format(&self, explicit: Option<FileFormat>) -> FileFormat {
        explicit.unwrap_or_else(|| FileFormat::detect(&self.name, self.content_type.as_deref()))
    }

    /// File name without its extension
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }
}

/// Caller options for one import
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    /// Force a format instead of detecting it
    pub format: Option<FileFormat>,
    /// Strategy applied to every conflict
    pub strategy: ResolutionStrategy,
    /// Run the validator; when off, only parse errors stop the import
    pub validate: bool,
    /// Back up the current project before committing
    pub create_backup: bool,
    pub parse: ParseOptions,
    /// Caller-chosen operation id, for cancellation
    pub operation_id: Option<OperationId>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            format: None,
            strategy: ResolutionStrategy::Merge,
            validate: true,
            create_backup: true,
            parse: ParseOptions::default(),
            operation_id: None,
        }
    }
}

/// Outcome of a dry run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    pub valid: bool,
    pub format: FileFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    pub snapshot_count: usize,
    pub errors: Vec<OperationError>,
    pub warnings: Vec<OperationWarning>,
    /// Unresolved conflicts, for caller-side resolution
    pub conflicts: Vec<ConflictItem>,
}

/// Runs the import pipeline
#[derive(Debug, Clone, Default)]
pub struct ImportService {
    validator: DataValidator,
}

/// Mutable state of one import run
struct Report {
    operation_id: OperationId,
    file_name: String,
    format: FileFormat,
    started_at: DateTime<Utc>,
    clock: Instant,
    imported: Vec<ProcessedItem>,
    skipped: Vec<SkippedItem>,
    conflicts: Vec<ConflictItem>,
    errors: Vec<OperationError>,
    warnings: Vec<OperationWarning>,
    backup_id: Option<String>,
}

impl Report {
    fn finish(self) -> ImportResult {
        let duration_ms = self.clock.elapsed().as_millis() as u64;
        ImportResult {
            operation_id: self.operation_id,
            success: self.errors.is_empty(),
            file_name: self.file_name,
            format: self.format,
            stats: OperationStats::from_items(&self.imported, duration_ms),
            imported: self.imported,
            skipped: self.skipped,
            conflicts: self.conflicts,
            errors: self.errors,
            warnings: self.warnings,
            backup_id: self.backup_id,
            started_at: self.started_at,
            finished_at: timestamp::now(),
            duration_ms,
        }
    }
}

impl ImportService {
    pub fn new(validator: DataValidator) -> Self {
        Self { validator }
    }

    /// Run the full pipeline and commit into `source`
    ///
    /// Always returns a result; failures and cancellation are reported in
    /// `errors` with `success == false`.
    pub async fn import(
        &self,
        file: &ImportFile,
        options: &ImportOptions,
        source: &dyn ProjectSource,
        handle: &OperationHandle,
        observer: Option<&dyn ProgressObserver>,
        backup_id: Option<String>,
    ) -> ImportResult {
        let mut report = Report {
            operation_id: handle.id(),
            file_name: file.name.clone(),
            format: file.format(options.format),
            started_at: timestamp::now(),
            clock: Instant::now(),
            imported: Vec::new(),
            skipped: Vec::new(),
            conflicts: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            backup_id,
        };

        if let Err(e) = self.run(file, options, source, handle, observer, &mut report).await {
            match &e {
                ReelError::Cancelled(_) => tracing::info!(operation_id = %handle.id(), "Import cancelled"),
                _ => tracing::warn!(operation_id = %handle.id(), error = %e, "Import failed"),
            }
            // Validation failures have already recorded their field errors
            if report.errors.is_empty() {
                report.errors.push(OperationError::from(&e));
            }
        }

        report.finish()
    }

    async fn run(
        &self,
        file: &ImportFile,
        options: &ImportOptions,
        source: &dyn ProjectSource,
        handle: &OperationHandle,
        observer: Option<&dyn ProgressObserver>,
        report: &mut Report,
    ) -> ReelResult<()> {
        let format = report.format;
        stage(handle, observer, ImportStage::Initializing, format!("Importing {}", file.name)).await?;

        stage(handle, observer, ImportStage::ReadingFile, "Reading file").await?;
        if file.content.is_empty() {
            return Err(ReelError::File(format!("{} is empty", file.name)));
        }
        report
            .warnings
            .extend(self.validator.validate_file_size(file.content.len() as u64));

        stage(handle, observer, ImportStage::ParsingData, format!("Parsing {}", format)).await?;
        let payload = formats::parse(&file.content, format, &options.parse)?;
        tracing::debug!(
            operation_id = %handle.id(),
            format = %format,
            data_type = %payload.declared_type(),
            "Parsed import payload"
        );

        stage(handle, observer, ImportStage::Validating, "Validating data").await?;
        if options.validate {
            let (target, data_type) = validation_target(&payload);
            let validation = self.validator.validate(&target, data_type);
            report.warnings.extend(validation.warnings);
            if !validation.valid {
                let count = validation.errors.len();
                report.errors.extend(validation.errors);
                return Err(ReelError::Validation(format!("{} validation error(s)", count)));
            }
        }
        let incoming = payload.into_partial(format)?;

        stage(handle, observer, ImportStage::DetectingConflicts, "Detecting conflicts").await?;
        let existing = source.current()?;
        let mut conflicts = detect_conflicts(&incoming, existing.as_ref());

        let resolved = if conflicts.is_empty() {
            ResolvedData::default()
        } else {
            stage(
                handle,
                observer,
                ImportStage::ResolvingConflicts,
                format!("Resolving {} conflict(s) with {}", conflicts.len(), options.strategy),
            )
            .await?;
            resolve_conflicts(&mut conflicts, options.strategy)
        };
        report.warnings.extend(
            resolved
                .notes
                .iter()
                .map(|note| OperationWarning::new("conflicts", note.clone())),
        );

        stage(handle, observer, ImportStage::Importing, "Committing project").await?;
        let commit = build_commit(incoming, existing, resolved, &conflicts, file);
        source.commit(commit.project)?;
        report.imported = commit.imported;
        report.skipped = commit.skipped;
        report.conflicts = conflicts;

        // Committed: past the last checkpoint
        announce(handle, observer, ImportStage::Completed, "Import completed");
        tracing::info!(
            operation_id = %handle.id(),
            file = %file.name,
            imported = report.imported.len(),
            conflicts = report.conflicts.len(),
            "Import completed"
        );
        Ok(())
    }

    /// Parse, validate and detect conflicts without committing
    pub fn preview(&self, file: &ImportFile, options: &ImportOptions, source: &dyn ProjectSource) -> PreviewResult {
        let format = file.format(options.format);
        let mut preview = PreviewResult {
            valid: false,
            format,
            data_type: None,
            snapshot_count: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            conflicts: Vec::new(),
        };

        if let Err(e) = self.run_preview(file, options, source, &mut preview) {
            preview.errors.push(OperationError::from(&e));
        }
        preview.valid = preview.errors.is_empty();
        preview
    }

    fn run_preview(
        &self,
        file: &ImportFile,
        options: &ImportOptions,
        source: &dyn ProjectSource,
        preview: &mut PreviewResult,
    ) -> ReelResult<()> {
        preview
            .warnings
            .extend(self.validator.validate_file_size(file.content.len() as u64));

        let payload = formats::parse(&file.content, preview.format, &options.parse)?;
        preview.data_type = Some(payload.declared_type());
        preview.snapshot_count = payload.snapshot_count();

        let (target, data_type) = validation_target(&payload);
        let validation = self.validator.validate(&target, data_type);
        preview.warnings.extend(validation.warnings);
        preview.errors.extend(validation.errors);
        if !preview.errors.is_empty() {
            return Ok(());
        }

        let incoming = payload.into_partial(preview.format)?;
        let existing = source.current()?;
        preview.conflicts = detect_conflicts(&incoming, existing.as_ref());
        Ok(())
    }
}

/// Checkpoint, then announce the stage
async fn stage(
    handle: &OperationHandle,
    observer: Option<&dyn ProgressObserver>,
    stage: ImportStage,
    message: impl Into<String>,
) -> ReelResult<()> {
    handle.checkpoint().await?;
    announce(handle, observer, stage, message);
    Ok(())
}

fn announce(
    handle: &OperationHandle,
    observer: Option<&dyn ProgressObserver>,
    stage: ImportStage,
    message: impl Into<String>,
) {
    let event = ProgressEvent::import(handle.id(), stage, message);
    tracing::debug!(operation_id = %handle.id(), stage = %stage, "{}", event.message);
    if let Some(observer) = observer {
        observer.on_progress(&event);
    }
}

/// The value and type the validator should check
///
/// A project envelope without metadata (an export with metadata excluded)
/// is checked as a bare document.
fn validation_target(payload: &ParsedPayload) -> (Value, DataType) {
    if let ParsedPayload::Project(value) = payload {
        if value.get("metadata").map_or(true, Value::is_null) {
            if let Some(document) = value.get("document") {
                return (document.clone(), DataType::Document);
            }
        }
    }
    (payload.to_value(), payload.declared_type())
}

/// The project to commit plus what happened to each incoming entity
struct Commit {
    project: ProjectData,
    imported: Vec<ProcessedItem>,
    skipped: Vec<SkippedItem>,
}

/// Combine incoming data, the current project and resolved conflicts
///
/// Metadata and document settings come from the resolution when there was a
/// conflict, else from the current project, else from the file. Snapshots,
/// themes and presets start from the current project; resolved values
/// replace entries with the same id and new entries are appended.
fn build_commit(
    incoming: PartialProject,
    existing: Option<ProjectData>,
    resolved: ResolvedData,
    conflicts: &[ConflictItem],
    file: &ImportFile,
) -> Commit {
    let mut imported = Vec::new();
    let mut skipped = Vec::new();

    // Outcome of every conflict, keyed by incoming entity
    let mut conflicted: HashSet<(DataType, String)> = HashSet::new();
    for conflict in conflicts {
        conflicted.insert((conflict.entity_type, conflict.id.clone()));
        let Some(resolution) = &conflict.resolution else {
            continue;
        };
        if resolution.value == conflict.existing {
            skipped.push(SkippedItem {
                data_type: conflict.entity_type,
                id: conflict.id.clone(),
                reason: resolution
                    .note
                    .clone()
                    .unwrap_or_else(|| format!("kept existing ({})", resolution.strategy)),
            });
        } else {
            imported.push(processed(&resolution.value));
        }
    }
    let is_conflicted = |data_type: DataType, id: &str| conflicted.contains(&(data_type, id.to_string()));

    let incoming_snapshots = incoming.snapshots().to_vec();
    let had_incoming_document = incoming.document.is_some();

    let (mut project, base_snapshots) = match existing {
        Some(current) => {
            let mut project = current.clone();
            if let Some(metadata) = resolved.metadata {
                project.metadata = metadata;
            } else if let Some(metadata) = &incoming.metadata {
                if metadata.id == current.metadata.id {
                    imported.push(ProcessedItem::named(DataType::Project, &metadata.id, &metadata.name));
                } else {
                    skipped.push(SkippedItem {
                        data_type: DataType::Project,
                        id: metadata.id.clone(),
                        reason: format!("a different project ({}) is open", current.metadata.id),
                    });
                }
            }
            if let Some(document) = resolved.document {
                project.document = document;
            } else if had_incoming_document {
                imported.push(ProcessedItem::new(DataType::Document, &project.metadata.id));
            }
            (project, current.document.snapshots)
        }
        None => {
            let metadata = incoming
                .metadata
                .clone()
                .unwrap_or_else(|| ProjectMetadata::new(file.stem()));
            imported.push(ProcessedItem::named(DataType::Project, &metadata.id, &metadata.name));
            let document = incoming.document.clone().unwrap_or_default();
            imported.push(ProcessedItem::new(DataType::Document, &metadata.id));
            (ProjectData::new(metadata, Document { snapshots: Vec::new(), ..document }), Vec::new())
        }
    };

    // Snapshots
    let mut snapshots = base_snapshots;
    for snapshot in resolved.snapshots {
        upsert(&mut snapshots, snapshot);
    }
    for snapshot in incoming_snapshots {
        if is_conflicted(DataType::Snapshots, &snapshot.id) {
            continue;
        }
        if snapshots.iter().all(|s| s.id != snapshot.id) {
            imported.push(ProcessedItem::new(DataType::Snapshots, &snapshot.id));
            snapshots.push(snapshot);
        }
    }
    project.document.snapshots = snapshots;

    // Themes and presets
    let mut themes = project.themes.take().unwrap_or_default();
    for theme in resolved.themes {
        upsert(&mut themes, theme);
    }
    for theme in incoming.themes.unwrap_or_default() {
        if !is_conflicted(DataType::Themes, &theme.id) && themes.iter().all(|t| t.id != theme.id) {
            imported.push(ProcessedItem::named(DataType::Themes, &theme.id, &theme.name));
            themes.push(theme);
        }
    }
    project.themes = (!themes.is_empty()).then_some(themes);

    let mut presets = project.presets.take().unwrap_or_default();
    for preset in resolved.presets {
        upsert(&mut presets, preset);
    }
    for preset in incoming.presets.unwrap_or_default() {
        if !is_conflicted(DataType::Presets, &preset.id) && presets.iter().all(|p| p.id != preset.id) {
            imported.push(ProcessedItem::named(DataType::Presets, &preset.id, &preset.name));
            presets.push(preset);
        }
    }
    project.presets = (!presets.is_empty()).then_some(presets);

    if incoming.export_settings.is_some() {
        project.export_settings = incoming.export_settings;
    }
    if incoming.version_history.is_some() {
        project.version_history = incoming.version_history;
    }

    project.metadata.file_size = file.content.len() as u64;
    project.metadata.updated_at = timestamp::now();
    project.refresh_derived();

    Commit {
        project,
        imported,
        skipped,
    }
}

/// Replace the entry with the same id, or append
fn upsert<T: Keyed>(items: &mut Vec<T>, item: T) {
    match items.iter_mut().find(|existing| existing.key() == item.key()) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

fn processed(value: &EntityValue) -> ProcessedItem {
    match value {
        EntityValue::Metadata(m) => ProcessedItem::named(DataType::Project, &m.id, &m.name),
        EntityValue::Theme(t) => ProcessedItem::named(DataType::Themes, &t.id, &t.name),
        EntityValue::Preset(p) => ProcessedItem::named(DataType::Presets, &p.id, &p.name),
        other => ProcessedItem::new(other.data_type(), other.id()),
    }
}
