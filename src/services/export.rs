//! Export pipeline
//!
//! Collects a project, keeps the sections the caller asked for, serializes
//! them and names the output file.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::operations::OperationHandle;
use super::progress::{ExportStage, ProgressEvent, ProgressObserver};
use crate::error::{ReelError, ReelResult};
use crate::formats::{self, SerializeOptions};
use crate::models::{
    generate_filename, timestamp, DataType, ExportResult, FileFormat, OperationError, OperationId,
    OperationStats, OperationWarning, PartialProject, ProcessedItem, ProjectData,
};
use crate::validation::validate_filename;

/// Prefix of generated file names when none is configured
pub const DEFAULT_FILENAME_PREFIX: &str = "codereel-project";

/// Caller options for one export
///
/// Also the payload of saved export templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    pub format: FileFormat,

    pub include_metadata: bool,
    pub include_themes: bool,
    pub include_presets: bool,
    pub include_export_settings: bool,
    pub include_version_history: bool,

    /// Export only these snapshots, in document order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_ids: Option<Vec<String>>,

    pub pretty: bool,
    pub sort_keys: bool,
    /// Deflate archive members
    pub compress: bool,
    /// Stamp `exportedAt` / `exportVersion` into the output
    pub include_export_info: bool,
    pub csv_delimiter: char,
    pub csv_include_headers: bool,

    /// Prefix of the generated file name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename_prefix: Option<String>,

    /// Caller-chosen operation id, for cancellation
    #[serde(skip)]
    pub operation_id: Option<OperationId>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: FileFormat::Json,
            include_metadata: true,
            include_themes: true,
            include_presets: true,
            include_export_settings: true,
            include_version_history: true,
            snapshot_ids: None,
            pretty: true,
            sort_keys: false,
            compress: true,
            include_export_info: true,
            csv_delimiter: ',',
            csv_include_headers: true,
            filename_prefix: None,
            operation_id: None,
        }
    }
}

impl ExportOptions {
    /// Codec options derived from these export options
    pub fn serialize_options(&self) -> ReelResult<SerializeOptions> {
        if !self.csv_delimiter.is_ascii() {
            return Err(ReelError::Validation(format!(
                "CSV delimiter must be a single ASCII character, got '{}'",
                self.csv_delimiter
            )));
        }
        Ok(SerializeOptions {
            pretty: self.pretty,
            sort_keys: self.sort_keys,
            csv_delimiter: self.csv_delimiter as u8,
            csv_include_headers: self.csv_include_headers,
            compress: self.compress,
            include_export_info: self.include_export_info,
        })
    }

    pub fn filename_prefix(&self) -> &str {
        self.filename_prefix.as_deref().unwrap_or(DEFAULT_FILENAME_PREFIX)
    }
}

/// Runs the export pipeline
#[derive(Debug, Clone, Default)]
pub struct ExportService;

struct Output {
    data: Vec<u8>,
    file_name: String,
    exported: Vec<ProcessedItem>,
}

impl ExportService {
    pub fn new() -> Self {
        Self
    }

    /// Export `project`; always returns a result
    pub async fn export(
        &self,
        project: Option<ProjectData>,
        options: &ExportOptions,
        handle: &OperationHandle,
        observer: Option<&dyn ProgressObserver>,
    ) -> ExportResult {
        let started_at = timestamp::now();
        let clock = Instant::now();
        let mut warnings = Vec::new();

        let outcome = self.run(project, options, handle, observer, &mut warnings).await;
        let duration_ms = clock.elapsed().as_millis() as u64;

        match outcome {
            Ok(output) => {
                tracing::info!(
                    operation_id = %handle.id(),
                    format = %options.format,
                    file = %output.file_name,
                    size = output.data.len(),
                    "Export completed"
                );
                ExportResult {
                    operation_id: handle.id(),
                    success: true,
                    format: options.format,
                    file_name: Some(output.file_name),
                    mime_type: Some(options.format.mime_type().to_string()),
                    size: output.data.len() as u64,
                    data: Some(output.data),
                    stats: OperationStats::from_items(&output.exported, duration_ms),
                    exported: output.exported,
                    errors: Vec::new(),
                    warnings,
                    started_at,
                    finished_at: timestamp::now(),
                    duration_ms,
                }
            }
            Err(e) => {
                match &e {
                    ReelError::Cancelled(_) => tracing::info!(operation_id = %handle.id(), "Export cancelled"),
                    _ => tracing::warn!(operation_id = %handle.id(), error = %e, "Export failed"),
                }
                ExportResult {
                    operation_id: handle.id(),
                    success: false,
                    format: options.format,
                    file_name: None,
                    mime_type: None,
                    size: 0,
                    data: None,
                    exported: Vec::new(),
                    errors: vec![OperationError::from(&e)],
                    warnings,
                    stats: OperationStats::default(),
                    started_at,
                    finished_at: timestamp::now(),
                    duration_ms,
                }
            }
        }
    }

    async fn run(
        &self,
        project: Option<ProjectData>,
        options: &ExportOptions,
        handle: &OperationHandle,
        observer: Option<&dyn ProgressObserver>,
        warnings: &mut Vec<OperationWarning>,
    ) -> ReelResult<Output> {
        stage(handle, observer, ExportStage::Initializing, format!("Exporting {}", options.format)).await?;
        let serialize_options = options.serialize_options()?;
        validate_filename(options.filename_prefix())?;

        stage(handle, observer, ExportStage::CollectingData, "Collecting project data").await?;
        let project = project.ok_or_else(|| ReelError::Export("no project data to export".into()))?;

        stage(handle, observer, ExportStage::Filtering, "Filtering sections").await?;
        let selected = select(project, options, warnings);
        let exported = exported_items(&selected);

        stage(handle, observer, ExportStage::Formatting, format!("Formatting {}", options.format)).await?;
        let data = formats::serialize(&selected, options.format, &serialize_options)?;

        stage(handle, observer, ExportStage::GeneratingFile, "Generating file").await?;
        let file_name = generate_filename(options.filename_prefix(), options.format, timestamp::now());

        let event = ProgressEvent::export(handle.id(), ExportStage::Completed, "Export completed");
        if let Some(observer) = observer {
            observer.on_progress(&event);
        }

        Ok(Output {
            data,
            file_name,
            exported,
        })
    }
}

async fn stage(
    handle: &OperationHandle,
    observer: Option<&dyn ProgressObserver>,
    stage: ExportStage,
    message: impl Into<String>,
) -> ReelResult<()> {
    handle.checkpoint().await?;
    let event = ProgressEvent::export(handle.id(), stage, message);
    tracing::debug!(operation_id = %handle.id(), stage = %stage, "{}", event.message);
    if let Some(observer) = observer {
        observer.on_progress(&event);
    }
    Ok(())
}

/// Keep the sections and snapshots the options ask for
fn select(project: ProjectData, options: &ExportOptions, warnings: &mut Vec<OperationWarning>) -> PartialProject {
    let mut document = project.document;

    if let Some(ids) = &options.snapshot_ids {
        for id in ids {
            if document.snapshot(id).is_none() {
                warnings.push(OperationWarning::new("snapshotIds", format!("Unknown snapshot id: {}", id)));
            }
        }
        document.snapshots.retain(|s| ids.contains(&s.id));
    }

    PartialProject {
        metadata: options.include_metadata.then_some(project.metadata),
        document: Some(document),
        themes: project.themes.filter(|_| options.include_themes),
        presets: project.presets.filter(|_| options.include_presets),
        export_settings: project.export_settings.filter(|_| options.include_export_settings),
        version_history: project.version_history.filter(|_| options.include_version_history),
        backup_info: None,
    }
}

fn exported_items(data: &PartialProject) -> Vec<ProcessedItem> {
    let mut items = Vec::new();
    if let Some(metadata) = &data.metadata {
        items.push(ProcessedItem::named(DataType::Project, &metadata.id, &metadata.name));
    }
    if data.document.is_some() {
        let id = data.metadata.as_ref().map_or("document", |m| m.id.as_str());
        items.push(ProcessedItem::new(DataType::Document, id));
    }
    items.extend(
        data.snapshots()
            .iter()
            .map(|s| ProcessedItem::new(DataType::Snapshots, &s.id)),
    );
    for theme in data.themes.iter().flatten() {
        items.push(ProcessedItem::named(DataType::Themes, &theme.id, &theme.name));
    }
    for preset in data.presets.iter().flatten() {
        items.push(ProcessedItem::named(DataType::Presets, &preset.id, &preset.name));
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::ParseOptions;
    use crate::models::{Document, ProjectMetadata, Snapshot, Theme};
    use crate::services::operations::OperationRegistry;
    use std::collections::BTreeMap;

    fn project() -> ProjectData {
        let mut project = ProjectData::new(
            ProjectMetadata::new("Demo"),
            Document::with_snapshots(vec![
                Snapshot::new("s1", "let a = 1;", 1000),
                Snapshot::new("s2", "let b = 2;", 1500),
                Snapshot::new("s3", "let c = 3;", 2000),
            ]),
        );
        project.themes = Some(vec![Theme {
            id: "t1".into(),
            name: "Dark".into(),
            dark: Some(true),
            colors: BTreeMap::new(),
        }]);
        project
    }

    async fn run(project: Option<ProjectData>, options: &ExportOptions) -> ExportResult {
        let registry = OperationRegistry::new("export");
        let handle = registry.begin(OperationId::new()).unwrap();
        ExportService::new().export(project, options, &handle, None).await
    }

    #[tokio::test]
    async fn test_export_json() {
        let result = run(Some(project()), &ExportOptions::default()).await;
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.mime_type.as_deref(), Some("application/json"));
        assert!(result.file_name.unwrap().starts_with("codereel-project-"));
        assert_eq!(result.stats.count(DataType::Snapshots), 3);
        assert_eq!(result.stats.count(DataType::Themes), 1);

        let data = result.data.unwrap();
        assert_eq!(result.size, data.len() as u64);
        let parsed = formats::parse(&data, FileFormat::Json, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.snapshot_count(), 3);
    }

    #[tokio::test]
    async fn test_section_and_snapshot_selection() {
        let options = ExportOptions {
            include_themes: false,
            include_metadata: false,
            snapshot_ids: Some(vec!["s3".into(), "s1".into(), "zz".into()]),
            ..Default::default()
        };
        let result = run(Some(project()), &options).await;
        assert!(result.success);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.stats.count(DataType::Project), 0);
        assert_eq!(result.stats.count(DataType::Themes), 0);

        let text = String::from_utf8(result.data.unwrap()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value.get("metadata").is_none());
        assert!(value.get("themes").is_none());
        let ids: Vec<&str> = value["document"]["snapshots"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["s1", "s3"]);
    }

    #[tokio::test]
    async fn test_csv_without_snapshots_fails() {
        let options = ExportOptions {
            format: FileFormat::Csv,
            snapshot_ids: Some(Vec::new()),
            ..Default::default()
        };
        let result = run(Some(project()), &options).await;
        assert!(!result.success);
        assert!(result.errors[0].message.contains("No snapshots to export as CSV"));
        assert!(result.data.is_none());
    }

    #[tokio::test]
    async fn test_missing_project_and_bad_prefix() {
        let result = run(None, &ExportOptions::default()).await;
        assert!(result.errors[0].message.contains("no project data to export"));

        let options = ExportOptions {
            filename_prefix: Some("CON".into()),
            ..Default::default()
        };
        let result = run(Some(project()), &options).await;
        assert!(!result.success);
        assert_eq!(result.errors[0].kind, crate::error::ErrorKind::ValidationError);
    }

    #[tokio::test]
    async fn test_zip_export_names_and_mime() {
        let options = ExportOptions {
            format: FileFormat::Zip,
            filename_prefix: Some("reel".into()),
            ..Default::default()
        };
        let result = run(Some(project()), &options).await;
        assert!(result.success);
        assert_eq!(result.mime_type.as_deref(), Some("application/zip"));
        assert!(result.file_name.unwrap().ends_with(".zip"));
    }

    #[test]
    fn test_options_round_trip_through_json() {
        let options = ExportOptions {
            format: FileFormat::Yaml,
            snapshot_ids: Some(vec!["s1".into()]),
            operation_id: Some(OperationId::new()),
            ..Default::default()
        };
        let json = serde_json::to_string(&options).unwrap();
        let back: ExportOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back.format, FileFormat::Yaml);
        assert_eq!(back.snapshot_ids, options.snapshot_ids);
        assert!(back.operation_id.is_none());

        let partial: ExportOptions = serde_json::from_str(r#"{"format": "csv"}"#).unwrap();
        assert!(partial.include_themes);
    }

    #[test]
    fn test_non_ascii_delimiter_is_rejected() {
        let options = ExportOptions {
            csv_delimiter: '§',
            ..Default::default()
        };
        assert!(options.serialize_options().is_err());
    }
}
