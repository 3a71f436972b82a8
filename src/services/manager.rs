//! The project import/export orchestrator
//!
//! `ProjectManager` is the context object callers construct once and keep:
//! it owns the import and export registries, both histories, the backup
//! manager and the template store, all over one key-value store.

use std::sync::Arc;

use super::export::{ExportOptions, ExportService};
use super::history::OperationHistory;
use super::import::{ImportFile, ImportOptions, ImportService, PreviewResult};
use super::operations::OperationRegistry;
use super::progress::ProgressObserver;
use super::templates::TemplateStore;
use crate::backup::{BackupItem, BackupManager, BackupReason};
use crate::config::Settings;
use crate::error::{ReelError, ReelResult};
use crate::models::{
    timestamp, ExportResult, ImportResult, OperationError, OperationId, OperationStats, ProjectData,
};
use crate::storage::{KeyValueStore, ProjectSource, EXPORT_HISTORY_KEY, IMPORT_HISTORY_KEY};
use crate::validation::DataValidator;

/// Orchestrates imports, exports and backups of one project
pub struct ProjectManager {
    source: Arc<dyn ProjectSource>,
    backups: BackupManager,
    templates: TemplateStore,
    importer: ImportService,
    exporter: ExportService,
    imports: OperationRegistry,
    exports: OperationRegistry,
    import_history: OperationHistory<ImportResult>,
    export_history: OperationHistory<ExportResult>,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl ProjectManager {
    /// Create a manager over `store`, committing imports into `source`
    pub fn new(store: Arc<dyn KeyValueStore>, source: Arc<dyn ProjectSource>, settings: &Settings) -> Self {
        let backups = BackupManager::new(
            store.clone(),
            settings.backup_retention.clone(),
            settings.compress_backups,
        )
        .with_source(source.clone());

        Self {
            source,
            backups,
            templates: TemplateStore::new(store.clone()),
            importer: ImportService::new(DataValidator::new(settings.validation_limits.clone())),
            exporter: ExportService::new(),
            imports: OperationRegistry::new("import"),
            exports: OperationRegistry::new("export"),
            import_history: OperationHistory::new(store.clone(), IMPORT_HISTORY_KEY),
            export_history: OperationHistory::new(store, EXPORT_HISTORY_KEY),
            observer: None,
        }
    }

    /// Send progress events of every operation to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// The current project
    pub fn current_project(&self) -> ReelResult<Option<ProjectData>> {
        self.source.current()
    }

    // -- import -------------------------------------------------------------

    /// Import one file into the current project
    ///
    /// Fails only when `options.operation_id` names an import that is
    /// already running; every other failure is reported in the result.
    pub async fn import_file(&self, file: ImportFile, options: ImportOptions) -> ReelResult<ImportResult> {
        let handle = self.imports.begin(options.operation_id.unwrap_or_default())?;
        tracing::info!(operation_id = %handle.id(), file = %file.name, "Starting import");

        let result = match self.pre_import_backup(&options) {
            Ok(backup_id) => {
                self.importer
                    .import(
                        &file,
                        &options,
                        self.source.as_ref(),
                        &handle,
                        self.observer.as_deref(),
                        backup_id,
                    )
                    .await
            }
            Err(e) => {
                tracing::error!(operation_id = %handle.id(), error = %e, "Pre-import backup failed");
                failed_import(handle.id(), &file, &options, &e)
            }
        };

        self.record_import(&result);
        Ok(result)
    }

    /// Import several files, one after another
    ///
    /// One result per file; a failing file never aborts the batch.
    pub async fn import_batch(&self, files: Vec<ImportFile>, options: ImportOptions) -> Vec<ImportResult> {
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let per_file = ImportOptions {
                operation_id: None,
                ..options.clone()
            };
            let result = match self.import_file(file.clone(), per_file.clone()).await {
                Ok(result) => result,
                Err(e) => failed_import(OperationId::new(), &file, &per_file, &e),
            };
            results.push(result);
        }
        results
    }

    /// Parse, validate and detect conflicts without committing
    pub async fn preview_import(&self, file: &ImportFile, options: &ImportOptions) -> PreviewResult {
        tokio::task::yield_now().await;
        self.importer.preview(file, options, self.source.as_ref())
    }

    fn pre_import_backup(&self, options: &ImportOptions) -> ReelResult<Option<String>> {
        if !options.create_backup {
            return Ok(None);
        }
        match self.source.current()? {
            Some(current) => {
                let item = self.backups.create_backup(BackupReason::BeforeImport, Some(&current))?;
                Ok(Some(item.id))
            }
            None => Ok(None),
        }
    }

    fn record_import(&self, result: &ImportResult) {
        if let Err(e) = self.import_history.append(result) {
            tracing::warn!(operation_id = %result.operation_id, error = %e, "Failed to record import history");
        }
    }

    // -- export -------------------------------------------------------------

    /// Export the current project
    pub async fn export_project(&self, options: ExportOptions) -> ReelResult<ExportResult> {
        let handle = self.exports.begin(options.operation_id.unwrap_or_default())?;
        let project = match self.source.current() {
            Ok(project) => project,
            Err(e) => {
                let result = failed_export(handle.id(), &options, &e);
                self.record_export(&result);
                return Ok(result);
            }
        };

        let result = self
            .exporter
            .export(project, &options, &handle, self.observer.as_deref())
            .await;
        self.record_export(&result);
        Ok(result)
    }

    /// Export the current project with a saved template's options
    pub async fn export_with_template(&self, template: &str) -> ReelResult<ExportResult> {
        let template = self.templates.get(template)?;
        self.export_project(template.options).await
    }

    /// Export several projects, one after another
    pub async fn export_batch(&self, projects: Vec<ProjectData>, options: ExportOptions) -> Vec<ExportResult> {
        let mut results = Vec::with_capacity(projects.len());
        for project in projects {
            let result = match self.exports.begin(OperationId::new()) {
                Ok(handle) => {
                    self.exporter
                        .export(Some(project), &options, &handle, self.observer.as_deref())
                        .await
                }
                Err(e) => failed_export(OperationId::new(), &options, &e),
            };
            self.record_export(&result);
            results.push(result);
        }
        results
    }

    fn record_export(&self, result: &ExportResult) {
        if let Err(e) = self.export_history.append(result) {
            tracing::warn!(operation_id = %result.operation_id, error = %e, "Failed to record export history");
        }
    }

    // -- operations ---------------------------------------------------------

    /// Request cancellation of a running import
    pub fn cancel_import(&self, id: &OperationId) -> bool {
        self.imports.cancel(id)
    }

    /// Request cancellation of a running export
    pub fn cancel_export(&self, id: &OperationId) -> bool {
        self.exports.cancel(id)
    }

    pub fn active_imports(&self) -> Vec<OperationId> {
        self.imports.active_ids()
    }

    pub fn active_exports(&self) -> Vec<OperationId> {
        self.exports.active_ids()
    }

    /// Import history, newest first
    pub fn import_history(&self) -> Vec<ImportResult> {
        self.import_history.list()
    }

    /// Export history, newest first
    pub fn export_history(&self) -> Vec<ExportResult> {
        self.export_history.list()
    }

    pub fn clear_history(&self) -> ReelResult<()> {
        self.import_history.clear()?;
        self.export_history.clear()
    }

    // -- backups ------------------------------------------------------------

    /// Back up the current project
    pub async fn create_backup(&self, reason: BackupReason, notes: Option<String>) -> ReelResult<BackupItem> {
        tokio::task::yield_now().await;
        self.backups.create_backup_with_notes(reason, None, notes)
    }

    /// Restore a backup and make it the current project
    pub async fn restore_backup(&self, id: &str) -> ReelResult<ProjectData> {
        tokio::task::yield_now().await;
        let project = self.backups.restore(id)?;
        self.source.commit(project.clone())?;
        Ok(project)
    }

    /// Take an automatic backup when one is due
    pub async fn create_auto_backup_if_needed(&self) -> ReelResult<Option<BackupItem>> {
        tokio::task::yield_now().await;
        if self.source.current()?.is_none() {
            return Ok(None);
        }
        self.backups.create_auto_backup_if_needed()
    }
}

fn failed_import(id: OperationId, file: &ImportFile, options: &ImportOptions, err: &ReelError) -> ImportResult {
    let now = timestamp::now();
    ImportResult {
        operation_id: id,
        success: false,
        file_name: file.name.clone(),
        format: file.format(options.format),
        imported: Vec::new(),
        skipped: Vec::new(),
        conflicts: Vec::new(),
        errors: vec![OperationError::from(err)],
        warnings: Vec::new(),
        stats: OperationStats::default(),
        backup_id: None,
        started_at: now,
        finished_at: now,
        duration_ms: 0,
    }
}

fn failed_export(id: OperationId, options: &ExportOptions, err: &ReelError) -> ExportResult {
    let now = timestamp::now();
    ExportResult {
        operation_id: id,
        success: false,
        format: options.format,
        file_name: None,
        mime_type: None,
        size: 0,
        data: None,
        exported: Vec::new(),
        errors: vec![OperationError::from(err)],
        warnings: Vec::new(),
        stats: OperationStats::default(),
        started_at: now,
        finished_at: now,
        duration_ms: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataType, Document, FileFormat, ProjectMetadata, Snapshot};
    use crate::services::progress::{ImportStage, ProgressEvent, Stage};
    use crate::storage::{FileStore, MemoryStore, SharedProject, StoredProject};
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn project() -> ProjectData {
        let mut metadata = ProjectMetadata::new("Demo");
        metadata.id = "p1".into();
        let mut project = ProjectData::new(
            metadata,
            Document::with_snapshots(vec![
                Snapshot::new("s1", "const a = 1;", 1000).with_transition_time(200),
                Snapshot::new("s2", "const a = 2;", 1500),
            ]),
        );
        project.refresh_derived();
        project
    }

    fn create_test_manager() -> (ProjectManager, Arc<SharedProject>) {
        let source = Arc::new(SharedProject::new());
        let manager = ProjectManager::new(Arc::new(MemoryStore::new()), source.clone(), &Settings::default());
        (manager, source)
    }

    #[tokio::test]
    async fn test_export_then_import_round_trip() {
        let (manager, source) = create_test_manager();
        source.commit(project()).unwrap();

        for format in [FileFormat::Json, FileFormat::Yaml, FileFormat::Xml, FileFormat::Zip] {
            let export = manager
                .export_project(ExportOptions {
                    format,
                    ..Default::default()
                })
                .await
                .unwrap();
            assert!(export.success, "{}: {:?}", format, export.errors);

            let (target, target_source) = create_test_manager();
            let file = ImportFile::new(export.file_name.unwrap(), export.data.unwrap());
            let result = target.import_file(file, ImportOptions::default()).await.unwrap();
            assert!(result.success, "{}: {:?}", format, result.errors);

            let imported = target_source.current().unwrap().unwrap();
            assert_eq!(imported.metadata.id, "p1");
            assert_eq!(imported.document.snapshots, project().document.snapshots);
        }
    }

    #[tokio::test]
    async fn test_pre_import_backup() {
        let (manager, source) = create_test_manager();

        let file = ImportFile::new("demo.json", serde_json::to_vec(&project()).unwrap());
        let first = manager.import_file(file.clone(), ImportOptions::default()).await.unwrap();
        assert!(first.backup_id.is_none());
        assert!(manager.backups().list_backups().is_empty());

        let mut changed = project();
        changed.document.snapshots[0].code = "const a = 42;".into();
        let file = ImportFile::new("demo.json", serde_json::to_vec(&changed).unwrap());
        let second = manager
            .import_file(
                file,
                ImportOptions {
                    strategy: crate::models::ResolutionStrategy::Overwrite,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(second.success);

        let backup_id = second.backup_id.unwrap();
        let backup = manager.backups().get_backup(&backup_id).unwrap();
        assert_eq!(backup.reason, BackupReason::BeforeImport);

        // Restoring the backup brings the old code back
        assert_eq!(source.current().unwrap().unwrap().document.snapshots[0].code, "const a = 42;");
        let restored = manager.restore_backup(&backup_id).await.unwrap();
        assert_eq!(restored.document.snapshots[0].code, "const a = 1;");
        assert_eq!(source.current().unwrap().unwrap().document.snapshots[0].code, "const a = 1;");
    }

    #[tokio::test]
    async fn test_histories_are_independent_and_newest_first() {
        let (manager, source) = create_test_manager();
        source.commit(project()).unwrap();

        manager.export_project(ExportOptions::default()).await.unwrap();
        let broken = ImportFile::new("broken.json", "{");
        manager.import_file(broken.clone(), ImportOptions::default()).await.unwrap();
        manager.import_file(broken, ImportOptions::default()).await.unwrap();

        assert_eq!(manager.export_history().len(), 1);
        let imports = manager.import_history();
        assert_eq!(imports.len(), 2);
        assert!(imports[0].started_at >= imports[1].started_at);
        assert!(imports.iter().all(|r| !r.success));

        manager.clear_history().unwrap();
        assert!(manager.import_history().is_empty());
    }

    #[tokio::test]
    async fn test_batch_import_collects_failures() {
        let (manager, _source) = create_test_manager();
        let files = vec![
            ImportFile::new("good.json", serde_json::to_vec(&project()).unwrap()),
            ImportFile::new("bad.csv", "id,code\n"),
        ];
        let results = manager.import_batch(files, ImportOptions::default()).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert_ne!(results[0].operation_id, results[1].operation_id);
    }

    #[tokio::test]
    async fn test_batch_export() {
        let (manager, _source) = create_test_manager();
        let mut other = project();
        other.metadata.id = "p2".into();
        let results = manager
            .export_batch(vec![project(), other], ExportOptions::default())
            .await;
        assert!(results.iter().all(|r| r.success));
        assert_eq!(manager.export_history().len(), 2);
        assert!(manager.active_exports().is_empty());
    }

    #[tokio::test]
    async fn test_operation_already_in_progress() {
        let (manager, _source) = create_test_manager();
        let id = OperationId::new();
        let _running = manager.imports.begin(id).unwrap();

        let options = ImportOptions {
            operation_id: Some(id),
            ..Default::default()
        };
        let err = manager
            .import_file(ImportFile::new("a.json", "{}"), options)
            .await
            .unwrap_err();
        assert!(matches!(err, ReelError::OperationInProgress(_)));
        assert!(manager.import_history().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_running_import() {
        let slot: Arc<Mutex<Option<Arc<ProjectManager>>>> = Arc::new(Mutex::new(None));
        let observer_slot = slot.clone();
        let source = Arc::new(SharedProject::new());
        let manager = Arc::new(
            ProjectManager::new(Arc::new(MemoryStore::new()), source.clone(), &Settings::default())
                .with_observer(Arc::new(move |event: &ProgressEvent| {
                    if event.stage != Stage::Import(ImportStage::Validating) {
                        return;
                    }
                    if let Some(manager) = observer_slot.lock().unwrap().as_ref() {
                        assert_eq!(manager.active_imports(), vec![event.operation_id]);
                        assert!(manager.cancel_import(&event.operation_id));
                    }
                })),
        );
        *slot.lock().unwrap() = Some(manager.clone());

        let file = ImportFile::new("demo.json", serde_json::to_vec(&project()).unwrap());
        let result = manager.import_file(file, ImportOptions::default()).await.unwrap();

        assert!(result.was_cancelled());
        assert!(source.current().unwrap().is_none());
        assert!(manager.active_imports().is_empty());
        assert!(!manager.cancel_import(&result.operation_id));
        assert!(!manager.cancel_export(&OperationId::new()));
        slot.lock().unwrap().take();
    }

    #[tokio::test]
    async fn test_observer_receives_events() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let seen = events.clone();
        let source = Arc::new(SharedProject::with_project(project()));
        let manager = ProjectManager::new(Arc::new(MemoryStore::new()), source, &Settings::default())
            .with_observer(Arc::new(move |event: &ProgressEvent| {
                seen.lock().unwrap().push(event.percentage)
            }));

        manager.export_project(ExportOptions::default()).await.unwrap();
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 6);
        assert_eq!(events.last().copied(), Some(100.0));
    }

    #[tokio::test]
    async fn test_templates_drive_exports() {
        let (manager, source) = create_test_manager();
        source.commit(project()).unwrap();
        manager
            .templates()
            .save(
                "csv",
                None,
                ExportOptions {
                    format: FileFormat::Csv,
                    ..Default::default()
                },
            )
            .unwrap();

        let result = manager.export_with_template("csv").await.unwrap();
        assert_eq!(result.format, FileFormat::Csv);
        assert_eq!(result.stats.count(DataType::Snapshots), 2);
        assert!(manager.export_with_template("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_preview_and_file_backed_store() {
        let temp_dir = TempDir::new().unwrap();
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(temp_dir.path().join("store")));
        let source = Arc::new(StoredProject::new(store.clone()));
        let manager = ProjectManager::new(store.clone(), source, &Settings::default());

        let file = ImportFile::new("demo.json", serde_json::to_vec(&project()).unwrap());
        let preview = manager.preview_import(&file, &ImportOptions::default()).await;
        assert!(preview.valid);
        assert!(manager.current_project().unwrap().is_none());

        manager.import_file(file, ImportOptions::default()).await.unwrap();
        let reopened = ProjectManager::new(store.clone(), Arc::new(StoredProject::new(store)), &Settings::default());
        assert_eq!(reopened.current_project().unwrap().unwrap().metadata.id, "p1");
        assert_eq!(reopened.import_history().len(), 1);
    }

    #[tokio::test]
    async fn test_auto_backup_needs_a_project() {
        let (manager, source) = create_test_manager();
        assert!(manager.create_auto_backup_if_needed().await.unwrap().is_none());

        source.commit(project()).unwrap();
        assert!(manager.create_auto_backup_if_needed().await.unwrap().is_some());
        assert!(manager.create_auto_backup_if_needed().await.unwrap().is_none());

        let manual = manager
            .create_backup(BackupReason::Manual, Some("before refactor".into()))
            .await
            .unwrap();
        assert_eq!(manual.notes.as_deref(), Some("before refactor"));
    }
}
