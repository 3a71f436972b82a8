//! CLI command handlers for importing project files
//!
//! `import` commits files into the current project; `preview` runs the same
//! checks against the current project without committing; `validate` checks
//! a file on its own.

use std::path::{Path, PathBuf};

use clap::Args;

use super::{print_errors, print_warnings};
use crate::config::settings::Settings;
use crate::error::{ReelError, ReelResult};
use crate::models::{DataType, FileFormat, ImportResult, ResolutionStrategy};
use crate::services::{
    process_in_chunks, retry_with_backoff, ImportFile, ImportOptions, ImportService,
    PreviewResult, ProjectManager, RetryConfig,
};
use crate::storage::SharedProject;
use crate::validation::DataValidator;

/// Files read concurrently at a time
const READ_CHUNK_SIZE: usize = 4;

/// Arguments of the import command
#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Files to import, committed in order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Input format (detected from the file name if omitted)
    #[arg(short, long)]
    pub format: Option<FileFormat>,

    /// Conflict resolution strategy (overwrite, skip, merge, create-new)
    #[arg(short, long)]
    pub strategy: Option<ResolutionStrategy>,

    /// Do not back up the current project first
    #[arg(long)]
    pub no_backup: bool,

    /// Skip structural validation
    #[arg(long)]
    pub no_validate: bool,
}

impl ImportArgs {
    fn options(&self, settings: &Settings) -> ImportOptions {
        ImportOptions {
            format: self.format,
            strategy: self.strategy.unwrap_or(settings.default_strategy),
            validate: !self.no_validate,
            create_backup: !self.no_backup && settings.create_backup_before_import,
            ..Default::default()
        }
    }
}

/// Read every file, retrying transient failures
async fn read_files(paths: &[PathBuf]) -> ReelResult<Vec<ImportFile>> {
    let retry = RetryConfig::default();
    let reads = process_in_chunks(
        paths.to_vec(),
        READ_CHUNK_SIZE,
        |path: PathBuf| {
            let retry = retry.clone();
            async move {
                if !path.exists() {
                    return Err(ReelError::Import(format!("File not found: {}", path.display())));
                }
                retry_with_backoff(&retry, || ImportFile::from_path(&path)).await
            }
        },
        |done, total| tracing::debug!(done, total, "Read import files"),
    )
    .await;

    reads.into_iter().collect()
}

async fn read_file(path: &Path) -> ReelResult<ImportFile> {
    let mut files = read_files(&[path.to_path_buf()]).await?;
    files
        .pop()
        .ok_or_else(|| ReelError::Import(format!("File not found: {}", path.display())))
}

/// Handle the import command
pub async fn handle_import_command(
    manager: &ProjectManager,
    settings: &Settings,
    args: ImportArgs,
) -> ReelResult<()> {
    let mut files = read_files(&args.files).await?;
    let options = args.options(settings);

    let results = if files.len() == 1 {
        vec![manager.import_file(files.remove(0), options).await?]
    } else {
        manager.import_batch(files, options).await
    };

    let mut failed = 0;
    for (i, result) in results.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print_import_result(result);
        if !result.success {
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(ReelError::Import(format!(
            "{} of {} file(s) failed to import",
            failed,
            results.len()
        )));
    }
    Ok(())
}

fn print_import_result(result: &ImportResult) {
    let title = format!("Import of '{}'", result.file_name);
    println!("{}", title);
    println!("{}", "=".repeat(title.len()));
    println!("Operation: {}", result.operation_id);
    println!("Format:    {}", result.format);
    println!(
        "Status:    {}",
        if result.was_cancelled() {
            "Cancelled"
        } else if result.success {
            "Success"
        } else {
            "Failed"
        }
    );
    if let Some(backup_id) = &result.backup_id {
        println!("Backup:    {}", backup_id);
    }
    println!("Duration:  {} ms", result.duration_ms);
    println!();
    println!("  Imported:  {}", result.imported.len());
    for data_type in [
        DataType::Project,
        DataType::Document,
        DataType::Snapshots,
        DataType::Themes,
        DataType::Presets,
    ] {
        let count = result.stats.count(data_type);
        if count > 0 {
            println!("    {:<10} {}", format!("{}:", data_type), count);
        }
    }
    println!("  Skipped:   {}", result.skipped.len());
    println!("  Conflicts: {}", result.conflicts.len());

    if !result.skipped.is_empty() {
        println!();
        println!("Skipped:");
        for item in &result.skipped {
            println!("  - {} {}: {}", item.data_type, item.id, item.reason);
        }
    }

    print_errors(&result.errors);
    print_warnings(&result.warnings);
}

/// Handle the preview command
pub async fn handle_preview_command(
    manager: &ProjectManager,
    settings: &Settings,
    file: PathBuf,
    format: Option<FileFormat>,
) -> ReelResult<()> {
    let file = read_file(&file).await?;
    let options = ImportOptions {
        format,
        strategy: settings.default_strategy,
        ..Default::default()
    };
    let preview = manager.preview_import(&file, &options).await;

    print_preview(&file.name, &preview);
    if !preview.conflicts.is_empty() {
        println!();
        println!("Conflicts with the current project:");
        for conflict in &preview.conflicts {
            let fields: Vec<&str> = conflict.differences.iter().map(|d| d.field.as_str()).collect();
            println!(
                "  - {} {} ({} field(s) differ: {})",
                conflict.entity_type,
                conflict.id,
                fields.len(),
                fields.join(", ")
            );
        }
    }

    if preview.valid {
        Ok(())
    } else {
        Err(ReelError::Validation(format!("{} is not a valid project file", file.name)))
    }
}

/// Handle the validate command
///
/// Checks the file against the validation limits only; the current project
/// is not consulted.
pub async fn handle_validate_command(
    settings: &Settings,
    file: PathBuf,
    format: Option<FileFormat>,
) -> ReelResult<()> {
    let file = read_file(&file).await?;
    let options = ImportOptions {
        format,
        ..Default::default()
    };
    let service = ImportService::new(DataValidator::new(settings.validation_limits.clone()));
    let preview = service.preview(&file, &options, &SharedProject::new());

    print_preview(&file.name, &preview);
    if preview.valid {
        println!();
        println!("{} is valid.", file.name);
        Ok(())
    } else {
        Err(ReelError::Validation(format!("{} is not a valid project file", file.name)))
    }
}

fn print_preview(name: &str, preview: &PreviewResult) {
    let title = format!("Preview of '{}'", name);
    println!("{}", title);
    println!("{}", "=".repeat(title.len()));
    println!("Format:    {}", preview.format);
    println!(
        "Data type: {}",
        preview
            .data_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    );
    println!("Snapshots: {}", preview.snapshot_count);
    println!("Valid:     {}", if preview.valid { "Yes" } else { "No" });

    print_errors(&preview.errors);
    print_warnings(&preview.warnings);
}
