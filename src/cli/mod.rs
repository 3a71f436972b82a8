//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod backup;
pub mod export;
pub mod history;
pub mod import;
pub mod template;

pub use backup::{handle_backup_command, BackupCommands};
pub use export::{handle_export_command, ExportArgs};
pub use history::{handle_history_command, HistoryCommands};
pub use import::{
    handle_import_command, handle_preview_command, handle_validate_command, ImportArgs,
};
pub use template::{handle_template_command, TemplateCommands};

use std::sync::Arc;

use crate::config::{paths::ReelPaths, settings::Settings};
use crate::error::ReelResult;
use crate::models::{OperationError, OperationWarning};
use crate::services::{ProgressEvent, ProjectManager};
use crate::storage::{FileStore, KeyValueStore, StoredProject};

/// Open the workspace under `paths` and build a manager over it
pub fn open_manager(paths: &ReelPaths, settings: &Settings) -> ReelResult<ProjectManager> {
    paths.ensure_directories()?;
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(paths.store_dir()));
    let source = Arc::new(StoredProject::new(store.clone()));

    let manager = ProjectManager::new(store, source, settings).with_observer(Arc::new(
        |event: &ProgressEvent| {
            tracing::debug!(
                operation_id = %event.operation_id,
                stage = %event.stage,
                percentage = event.percentage,
                "{}",
                event.message
            );
        },
    ));
    Ok(manager)
}

fn print_errors(errors: &[OperationError]) {
    if errors.is_empty() {
        return;
    }
    println!();
    println!("Errors:");
    for error in errors {
        match &error.field {
            Some(field) => println!("  - {}: {}", field, error.message),
            None => println!("  - {}", error.message),
        }
    }
}

fn print_warnings(warnings: &[OperationWarning]) {
    if warnings.is_empty() {
        return;
    }
    println!();
    println!("Warnings:");
    for warning in warnings {
        println!("  - {}: {}", warning.field, warning.message);
    }
}

/// Format a byte count for display
pub(crate) fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
