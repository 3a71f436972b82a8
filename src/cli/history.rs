//! CLI command handlers for operation history

use clap::Subcommand;

use crate::error::ReelResult;
use crate::services::ProjectManager;

/// History subcommands
#[derive(Subcommand)]
pub enum HistoryCommands {
    /// Show recent imports
    Imports {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },

    /// Show recent exports
    Exports {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },

    /// Clear both histories
    Clear,
}

/// Handle a history command
pub fn handle_history_command(manager: &ProjectManager, cmd: HistoryCommands) -> ReelResult<()> {
    match cmd {
        HistoryCommands::Imports { limit } => {
            let history = manager.import_history();
            if history.is_empty() {
                println!("No imports recorded.");
                return Ok(());
            }

            println!("Import History");
            println!("==============");
            for result in history.iter().take(limit) {
                println!(
                    "  {}  {:<7}  {:<4}  {:>3} imported  {:>3} skipped  {}",
                    result.started_at.format("%Y-%m-%d %H:%M:%S"),
                    status(result.success, result.was_cancelled()),
                    result.format.to_string(),
                    result.imported.len(),
                    result.skipped.len(),
                    result.file_name
                );
            }
            println!();
            println!("Showing {} of {} import(s)", history.len().min(limit), history.len());
        }

        HistoryCommands::Exports { limit } => {
            let history = manager.export_history();
            if history.is_empty() {
                println!("No exports recorded.");
                return Ok(());
            }

            println!("Export History");
            println!("==============");
            for result in history.iter().take(limit) {
                println!(
                    "  {}  {:<7}  {:<4}  {:>3} items  {}",
                    result.started_at.format("%Y-%m-%d %H:%M:%S"),
                    status(result.success, result.was_cancelled()),
                    result.format.to_string(),
                    result.exported.len(),
                    result.file_name.as_deref().unwrap_or("-")
                );
            }
            println!();
            println!("Showing {} of {} export(s)", history.len().min(limit), history.len());
        }

        HistoryCommands::Clear => {
            manager.clear_history()?;
            println!("History cleared.");
        }
    }

    Ok(())
}

fn status(success: bool, cancelled: bool) -> &'static str {
    if cancelled {
        "cancel"
    } else if success {
        "ok"
    } else {
        "failed"
    }
}
