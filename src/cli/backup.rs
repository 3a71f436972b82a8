//! CLI command handlers for backup management

use clap::Subcommand;

use super::format_size;
use crate::backup::{BackupItem, BackupReason};
use crate::error::{ReelError, ReelResult};
use crate::services::ProjectManager;

/// Backup management subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Back up the current project
    Create {
        /// Notes stored with the backup
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List all backups
    List {
        /// Show notes and payload details
        #[arg(short, long)]
        verbose: bool,
    },

    /// Restore a backup as the current project
    Restore {
        /// Backup id
        backup: String,

        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Delete a backup
    Delete {
        /// Backup id
        #[arg(required_unless_present = "all")]
        backup: Option<String>,

        /// Delete every backup
        #[arg(long, conflicts_with = "backup")]
        all: bool,
    },

    /// Remove backups outside the retention policy
    Prune {
        /// Actually delete (otherwise just show what would be deleted)
        #[arg(short, long)]
        force: bool,
    },

    /// Show backup statistics
    Stats,
}

/// Handle a backup command
pub async fn handle_backup_command(manager: &ProjectManager, cmd: BackupCommands) -> ReelResult<()> {
    let backups = manager.backups();

    match cmd {
        BackupCommands::Create { notes } => {
            let item = manager.create_backup(BackupReason::Manual, notes).await?;
            println!("Backup created: {}", item.id);
            println!("  Project: {} ({})", item.project_name, item.project_id);
            println!("  Size:    {}", format_size(item.size));
        }

        BackupCommands::List { verbose } => {
            let list = backups.list_backups();

            if list.is_empty() {
                println!("No backups found.");
                println!("Create a backup with: codereel backup create");
                return Ok(());
            }

            println!("Available Backups");
            println!("=================");
            println!();

            for item in &list {
                print_backup_line(item);
                if verbose {
                    println!("    Project:    {} ({})", item.project_name, item.project_id);
                    println!(
                        "    Payload:    {}{}",
                        if item.compressed { "compressed" } else { "plain" },
                        if item.restorable { "" } else { ", not restorable" }
                    );
                    if let Some(notes) = &item.notes {
                        println!("    Notes:      {}", notes);
                    }
                }
            }

            println!();
            println!("Total: {} backup(s)", list.len());
        }

        BackupCommands::Restore { backup, force } => {
            let item = backups.get_backup(&backup)?;

            if !force {
                println!("Restore Preview");
                println!("===============");
                print_backup_line(&item);
                println!();
                println!("WARNING: Restoring will replace the current project.");
                println!("To restore, run again with --force flag:");
                println!("  codereel backup restore {} --force", backup);
                return Ok(());
            }

            let project = manager.restore_backup(&backup).await?;
            println!("Restore complete!");
            println!(
                "Restored '{}' with {} snapshot(s).",
                project.metadata.name,
                project.document.snapshots.len()
            );
        }

        BackupCommands::Delete { backup, all } => {
            if all {
                let count = backups.list_backups().len();
                backups.delete_all_backups()?;
                println!("Deleted {} backup(s).", count);
            } else {
                let id = backup.ok_or_else(|| ReelError::Validation("a backup id is required".into()))?;
                backups.delete_backup(&id)?;
                println!("Deleted backup {}", id);
            }
        }

        BackupCommands::Prune { force } => {
            let retention = backups.retention();
            let expired = backups.expired_backups();

            if expired.is_empty() {
                println!("No backups to prune.");
                println!(
                    "Current retention policy: {} backups, {} days",
                    retention.max_backups, retention.retention_days
                );
                return Ok(());
            }

            println!("Prune Summary");
            println!("=============");
            println!(
                "Retention policy: {} backups, {} days (manual backups never expire by age)",
                retention.max_backups, retention.retention_days
            );
            println!("To be deleted: {} backup(s)", expired.len());
            for item in &expired {
                print_backup_line(item);
            }
            println!();

            if !force {
                println!("To delete old backups, run again with --force flag:");
                println!("  codereel backup prune --force");
                return Ok(());
            }

            let removed = backups.apply_cleanup_rules()?;
            println!("Deleted {} backup(s).", removed.len());
        }

        BackupCommands::Stats => {
            let stats = backups.get_backup_stats();

            println!("Backup Statistics");
            println!("=================");
            println!("Total backups: {}", stats.total_backups);
            println!("Total size:    {}", format_size(stats.total_size));
            if let Some(oldest) = stats.oldest {
                println!("Oldest:        {}", oldest.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            if let Some(newest) = stats.newest {
                println!("Newest:        {}", newest.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            if !stats.by_reason.is_empty() {
                println!();
                println!("By reason:");
                for (reason, count) in &stats.by_reason {
                    println!("  {:<15} {}", reason.to_string(), count);
                }
            }
        }
    }

    Ok(())
}

fn print_backup_line(item: &BackupItem) {
    println!(
        "  {}  {}  {:<13}  {}",
        item.id,
        item.timestamp.format("%Y-%m-%d %H:%M:%S"),
        item.reason.to_string(),
        format_size(item.size)
    );
}
