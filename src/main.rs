use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use codereel::cli::{
    handle_backup_command, handle_export_command, handle_history_command, handle_import_command,
    handle_preview_command, handle_template_command, handle_validate_command, open_manager,
    BackupCommands, ExportArgs, HistoryCommands, ImportArgs, TemplateCommands,
};
use codereel::config::{paths::ReelPaths, settings::Settings};
use codereel::models::FileFormat;

#[derive(Parser)]
#[command(
    name = "codereel",
    version,
    about = "Import, export and back up code animation projects",
    long_about = "codereel moves code animation projects between JSON, YAML, CSV, \
                  XML and ZIP files. Imports are validated, merged into the current \
                  project with configurable conflict resolution, and preceded by an \
                  automatic backup."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import project files into the current project
    Import(ImportArgs),

    /// Show what importing a file would do, without committing
    Preview {
        /// File to inspect
        file: PathBuf,

        /// Input format (detected from the file name if omitted)
        #[arg(short, long)]
        format: Option<FileFormat>,
    },

    /// Check a file against the validation rules
    Validate {
        /// File to check
        file: PathBuf,

        /// Input format (detected from the file name if omitted)
        #[arg(short, long)]
        format: Option<FileFormat>,
    },

    /// Export the current project
    Export(ExportArgs),

    /// Backup management commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Import and export history
    #[command(subcommand)]
    History(HistoryCommands),

    /// Saved export templates
    #[command(subcommand)]
    Template(TemplateCommands),

    /// Show current configuration and paths
    Config {
        /// Write the current settings to the settings file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "codereel=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = ReelPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    let Some(command) = cli.command else {
        println!("codereel - code animation project interchange");
        println!();
        println!("Run 'codereel --help' for usage information.");
        return Ok(());
    };

    if let Commands::Config { save } = command {
        if save {
            settings.save(&paths)?;
            println!("Settings written to {}", paths.settings_file().display());
            println!();
        }
        print_config(&paths, &settings);
        return Ok(());
    }

    let manager = open_manager(&paths, &settings)?;
    if let Err(e) = manager.create_auto_backup_if_needed().await {
        tracing::warn!(error = %e, "Automatic backup failed");
    }

    match command {
        Commands::Import(args) => handle_import_command(&manager, &settings, args).await?,
        Commands::Preview { file, format } => {
            handle_preview_command(&manager, &settings, file, format).await?
        }
        Commands::Validate { file, format } => {
            handle_validate_command(&settings, file, format).await?
        }
        Commands::Export(args) => handle_export_command(&manager, &paths, &settings, args).await?,
        Commands::Backup(cmd) => handle_backup_command(&manager, cmd).await?,
        Commands::History(cmd) => handle_history_command(&manager, cmd)?,
        Commands::Template(cmd) => handle_template_command(&manager, cmd)?,
        Commands::Config { .. } => print_config(&paths, &settings),
    }

    Ok(())
}

fn print_config(paths: &ReelPaths, settings: &Settings) {
    println!("codereel Configuration");
    println!("======================");
    println!("Base directory:   {}", paths.base_dir().display());
    println!("Store directory:  {}", paths.store_dir().display());
    println!("Export directory: {}", paths.export_dir().display());
    println!("Settings file:    {}", paths.settings_file().display());
    println!(
        "Formats:          {}",
        FileFormat::ALL
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("Settings:");
    println!("  Default strategy:       {}", settings.default_strategy);
    println!("  Default export format:  {}", settings.default_export_format);
    println!("  Pretty print:           {}", settings.pretty_print);
    println!(
        "  Backup before import:   {}",
        settings.create_backup_before_import
    );
    println!("  Compress backups:       {}", settings.compress_backups);
    println!(
        "  Backup retention:       {} backups, {} days",
        settings.backup_retention.max_backups, settings.backup_retention.retention_days
    );
    println!(
        "  Auto backup interval:   {} hours",
        settings.backup_retention.auto_backup_interval_hours
    );
    println!(
        "  Max file size:          {} bytes",
        settings.validation_limits.max_file_size
    );
    println!(
        "  Max snapshots:          {}",
        settings.validation_limits.max_snapshots
    );
}
