//! CLI command handler for exporting the current project

use std::path::{Path, PathBuf};

use clap::Args;

use super::{format_size, print_errors, print_warnings};
use crate::config::{paths::ReelPaths, settings::Settings};
use crate::error::{ReelError, ReelResult};
use crate::models::{ExportResult, FileFormat};
use crate::services::{ExportOptions, ProjectManager};
use crate::storage::file_io::write_bytes_atomic;

/// Arguments of the export command
#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Output file or directory (defaults to the export directory)
    pub output: Option<PathBuf>,

    /// Output format (json, yaml, csv, xml, zip)
    #[arg(short, long)]
    pub format: Option<FileFormat>,

    /// Indent the output
    #[arg(long, conflicts_with = "compact")]
    pub pretty: bool,

    /// Write the output without indentation
    #[arg(long)]
    pub compact: bool,

    /// Sort object keys recursively
    #[arg(long)]
    pub sort_keys: bool,

    /// Deflate archive members
    #[arg(long)]
    pub compress: bool,

    /// Export only these snapshots (repeatable)
    #[arg(long = "snapshot", value_name = "ID")]
    pub snapshots: Vec<String>,

    /// Leave project metadata out of the export
    #[arg(long)]
    pub no_metadata: bool,

    /// CSV field delimiter
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// Use the options of a saved template (other option flags are ignored)
    #[arg(short, long, conflicts_with = "save_template")]
    pub template: Option<String>,

    /// Save these options as a named template before exporting
    #[arg(long, value_name = "NAME")]
    pub save_template: Option<String>,
}

impl ExportArgs {
    fn options(&self, settings: &Settings) -> ExportOptions {
        ExportOptions {
            format: self.format.unwrap_or(settings.default_export_format),
            include_metadata: !self.no_metadata,
            snapshot_ids: if self.snapshots.is_empty() {
                None
            } else {
                Some(self.snapshots.clone())
            },
            pretty: if self.compact {
                false
            } else {
                self.pretty || settings.pretty_print
            },
            sort_keys: self.sort_keys,
            compress: self.compress,
            csv_delimiter: self.delimiter,
            ..Default::default()
        }
    }
}

/// Handle the export command
pub async fn handle_export_command(
    manager: &ProjectManager,
    paths: &ReelPaths,
    settings: &Settings,
    args: ExportArgs,
) -> ReelResult<()> {
    let result = match &args.template {
        Some(template) => manager.export_with_template(template).await?,
        None => {
            let options = args.options(settings);
            if let Some(name) = &args.save_template {
                let template = manager.templates().save(name, None, options.clone())?;
                println!("Saved template '{}' ({})", template.name, template.id);
            }
            manager.export_project(options).await?
        }
    };

    if !result.success {
        print_errors(&result.errors);
        return Err(ReelError::Export("export failed".into()));
    }

    let target = output_path(paths, args.output.as_deref(), &result)?;
    let data = result.data.as_deref().unwrap_or_default();
    write_bytes_atomic(&target, data)?;

    println!("Export complete!");
    println!("  File:     {}", target.display());
    println!("  Format:   {}", result.format);
    println!("  Size:     {}", format_size(result.size));
    println!("  Items:    {}", result.exported.len());
    print_warnings(&result.warnings);

    Ok(())
}

/// Where to write an export: an explicit file, a file in an explicit
/// directory, or the generated name in the export directory
fn output_path(paths: &ReelPaths, output: Option<&Path>, result: &ExportResult) -> ReelResult<PathBuf> {
    let generated = || {
        result
            .file_name
            .clone()
            .ok_or_else(|| ReelError::Export("export produced no file name".into()))
    };

    match output {
        Some(path) if path.is_dir() => Ok(path.join(generated()?)),
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(paths.export_dir().join(generated()?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_follow_settings() {
        let settings = Settings {
            default_export_format: FileFormat::Yaml,
            pretty_print: true,
            ..Default::default()
        };
        let options = ExportArgs::default().options(&settings);
        assert_eq!(options.format, FileFormat::Yaml);
        assert!(options.pretty);
        assert!(options.snapshot_ids.is_none());

        let compact = ExportArgs {
            compact: true,
            format: Some(FileFormat::Csv),
            snapshots: vec!["s1".into()],
            ..Default::default()
        }
        .options(&settings);
        assert_eq!(compact.format, FileFormat::Csv);
        assert!(!compact.pretty);
        assert_eq!(compact.snapshot_ids, Some(vec!["s1".to_string()]));
    }
}
