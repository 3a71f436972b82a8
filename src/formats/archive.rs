//! ZIP archive codec
//!
//! Export bundles the project as JSON, its snapshots as CSV (when there are
//! any), the project as XML and a small manifest. Import picks one member and
//! hands it to the matching text codec.

use std::io::{Cursor, Read, Write};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{csv, json, xml, ParseOptions, ParsedPayload, SerializeOptions};
use crate::error::{ReelError, ReelResult};
use crate::models::timestamp::format_timestamp;
use crate::models::{FileFormat, PartialProject};

/// Name of the manifest member
pub const MANIFEST_NAME: &str = "manifest.json";

/// Preferred members, in priority order
const PROJECT_MEMBERS: [&str; 3] = ["project.json", "project.yaml", "project.yml"];

/// Companion file describing an exported archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveManifest {
    /// Project name, when the export carried metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_at: String,
    pub app_version: String,
    /// Member file names, manifest excluded
    pub files: Vec<String>,
}

/// Parse the preferred member of an archive
pub fn parse(bytes: &[u8], options: &ParseOptions) -> ReelResult<ParsedPayload> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut names = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if !entry.is_dir() {
            names.push(entry.name().to_string());
        }
    }

    let (member, format) = select_member(&names).ok_or(ReelError::EmptyArchive)?;
    tracing::debug!(member = %member, format = %format, "Reading archive member");

    let content = read_member(&mut archive, &member)?;
    super::parse(&content, format, options)
}

/// Pick the member to import: `project.*` first, then the first supported file
fn select_member(names: &[String]) -> Option<(String, FileFormat)> {
    for preferred in PROJECT_MEMBERS {
        if let Some(name) = names.iter().find(|n| base_name(n).eq_ignore_ascii_case(preferred)) {
            let format = FileFormat::from_filename(name)?;
            return Some((name.clone(), format));
        }
    }

    names
        .iter()
        .filter(|n| !base_name(n).eq_ignore_ascii_case(MANIFEST_NAME))
        .find_map(|n| match FileFormat::from_filename(n) {
            Some(FileFormat::Zip) | None => None,
            Some(format) => Some((n.clone(), format)),
        })
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Read one member fully
pub fn read_member<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> ReelResult<Vec<u8>> {
    let mut entry = archive.by_name(name)?;
    let mut buffer = Vec::new();
    entry
        .read_to_end(&mut buffer)
        .map_err(|e| ReelError::parse(FileFormat::Zip, format!("failed to read {}: {}", name, e)))?;
    Ok(buffer)
}

/// Package named members into an in-memory archive
pub fn write_members(members: &[(&str, Vec<u8>)], compress: bool) -> ReelResult<Vec<u8>> {
    let method = if compress {
        CompressionMethod::Deflated
    } else {
        CompressionMethod::Stored
    };
    let options = SimpleFileOptions::default()
        .compression_method(method)
        .unix_permissions(0o644);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in members {
        zip.start_file(*name, options)
            .map_err(|e| ReelError::Export(format!("Failed to add {}: {}", name, e)))?;
        zip.write_all(content)
            .map_err(|e| ReelError::Export(format!("Failed to write {}: {}", name, e)))?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| ReelError::Export(format!("Failed to finalize archive: {}", e)))?;
    Ok(cursor.into_inner())
}

/// Serialize a partial project as a multi-format archive
pub fn serialize(data: &PartialProject, options: &SerializeOptions) -> ReelResult<Vec<u8>> {
    let mut members: Vec<(&str, Vec<u8>)> = Vec::new();

    members.push(("project.json", json::serialize(data, options)?.into_bytes()));
    if !data.snapshots().is_empty() {
        members.push(("snapshots.csv", csv::serialize(data.snapshots(), options)?.into_bytes()));
    }
    members.push(("project.xml", xml::serialize(data, options)?.into_bytes()));

    let manifest = ArchiveManifest {
        name: data.metadata.as_ref().map(|m| m.name.clone()),
        created_at: format_timestamp(&Utc::now()),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        files: members.iter().map(|(name, _)| name.to_string()).collect(),
    };
    let manifest = serde_json::to_vec_pretty(&manifest)?;
    members.push((MANIFEST_NAME, manifest));

    write_members(&members, options.compress)
}

/// Read the manifest of an exported archive
pub fn read_manifest(bytes: &[u8]) -> ReelResult<ArchiveManifest> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let content = read_member(&mut archive, MANIFEST_NAME)?;
    serde_json::from_slice(&content)
        .map_err(|e| ReelError::parse(FileFormat::Zip, format!("invalid manifest: {}", e)))
}
