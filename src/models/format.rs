//! Supported interchange formats
//!
//! Maps formats to file extensions and MIME types, detects the format of an
//! incoming file, and builds timestamped output filenames.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fallback MIME type for unknown extensions
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A serialized representation of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Structured object format
    #[default]
    Json,
    /// Structured object format, human-oriented
    Yaml,
    /// Flat tabular format (snapshots only)
    Csv,
    /// Markup format
    Xml,
    /// Archive bundling several of the above plus a manifest
    Zip,
}

impl FileFormat {
    /// All supported formats
    pub const ALL: [FileFormat; 5] = [
        FileFormat::Json,
        FileFormat::Yaml,
        FileFormat::Csv,
        FileFormat::Xml,
        FileFormat::Zip,
    ];

    /// File extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Csv => "csv",
            Self::Xml => "xml",
            Self::Zip => "zip",
        }
    }

    /// MIME type used for generated files
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Yaml => "application/yaml",
            Self::Csv => "text/csv",
            Self::Xml => "application/xml",
            Self::Zip => "application/zip",
        }
    }

    /// Resolve a format from a file extension (case-insensitive, dot optional)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "csv" => Some(Self::Csv),
            "xml" => Some(Self::Xml),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }

    /// Resolve a format from a declared content type
    pub fn from_mime(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/json" | "text/json" => Some(Self::Json),
            "application/yaml" | "application/x-yaml" | "text/yaml" | "text/x-yaml" => {
                Some(Self::Yaml)
            }
            "text/csv" | "application/csv" => Some(Self::Csv),
            "application/xml" | "text/xml" => Some(Self::Xml),
            "application/zip" | "application/x-zip-compressed" => Some(Self::Zip),
            _ => None,
        }
    }

    /// Resolve a format from a filename's extension
    pub fn from_filename(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    /// Detect the format of an incoming file
    ///
    /// Tries the filename extension, then the declared content type, and
    /// falls back to JSON when neither is conclusive.
    pub fn detect(name: &str, content_type: Option<&str>) -> Self {
        Self::from_filename(name)
            .or_else(|| content_type.and_then(Self::from_mime))
            .unwrap_or_default()
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "JSON"),
            Self::Yaml => write!(f, "YAML"),
            Self::Csv => write!(f, "CSV"),
            Self::Xml => write!(f, "XML"),
            Self::Zip => write!(f, "ZIP"),
        }
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| format!("Unsupported format: {}", s))
    }
}

/// MIME type for an arbitrary extension
pub fn mime_for_extension(ext: &str) -> &'static str {
    FileFormat::from_extension(ext)
        .map(|f| f.mime_type())
        .unwrap_or(OCTET_STREAM)
}

/// Build an output filename: `<prefix>-<timestamp>.<ext>`
///
/// The timestamp is ISO-8601 with `:` and `.` replaced by `-`.
pub fn generate_filename(prefix: &str, format: FileFormat, at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{}-{}.{}", prefix, stamp, format.extension())
}
