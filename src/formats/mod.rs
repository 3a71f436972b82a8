//! Format codec layer
//!
//! Parses raw bytes of a [`FileFormat`] into a [`ParsedPayload`] and
//! serializes a [`PartialProject`] back into bytes. The codecs know nothing
//! about conflicts, backups or the current project.
//!
//! Structured inputs come in three shapes: a full project envelope, a bare
//! document, or a bare list of snapshots. The shape is resolved once, during
//! parse, and carried as the [`ParsedPayload`] discriminant.

pub mod archive;
pub mod csv;
pub mod json;
pub mod xml;
pub mod yaml;

use serde_json::{Map, Value};

use crate::error::{ReelError, ReelResult};
use crate::models::{DataType, Document, FileFormat, PartialProject};

/// Version string written into export envelopes
pub const EXPORT_VERSION: &str = "1.0";

/// Options controlling how raw input is read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Field delimiter for CSV input
    pub csv_delimiter: u8,
    /// Force or suppress header detection; `None` sniffs the first row
    pub csv_has_header: Option<bool>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            csv_delimiter: b',',
            csv_has_header: None,
        }
    }
}

/// Options controlling how output is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Indent structured and markup output
    pub pretty: bool,
    /// Sort object keys recursively (JSON and YAML)
    pub sort_keys: bool,
    /// Field delimiter for CSV output
    pub csv_delimiter: u8,
    /// Write a header row in CSV output
    pub csv_include_headers: bool,
    /// Deflate archive members instead of storing them
    pub compress: bool,
    /// Add `exportedAt`/`exportVersion` to structured output
    pub include_export_info: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            sort_keys: false,
            csv_delimiter: b',',
            csv_include_headers: true,
            compress: true,
            include_export_info: true,
        }
    }
}

/// Parsed input with its top-level shape resolved
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPayload {
    /// An envelope with `metadata` and/or `document`
    Project(Value),
    /// A bare document carrying `snapshots`
    Document(Value),
    /// A bare sequence of snapshots
    Snapshots(Vec<Value>),
}

impl ParsedPayload {
    /// Classify a structured value by its top-level shape
    pub fn from_value(value: Value, format: FileFormat) -> ReelResult<Self> {
        match value {
            Value::Array(items) => Ok(Self::Snapshots(items)),
            Value::Object(map) => {
                if map.contains_key("metadata") || map.contains_key("document") {
                    Ok(Self::Project(Value::Object(map)))
                } else if map.contains_key("snapshots") {
                    Ok(Self::Document(Value::Object(map)))
                } else {
                    Err(ReelError::parse(
                        format,
                        "unrecognized structure: expected a project, a document or a list of snapshots",
                    ))
                }
            }
            other => Err(ReelError::parse(
                format,
                format!("unrecognized structure: top-level {} value", json_type_name(&other)),
            )),
        }
    }

    /// The data type the payload declares by its shape
    pub fn declared_type(&self) -> DataType {
        match self {
            Self::Project(_) => DataType::Project,
            Self::Document(_) => DataType::Document,
            Self::Snapshots(_) => DataType::Snapshots,
        }
    }

    /// The payload as a plain value, for validation against its declared type
    pub fn to_value(&self) -> Value {
        match self {
            Self::Project(v) | Self::Document(v) => v.clone(),
            Self::Snapshots(items) => Value::Array(items.clone()),
        }
    }

    /// Number of snapshots carried by the payload, wherever they live
    pub fn snapshot_count(&self) -> usize {
        let snapshots = match self {
            Self::Project(v) => v.pointer("/document/snapshots"),
            Self::Document(v) => v.get("snapshots"),
            Self::Snapshots(items) => return items.len(),
        };
        snapshots.and_then(Value::as_array).map_or(0, Vec::len)
    }

    /// Normalize into a project-shaped value
    ///
    /// A bare document becomes `{ "document": ... }`; bare snapshots are
    /// wrapped into a default document first.
    pub fn into_project_value(self) -> Value {
        match self {
            Self::Project(v) => v,
            Self::Document(v) => wrap("document", v),
            Self::Snapshots(items) => {
                let mut document = match serde_json::to_value(Document::default()) {
                    Ok(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                document.insert("snapshots".to_string(), Value::Array(items));
                wrap("document", Value::Object(document))
            }
        }
    }

    /// Convert into a typed partial project
    pub fn into_partial(self, format: FileFormat) -> ReelResult<PartialProject> {
        serde_json::from_value(self.into_project_value())
            .map_err(|e| ReelError::parse(format, format!("invalid project structure: {}", e)))
    }
}

fn wrap(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

/// Human name of a JSON value's type, as used in messages
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parse raw bytes in the given format
pub fn parse(content: &[u8], format: FileFormat, options: &ParseOptions) -> ReelResult<ParsedPayload> {
    if format == FileFormat::Zip {
        return archive::parse(content, options);
    }

    let text = std::str::from_utf8(content)
        .map_err(|e| ReelError::parse(format, format!("content is not valid UTF-8: {}", e)))?;
    parse_text(text, format, options)
}

/// Parse text in one of the textual formats
pub fn parse_text(text: &str, format: FileFormat, options: &ParseOptions) -> ReelResult<ParsedPayload> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    match format {
        FileFormat::Json => ParsedPayload::from_value(json::parse(text)?, format),
        FileFormat::Yaml => ParsedPayload::from_value(yaml::parse(text)?, format),
        FileFormat::Csv => Ok(ParsedPayload::Snapshots(csv::parse(text, options)?)),
        FileFormat::Xml => xml::parse(text),
        FileFormat::Zip => Err(ReelError::parse(
            format,
            "archives are binary and must be parsed from bytes",
        )),
    }
}

/// Serialize a partial project in the given format
pub fn serialize(
    data: &PartialProject,
    format: FileFormat,
    options: &SerializeOptions,
) -> ReelResult<Vec<u8>> {
    match format {
        FileFormat::Json => json::serialize(data, options).map(String::into_bytes),
        FileFormat::Yaml => yaml::serialize(data, options).map(String::into_bytes),
        FileFormat::Csv => csv::serialize(data.snapshots(), options).map(String::into_bytes),
        FileFormat::Xml => xml::serialize(data, options).map(String::into_bytes),
        FileFormat::Zip => archive::serialize(data, options),
    }
}

/// Recursively sort object keys
///
/// `serde_json::Map` is ordered by key unless `preserve_order` is enabled, so
/// rebuilding each map is enough to fix the order either way.
pub fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
