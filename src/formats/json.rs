//! JSON codec
//!
//! Direct field mapping. Export output is wrapped in an envelope that adds
//! `exportedAt` and `exportVersion`; parsing ignores both.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use super::{sort_keys, SerializeOptions, EXPORT_VERSION};
use crate::error::{ReelError, ReelResult};
use crate::models::timestamp::format_timestamp;
use crate::models::{FileFormat, PartialProject};

/// Export envelope around a partial project
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExportEnvelope<'a> {
    #[serde(flatten)]
    pub project: &'a PartialProject,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_version: Option<&'static str>,
}

impl<'a> ExportEnvelope<'a> {
    pub(crate) fn new(project: &'a PartialProject, options: &SerializeOptions) -> Self {
        if options.include_export_info {
            Self {
                project,
                exported_at: Some(format_timestamp(&Utc::now())),
                export_version: Some(EXPORT_VERSION),
            }
        } else {
            Self {
                project,
                exported_at: None,
                export_version: None,
            }
        }
    }
}

/// Parse JSON text into a value
pub fn parse(text: &str) -> ReelResult<Value> {
    serde_json::from_str(text).map_err(|e| ReelError::parse(FileFormat::Json, e.to_string()))
}

/// Serialize a partial project as JSON text
pub fn serialize(data: &PartialProject, options: &SerializeOptions) -> ReelResult<String> {
    let envelope = ExportEnvelope::new(data, options);
    let result = if options.sort_keys {
        let value = serde_json::to_value(&envelope)?;
        to_string(&sort_keys(value), options.pretty)
    } else {
        to_string(&envelope, options.pretty)
    };
    result.map_err(|e| ReelError::Export(format!("Failed to write JSON: {}", e)))
}

fn to_string<T: Serialize + ?Sized>(value: &T, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}
