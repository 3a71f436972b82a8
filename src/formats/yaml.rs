//! YAML codec
//!
//! Accepts the same three shapes as JSON. Input is read into a
//! `serde_json::Value` so shape detection and validation stay shared.

use serde_json::Value;

use super::json::ExportEnvelope;
use super::{sort_keys, SerializeOptions};
use crate::error::{ReelError, ReelResult};
use crate::models::{FileFormat, PartialProject};

/// Parse YAML text into a value
pub fn parse(text: &str) -> ReelResult<Value> {
    if text.trim().is_empty() {
        return Err(ReelError::parse(FileFormat::Yaml, "document is empty"));
    }
    Ok(serde_yaml::from_str(text)?)
}

/// Serialize a partial project as YAML text
///
/// YAML has no compact layout, so `pretty` is ignored.
pub fn serialize(data: &PartialProject, options: &SerializeOptions) -> ReelResult<String> {
    let envelope = ExportEnvelope::new(data, options);
    let result = if options.sort_keys {
        let value = serde_json::to_value(&envelope)?;
        serde_yaml::to_string(&sort_keys(value))
    } else {
        serde_yaml::to_string(&envelope)
    };
    result.map_err(|e| ReelError::Export(format!("Failed to write YAML: {}", e)))
}
