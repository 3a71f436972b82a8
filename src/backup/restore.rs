//! Backup payload encoding and restoration
//!
//! A payload is the project serialized as JSON. Compressed payloads wrap that
//! JSON in a one-member deflate archive, base64-encoded so it fits a string
//! store.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use zip::ZipArchive;

use crate::error::{ReelError, ReelResult};
use crate::formats::archive::{read_member, write_members};
use crate::models::ProjectData;

/// Name of the single archive member in a compressed payload
const PAYLOAD_MEMBER: &str = "backup.json";

/// Encode a project into a storable payload
///
/// Returns the payload and the size of the uncompressed JSON in bytes.
pub fn encode_payload(project: &ProjectData, compress: bool) -> ReelResult<(String, u64)> {
    let json = serde_json::to_string(project)
        .map_err(|e| ReelError::Backup(format!("backup creation failed: {}", e)))?;
    let size = json.len() as u64;

    if !compress {
        return Ok((json, size));
    }

    let archive = write_members(&[(PAYLOAD_MEMBER, json.into_bytes())], true)
        .map_err(|e| ReelError::Backup(format!("backup creation failed: {}", e)))?;
    Ok((STANDARD.encode(archive), size))
}

/// Decode a payload back into raw JSON
fn decode_payload(payload: &str, compressed: bool) -> ReelResult<Value> {
    let json = if compressed {
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| ReelError::Backup(format!("corrupt backup payload: {}", e)))?;
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ReelError::Backup(format!("corrupt backup payload: {}", e)))?;
        read_member(&mut archive, PAYLOAD_MEMBER)
            .map_err(|e| ReelError::Backup(format!("corrupt backup payload: {}", e)))?
    } else {
        payload.as_bytes().to_vec()
    };

    serde_json::from_slice(&json)
        .map_err(|e| ReelError::Backup(format!("corrupt backup payload: {}", e)))
}

/// Check the minimum shape of a restorable project
pub fn validate_structure(value: &Value) -> ReelResult<()> {
    let invalid = |what: &str| ReelError::Backup(format!("invalid backup data: {}", what));

    let object = value.as_object().ok_or_else(|| invalid("not an object"))?;
    if !object.get("metadata").is_some_and(Value::is_object) {
        return Err(invalid("missing metadata"));
    }
    let document = object
        .get("document")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("missing document"))?;
    match document.get("snapshots").and_then(Value::as_array) {
        Some(snapshots) if !snapshots.is_empty() => Ok(()),
        _ => Err(invalid("document has no snapshots")),
    }
}

/// Decode, check and deserialize a payload
///
/// Dates stored as strings come back as timestamps through the models'
/// lenient timestamp handling.
pub fn restore_payload(payload: &str, compressed: bool) -> ReelResult<ProjectData> {
    let value = decode_payload(payload, compressed)?;
    validate_structure(&value)?;
    serde_json::from_value(value).map_err(|e| ReelError::Backup(format!("invalid backup data: {}", e)))
}
