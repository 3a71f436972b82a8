//! Field-level differences between two JSON values
//!
//! Only top-level keys are compared; nested objects that differ are reported
//! as a single value change on their key.

use serde_json::Value;

use crate::formats::json_type_name;
use crate::models::{ConflictDifference, DifferenceKind};

/// Compare two values key by key
///
/// Every differing key appears exactly once. Keys listed in `exclude` are
/// skipped on both sides. Non-object values are compared as a whole under
/// the field name `$`.
pub fn find_differences(existing: &Value, incoming: &Value, exclude: &[&str]) -> Vec<ConflictDifference> {
    let (existing_obj, incoming_obj) = match (existing, incoming) {
        (Value::Object(e), Value::Object(i)) => (e, i),
        _ => {
            return if existing == incoming {
                Vec::new()
            } else {
                vec![difference("$", Some(existing), Some(incoming))]
            };
        }
    };

    let mut differences = Vec::new();

    // Modified and deleted fields
    for (key, existing_val) in existing_obj {
        if exclude.contains(&key.as_str()) {
            continue;
        }
        match incoming_obj.get(key) {
            Some(incoming_val) if incoming_val == existing_val => {}
            incoming_val => differences.push(difference(key, Some(existing_val), incoming_val)),
        }
    }

    // Added fields
    for (key, incoming_val) in incoming_obj {
        if exclude.contains(&key.as_str()) || existing_obj.contains_key(key) {
            continue;
        }
        differences.push(difference(key, None, Some(incoming_val)));
    }

    differences
}

fn difference(field: &str, existing: Option<&Value>, incoming: Option<&Value>) -> ConflictDifference {
    let kind = match (existing, incoming) {
        (None, _) => DifferenceKind::Addition,
        (_, None) => DifferenceKind::Deletion,
        (Some(e), Some(i)) if json_type_name(e) != json_type_name(i) => DifferenceKind::TypeChange,
        _ => DifferenceKind::ValueChange,
    };

    ConflictDifference {
        field: field.to_string(),
        existing_value: existing.cloned(),
        incoming_value: incoming.cloned(),
        kind,
    }
}

/// One-line, human-readable rendering of a difference
pub fn describe(difference: &ConflictDifference) -> String {
    let existing = difference
        .existing_value
        .as_ref()
        .map_or_else(|| "(absent)".to_string(), format_value);
    let incoming = difference
        .incoming_value
        .as_ref()
        .map_or_else(|| "(absent)".to_string(), format_value);
    format!("{}: {} -> {}", difference.field, existing, incoming)
}

/// Format a JSON value for display, truncating long strings
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => {
            if s.chars().count() > 50 {
                let head: String = s.chars().take(47).collect();
                format!("\"{}...\"", head)
            } else {
                format!("\"{}\"", s)
            }
        }
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}
