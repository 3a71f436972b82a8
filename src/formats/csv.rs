//! CSV codec for snapshot sequences
//!
//! Columns are positional: `id, code, duration, transitionTime`. Fields are
//! quoted with the usual double-quote convention, so code containing the
//! delimiter, quotes or newlines survives a round trip.

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde_json::{Map, Number, Value};

use super::{ParseOptions, SerializeOptions};
use crate::error::{ReelError, ReelResult};
use crate::models::{FileFormat, Snapshot};

/// Header row written on export
pub const HEADERS: [&str; 4] = ["id", "code", "duration", "transitionTime"];

/// Minimum number of cells in a data row
const MIN_COLUMNS: usize = 3;

/// Parse CSV text into snapshot values
///
/// Numeric cells that fail to parse are kept as strings so the validator can
/// report them against the right field.
pub fn parse(text: &str, options: &ParseOptions) -> ReelResult<Vec<Value>> {
    if text.trim().is_empty() {
        return Err(ReelError::parse(
            FileFormat::Csv,
            "CSV file must contain at least one content line",
        ));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.csv_delimiter)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        records.push(record);
    }

    let has_header = match (options.csv_has_header, records.first()) {
        (Some(forced), _) => forced,
        (None, Some(first)) => looks_like_header(first),
        (None, None) => false,
    };
    let skip = usize::from(has_header && !records.is_empty());

    let mut snapshots = Vec::with_capacity(records.len().saturating_sub(skip));
    for (index, record) in records.iter().enumerate().skip(skip) {
        if record.len() < MIN_COLUMNS {
            return Err(ReelError::parse(
                FileFormat::Csv,
                format!(
                    "row {} has {} column(s), expected at least {} (id, code, duration)",
                    index + 1,
                    record.len(),
                    MIN_COLUMNS
                ),
            ));
        }
        snapshots.push(row_to_snapshot(record));
    }

    Ok(snapshots)
}

/// Serialize snapshots as CSV text
pub fn serialize(snapshots: &[Snapshot], options: &SerializeOptions) -> ReelResult<String> {
    if snapshots.is_empty() {
        return Err(ReelError::Export("No snapshots to export as CSV".into()));
    }

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .delimiter(options.csv_delimiter)
        .from_writer(Vec::new());

    let write_error = |e: csv::Error| ReelError::Export(format!("Failed to write CSV: {}", e));

    if options.csv_include_headers {
        writer.write_record(HEADERS).map_err(write_error)?;
    }

    for snapshot in snapshots {
        let duration = snapshot.duration.to_string();
        let transition = snapshot.transition_time.to_string();
        writer
            .write_record([
                snapshot.id.as_str(),
                snapshot.code.as_str(),
                duration.as_str(),
                transition.as_str(),
            ])
            .map_err(write_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ReelError::Export(format!("Failed to flush CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| ReelError::Export(format!("CSV output is not UTF-8: {}", e)))
}

/// A first row is a header when at least two cells are known column names
fn looks_like_header(record: &StringRecord) -> bool {
    record
        .iter()
        .map(|cell| cell.trim().to_lowercase().replace(['_', ' '], ""))
        .filter(|cell| matches!(cell.as_str(), "id" | "code" | "duration" | "transitiontime"))
        .count()
        >= 2
}

fn row_to_snapshot(record: &StringRecord) -> Value {
    let cell = |i: usize| record.get(i).unwrap_or_default();

    let mut snapshot = Map::new();
    snapshot.insert("id".into(), Value::String(cell(0).trim().to_string()));
    snapshot.insert("code".into(), Value::String(cell(1).to_string()));
    snapshot.insert("duration".into(), numeric_cell(cell(2)));

    let transition = cell(3).trim();
    let transition = if transition.is_empty() {
        Value::from(0)
    } else {
        numeric_cell(transition)
    };
    snapshot.insert("transitionTime".into(), transition);

    Value::Object(snapshot)
}

fn numeric_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::from(n);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}
