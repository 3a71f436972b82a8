//! Structural and business-rule validation
//!
//! The validator works on untyped `serde_json::Value` input so it can report
//! every problem in a file instead of stopping at the first field serde
//! rejects. Errors block an import; warnings only accumulate.

pub mod filename;

pub use filename::validate_filename;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ValidationLimits;
use crate::formats::json_type_name;
use crate::models::timestamp::parse_timestamp;
use crate::models::{DataType, FileFormat, OperationError, OperationWarning};

/// Language tags the renderer knows how to highlight
pub const KNOWN_LANGUAGES: &[&str] = &[
    "javascript", "typescript", "jsx", "tsx", "python", "rust", "go", "java", "kotlin", "swift",
    "c", "cpp", "csharp", "ruby", "php", "html", "css", "scss", "json", "yaml", "xml",
    "markdown", "sql", "bash", "shell", "plaintext",
];

/// Aspect ratios (width / height) outside this range get a warning
pub const ASPECT_RATIO_RANGE: (f64, f64) = (0.5, 3.0);
/// Font sizes outside this range get a warning
pub const FONT_SIZE_RANGE: (f64, f64) = (8.0, 72.0);
/// Per-snapshot duration above which a warning is raised, in milliseconds
pub const MAX_SNAPSHOT_DURATION: f64 = 60_000.0;
/// Code length above which a warning is raised, in characters
pub const MAX_CODE_LENGTH: usize = 10_000;
/// Line length above which a warning is raised, in characters
pub const MAX_LINE_LENGTH: usize = 200;
/// Total duration bounds outside which a warning is raised, in milliseconds
pub const TOTAL_DURATION_RANGE: (f64, f64) = (1_000.0, 300_000.0);

/// Outcome of validating one value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<OperationError>,
    pub warnings: Vec<OperationWarning>,
}

impl ValidationResult {
    /// Whether a given field has an error
    pub fn has_error_on(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field.as_deref() == Some(field))
    }

    /// Whether any error message contains the given text
    pub fn has_error_containing(&self, text: &str) -> bool {
        self.errors.iter().any(|e| e.message.contains(text))
    }
}

/// Validates project data against type, range and consistency rules
#[derive(Debug, Clone, Default)]
pub struct DataValidator {
    limits: ValidationLimits,
}

impl DataValidator {
    pub fn new(limits: ValidationLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    /// Validate a value against a declared data type
    pub fn validate(&self, data: &Value, data_type: DataType) -> ValidationResult {
        let mut checker = Checker::new(&self.limits);
        match data_type {
            DataType::Project => checker.project(data),
            DataType::Document => checker.document(data, "document"),
            DataType::Snapshots => checker.snapshots(data, "snapshots"),
            DataType::Themes => checker.themes(data, "themes"),
            DataType::Presets => checker.presets(data, "presets"),
            DataType::Settings => checker.settings(data, "settings"),
        }
        checker.finish()
    }

    /// Validate against a data type given by name
    pub fn validate_named(&self, data: &Value, data_type: &str) -> ValidationResult {
        match data_type.parse::<DataType>() {
            Ok(data_type) => self.validate(data, data_type),
            Err(message) => ValidationResult {
                valid: false,
                errors: vec![OperationError::validation("dataType", message)],
                warnings: Vec::new(),
            },
        }
    }

    /// Warn when a raw input is larger than the configured maximum
    pub fn validate_file_size(&self, size: u64) -> Option<OperationWarning> {
        (size > self.limits.max_file_size).then(|| {
            OperationWarning::new(
                "fileSize",
                format!(
                    "File size {} bytes exceeds the recommended maximum of {} bytes",
                    size, self.limits.max_file_size
                ),
            )
        })
    }
}

/// Accumulates issues for one validation run
struct Checker<'a> {
    limits: &'a ValidationLimits,
    errors: Vec<OperationError>,
    warnings: Vec<OperationWarning>,
}

impl<'a> Checker<'a> {
    fn new(limits: &'a ValidationLimits) -> Self {
        Self {
            limits,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn finish(self) -> ValidationResult {
        ValidationResult {
            valid: self.errors.is_empty(),
            errors: self.errors,
            warnings: self.warnings,
        }
    }

    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(OperationError::validation(field, message));
    }

    fn warn(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(OperationWarning::new(field, message));
    }

    // -- typed field access ---------------------------------------------------

    fn object<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            other => {
                self.error(path, format!("Expected an object, found {}", json_type_name(other)));
                None
            }
        }
    }

    fn array<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Vec<Value>> {
        match value {
            Value::Array(items) => Some(items),
            other => {
                self.error(path, format!("Expected an array, found {}", json_type_name(other)));
                None
            }
        }
    }

    fn required<'v>(&mut self, map: &'v Map<String, Value>, path: &str, key: &str) -> Option<&'v Value> {
        match map.get(key) {
            Some(Value::Null) | None => {
                self.error(join(path, key), format!("Missing required field: {}", key));
                None
            }
            Some(value) => Some(value),
        }
    }

    fn string<'v>(&mut self, value: &'v Value, field: &str) -> Option<&'v str> {
        match value {
            Value::String(s) => Some(s),
            other => {
                self.error(field, format!("Expected a string, found {}", json_type_name(other)));
                None
            }
        }
    }

    /// Every numeric field of the model is an unsigned integer
    fn number(&mut self, value: &Value, field: &str) -> Option<f64> {
        match value {
            Value::Number(n) => match n.as_u64() {
                Some(n) => Some(n as f64),
                None => {
                    self.error(field, format!("Expected a non-negative whole number, found {}", n));
                    None
                }
            },
            other => {
                self.error(field, format!("Expected a number, found {}", json_type_name(other)));
                None
            }
        }
    }

    fn required_string<'v>(&mut self, map: &'v Map<String, Value>, path: &str, key: &str) -> Option<&'v str> {
        let value = self.required(map, path, key)?;
        self.string(value, &join(path, key))
    }

    fn required_number(&mut self, map: &Map<String, Value>, path: &str, key: &str) -> Option<f64> {
        let value = self.required(map, path, key)?;
        self.number(value, &join(path, key))
    }

    fn optional_string<'v>(&mut self, map: &'v Map<String, Value>, path: &str, key: &str) -> Option<&'v str> {
        match map.get(key) {
            Some(Value::Null) | None => None,
            Some(value) => self.string(value, &join(path, key)),
        }
    }

    fn optional_number(&mut self, map: &Map<String, Value>, path: &str, key: &str) -> Option<f64> {
        match map.get(key) {
            Some(Value::Null) | None => None,
            Some(value) => self.number(value, &join(path, key)),
        }
    }

    fn optional_bool(&mut self, map: &Map<String, Value>, path: &str, key: &str) {
        match map.get(key) {
            Some(Value::Null) | Some(Value::Bool(_)) | None => {}
            Some(other) => self.error(
                join(path, key),
                format!("Expected a boolean, found {}", json_type_name(other)),
            ),
        }
    }

    fn required_date(&mut self, map: &Map<String, Value>, path: &str, key: &str) {
        if let Some(value) = self.required(map, path, key) {
            if parse_timestamp(value).is_none() {
                self.error(join(path, key), format!("Invalid date: {}", value));
            }
        }
    }

    fn non_negative(&mut self, map: &Map<String, Value>, path: &str, key: &str) {
        self.optional_number(map, path, key);
    }

    // -- entities -------------------------------------------------------------

    fn project(&mut self, data: &Value) {
        let Some(project) = self.object(data, "project") else {
            return;
        };

        if let Some(metadata) = self.required(project, "", "metadata") {
            self.metadata(metadata, "metadata");
        }
        if let Some(document) = self.required(project, "", "document") {
            self.document(document, "document");
        }

        if let Some(themes) = project.get("themes").filter(|v| !v.is_null()) {
            self.themes(themes, "themes");
        }
        if let Some(presets) = project.get("presets").filter(|v| !v.is_null()) {
            self.presets(presets, "presets");
        }
        if let Some(settings) = project.get("exportSettings").filter(|v| !v.is_null()) {
            self.settings(settings, "exportSettings");
        }
        if let Some(history) = project.get("versionHistory").filter(|v| !v.is_null()) {
            if let Some(entries) = self.array(history, "versionHistory") {
                for (i, entry) in entries.iter().enumerate() {
                    let path = format!("versionHistory[{}]", i);
                    if let Some(entry) = self.object(entry, &path) {
                        self.required_string(entry, &path, "version");
                        self.required_date(entry, &path, "timestamp");
                    }
                }
            }
        }
    }

    fn metadata(&mut self, value: &Value, path: &str) {
        let Some(metadata) = self.object(value, path) else {
            return;
        };

        for key in ["id", "name", "version"] {
            self.required_string(metadata, path, key);
        }
        self.required_date(metadata, path, "createdAt");
        self.required_date(metadata, path, "updatedAt");
        self.optional_string(metadata, path, "author");
        self.optional_string(metadata, path, "description");

        if let Some(tags) = metadata.get("tags").filter(|v| !v.is_null()) {
            let field = join(path, "tags");
            if let Some(tags) = self.array(tags, &field) {
                for (i, tag) in tags.iter().enumerate() {
                    self.string(tag, &format!("{}[{}]", field, i));
                }
            }
        }

        for key in ["fileSize", "snapshotCount", "totalDuration"] {
            self.non_negative(metadata, path, key);
        }
        if let Some(size) = metadata.get("fileSize").and_then(Value::as_f64) {
            if size > self.limits.max_file_size as f64 {
                self.warn(
                    join(path, "fileSize"),
                    format!(
                        "File size {} bytes exceeds the recommended maximum of {} bytes",
                        size, self.limits.max_file_size
                    ),
                );
            }
        }
    }

    fn document(&mut self, value: &Value, path: &str) {
        let Some(document) = self.object(value, path) else {
            return;
        };

        if let Some(language) = self.required_string(document, path, "language") {
            if !KNOWN_LANGUAGES.contains(&language.to_ascii_lowercase().as_str()) {
                self.warn(join(path, "language"), format!("Unknown language: {}", language));
            }
        }

        if let Some(snapshots) = self.required(document, path, "snapshots") {
            self.snapshots(snapshots, &join(path, "snapshots"));
        }

        if let Some(font_size) = self.required_number(document, path, "fontSize") {
            if font_size < FONT_SIZE_RANGE.0 || font_size > FONT_SIZE_RANGE.1 {
                self.warn(
                    join(path, "fontSize"),
                    format!(
                        "Font size {} is outside the recommended range {}-{}",
                        font_size, FONT_SIZE_RANGE.0, FONT_SIZE_RANGE.1
                    ),
                );
            }
        }
        self.required_number(document, path, "lineHeight");

        let width = self.required_number(document, path, "width");
        let height = self.required_number(document, path, "height");
        for (key, dimension) in [("width", width), ("height", height)] {
            if matches!(dimension, Some(d) if d <= 0.0) {
                self.error(join(path, key), format!("{} must be positive", key));
            }
        }
        if let (Some(w), Some(h)) = (width, height) {
            if w > 0.0 && h > 0.0 {
                let ratio = w / h;
                if ratio < ASPECT_RATIO_RANGE.0 || ratio > ASPECT_RATIO_RANGE.1 {
                    self.warn(
                        join(path, "width"),
                        format!("Unusual aspect ratio {:.2} ({}x{})", ratio, w, h),
                    );
                }
            }
        }

        self.required_string(document, path, "theme");

        if let Some(padding) = self.required(document, path, "padding") {
            let padding_path = join(path, "padding");
            if let Some(padding) = self.object(padding, &padding_path) {
                for side in ["top", "right", "bottom", "left"] {
                    self.non_negative(padding, &padding_path, side);
                }
            }
        }
    }

    fn snapshots(&mut self, value: &Value, path: &str) {
        let Some(snapshots) = self.array(value, path) else {
            return;
        };

        if snapshots.is_empty() {
            self.error(path, "At least one snapshot is required");
            return;
        }
        if snapshots.len() > self.limits.max_snapshots {
            self.warn(
                path,
                format!(
                    "{} snapshots exceed the recommended maximum of {}",
                    snapshots.len(),
                    self.limits.max_snapshots
                ),
            );
        }

        let mut seen = HashSet::new();
        let mut total_duration = 0.0;
        for (i, snapshot) in snapshots.iter().enumerate() {
            let snapshot_path = format!("{}[{}]", path, i);
            if let Some((id, duration)) = self.snapshot(snapshot, &snapshot_path) {
                if let Some(id) = id {
                    if !seen.insert(id) {
                        self.error(
                            join(&snapshot_path, "id"),
                            format!("Duplicate snapshot ID: {}", id),
                        );
                    }
                }
                total_duration += duration.unwrap_or(0.0);
            }
        }

        if total_duration > TOTAL_DURATION_RANGE.1 {
            self.warn(
                path,
                format!("Total duration {}ms is unusually long", total_duration),
            );
        } else if total_duration < TOTAL_DURATION_RANGE.0 {
            self.warn(
                path,
                format!("Total duration {}ms is unusually short", total_duration),
            );
        }
    }

    /// Returns the snapshot id and duration when the value is an object
    fn snapshot<'v>(&mut self, value: &'v Value, path: &str) -> Option<(Option<&'v str>, Option<f64>)> {
        let snapshot = self.object(value, path)?;

        let id = self.required_string(snapshot, path, "id");
        if let Some(code) = self.required_string(snapshot, path, "code") {
            self.code(code, &join(path, "code"));
        }

        let duration = self.required_number(snapshot, path, "duration");
        if let Some(duration) = duration {
            if duration <= 0.0 {
                self.error(join(path, "duration"), "Duration must be positive");
            } else if duration > MAX_SNAPSHOT_DURATION {
                self.warn(
                    join(path, "duration"),
                    format!("Duration {}ms exceeds {}ms", duration, MAX_SNAPSHOT_DURATION),
                );
            }
        }

        if let Some(transition) = self.required_number(snapshot, path, "transitionTime") {
            if matches!(duration, Some(d) if transition > d) {
                self.error(
                    join(path, "transitionTime"),
                    "Transition time cannot exceed duration",
                );
            }
        }

        Some((id, duration))
    }

    fn code(&mut self, code: &str, field: &str) {
        if code.trim().is_empty() {
            self.warn(field, "Code is empty or whitespace only");
            return;
        }

        let length = code.chars().count();
        if length > MAX_CODE_LENGTH {
            self.warn(
                field,
                format!("Code is {} characters long (recommended maximum {})", length, MAX_CODE_LENGTH),
            );
        }
        if let Some((line, _)) = code
            .lines()
            .enumerate()
            .find(|(_, l)| l.chars().count() > MAX_LINE_LENGTH)
        {
            self.warn(
                field,
                format!("Line {} is longer than {} characters", line + 1, MAX_LINE_LENGTH),
            );
        }
    }

    fn themes(&mut self, value: &Value, path: &str) {
        let Some(themes) = self.array(value, path) else {
            return;
        };

        let mut seen = HashSet::new();
        for (i, theme) in themes.iter().enumerate() {
            let theme_path = format!("{}[{}]", path, i);
            let Some(theme) = self.object(theme, &theme_path) else {
                continue;
            };

            if let Some(id) = self.required_string(theme, &theme_path, "id") {
                if !seen.insert(id) {
                    self.error(join(&theme_path, "id"), format!("Duplicate theme ID: {}", id));
                }
            }
            self.required_string(theme, &theme_path, "name");
            self.optional_bool(theme, &theme_path, "dark");

            if let Some(colors) = theme.get("colors").filter(|v| !v.is_null()) {
                let colors_path = join(&theme_path, "colors");
                if let Some(colors) = self.object(colors, &colors_path) {
                    for (role, color) in colors {
                        self.string(color, &join(&colors_path, role));
                    }
                }
            }
        }
    }

    fn presets(&mut self, value: &Value, path: &str) {
        let Some(presets) = self.array(value, path) else {
            return;
        };

        let mut seen = HashSet::new();
        for (i, preset) in presets.iter().enumerate() {
            let preset_path = format!("{}[{}]", path, i);
            let Some(preset) = self.object(preset, &preset_path) else {
                continue;
            };

            if let Some(id) = self.required_string(preset, &preset_path, "id") {
                if !seen.insert(id) {
                    self.error(join(&preset_path, "id"), format!("Duplicate preset ID: {}", id));
                }
            }
            self.required_string(preset, &preset_path, "name");
            self.optional_string(preset, &preset_path, "description");
            self.optional_string(preset, &preset_path, "theme");
            for key in ["fontSize", "lineHeight", "width", "height", "duration", "transitionTime"] {
                self.non_negative(preset, &preset_path, key);
            }
        }
    }

    fn settings(&mut self, value: &Value, path: &str) {
        let Some(settings) = self.object(value, path) else {
            return;
        };

        if let Some(format) = self.optional_string(settings, path, "format") {
            if format.parse::<FileFormat>().is_err() {
                self.error(join(path, "format"), format!("Unsupported format: {}", format));
            }
        }
        for key in ["pretty", "includeThemes", "includePresets"] {
            self.optional_bool(settings, path, key);
        }
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}
