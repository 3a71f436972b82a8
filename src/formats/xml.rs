//! XML codec
//!
//! Each field is an element. On read, attributes become object keys,
//! repeated child tags become arrays and leaf text is type-coerced unless
//! the field is known to hold a string. Code bodies travel in CDATA
//! sections, which are never coerced.
//!
//! The root tag decides the shape: `<project>`, `<document>` or
//! `<snapshots>`. Any other root falls back to structural shape detection.

use std::collections::HashSet;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Number, Value};

use super::{ParsedPayload, SerializeOptions, EXPORT_VERSION};
use crate::error::{ReelError, ReelResult};
use crate::models::timestamp::{self, format_timestamp};
use crate::models::{FileFormat, PartialProject};

/// Fields that always hold lists
const LIST_FIELDS: &[&str] = &["snapshots", "themes", "presets", "tags", "versionHistory"];

/// Fields whose values are strings even when they look numeric
const STRING_FIELDS: &[&str] = &[
    "id",
    "name",
    "version",
    "language",
    "theme",
    "author",
    "description",
    "tag",
    "code",
];

/// Fields written as CDATA
const CDATA_FIELDS: &[&str] = &["code"];

const INDENT_SIZE: usize = 2;

// -- writing ------------------------------------------------------------------

/// Serialize a partial project as XML text
pub fn serialize(data: &PartialProject, options: &SerializeOptions) -> ReelResult<String> {
    let value = serde_json::to_value(data).map_err(write_error)?;

    let mut writer = if options.pretty {
        Writer::new_with_indent(Vec::new(), b' ', INDENT_SIZE)
    } else {
        Writer::new(Vec::new())
    };
    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let exported_at = format_timestamp(&timestamp::now());
    let mut attributes = Vec::new();
    if options.include_export_info {
        attributes.push(("exportedAt", exported_at.as_str()));
        attributes.push(("exportVersion", EXPORT_VERSION));
    }
    write_element(&mut writer, "project", &attributes, &value)?;

    String::from_utf8(writer.into_inner()).map_err(write_error)
}

fn write_error(message: impl std::fmt::Display) -> ReelError {
    ReelError::Export(format!("Failed to write XML: {}", message))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> ReelResult<()> {
    writer.write_event(event).map_err(write_error)
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    attributes: &[(&str, &str)],
    value: &Value,
) -> ReelResult<()> {
    if value.is_null() {
        return Ok(());
    }

    let mut start = BytesStart::new(name);
    for attribute in attributes {
        start.push_attribute(*attribute);
    }

    match value {
        Value::Object(map) => {
            emit(writer, Event::Start(start))?;
            for (key, child) in map {
                write_element(writer, key, &[], child)?;
            }
        }
        Value::Array(items) => {
            let item_name = singular(name);
            emit(writer, Event::Start(start))?;
            for item in items {
                write_element(writer, &item_name, &[], item)?;
            }
        }
        Value::String(text) if CDATA_FIELDS.contains(&name) => {
            emit(writer, Event::Start(start))?;
            for section in cdata_sections(text) {
                emit(writer, Event::CData(BytesCData::new(section)))?;
            }
        }
        scalar => {
            let text = match scalar {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            emit(writer, Event::Start(start))?;
            emit(writer, Event::Text(BytesText::new(&text)))?;
        }
    }
    emit(writer, Event::End(BytesEnd::new(name)))
}

/// Child tag for an element of a list: `snapshots` -> `snapshot`
fn singular(name: &str) -> String {
    match name {
        "versionHistory" => "version".to_string(),
        _ => match name.strip_suffix('s') {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => "item".to_string(),
        },
    }
}

/// Split text into CDATA bodies, breaking any embedded `]]>` across two sections
fn cdata_sections(text: &str) -> Vec<String> {
    let parts: Vec<&str> = text.split("]]>").collect();
    let last = parts.len() - 1;
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let head = if i > 0 { ">" } else { "" };
            let tail = if i < last { "]]" } else { "" };
            format!("{}{}{}", head, part, tail)
        })
        .collect()
}

// -- reading ------------------------------------------------------------------

#[derive(Default)]
struct Frame {
    name: String,
    children: Map<String, Value>,
    repeated: HashSet<String>,
    has_children: bool,
    text: String,
    cdata: bool,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    fn push_child(&mut self, name: String, value: Value) {
        self.has_children = true;
        match self.children.get_mut(&name) {
            Some(Value::Array(items)) if self.repeated.contains(&name) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
                self.repeated.insert(name);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }

    fn into_value(self) -> Value {
        if self.has_children {
            let mut children = self.children;
            let text = self.text.trim();
            if !text.is_empty() {
                children.insert("#text".to_string(), coerce(text));
            }
            Value::Object(children)
        } else if self.cdata {
            Value::String(self.text)
        } else {
            leaf(&self.name, &self.text)
        }
    }
}

/// Parse XML text into a shaped payload
pub fn parse(text: &str) -> ReelResult<ParsedPayload> {
    let (root, value) = parse_tree(text)?;
    let value = normalize(Some(&root), value);

    match root.as_str() {
        "project" => match value {
            Value::Object(_) => Ok(ParsedPayload::Project(value)),
            _ => Ok(ParsedPayload::Project(Value::Object(Map::new()))),
        },
        "document" => Ok(ParsedPayload::Document(value)),
        "snapshots" => match value {
            Value::Array(items) => Ok(ParsedPayload::Snapshots(items)),
            other => ParsedPayload::from_value(other, FileFormat::Xml),
        },
        _ => ParsedPayload::from_value(value, FileFormat::Xml),
    }
}

fn xml_error(message: impl std::fmt::Display) -> ReelError {
    ReelError::parse(FileFormat::Xml, message.to_string())
}

fn start_frame(element: &BytesStart<'_>) -> ReelResult<Frame> {
    let mut frame = Frame::new(String::from_utf8_lossy(element.name().as_ref()).into_owned());
    for attribute in element.attributes() {
        let attribute = attribute.map_err(xml_error)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(xml_error)?;
        let value = leaf(&key, &value);
        frame.push_child(key, value);
    }
    Ok(frame)
}

/// Build the element tree, returning the root tag and its value
fn parse_tree(text: &str) -> ReelResult<(String, Value)> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            xml_error(format!("error at position {}: {}", reader.buffer_position(), e))
        })?;

        match event {
            Event::Start(element) => {
                if root.is_some() && stack.is_empty() {
                    return Err(xml_error("multiple root elements"));
                }
                stack.push(start_frame(&element)?);
            }
            Event::Empty(element) => {
                if root.is_some() && stack.is_empty() {
                    return Err(xml_error("multiple root elements"));
                }
                let frame = start_frame(&element)?;
                close_frame(frame, &mut stack, &mut root);
            }
            Event::Text(text) => {
                if let Some(frame) = stack.last_mut() {
                    let text = text.unescape().map_err(xml_error)?;
                    frame.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    let bytes = data.into_inner();
                    frame.text.push_str(&String::from_utf8_lossy(&bytes));
                    frame.cdata = true;
                }
            }
            Event::End(_) => match stack.pop() {
                Some(frame) => close_frame(frame, &mut stack, &mut root),
                None => return Err(xml_error("unexpected closing tag")),
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(xml_error(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| xml_error("document has no root element"))
}

fn close_frame(frame: Frame, stack: &mut [Frame], root: &mut Option<(String, Value)>) {
    let name = frame.name.clone();
    let value = frame.into_value();
    match stack.last_mut() {
        Some(parent) => parent.push_child(name, value),
        None => *root = Some((name, value)),
    }
}

/// Value of a leaf element or attribute
///
/// String fields keep their raw text, empty included. Other empty leaves
/// are absent.
fn leaf(name: &str, text: &str) -> Value {
    if STRING_FIELDS.contains(&name) {
        Value::String(text.to_string())
    } else if text.is_empty() {
        Value::Null
    } else {
        coerce(text)
    }
}

/// Type-coerce leaf text
fn coerce(text: &str) -> Value {
    let trimmed = text.trim();

    if is_integer(trimmed) {
        if let Ok(n) = trimmed.parse::<i64>() {
            return Value::from(n);
        }
    }
    if is_decimal(trimmed) {
        if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }
    match trimmed {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    let wrapped = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    if wrapped {
        if let Ok(nested) = serde_json::from_str(trimmed) {
            return nested;
        }
    }
    Value::String(text.to_string())
}

/// `-?\d+`
fn is_integer(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// `-?\d*\.\d+`
fn is_decimal(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    match unsigned.split_once('.') {
        Some((whole, fraction)) => {
            whole.bytes().all(|b| b.is_ascii_digit())
                && !fraction.is_empty()
                && fraction.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// Apply field-aware fixes to the element tree
///
/// Empty elements are dropped and list fields always become arrays.
fn normalize(key: Option<&str>, value: Value) -> Value {
    let value = match value {
        Value::Object(map) => {
            let mut normalized = Map::new();
            for (child_key, child) in map {
                let child = normalize(Some(&child_key), child);
                if !child.is_null() {
                    normalized.insert(child_key, child);
                }
            }
            Value::Object(normalized)
        }
        Value::Array(items) => {
            let item_key = key.filter(|k| !LIST_FIELDS.contains(k));
            Value::Array(items.into_iter().map(|v| normalize(item_key, v)).collect())
        }
        other => other,
    };

    match key {
        Some(k) if LIST_FIELDS.contains(&k) => into_list(value),
        _ => value,
    }
}

/// Unwrap `<snapshots><snapshot/>...</snapshots>` style containers
fn into_list(value: Value) -> Value {
    match value {
        Value::Null => Value::Array(Vec::new()),
        Value::String(s) if s.trim().is_empty() => Value::Array(Vec::new()),
        Value::Array(items) => Value::Array(items),
        Value::Object(map) if map.is_empty() => Value::Array(Vec::new()),
        Value::Object(map) if map.len() == 1 => match map.into_iter().next() {
            Some((_, Value::Array(items))) => Value::Array(items),
            Some((_, single)) => Value::Array(vec![single]),
            None => Value::Array(Vec::new()),
        },
        other => Value::Array(vec![other]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataType, Document, ProjectMetadata, Snapshot};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn round_trip(data: &PartialProject) -> PartialProject {
        let text = serialize(data, &SerializeOptions::default()).unwrap();
        parse(&text).unwrap().into_partial(FileFormat::Xml).unwrap()
    }

    #[test]
    fn test_markup_in_text_is_escaped() {
        let mut metadata = ProjectMetadata::new(r#"<a href="x">Tom & 'Jerry'</a>"#);
        metadata.description = Some("1 < 2 && 3 > 2".to_string());
        let data = PartialProject {
            metadata: Some(metadata),
            ..Default::default()
        };

        let text = serialize(&data, &SerializeOptions::default()).unwrap();
        assert!(text.contains("&lt;a href="));
        assert!(!text.contains("<a href"));
        assert_eq!(round_trip(&data), data);
    }

    #[test]
    fn test_numeric_looking_strings_round_trip() {
        let mut metadata = ProjectMetadata::new("Reel");
        metadata.id = "0042".to_string();
        metadata.version = "1.10".to_string();
        metadata.tags = vec!["007".to_string(), "true".to_string()];
        let data = PartialProject {
            metadata: Some(metadata),
            document: Some(Document::with_snapshots(vec![Snapshot::new("007", "1.50", 1000)])),
            ..Default::default()
        };

        let parsed = round_trip(&data);
        assert_eq!(parsed, data);
        assert_eq!(parsed.snapshots()[0].id, "007");
    }

    #[test]
    fn test_empty_strings_round_trip() {
        let mut metadata = ProjectMetadata::new("Reel");
        metadata.description = Some(String::new());
        let mut document = Document::with_snapshots(vec![Snapshot::new("s1", "", 1000)]);
        document.theme = String::new();
        let data = PartialProject {
            metadata: Some(metadata),
            document: Some(document),
            ..Default::default()
        };

        let parsed = round_trip(&data);
        assert_eq!(parsed, data);
        assert_eq!(parsed.document.unwrap().theme, "");
    }

    #[test]
    fn test_code_is_written_as_cdata() {
        let data = PartialProject {
            document: Some(Document::with_snapshots(vec![Snapshot::new(
                "s1",
                "if (a < b && c) { x = ']]>'; }",
                1000,
            )])),
            ..Default::default()
        };
        let text = serialize(&data, &SerializeOptions::default()).unwrap();
        assert!(text.contains("<code><![CDATA[if (a < b && c)"));

        let parsed = parse(&text).unwrap().into_partial(FileFormat::Xml).unwrap();
        assert_eq!(parsed.snapshots()[0].code, "if (a < b && c) { x = ']]>'; }");
    }

    #[test]
    fn test_compact_output_has_no_newlines() {
        let data = PartialProject {
            document: Some(Document::with_snapshots(vec![Snapshot::new("s1", "x", 1000)])),
            ..Default::default()
        };
        let options = SerializeOptions {
            pretty: false,
            include_export_info: false,
            ..Default::default()
        };
        let text = serialize(&data, &options).unwrap();
        assert!(!text.contains('\n'));
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?><project><document>"));
    }

    #[test]
    fn test_leaf_coercion() {
        assert_eq!(coerce("42"), json!(42));
        assert_eq!(coerce("-7"), json!(-7));
        assert_eq!(coerce("1.5"), json!(1.5));
        assert_eq!(coerce(".5"), json!(0.5));
        assert_eq!(coerce("true"), json!(true));
        assert_eq!(coerce("false"), json!(false));
        assert_eq!(coerce("{\"a\": 1}"), json!({"a": 1}));
        assert_eq!(coerce("[1, 2]"), json!([1, 2]));
        assert_eq!(coerce("[not json]"), json!("[not json]"));
        assert_eq!(coerce("1.0.0"), json!("1.0.0"));
        assert_eq!(coerce("hello"), json!("hello"));
    }

    #[test]
    fn test_attributes_and_repeated_tags() {
        let payload = parse(
            r#"<document language="rust" fontSize="16">
                 <snapshots>
                   <snapshot id="a"><code>x</code><duration>1000</duration></snapshot>
                   <snapshot id="b"><code>y</code><duration>2000</duration></snapshot>
                 </snapshots>
               </document>"#,
        )
        .unwrap();
        assert_eq!(payload.declared_type(), DataType::Document);

        let value = payload.to_value();
        assert_eq!(value["language"], "rust");
        assert_eq!(value["fontSize"], 16);
        assert_eq!(value["snapshots"][1]["id"], "b");
        assert_eq!(value["snapshots"][1]["duration"], 2000);
    }

    #[test]
    fn test_single_item_lists_are_arrays() {
        let payload = parse(
            "<project><metadata><tags><tag>2024</tag></tags></metadata>\
             <document><snapshots><snapshot><id>1</id><code>x</code><duration>5</duration></snapshot></snapshots></document></project>",
        )
        .unwrap();
        let value = payload.to_value();
        assert_eq!(value["metadata"]["tags"], json!(["2024"]));
        assert_eq!(value["document"]["snapshots"][0]["id"], "1");
        assert_eq!(value["document"]["snapshots"][0]["duration"], 5);
    }

    #[test]
    fn test_numeric_identifiers_stay_strings() {
        let payload = parse(
            "<project><metadata><id>123</id><name>2024</name><version>2</version></metadata></project>",
        )
        .unwrap();
        let value = payload.to_value();
        assert_eq!(value["metadata"]["id"], "123");
        assert_eq!(value["metadata"]["name"], "2024");
        assert_eq!(value["metadata"]["version"], "2");
    }

    #[test]
    fn test_empty_list_and_empty_map() {
        let payload = parse(
            "<project><themes><theme><id>t</id><name>T</name><colors/></theme></themes>\
             <presets></presets></project>",
        )
        .unwrap();
        let value = payload.to_value();
        assert_eq!(value["presets"], json!([]));
        assert!(value["themes"][0].get("colors").is_none());
    }

    #[test]
    fn test_snapshots_root() {
        let payload = parse("<snapshots><snapshot><id>s1</id><code>a</code><duration>10</duration></snapshot></snapshots>").unwrap();
        assert_eq!(payload.declared_type(), DataType::Snapshots);
        assert_eq!(payload.snapshot_count(), 1);
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        for broken in ["<project><document></project>", "<project>", "", "just text"] {
            let err = parse(broken).unwrap_err();
            assert!(
                matches!(err, ReelError::Parse { format: FileFormat::Xml, .. }),
                "{broken:?} gave {err}"
            );
        }
    }
}
