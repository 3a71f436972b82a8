//! Conflict models
//!
//! A conflict records one entity that exists on both the incoming and the
//! existing side with differing content, together with the field-level
//! differences and, once resolved, the chosen resolution.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::document::{Document, Snapshot};
use super::project::{Preset, ProjectMetadata, Theme};
use super::DataType;
use crate::error::ReelError;

/// Why two entities collide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictType {
    IdCollision,
    NameCollision,
    DataMismatch,
    VersionConflict,
    DependencyConflict,
}

/// How a single field differs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DifferenceKind {
    /// Same primitive type, different value
    ValueChange,
    /// Different primitive types
    TypeChange,
    /// Missing from the existing side
    Addition,
    /// Missing from the incoming side
    Deletion,
}

/// One differing field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictDifference {
    pub field: String,
    pub existing_value: Option<Value>,
    pub incoming_value: Option<Value>,
    pub kind: DifferenceKind,
}

/// A typed entity taking part in a conflict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum EntityValue {
    Metadata(ProjectMetadata),
    Document(Document),
    Snapshot(Snapshot),
    Theme(Theme),
    Preset(Preset),
}

impl EntityValue {
    /// Identifier of the wrapped entity ("document" for documents)
    pub fn id(&self) -> &str {
        match self {
            Self::Metadata(m) => &m.id,
            Self::Document(_) => "document",
            Self::Snapshot(s) => &s.id,
            Self::Theme(t) => &t.id,
            Self::Preset(p) => &p.id,
        }
    }

    /// The data type this entity belongs to
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Metadata(_) => DataType::Project,
            Self::Document(_) => DataType::Document,
            Self::Snapshot(_) => DataType::Snapshots,
            Self::Theme(_) => DataType::Themes,
            Self::Preset(_) => DataType::Presets,
        }
    }
}

/// Policy applied to resolve conflicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// Always take the incoming value
    Overwrite,
    /// Always keep the existing value
    Skip,
    /// Structural merge, incoming wins on scalar collisions
    #[default]
    Merge,
    /// Keep the existing value and add the incoming one under a new id
    CreateNew,
    /// Caller-driven; resolves as `Merge` when applied automatically
    Interactive,
}

impl ResolutionStrategy {
    /// The strategy actually applied by the resolver
    pub fn effective(&self) -> Self {
        match self {
            Self::Interactive => Self::Merge,
            other => *other,
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overwrite => write!(f, "overwrite"),
            Self::Skip => write!(f, "skip"),
            Self::Merge => write!(f, "merge"),
            Self::CreateNew => write!(f, "create-new"),
            Self::Interactive => write!(f, "interactive"),
        }
    }
}

impl FromStr for ResolutionStrategy {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "skip" => Ok(Self::Skip),
            "merge" => Ok(Self::Merge),
            "create-new" | "createnew" => Ok(Self::CreateNew),
            "interactive" => Ok(Self::Interactive),
            _ => Err(ReelError::Conflict(format!(
                "unsupported conflict resolution strategy: {}",
                s
            ))),
        }
    }
}

/// How a conflict was resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResolution {
    /// Strategy that was requested
    pub strategy: ResolutionStrategy,
    /// The value that won
    pub value: EntityValue,
    /// Explanation when the resolver had to fall back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One detected collision between incoming and existing data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictItem {
    pub id: String,

    #[serde(rename = "type")]
    pub entity_type: DataType,

    pub conflict_type: ConflictType,
    pub existing: EntityValue,
    pub incoming: EntityValue,
    pub differences: Vec<ConflictDifference>,

    #[serde(default)]
    pub resolved: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ConflictResolution>,
}

impl ConflictItem {
    /// Create an unresolved conflict
    pub fn new(
        conflict_type: ConflictType,
        existing: EntityValue,
        incoming: EntityValue,
        differences: Vec<ConflictDifference>,
    ) -> Self {
        Self {
            id: incoming.id().to_string(),
            entity_type: incoming.data_type(),
            conflict_type,
            existing,
            incoming,
            differences,
            resolved: false,
            resolution: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            "overwrite".parse::<ResolutionStrategy>().unwrap(),
            ResolutionStrategy::Overwrite
        );
        assert_eq!(
            "CREATE_NEW".parse::<ResolutionStrategy>().unwrap(),
            ResolutionStrategy::CreateNew
        );
        assert_eq!(
            "create-new".parse::<ResolutionStrategy>().unwrap(),
            ResolutionStrategy::CreateNew
        );
    }

    #[test]
    fn test_unknown_strategy_fails_fast() {
        let err = "coin-flip".parse::<ResolutionStrategy>().unwrap_err();
        assert!(err
            .to_string()
            .contains("unsupported conflict resolution strategy"));
        assert_eq!(err.kind(), crate::error::ErrorKind::ConflictError);
    }

    #[test]
    fn test_interactive_resolves_as_merge() {
        assert_eq!(
            ResolutionStrategy::Interactive.effective(),
            ResolutionStrategy::Merge
        );
        assert_eq!(ResolutionStrategy::Skip.effective(), ResolutionStrategy::Skip);
    }

    #[test]
    fn test_conflict_item_takes_identity_from_incoming() {
        let existing = EntityValue::Snapshot(Snapshot::new("s1", "a", 1000));
        let incoming = EntityValue::Snapshot(Snapshot::new("s1", "b", 1000));
        let item = ConflictItem::new(ConflictType::IdCollision, existing, incoming, vec![]);
        assert_eq!(item.id, "s1");
        assert_eq!(item.entity_type, DataType::Snapshots);
        assert!(!item.resolved);
    }

    #[test]
    fn test_entity_value_serialization_is_tagged() {
        let value = EntityValue::Snapshot(Snapshot::new("s1", "a", 1000));
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["kind"], "snapshot");
        assert_eq!(json["value"]["id"], "s1");
    }
}
