//! Conflict detection between incoming and existing project data

use std::collections::HashMap;

use serde::Serialize;

use super::diff::find_differences;
use crate::models::{
    ConflictItem, ConflictType, EntityValue, PartialProject, Preset, ProjectData, Snapshot, Theme,
};

/// Metadata fields recomputed on every commit; differences there are noise
const DERIVED_METADATA_FIELDS: &[&str] = &["fileSize", "snapshotCount", "totalDuration"];

/// Find every entity present on both sides with differing content
///
/// Without existing data there is nothing to collide with. Metadata only
/// conflicts when both sides carry the same project id.
pub fn detect_conflicts(incoming: &PartialProject, existing: Option<&ProjectData>) -> Vec<ConflictItem> {
    let Some(existing) = existing else {
        return Vec::new();
    };

    let mut conflicts = Vec::new();

    if let Some(metadata) = &incoming.metadata {
        if metadata.id == existing.metadata.id {
            let differences = diff(&existing.metadata, metadata, DERIVED_METADATA_FIELDS);
            if !differences.is_empty() {
                let conflict_type = if metadata.version != existing.metadata.version {
                    ConflictType::VersionConflict
                } else {
                    ConflictType::DataMismatch
                };
                conflicts.push(ConflictItem::new(
                    conflict_type,
                    EntityValue::Metadata(existing.metadata.clone()),
                    EntityValue::Metadata(metadata.clone()),
                    differences,
                ));
            }
        }
    }

    if let Some(document) = &incoming.document {
        let differences = diff(&existing.document, document, &["snapshots"]);
        if !differences.is_empty() {
            conflicts.push(ConflictItem::new(
                ConflictType::DataMismatch,
                EntityValue::Document(existing.document.clone()),
                EntityValue::Document(document.clone()),
                differences,
            ));
        }

        let by_id: HashMap<&str, _> = existing
            .document
            .snapshots
            .iter()
            .map(|s| (s.id.as_str(), s))
            .collect();
        for snapshot in &document.snapshots {
            if let Some(current) = by_id.get(snapshot.id.as_str()) {
                let differences = diff(*current, snapshot, &[]);
                if !differences.is_empty() {
                    conflicts.push(ConflictItem::new(
                        ConflictType::IdCollision,
                        EntityValue::Snapshot((*current).clone()),
                        EntityValue::Snapshot(snapshot.clone()),
                        differences,
                    ));
                }
            }
        }
    }

    if let Some(themes) = &incoming.themes {
        conflicts.extend(keyed_conflicts(existing.themes(), themes, EntityValue::Theme));
    }
    if let Some(presets) = &incoming.presets {
        conflicts.extend(keyed_conflicts(existing.presets(), presets, EntityValue::Preset));
    }

    tracing::debug!(count = conflicts.len(), "Conflict detection finished");
    conflicts
}

fn diff<T: Serialize>(existing: &T, incoming: &T, exclude: &[&str]) -> Vec<crate::models::ConflictDifference> {
    let existing = serde_json::to_value(existing).unwrap_or_default();
    let incoming = serde_json::to_value(incoming).unwrap_or_default();
    find_differences(&existing, &incoming, exclude)
}

/// Entities matched across sides by a string id
pub(crate) trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Snapshot {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Theme {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Preset {
    fn key(&self) -> &str {
        &self.id
    }
}

fn keyed_conflicts<T, W>(existing: &[T], incoming: &[T], wrap: W) -> Vec<ConflictItem>
where
    T: Keyed + Serialize + Clone,
    W: Fn(T) -> EntityValue,
{
    let by_id: HashMap<&str, &T> = existing.iter().map(|item| (item.key(), item)).collect();

    incoming
        .iter()
        .filter_map(|item| {
            let current = *by_id.get(item.key())?;
            let differences = diff(current, item, &[]);
            (!differences.is_empty()).then(|| {
                ConflictItem::new(
                    ConflictType::IdCollision,
                    wrap(current.clone()),
                    wrap(item.clone()),
                    differences,
                )
            })
        })
        .collect()
}
