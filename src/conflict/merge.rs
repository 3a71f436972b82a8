//! Structural merge per entity type
//!
//! Each entity merges field by field with statically known types. Scalars
//! take the incoming value, optional fields fall back to the existing value,
//! lists are unioned by value and string maps are unioned with incoming
//! entries winning. Documents merge their snapshot lists by id.

use std::collections::BTreeMap;

use crate::error::{ReelError, ReelResult};
use crate::models::{Document, EntityValue, Padding, Preset, ProjectMetadata, Snapshot, Theme};

/// Merge two versions of the same entity
pub trait Merge {
    /// Combine `self` (existing) with `incoming`; incoming wins on collisions
    fn merge(&self, incoming: &Self) -> Self;
}

/// Incoming value when present, else the existing one
pub fn merge_option<T: Clone>(existing: &Option<T>, incoming: &Option<T>) -> Option<T> {
    incoming.clone().or_else(|| existing.clone())
}

/// Existing items in order, then incoming items not already present
///
/// Uniqueness is full value equality, so this is quadratic in list length.
pub fn union_by_value<T: Clone + PartialEq>(existing: &[T], incoming: &[T]) -> Vec<T> {
    let mut merged = existing.to_vec();
    for item in incoming {
        if !merged.contains(item) {
            merged.push(item.clone());
        }
    }
    merged
}

/// Union of two maps, incoming entries winning
pub fn merge_maps<K: Ord + Clone, V: Clone>(
    existing: &BTreeMap<K, V>,
    incoming: &BTreeMap<K, V>,
) -> BTreeMap<K, V> {
    let mut merged = existing.clone();
    merged.extend(incoming.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

impl Merge for ProjectMetadata {
    fn merge(&self, incoming: &Self) -> Self {
        Self {
            id: incoming.id.clone(),
            name: incoming.name.clone(),
            version: incoming.version.clone(),
            author: merge_option(&self.author, &incoming.author),
            description: merge_option(&self.description, &incoming.description),
            created_at: incoming.created_at,
            updated_at: incoming.updated_at,
            tags: union_by_value(&self.tags, &incoming.tags),
            file_size: incoming.file_size,
            snapshot_count: incoming.snapshot_count,
            total_duration: incoming.total_duration,
        }
    }
}

impl Merge for Padding {
    fn merge(&self, incoming: &Self) -> Self {
        *incoming
    }
}

impl Merge for Snapshot {
    fn merge(&self, incoming: &Self) -> Self {
        incoming.clone()
    }
}

impl Merge for Document {
    fn merge(&self, incoming: &Self) -> Self {
        let mut snapshots: Vec<Snapshot> = self
            .snapshots
            .iter()
            .map(|existing| match incoming.snapshot(&existing.id) {
                Some(other) => existing.merge(other),
                None => existing.clone(),
            })
            .collect();
        for snapshot in &incoming.snapshots {
            if self.snapshot(&snapshot.id).is_none() {
                snapshots.push(snapshot.clone());
            }
        }

        Self {
            language: incoming.language.clone(),
            snapshots,
            font_size: incoming.font_size,
            line_height: incoming.line_height,
            width: incoming.width,
            height: incoming.height,
            theme: incoming.theme.clone(),
            padding: self.padding.merge(&incoming.padding),
        }
    }
}

impl Merge for Theme {
    fn merge(&self, incoming: &Self) -> Self {
        Self {
            id: incoming.id.clone(),
            name: incoming.name.clone(),
            dark: merge_option(&self.dark, &incoming.dark),
            colors: merge_maps(&self.colors, &incoming.colors),
        }
    }
}

impl Merge for Preset {
    fn merge(&self, incoming: &Self) -> Self {
        Self {
            id: incoming.id.clone(),
            name: incoming.name.clone(),
            description: merge_option(&self.description, &incoming.description),
            font_size: merge_option(&self.font_size, &incoming.font_size),
            line_height: merge_option(&self.line_height, &incoming.line_height),
            width: merge_option(&self.width, &incoming.width),
            height: merge_option(&self.height, &incoming.height),
            theme: merge_option(&self.theme, &incoming.theme),
            duration: merge_option(&self.duration, &incoming.duration),
            transition_time: merge_option(&self.transition_time, &incoming.transition_time),
        }
    }
}

/// Merge two entity values of the same kind
///
/// Fails when the two values wrap different entity kinds.
pub fn merge_entities(existing: &EntityValue, incoming: &EntityValue) -> ReelResult<EntityValue> {
    let merged = match (existing, incoming) {
        (EntityValue::Metadata(e), EntityValue::Metadata(i)) => EntityValue::Metadata(e.merge(i)),
        (EntityValue::Document(e), EntityValue::Document(i)) => EntityValue::Document(e.merge(i)),
        (EntityValue::Snapshot(e), EntityValue::Snapshot(i)) => EntityValue::Snapshot(e.merge(i)),
        (EntityValue::Theme(e), EntityValue::Theme(i)) => EntityValue::Theme(e.merge(i)),
        (EntityValue::Preset(e), EntityValue::Preset(i)) => EntityValue::Preset(e.merge(i)),
        (e, i) => {
            return Err(ReelError::Conflict(format!(
                "cannot merge {} '{}' with {} '{}'",
                e.data_type(),
                e.id(),
                i.data_type(),
                i.id()
            )))
        }
    };
    Ok(merged)
}
