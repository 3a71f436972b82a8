//! Conflict resolution
//!
//! Applies one strategy to a list of conflicts, records the chosen value on
//! each conflict and gathers the winners by entity type for the commit step.

use chrono::Utc;

use super::merge::merge_entities;
use crate::models::{
    ConflictItem, ConflictResolution, Document, EntityValue, Preset, ProjectMetadata,
    ResolutionStrategy, Snapshot, Theme,
};

/// Suffix appended to names of entities copied by `CreateNew`
pub const IMPORTED_SUFFIX: &str = " (Imported)";

/// Winning values of a resolution pass, grouped by entity type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedData {
    pub metadata: Option<ProjectMetadata>,
    pub document: Option<Document>,
    /// Replace the snapshot with the same id, or append when the id is new
    pub snapshots: Vec<Snapshot>,
    pub themes: Vec<Theme>,
    pub presets: Vec<Preset>,
    /// Explanations for conflicts that fell back to the existing value
    pub notes: Vec<String>,
}

impl ResolvedData {
    fn absorb(&mut self, value: EntityValue) {
        match value {
            EntityValue::Metadata(m) => self.metadata = Some(m),
            EntityValue::Document(d) => self.document = Some(d),
            EntityValue::Snapshot(s) => self.snapshots.push(s),
            EntityValue::Theme(t) => self.themes.push(t),
            EntityValue::Preset(p) => self.presets.push(p),
        }
    }
}

/// Resolve every conflict with one strategy
///
/// Each conflict is marked resolved and carries its resolution afterwards.
pub fn resolve_conflicts(conflicts: &mut [ConflictItem], strategy: ResolutionStrategy) -> ResolvedData {
    let mut resolved = ResolvedData::default();

    for conflict in conflicts.iter_mut() {
        let resolution = resolve_conflict(conflict, strategy);
        if let Some(note) = &resolution.note {
            tracing::warn!(conflict_id = %conflict.id, note = %note, "Conflict resolution fell back");
            resolved.notes.push(format!("{} '{}': {}", conflict.entity_type, conflict.id, note));
        }
        resolved.absorb(resolution.value.clone());
        conflict.resolved = true;
        conflict.resolution = Some(resolution);
    }

    tracing::debug!(
        count = conflicts.len(),
        strategy = %strategy,
        "Resolved conflicts"
    );
    resolved
}

/// Decide the winning value for a single conflict
pub fn resolve_conflict(conflict: &ConflictItem, strategy: ResolutionStrategy) -> ConflictResolution {
    let keep_existing = |note: String| ConflictResolution {
        strategy,
        value: conflict.existing.clone(),
        note: Some(note),
    };

    match strategy.effective() {
        ResolutionStrategy::Overwrite => ConflictResolution {
            strategy,
            value: conflict.incoming.clone(),
            note: None,
        },
        ResolutionStrategy::Skip => ConflictResolution {
            strategy,
            value: conflict.existing.clone(),
            note: None,
        },
        ResolutionStrategy::CreateNew => match create_copy(&conflict.incoming) {
            Some(value) => ConflictResolution {
                strategy,
                value,
                note: None,
            },
            None => keep_existing("a document cannot be copied; kept the existing one".into()),
        },
        // Interactive never survives `effective()`
        ResolutionStrategy::Merge | ResolutionStrategy::Interactive => {
            match merge_entities(&conflict.existing, &conflict.incoming) {
                Ok(value) => ConflictResolution {
                    strategy,
                    value,
                    note: None,
                },
                Err(e) => keep_existing(format!("merge failed ({}); kept the existing value", e)),
            }
        }
    }
}

/// Copy of an entity under a derived id: `<id>-imported-<millis>`
fn create_copy(value: &EntityValue) -> Option<EntityValue> {
    let stamp = Utc::now().timestamp_millis();
    let new_id = |id: &str| format!("{}-imported-{}", id, stamp);
    let new_name = |name: &str| format!("{}{}", name, IMPORTED_SUFFIX);

    match value {
        EntityValue::Metadata(m) => Some(EntityValue::Metadata(ProjectMetadata {
            id: new_id(&m.id),
            name: new_name(&m.name),
            ..m.clone()
        })),
        EntityValue::Snapshot(s) => Some(EntityValue::Snapshot(s.with_id(new_id(&s.id)))),
        EntityValue::Theme(t) => Some(EntityValue::Theme(Theme {
            id: new_id(&t.id),
            name: new_name(&t.name),
            ..t.clone()
        })),
        EntityValue::Preset(p) => Some(EntityValue::Preset(Preset {
            id: new_id(&p.id),
            name: new_name(&p.name),
            ..p.clone()
        })),
        EntityValue::Document(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::diff::find_differences;
    use crate::models::timestamp::parse_timestamp_str;
    use crate::models::ConflictType;

    fn metadata_conflict() -> ConflictItem {
        let created = parse_timestamp_str("2024-03-01T09:00:00.000Z").unwrap();
        let mut existing = ProjectMetadata::new("A");
        existing.id = "p1".into();
        existing.author = Some("ann".into());
        existing.created_at = created;
        existing.updated_at = created;

        let mut incoming = existing.clone();
        incoming.name = "B".into();
        incoming.author = None;
        incoming.description = Some("only incoming".into());

        let existing_json = serde_json::to_value(&existing).unwrap();
        let incoming_json = serde_json::to_value(&incoming).unwrap();
        ConflictItem::new(
            ConflictType::DataMismatch,
            EntityValue::Metadata(existing),
            EntityValue::Metadata(incoming),
            find_differences(&existing_json, &incoming_json, &[]),
        )
    }

    fn resolved_metadata(strategy: ResolutionStrategy) -> ProjectMetadata {
        let mut conflicts = vec![metadata_conflict()];
        let resolved = resolve_conflicts(&mut conflicts, strategy);
        assert!(conflicts[0].resolved);
        resolved.metadata.unwrap()
    }

    #[test]
    fn test_overwrite_takes_incoming() {
        assert_eq!(resolved_metadata(ResolutionStrategy::Overwrite).name, "B");
    }

    #[test]
    fn test_skip_keeps_existing() {
        assert_eq!(resolved_metadata(ResolutionStrategy::Skip).name, "A");
    }

    #[test]
    fn test_merge_prefers_incoming_and_keeps_one_sided_fields() {
        let merged = resolved_metadata(ResolutionStrategy::Merge);
        assert_eq!(merged.name, "B");
        assert_eq!(merged.author.as_deref(), Some("ann"));
        assert_eq!(merged.description.as_deref(), Some("only incoming"));

        assert_eq!(resolved_metadata(ResolutionStrategy::Interactive), merged);
    }

    #[test]
    fn test_create_new_derives_id_and_name() {
        let copy = resolved_metadata(ResolutionStrategy::CreateNew);
        assert!(copy.id.starts_with("p1-imported-"));
        assert_eq!(copy.name, "B (Imported)");
    }

    #[test]
    fn test_create_new_snapshot_is_collected() {
        let existing = Snapshot::new("s1", "a", 1000);
        let incoming = Snapshot::new("s1", "b", 1000);
        let mut conflicts = vec![ConflictItem::new(
            ConflictType::IdCollision,
            EntityValue::Snapshot(existing),
            EntityValue::Snapshot(incoming),
            Vec::new(),
        )];

        let resolved = resolve_conflicts(&mut conflicts, ResolutionStrategy::CreateNew);
        assert_eq!(resolved.snapshots.len(), 1);
        assert!(resolved.snapshots[0].id.starts_with("s1-imported-"));
        assert_eq!(resolved.snapshots[0].code, "b");
    }

    #[test]
    fn test_documents_cannot_be_copied() {
        let mut incoming = Document::default();
        incoming.font_size = 30;
        let mut conflicts = vec![ConflictItem::new(
            ConflictType::DataMismatch,
            EntityValue::Document(Document::default()),
            EntityValue::Document(incoming),
            Vec::new(),
        )];

        let resolved = resolve_conflicts(&mut conflicts, ResolutionStrategy::CreateNew);
        assert_eq!(resolved.document, Some(Document::default()));
        assert_eq!(resolved.notes.len(), 1);
    }

    #[test]
    fn test_mismatched_merge_falls_back_to_existing() {
        let existing = EntityValue::Snapshot(Snapshot::new("x", "a", 1000));
        let incoming = EntityValue::Document(Document::default());
        let conflict = ConflictItem::new(ConflictType::DataMismatch, existing.clone(), incoming, Vec::new());

        let resolution = resolve_conflict(&conflict, ResolutionStrategy::Merge);
        assert_eq!(resolution.value, existing);
        assert!(resolution.note.unwrap().contains("merge failed"));
    }
}
