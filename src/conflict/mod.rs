//! Conflict detection and resolution
//!
//! Detection compares incoming data against the current project entity by
//! entity: project metadata, the document, and snapshots, themes and presets
//! keyed by id. Resolution applies one [`ResolutionStrategy`] to every
//! detected conflict.
//!
//! [`ResolutionStrategy`]: crate::models::ResolutionStrategy

pub mod detector;
pub mod diff;
pub mod merge;
pub mod resolver;

pub use detector::detect_conflicts;
pub use diff::{describe, find_differences};
pub use merge::{merge_entities, Merge};
pub use resolver::{resolve_conflict, resolve_conflicts, ResolvedData};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Document, PartialProject, ProjectData, ProjectMetadata, ResolutionStrategy, Snapshot,
    };

    #[test]
    fn test_detect_then_resolve() {
        let mut metadata = ProjectMetadata::new("A");
        metadata.id = "p1".into();
        let existing = ProjectData::new(
            metadata.clone(),
            Document::with_snapshots(vec![Snapshot::new("s1", "old", 1000)]),
        );

        let mut incoming_meta = metadata;
        incoming_meta.name = "B".into();
        let incoming = PartialProject {
            metadata: Some(incoming_meta),
            document: Some(Document::with_snapshots(vec![Snapshot::new("s1", "new", 1000)])),
            ..Default::default()
        };

        let mut conflicts = detect_conflicts(&incoming, Some(&existing));
        assert_eq!(conflicts.len(), 2);

        let resolved = resolve_conflicts(&mut conflicts, ResolutionStrategy::Skip);
        assert!(conflicts.iter().all(|c| c.resolved));
        assert_eq!(resolved.metadata.unwrap().name, "A");
        assert_eq!(resolved.snapshots[0].code, "old");
        assert!(resolved.notes.is_empty());
    }
}
