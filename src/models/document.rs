//! Document and snapshot models
//!
//! A document is the animated-code unit: a language, rendering parameters and
//! an ordered sequence of snapshots. Snapshots are treated as immutable values;
//! every mutation helper returns a modified copy.

use serde::{Deserialize, Serialize};

/// Language assumed when an import carries only bare snapshots
pub const DEFAULT_LANGUAGE: &str = "javascript";
/// Default font size in points
pub const DEFAULT_FONT_SIZE: u32 = 14;
/// Default line height in pixels
pub const DEFAULT_LINE_HEIGHT: u32 = 20;
/// Default canvas width in pixels
pub const DEFAULT_WIDTH: u32 = 800;
/// Default canvas height in pixels
pub const DEFAULT_HEIGHT: u32 = 600;
/// Default theme identifier
pub const DEFAULT_THEME: &str = "default";

/// Canvas padding in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Padding {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

/// One code state with its display and transition timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Unique within the owning document
    pub id: String,

    /// Code text shown for this state
    pub code: String,

    /// How long the snapshot is displayed, in milliseconds (positive)
    pub duration: u64,

    /// Transition into the next snapshot, in milliseconds (at most `duration`)
    #[serde(default)]
    pub transition_time: u64,
}

impl Snapshot {
    /// Create a new snapshot
    pub fn new(id: impl Into<String>, code: impl Into<String>, duration: u64) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            duration,
            transition_time: 0,
        }
    }

    /// Copy with a different id
    pub fn with_id(&self, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..self.clone()
        }
    }

    /// Copy with different code
    pub fn with_code(&self, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..self.clone()
        }
    }

    /// Copy with a different duration
    pub fn with_duration(&self, duration: u64) -> Self {
        Self {
            duration,
            ..self.clone()
        }
    }

    /// Copy with a different transition time
    pub fn with_transition_time(&self, transition_time: u64) -> Self {
        Self {
            transition_time,
            ..self.clone()
        }
    }

    /// Whether the timing invariants hold
    pub fn has_valid_timing(&self) -> bool {
        self.duration > 0 && self.transition_time <= self.duration
    }
}

/// The animated-code document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Language tag used for highlighting
    pub language: String,

    /// Ordered snapshot sequence (at least one on a valid document)
    pub snapshots: Vec<Snapshot>,

    pub font_size: u32,
    pub line_height: u32,
    pub width: u32,
    pub height: u32,

    /// Theme identifier
    pub theme: String,

    #[serde(default)]
    pub padding: Padding,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            snapshots: Vec::new(),
            font_size: DEFAULT_FONT_SIZE,
            line_height: DEFAULT_LINE_HEIGHT,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            theme: DEFAULT_THEME.to_string(),
            padding: Padding::default(),
        }
    }
}

impl Document {
    /// A default document holding the given snapshots
    pub fn with_snapshots(snapshots: Vec<Snapshot>) -> Self {
        Self {
            snapshots,
            ..Self::default()
        }
    }

    /// Sum of all snapshot durations
    pub fn total_duration(&self) -> u64 {
        self.snapshots.iter().map(|s| s.duration).sum()
    }

    /// Find a snapshot by id
    pub fn snapshot(&self, id: &str) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.id == id)
    }

    /// Remove a snapshot by id
    pub fn remove_snapshot(&mut self, id: &str) -> Option<Snapshot> {
        let index = self.snapshots.iter().position(|s| s.id == id)?;
        Some(self.snapshots.remove(index))
    }

    /// Duplicate a snapshot, inserting the copy right after the original
    pub fn duplicate_snapshot(&mut self, id: &str, new_id: impl Into<String>) -> Option<&Snapshot> {
        let index = self.snapshots.iter().position(|s| s.id == id)?;
        let copy = self.snapshots[index].with_id(new_id);
        self.snapshots.insert(index + 1, copy);
        self.snapshots.get(index + 1)
    }

    /// Move a snapshot to a new position, returning whether anything moved
    pub fn move_snapshot(&mut self, from: usize, to: usize) -> bool {
        if from >= self.snapshots.len() || to >= self.snapshots.len() || from == to {
            return false;
        }
        let snapshot = self.snapshots.remove(from);
        self.snapshots.insert(to, snapshot);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::with_snapshots(vec![
            Snapshot::new("a", "let a = 1;", 1000),
            Snapshot::new("b", "let b = 2;", 2000).with_transition_time(500),
            Snapshot::new("c", "let c = 3;", 1500),
        ])
    }

    #[test]
    fn test_defaults() {
        let doc = Document::default();
        assert_eq!(doc.language, "javascript");
        assert_eq!(doc.font_size, 14);
        assert_eq!(doc.line_height, 20);
        assert_eq!((doc.width, doc.height), (800, 600));
        assert_eq!(doc.theme, "default");
        assert_eq!(doc.padding, Padding::default());
    }

    #[test]
    fn test_immutable_updates() {
        let original = Snapshot::new("a", "x", 1000);
        let changed = original.with_code("y").with_duration(3000);
        assert_eq!(original.code, "x");
        assert_eq!(changed.code, "y");
        assert_eq!(changed.duration, 3000);
        assert_eq!(changed.id, "a");
    }

    #[test]
    fn test_timing_invariant() {
        assert!(Snapshot::new("a", "x", 1000).with_transition_time(1000).has_valid_timing());
        assert!(!Snapshot::new("a", "x", 1000).with_transition_time(1001).has_valid_timing());
        assert!(!Snapshot::new("a", "x", 0).has_valid_timing());
    }

    #[test]
    fn test_total_duration() {
        assert_eq!(sample().total_duration(), 4500);
    }

    #[test]
    fn test_duplicate_and_remove() {
        let mut doc = sample();
        doc.duplicate_snapshot("b", "b-copy").unwrap();
        let ids: Vec<_> = doc.snapshots.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "b-copy", "c"]);

        let removed = doc.remove_snapshot("a").unwrap();
        assert_eq!(removed.id, "a");
        assert!(doc.remove_snapshot("missing").is_none());
    }

    #[test]
    fn test_move_snapshot() {
        let mut doc = sample();
        assert!(doc.move_snapshot(0, 2));
        let ids: Vec<_> = doc.snapshots.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert!(!doc.move_snapshot(0, 9));
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let snapshot = Snapshot::new("a", "x", 1000).with_transition_time(200);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["transitionTime"], 200);

        let doc = sample();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["fontSize"], 14);
        assert_eq!(json["lineHeight"], 20);
    }
}
