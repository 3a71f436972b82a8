//! Strongly-typed ID wrappers for engine-generated identifiers
//!
//! Project entities carry free-form string ids chosen by their authors;
//! identifiers the engine mints itself (operations, templates) are UUID
//! newtypes so they cannot be mixed up at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Macro to generate ID newtype wrappers
macro_rules! define_id {
    ($name:ident, $display_prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Get the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $display_prefix, &self.0.to_string()[..8])
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.strip_prefix($display_prefix).unwrap_or(s);
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

define_id!(OperationId, "op-");
define_id!(TemplateId, "tpl-");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_prefix() {
        let id = OperationId::new();
        let display = id.to_string();
        assert!(display.starts_with("op-"));
        assert_eq!(display.len(), 11);
    }

    #[test]
    fn test_id_uniqueness() {
        assert_ne!(OperationId::new(), OperationId::new());
    }

    #[test]
    fn test_id_parse_full_uuid() {
        let id = TemplateId::new();
        let parsed: TemplateId = id.as_uuid().to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_id_serialization() {
        let id = OperationId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: OperationId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
