//! Entity references

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one entity: its type name and a stable id.
///
/// The id is kept in its string form, so any value with a stable
/// `Display` rendering (integers, UUIDs, slugs) can be used.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EntityRef {
    entity_type: String,
    entity_id: String,
}

impl EntityRef {
    /// Create a reference from a type name and any displayable id
    pub fn new(entity_type: impl Into<String>, entity_id: impl fmt::Display) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.to_string(),
        }
    }

    /// The entity type name
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// The entity id as a string
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityRef({}/{})", self.entity_type, self.entity_id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.entity_id)
    }
}
