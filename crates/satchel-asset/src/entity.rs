//! Entity-side collaborator: types, ids and change hooks

use crate::descriptor::AssetDescriptor;
use crate::instance::AssetInstance;
use crate::resolver::check_segment;
use satchel_core::{EntityRef, Result, SatchelError};
use std::fmt;
use std::sync::Arc;

/// An entity type and the asset fields it declares
#[derive(Debug)]
pub struct EntityType {
    name: String,
    fields: Vec<Arc<AssetDescriptor>>,
}

impl EntityType {
    pub fn new(name: &str) -> Result<Self> {
        check_segment("entity type", name).map_err(|_| {
            SatchelError::Configuration(format!("Invalid entity type name '{}'", name))
        })?;
        Ok(Self {
            name: name.to_string(),
            fields: Vec::new(),
        })
    }

    /// Declare a field. Field names must be unique within the type.
    pub fn with_field(mut self, descriptor: AssetDescriptor) -> Result<Self> {
        if self.field(descriptor.name()).is_some() {
            return Err(SatchelError::Configuration(format!(
                "Field '{}' declared twice on '{}'",
                descriptor.name(),
                self.name
            )));
        }
        self.fields.push(Arc::new(descriptor));
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self, name: &str) -> Option<&Arc<AssetDescriptor>> {
        self.fields.iter().find(|d| d.name() == name)
    }

    /// Declared fields, in declaration order
    pub fn fields(&self) -> &[Arc<AssetDescriptor>] {
        &self.fields
    }
}

/// Anything that owns asset fields.
///
/// The hooks let an entity layer react to reads and changes (e.g. mark a
/// row dirty); they default to doing nothing.
pub trait Entity {
    fn entity_type(&self) -> &EntityType;

    /// Stable id; only its string form is used for storage
    fn entity_id(&self) -> String;

    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.entity_type().name(), self.entity_id())
    }

    /// Called with the fresh snapshot each time a field is read
    fn on_read(&self, _field: &str, _instance: &AssetInstance) {}

    fn on_assigned(&self, _field: &str, _instance: &AssetInstance) {}

    fn on_deleted(&self, _field: &str) {}
}

/// A plain entity: a shared type plus an id
#[derive(Clone)]
pub struct Record {
    entity_type: Arc<EntityType>,
    id: String,
}

impl Record {
    pub fn new(entity_type: Arc<EntityType>, id: impl fmt::Display) -> Self {
        Self {
            entity_type,
            id: id.to_string(),
        }
    }
}

impl Entity for Record {
    fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    fn entity_id(&self) -> String {
        self.id.clone()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record({}/{})", self.entity_type.name(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_type() -> Arc<EntityType> {
        Arc::new(
            EntityType::new("user")
                .unwrap()
                .with_field(AssetDescriptor::generic("avatar").unwrap())
                .unwrap()
                .with_field(AssetDescriptor::generic("resume").unwrap())
                .unwrap(),
        )
    }

    #[test]
    fn test_fields_in_declaration_order() {
        let ty = user_type();
        let names: Vec<&str> = ty.fields().iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["avatar", "resume"]);
        assert!(ty.field("avatar").is_some());
        assert!(ty.field("banner").is_none());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = EntityType::new("user")
            .unwrap()
            .with_field(AssetDescriptor::generic("avatar").unwrap())
            .unwrap()
            .with_field(AssetDescriptor::generic("avatar").unwrap())
            .unwrap_err();
        assert!(matches!(err, SatchelError::Configuration(_)));
    }

    #[test]
    fn test_record_ref() {
        let record = Record::new(user_type(), 1);
        assert_eq!(record.entity_ref(), EntityRef::new("user", "1"));
        assert_eq!(record.entity_id(), "1");
    }

    #[test]
    fn test_invalid_type_name() {
        assert!(EntityType::new("").is_err());
        assert!(EntityType::new("a/b").is_err());
    }
}
