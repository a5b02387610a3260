//! Runtime view of one field on one entity

use satchel_core::{EntityRef, Metadata};
use std::path::{Path, PathBuf};

/// Whether a field currently has a stored artifact
#[derive(Debug, Clone, PartialEq)]
pub enum AssetState {
    None,
    Bound {
        path: PathBuf,
        extension: Option<String>,
    },
}

/// Snapshot of a field's persisted state.
///
/// Built fresh on every access, never cached. Probing an unbound instance
/// returns `None`/empty values instead of failing.
#[derive(Debug, Clone)]
pub struct AssetInstance {
    entity: EntityRef,
    field: String,
    state: AssetState,
    metadata: Metadata,
}

impl AssetInstance {
    pub fn none(entity: EntityRef, field: &str) -> Self {
        Self {
            entity,
            field: field.to_string(),
            state: AssetState::None,
            metadata: Metadata::new(),
        }
    }

    pub fn bound(
        entity: EntityRef,
        field: &str,
        path: PathBuf,
        extension: Option<String>,
        metadata: Metadata,
    ) -> Self {
        Self {
            entity,
            field: field.to_string(),
            state: AssetState::Bound { path, extension },
            metadata,
        }
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn state(&self) -> &AssetState {
        &self.state
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.state, AssetState::Bound { .. })
    }

    pub fn is_none(&self) -> bool {
        !self.is_bound()
    }

    /// Absolute path of the stored artifact
    pub fn path(&self) -> Option<&Path> {
        match &self.state {
            AssetState::Bound { path, .. } => Some(path),
            AssetState::None => None,
        }
    }

    pub fn extension(&self) -> Option<&str> {
        match &self.state {
            AssetState::Bound { extension, .. } => extension.as_deref(),
            AssetState::None => None,
        }
    }

    /// True when the stored artifact is a directory
    pub fn is_dir(&self) -> bool {
        self.path().is_some_and(|p| p.is_dir())
    }

    /// Metadata map; always empty when unbound
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.metadata.get(key)
    }

    pub fn width(&self) -> Option<u32> {
        self.metadata.get_u32("width")
    }

    pub fn height(&self) -> Option<u32> {
        self.metadata.get_u32("height")
    }
}
