//! Metadata persistence for stored assets

use crate::resolver::{check_field_name, PathResolver};
use satchel_core::{EntityRef, Metadata, Result, SatchelError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Where per-field metadata lives (a database column, sidecar files, ...).
///
/// `get` on a field that has never been set returns empty metadata.
pub trait MetadataStore: Send + Sync {
    fn get(&self, entity: &EntityRef, field: &str) -> Result<Metadata>;
    fn set(&self, entity: &EntityRef, field: &str, metadata: &Metadata) -> Result<()>;
    fn clear(&self, entity: &EntityRef, field: &str) -> Result<()>;
}

/// In-process metadata store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<(EntityRef, String), Metadata>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetadataStore for MemoryStore {
    fn get(&self, entity: &EntityRef, field: &str) -> Result<Metadata> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .get(&(entity.clone(), field.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn set(&self, entity: &EntityRef, field: &str, metadata: &Metadata) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert((entity.clone(), field.to_string()), metadata.clone());
        Ok(())
    }

    fn clear(&self, entity: &EntityRef, field: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(&(entity.clone(), field.to_string()));
        Ok(())
    }
}

/// TOML sidecar file format for field metadata
#[derive(Debug, Default, Serialize, Deserialize)]
struct SidecarFile {
    #[serde(default)]
    metadata: Metadata,
}

/// Part of a sidecar file name after `<field>.`
const SIDECAR_SUFFIX: &str = "meta.toml";

/// True for the tail of a sidecar (`meta.toml`) or of its in-flight temp
/// file (`meta.<uuid>.tmp`)
pub(crate) fn is_sidecar_suffix(rest: &str) -> bool {
    rest == SIDECAR_SUFFIX || (rest.starts_with("meta.") && rest.ends_with(".tmp"))
}

/// One `<root>/<type>/<id>/<field>.meta.toml` file per field.
///
/// The root may be the asset storage root itself: artifact lookup skips
/// sidecar names and no artifact may be stored under one.
#[derive(Debug, Clone)]
pub struct SidecarStore {
    paths: PathResolver,
}

impl SidecarStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            paths: PathResolver::new(root),
        }
    }

    fn sidecar_path(&self, entity: &EntityRef, field: &str) -> Result<PathBuf> {
        check_field_name(field)?;
        Ok(self
            .paths
            .entity_dir(entity)?
            .join(format!("{}.{}", field, SIDECAR_SUFFIX)))
    }
}

impl MetadataStore for SidecarStore {
    fn get(&self, entity: &EntityRef, field: &str) -> Result<Metadata> {
        let path = self.sidecar_path(entity, field)?;
        if !path.exists() {
            return Ok(Metadata::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| SatchelError::storage(&path, e))?;
        let file: SidecarFile = toml::from_str(&content).map_err(|e| {
            SatchelError::Metadata(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        Ok(file.metadata)
    }

    fn set(&self, entity: &EntityRef, field: &str, metadata: &Metadata) -> Result<()> {
        let path = self.sidecar_path(entity, field)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SatchelError::storage(parent, e))?;
        }

        let content = toml::to_string_pretty(&SidecarFile {
            metadata: metadata.clone(),
        })?;

        // Write-then-rename so readers never see a half-written sidecar
        let temp = path.with_file_name(format!("{}.meta.{}.tmp", field, uuid::Uuid::new_v4()));
        fs::write(&temp, content).map_err(|e| SatchelError::storage(&temp, e))?;
        fs::rename(&temp, &path).map_err(|e| {
            fs::remove_file(&temp).ok();
            SatchelError::storage(&path, e)
        })
    }

    fn clear(&self, entity: &EntityRef, field: &str) -> Result<()> {
        let path = self.sidecar_path(entity, field)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SatchelError::storage(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("satchel_catalog_test_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn exercise(store: &dyn MetadataStore) {
        let user = EntityRef::new("user", 1);
        assert!(store.get(&user, "avatar").unwrap().is_empty());

        store
            .set(&user, "avatar", &Metadata::with_dimensions(100, 80))
            .unwrap();
        let meta = store.get(&user, "avatar").unwrap();
        assert_eq!(meta.get_u32("width"), Some(100));
        assert_eq!(meta.get_u32("height"), Some(80));

        // Other fields and entities are unaffected
        assert!(store.get(&user, "banner").unwrap().is_empty());
        assert!(store.get(&EntityRef::new("user", 2), "avatar").unwrap().is_empty());

        store.clear(&user, "avatar").unwrap();
        assert!(store.get(&user, "avatar").unwrap().is_empty());
        store.clear(&user, "avatar").unwrap();
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        exercise(&store);
        assert!(store.is_empty());
    }

    #[test]
    fn test_sidecar_store() {
        let dir = temp_dir();
        exercise(&SidecarStore::new(&dir));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_sidecar_persists_across_instances() {
        let dir = temp_dir();
        let user = EntityRef::new("user", 9);
        let mut meta = Metadata::new();
        meta.insert("caption", "at the beach");
        SidecarStore::new(&dir).set(&user, "photo", &meta).unwrap();

        let reopened = SidecarStore::new(&dir);
        assert_eq!(reopened.get(&user, "photo").unwrap(), meta);
        assert!(dir.join("user").join("9").join("photo.meta.toml").exists());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_sidecar_parse_error() {
        let dir = temp_dir();
        let store = SidecarStore::new(&dir);
        let user = EntityRef::new("user", 1);
        let path = dir.join("user").join("1");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("avatar.meta.toml"), "not = [valid").unwrap();

        assert!(matches!(
            store.get(&user, "avatar"),
            Err(SatchelError::Metadata(_))
        ));

        fs::remove_dir_all(&dir).ok();
    }
}
