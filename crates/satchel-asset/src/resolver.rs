//! Deterministic storage paths

use crate::catalog::is_sidecar_suffix;
use satchel_core::{EntityRef, Result, SatchelError};
use std::fs;
use std::path::{Path, PathBuf};

/// Maps (entity type, entity id, field) to a location under the storage root.
///
/// Layout: `<root>/<entity_type>/<entity_id>/<field>[.<ext>]`
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every field of one entity. Does not touch the disk.
    pub fn entity_dir(&self, entity: &EntityRef) -> Result<PathBuf> {
        check_segment("entity type", entity.entity_type())?;
        check_segment("entity id", entity.entity_id())?;
        Ok(self
            .root
            .join(entity.entity_type())
            .join(entity.entity_id()))
    }

    /// Resolve the final path for a field, creating the entity directory.
    ///
    /// Calling this twice with the same inputs yields the same path.
    pub fn resolve(&self, entity: &EntityRef, field: &str, ext: Option<&str>) -> Result<PathBuf> {
        check_field_name(field)?;
        check_extension(ext)?;
        let dir = self.entity_dir(entity)?;
        fs::create_dir_all(&dir).map_err(|e| SatchelError::storage(&dir, e))?;
        Ok(dir.join(file_name(field, ext)))
    }

    /// Find the artifact currently stored for a field, if any.
    ///
    /// Matches an entry named `<field>` or `<field>.<ext>`, skipping metadata
    /// sidecars in case a [`SidecarStore`](crate::SidecarStore) shares the
    /// root. When several match (an interrupted replace), the most recently
    /// modified wins.
    pub fn locate(&self, entity: &EntityRef, field: &str) -> Result<Option<PathBuf>> {
        check_field_name(field)?;
        let dir = self.entity_dir(entity)?;
        if !dir.is_dir() {
            return Ok(None);
        }

        let prefix = format!("{}.", field);
        let mut found: Option<(PathBuf, Option<std::time::SystemTime>)> = None;
        for entry in fs::read_dir(&dir).map_err(|e| SatchelError::storage(&dir, e))? {
            let entry = entry.map_err(|e| SatchelError::storage(&dir, e))?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            let matches = match name_str.strip_prefix(&prefix) {
                Some(rest) => !is_sidecar_suffix(rest),
                None => name_str == field,
            };
            if !matches {
                continue;
            }
            let modified = entry.metadata().and_then(|m| m.modified()).ok();
            let newer = match &found {
                Some((_, best)) => modified > *best,
                None => true,
            };
            if newer {
                found = Some((entry.path(), modified));
            }
        }

        Ok(found.map(|(path, _)| path))
    }
}

/// `<field>` or `<field>.<ext>`; a leading dot on `ext` is not doubled
pub fn file_name(field: &str, ext: Option<&str>) -> String {
    match ext.map(|e| e.trim_start_matches('.')) {
        Some(ext) if !ext.is_empty() => format!("{}.{}", field, ext),
        _ => field.to_string(),
    }
}

/// Extension of a stored artifact, given the field it belongs to
pub fn extension_of(path: &Path, field: &str) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    name.strip_prefix(field)
        .and_then(|rest| rest.strip_prefix('.'))
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_string())
}

pub(crate) fn check_segment(kind: &'static str, value: &str) -> Result<()> {
    let bad = value.is_empty()
        || value.starts_with('.')
        || value.contains(['/', '\\', '\0']);
    if bad {
        return Err(SatchelError::InvalidSegment {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Extensions become part of a file name: no separators or NUL, and never
/// a name reserved for metadata sidecars
pub(crate) fn check_extension(ext: Option<&str>) -> Result<()> {
    let Some(ext) = ext.map(|e| e.trim_start_matches('.')) else {
        return Ok(());
    };
    if ext.contains(['/', '\\', '\0']) || is_sidecar_suffix(ext) {
        return Err(SatchelError::InvalidSegment {
            kind: "extension",
            value: ext.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn check_field_name(field: &str) -> Result<()> {
    check_segment("field name", field)?;
    if field.contains('.') {
        return Err(SatchelError::InvalidSegment {
            kind: "field name",
            value: field.to_string(),
        });
    }
    Ok(())
}
