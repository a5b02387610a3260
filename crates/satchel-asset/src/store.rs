//! Entity-keyed asset storage
//!
//! Owns the commit/replace protocol: processed content is staged, moved into
//! its final path, its metadata persisted, and only then is the superseded
//! artifact removed. Any failure before that point restores the previous
//! state.

use crate::catalog::MetadataStore;
use crate::descriptor::AssetDescriptor;
use crate::entity::Entity;
use crate::fsops;
use crate::instance::AssetInstance;
use crate::processor::{GenericProcessor, Staged};
use crate::resolver::{extension_of, PathResolver};
use crate::source::AssetSource;
use satchel_core::{EntityRef, Metadata, Result, SatchelError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const STAGING_DIR: &str = ".staging";

/// Outcome of a successful assign or clone
#[derive(Debug)]
pub struct Commit {
    /// The field's new state
    pub instance: AssetInstance,
    /// Set when the superseded artifact could not be removed. The commit
    /// itself is valid regardless.
    pub stale_cleanup: Option<SatchelError>,
}

/// Storage handle passed explicitly to every asset operation.
///
/// Artifacts live at `<root>/<entity_type>/<entity_id>/<field>[.<ext>]`;
/// staged content goes to `<root>/.staging` so moves stay on one filesystem.
/// There is no internal locking: callers that write the same field from
/// several threads must serialize those writes themselves.
pub struct StorageContext {
    resolver: PathResolver,
    staging: PathBuf,
    metadata: Box<dyn MetadataStore>,
    retire: fn(&Path) -> Result<()>,
}

/// Where the occupant of a final path is kept while a commit is in flight
enum Backup {
    /// A second name for a file that is still in place
    Linked(PathBuf),
    /// The occupant itself, moved out of the way
    Parked(PathBuf),
}

impl Backup {
    fn path(&self) -> &Path {
        match self {
            Backup::Linked(path) | Backup::Parked(path) => path,
        }
    }
}

impl StorageContext {
    pub fn new<P: AsRef<Path>, M: MetadataStore + 'static>(root: P, metadata: M) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            staging: root.join(STAGING_DIR),
            resolver: PathResolver::new(root),
            metadata: Box::new(metadata),
            retire: fsops::remove_artifact,
        }
    }

    /// Replace how superseded artifacts are removed
    #[cfg(test)]
    fn with_retire(mut self, retire: fn(&Path) -> Result<()>) -> Self {
        self.retire = retire;
        self
    }

    /// Stage into a different directory. It should share a filesystem with
    /// the root, or commits fall back to copying.
    pub fn with_staging_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.staging = dir.as_ref().to_path_buf();
        self
    }

    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    pub fn metadata_store(&self) -> &dyn MetadataStore {
        self.metadata.as_ref()
    }

    /// A fresh, unused path in the staging area
    pub fn staging_path(&self, ext: Option<&str>) -> Result<PathBuf> {
        crate::resolver::check_extension(ext)?;
        fs::create_dir_all(&self.staging).map_err(|e| SatchelError::storage(&self.staging, e))?;
        let name = crate::resolver::file_name(&uuid::Uuid::new_v4().to_string(), ext);
        Ok(self.staging.join(name))
    }

    /// Current state of a field
    pub fn instance<E: Entity + ?Sized>(&self, entity: &E, field: &str) -> Result<AssetInstance> {
        let descriptor = descriptor_of(entity, field)?;
        descriptor.resolve()?;
        let instance = self.read_instance(&entity.entity_ref(), field)?;
        entity.on_read(field, &instance);
        Ok(instance)
    }

    /// Process `source` with the field's processor and commit the result.
    ///
    /// On error the field keeps whatever it had before.
    pub fn assign<E: Entity + ?Sized>(
        &self,
        entity: &E,
        field: &str,
        source: impl Into<AssetSource>,
        metadata: Option<Metadata>,
    ) -> Result<Commit> {
        let descriptor = descriptor_of(entity, field)?;
        descriptor.resolve()?;
        let entity_ref = entity.entity_ref();

        let staged = descriptor
            .processor()
            .process(self, source.into(), metadata)?;
        debug!(
            entity = %entity_ref,
            field,
            processor = descriptor.processor().name(),
            staged = %staged.path.display(),
            "processed asset"
        );

        let commit = self.commit(&entity_ref, field, staged)?;
        entity.on_assigned(field, &commit.instance);
        Ok(commit)
    }

    /// Assign from another instance: its artifact and metadata go through
    /// this field's processor. An unbound instance deletes the field.
    pub fn assign_instance<E: Entity + ?Sized>(
        &self,
        entity: &E,
        field: &str,
        from: &AssetInstance,
    ) -> Result<Commit> {
        match from.path() {
            Some(path) => self.assign(
                entity,
                field,
                AssetSource::path(path),
                Some(from.metadata().clone()),
            ),
            None => {
                self.delete(entity, field)?;
                Ok(Commit {
                    instance: AssetInstance::none(entity.entity_ref(), field),
                    stale_cleanup: None,
                })
            }
        }
    }

    /// Remove a field's artifact and metadata. Deleting an unbound field is a
    /// no-op.
    ///
    /// The artifact is renamed into staging before anything is removed, so
    /// the field turns unbound in one step. If clearing the metadata fails
    /// the artifact is put back.
    pub fn delete<E: Entity + ?Sized>(&self, entity: &E, field: &str) -> Result<()> {
        descriptor_of(entity, field)?;
        let entity_ref = entity.entity_ref();

        match self.resolver.locate(&entity_ref, field)? {
            Some(path) => {
                let trash = self.staging_path(None)?;
                fsops::move_artifact(&path, &trash)?;
                if let Err(e) = self.metadata.clear(&entity_ref, field) {
                    warn!(entity = %entity_ref, field, error = %e, "delete failed, restoring asset");
                    if let Err(restore) = fsops::move_artifact(&trash, &path) {
                        warn!(
                            trash = %trash.display(),
                            path = %path.display(),
                            error = %restore,
                            "failed to restore deleted asset"
                        );
                    }
                    return Err(e);
                }
                if let Err(e) = (self.retire)(&trash) {
                    warn!(path = %trash.display(), error = %e, "failed to remove deleted asset");
                }
                info!(entity = %entity_ref, field, path = %path.display(), "deleted asset");
            }
            None => self.metadata.clear(&entity_ref, field)?,
        }
        entity.on_deleted(field);
        Ok(())
    }

    /// Bound fields of an entity, in declaration order.
    ///
    /// Each item reflects the disk at the time it is produced.
    pub fn iter_assets<'a, E: Entity + ?Sized>(
        &'a self,
        entity: &'a E,
    ) -> impl Iterator<Item = Result<(AssetInstance, &'a str)>> + 'a {
        entity
            .entity_type()
            .fields()
            .iter()
            .filter_map(move |descriptor| match self.instance(entity, descriptor.name()) {
                Ok(instance) if instance.is_bound() => Some(Ok((instance, descriptor.name()))),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
    }

    /// Copy every bound asset of `source` onto the same-named fields of
    /// `dest`.
    ///
    /// Content and metadata are copied verbatim, bypassing the destination
    /// processors. Fields unbound on `source` are left alone on `dest`.
    pub fn clone_assets<S, D>(&self, source: &S, dest: &D) -> Result<Vec<Commit>>
    where
        S: Entity + ?Sized,
        D: Entity + ?Sized,
    {
        for descriptor in source.entity_type().fields() {
            if dest.entity_type().field(descriptor.name()).is_none() {
                return Err(SatchelError::Configuration(format!(
                    "Cannot clone field '{}': not declared on '{}'",
                    descriptor.name(),
                    dest.entity_type().name()
                )));
            }
        }

        let dest_ref = dest.entity_ref();
        let mut commits = Vec::new();
        for item in self.iter_assets(source) {
            let (instance, field) = item?;
            let Some(path) = instance.path() else {
                continue;
            };
            let staged = GenericProcessor.stage_path(
                self,
                path,
                instance.extension().map(|e| e.to_string()),
                instance.metadata().clone(),
            )?;
            let commit = self.commit(&dest_ref, field, staged)?;
            dest.on_assigned(field, &commit.instance);
            commits.push(commit);
        }

        info!(
            from = %source.entity_ref(),
            to = %dest_ref,
            count = commits.len(),
            "cloned assets"
        );
        Ok(commits)
    }

    fn read_instance(&self, entity: &EntityRef, field: &str) -> Result<AssetInstance> {
        match self.resolver.locate(entity, field)? {
            Some(path) => {
                let extension = extension_of(&path, field);
                let metadata = self.metadata.get(entity, field)?;
                Ok(AssetInstance::bound(
                    entity.clone(),
                    field,
                    path,
                    extension,
                    metadata,
                ))
            }
            None => Ok(AssetInstance::none(entity.clone(), field)),
        }
    }

    /// Move a staged artifact into place and retire the previous one.
    ///
    /// A file replacing a file at the same path is renamed over it, so the
    /// field never reads unbound; a hard link in staging keeps the old
    /// content for rollback. Any other occupant of the final path (a
    /// directory, or a file a directory replaces) is parked in staging
    /// first, and until the move completes the field reads unbound.
    fn commit(&self, entity: &EntityRef, field: &str, staged: Staged) -> Result<Commit> {
        let Staged {
            path: staged_path,
            extension,
            metadata,
            finalize,
        } = staged;

        let previous = self.resolver.locate(entity, field)?;
        let final_path = self
            .resolver
            .resolve(entity, field, extension.as_deref())?;
        let backup = self.set_aside(&final_path, &staged_path)?;

        let placed = fsops::move_artifact(&staged_path, &final_path)
            .and_then(|()| self.metadata.set(entity, field, &metadata));
        if let Err(e) = placed {
            warn!(entity = %entity, field, error = %e, "commit failed, rolling back");
            self.rollback(&final_path, backup.as_ref());
            return Err(e);
        }

        let mut stale_cleanup = None;
        if let Some(previous) = previous.filter(|p| *p != final_path) {
            if let Err(e) = (self.retire)(&previous) {
                warn!(path = %previous.display(), error = %e, "failed to remove superseded asset");
                stale_cleanup = Some(e);
            }
        }
        if let Some(backup) = backup {
            if let Err(e) = (self.retire)(backup.path()) {
                warn!(path = %backup.path().display(), error = %e, "failed to remove replaced asset");
                stale_cleanup.get_or_insert(e);
            }
        }

        finalize.run();
        info!(entity = %entity, field, path = %final_path.display(), "committed asset");

        Ok(Commit {
            instance: AssetInstance::bound(entity.clone(), field, final_path, extension, metadata),
            stale_cleanup,
        })
    }

    /// Keep whatever occupies `final_path` recoverable until the commit lands
    fn set_aside(&self, final_path: &Path, staged: &Path) -> Result<Option<Backup>> {
        let Ok(occupant) = fs::symlink_metadata(final_path) else {
            return Ok(None);
        };
        let staged_is_dir = fs::metadata(staged).map(|m| m.is_dir()).unwrap_or(false);
        let backup = self.staging_path(None)?;

        if occupant.is_dir() || staged_is_dir {
            fsops::move_artifact(final_path, &backup)?;
            debug!(path = %final_path.display(), "parked previous asset");
            Ok(Some(Backup::Parked(backup)))
        } else {
            fsops::link_or_copy(final_path, &backup)?;
            Ok(Some(Backup::Linked(backup)))
        }
    }

    fn rollback(&self, final_path: &Path, backup: Option<&Backup>) {
        // A linked backup is renamed straight over the new file
        if !matches!(backup, Some(Backup::Linked(_))) {
            if let Err(e) = fsops::remove_artifact(final_path) {
                warn!(path = %final_path.display(), error = %e, "failed to remove partial asset");
            }
        }
        if let Some(backup) = backup {
            if let Err(e) = fsops::move_artifact(backup.path(), final_path) {
                warn!(
                    backup = %backup.path().display(),
                    path = %final_path.display(),
                    error = %e,
                    "failed to restore previous asset"
                );
            }
        }
    }
}

fn descriptor_of<'a, E: Entity + ?Sized>(
    entity: &'a E,
    field: &str,
) -> Result<&'a Arc<AssetDescriptor>> {
    entity.entity_type().field(field).ok_or_else(|| {
        SatchelError::Configuration(format!(
            "Unknown field '{}' on '{}'",
            field,
            entity.entity_type().name()
        ))
    })
}
