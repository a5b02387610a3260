//! Processor contract and the generic (identity) processor

use crate::fsops;
use crate::source::AssetSource;
use crate::store::StorageContext;
use satchel_core::{Metadata, Result, SatchelError};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Cleanup for a staged artifact.
///
/// Runs exactly once: either through [`Finalizer::run`] or when dropped, so
/// temporary resources are released on every exit path.
pub struct Finalizer(Option<Box<dyn FnOnce() + Send>>);

impl Finalizer {
    pub fn new<F: FnOnce() + Send + 'static>(f: F) -> Self {
        Self(Some(Box::new(f)))
    }

    pub fn noop() -> Self {
        Self(None)
    }

    /// Remove `path` (file or directory) if it is still there
    pub fn remove_path(path: PathBuf) -> Self {
        Self::new(move || {
            if let Err(e) = fsops::remove_artifact(&path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove staged artifact");
            }
        })
    }

    pub fn run(mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl Drop for Finalizer {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl fmt::Debug for Finalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0.is_some() {
            "Finalizer(pending)"
        } else {
            "Finalizer(done)"
        })
    }
}

/// Output of a processor: an artifact waiting in the staging area
#[derive(Debug)]
pub struct Staged {
    /// Temporary location of the processed file or directory
    pub path: PathBuf,
    /// Extension the artifact should be stored with
    pub extension: Option<String>,
    pub metadata: Metadata,
    pub finalize: Finalizer,
}

impl Staged {
    /// The staged artifact as a source, e.g. for chaining processors
    pub fn source(&self) -> AssetSource {
        AssetSource::Path(self.path.clone())
    }
}

/// Transforms incoming content before it is committed.
///
/// Implementations must leave `source` untouched on disk, write their
/// output to a fresh path from [`StorageContext::staging_path`], and return
/// a [`Finalizer`] that removes it. On a requirements failure nothing may
/// have been written; on a processing failure any partial output must be
/// removed before returning.
pub trait AssetProcessor: Send + Sync {
    /// Short name used in logs and config (e.g. "generic", "image")
    fn name(&self) -> &str;

    fn process(
        &self,
        ctx: &StorageContext,
        source: AssetSource,
        metadata: Option<Metadata>,
    ) -> Result<Staged>;

    /// Force any deferred configuration. Called on first field access.
    fn resolve(&self) -> Result<()> {
        Ok(())
    }
}

/// Stores content byte-for-byte. Directories are copied recursively.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericProcessor;

impl GenericProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Stage a copy of an existing file or directory
    pub fn stage_path(
        &self,
        ctx: &StorageContext,
        path: &Path,
        extension: Option<String>,
        metadata: Metadata,
    ) -> Result<Staged> {
        let staged = ctx.staging_path(extension.as_deref())?;
        if let Err(e) = fsops::copy_artifact(path, &staged) {
            fsops::remove_artifact(&staged).ok();
            return Err(e);
        }
        Ok(Staged {
            path: staged.clone(),
            extension,
            metadata,
            finalize: Finalizer::remove_path(staged),
        })
    }

    fn stage_stream(
        &self,
        ctx: &StorageContext,
        reader: &mut dyn io::Read,
        extension: Option<String>,
        metadata: Metadata,
    ) -> Result<Staged> {
        let staged = ctx.staging_path(extension.as_deref())?;
        let copied = fs::File::create(&staged).and_then(|mut file| io::copy(reader, &mut file));
        if let Err(e) = copied {
            fsops::remove_artifact(&staged).ok();
            return Err(SatchelError::storage(&staged, e));
        }
        Ok(Staged {
            path: staged.clone(),
            extension,
            metadata,
            finalize: Finalizer::remove_path(staged),
        })
    }
}

impl AssetProcessor for GenericProcessor {
    fn name(&self) -> &str {
        "generic"
    }

    fn process(
        &self,
        ctx: &StorageContext,
        source: AssetSource,
        metadata: Option<Metadata>,
    ) -> Result<Staged> {
        let metadata = metadata.unwrap_or_default();
        match source {
            AssetSource::Path(path) => {
                let extension = if path.is_dir() {
                    None
                } else {
                    AssetSource::path(&path).extension()
                };
                self.stage_path(ctx, &path, extension, metadata)
            }
            AssetSource::Stream {
                mut reader,
                extension,
            } => self.stage_stream(ctx, &mut reader, extension, metadata),
        }
    }
}
