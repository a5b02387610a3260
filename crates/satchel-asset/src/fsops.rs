//! Filesystem helpers for file and directory artifacts

use satchel_core::{Result, SatchelError};
use std::fs;
use std::io;
use std::path::Path;

/// Copy a file, or a directory tree recursively, to `dest`.
pub fn copy_artifact(src: &Path, dest: &Path) -> Result<()> {
    let meta = fs::metadata(src).map_err(|e| SatchelError::storage(src, e))?;
    if meta.is_dir() {
        fs::create_dir(dest).map_err(|e| SatchelError::storage(dest, e))?;
        for entry in fs::read_dir(src).map_err(|e| SatchelError::storage(src, e))? {
            let entry = entry.map_err(|e| SatchelError::storage(src, e))?;
            copy_artifact(&entry.path(), &dest.join(entry.file_name()))?;
        }
    } else {
        fs::copy(src, dest).map_err(|e| SatchelError::storage(dest, e))?;
    }
    Ok(())
}

/// Remove a file or directory tree. Missing paths are not an error.
pub fn remove_artifact(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(SatchelError::storage(path, e)),
    };
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match removed {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SatchelError::storage(path, e)),
    }
}

/// Move an artifact into place, replacing a file already at `dest`.
///
/// Uses a rename, which is atomic when both paths share a filesystem;
/// otherwise copies next to `dest` under a hidden name, renames that into
/// place, and removes the original. On failure nothing is left at the
/// hidden name; `src` is kept.
pub fn move_artifact(src: &Path, dest: &Path) -> Result<()> {
    move_with(src, dest, |from, to| fs::rename(from, to))
}

fn move_with<F>(src: &Path, dest: &Path, rename: F) -> Result<()>
where
    F: Fn(&Path, &Path) -> io::Result<()>,
{
    let rename_err = match rename(src, dest) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    if !occupied(src) {
        return Err(SatchelError::storage(src, rename_err));
    }
    tracing::debug!(
        from = %src.display(),
        to = %dest.display(),
        error = %rename_err,
        "rename failed, copying instead"
    );

    // Dot-prefixed so the copy is never mistaken for a stored artifact
    let partial = dest.with_file_name(format!(".{}.partial", uuid::Uuid::new_v4()));
    let placed = copy_artifact(src, &partial).and_then(|()| {
        fs::rename(&partial, dest).map_err(|e| SatchelError::storage(dest, e))
    });
    if let Err(e) = placed {
        remove_artifact(&partial).ok();
        return Err(e);
    }
    remove_artifact(src)
}

/// Make `dest` a second name for the file at `src`: a hard link, or a copy
/// when linking is not possible (e.g. across filesystems)
pub fn link_or_copy(src: &Path, dest: &Path) -> Result<()> {
    match fs::hard_link(src, dest) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!(from = %src.display(), error = %e, "hard link failed, copying instead");
            copy_artifact(src, dest)
        }
    }
}

/// True if anything (file, directory, dangling link) exists at `path`
pub fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("satchel_fsops_test_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_copy_directory_tree() {
        let dir = temp_dir();
        let src = dir.join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.txt"), b"a").unwrap();
        fs::write(src.join("nested").join("b.txt"), b"b").unwrap();

        let dest = dir.join("dest");
        copy_artifact(&src, &dest).unwrap();
        assert_eq!(fs::read(dest.join("a.txt")).unwrap(), b"a");
        assert_eq!(fs::read(dest.join("nested").join("b.txt")).unwrap(), b"b");
        assert!(src.join("a.txt").exists());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let dir = temp_dir();
        remove_artifact(&dir.join("nothing")).unwrap();
        remove_artifact(&dir).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_move_file() {
        let dir = temp_dir();
        let src = dir.join("staged");
        fs::write(&src, b"payload").unwrap();
        let dest = dir.join("final.bin");

        move_artifact(&src, &dest).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read(&dest).unwrap(), b"payload");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_move_replaces_existing_file() {
        let dir = temp_dir();
        let src = dir.join("staged");
        let dest = dir.join("final.bin");
        fs::write(&src, b"new").unwrap();
        fs::write(&dest, b"old").unwrap();

        move_artifact(&src, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"new");
        assert!(!src.exists());

        fs::remove_dir_all(&dir).ok();
    }

    fn cross_device(_: &Path, _: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "cross-device link"))
    }

    #[test]
    fn test_move_falls_back_to_copy() {
        let dir = temp_dir();
        let src = dir.join("staged");
        let dest = dir.join("out").join("final.bin");
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&src, b"payload").unwrap();
        fs::write(&dest, b"old").unwrap();

        move_with(&src, &dest, cross_device).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"payload");
        assert!(!src.exists());
        let names: Vec<_> = fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("final.bin")]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_move_directory_falls_back_to_copy() {
        let dir = temp_dir();
        let src = dir.join("staged");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("nested").join("b.txt"), b"b").unwrap();
        let dest = dir.join("final");

        move_with(&src, &dest, cross_device).unwrap();
        assert_eq!(fs::read(dest.join("nested").join("b.txt")).unwrap(), b"b");
        assert!(!src.exists());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_failed_fallback_keeps_source() {
        let dir = temp_dir();
        let src = dir.join("staged");
        fs::write(&src, b"payload").unwrap();
        let dest = dir.join("missing").join("final.bin");

        assert!(move_with(&src, &dest, cross_device).is_err());
        assert_eq!(fs::read(&src).unwrap(), b"payload");
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 1);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_link_or_copy_keeps_original() {
        let dir = temp_dir();
        let src = dir.join("stored.png");
        fs::write(&src, b"png").unwrap();
        let backup = dir.join("backup");

        link_or_copy(&src, &backup).unwrap();
        assert_eq!(fs::read(&src).unwrap(), b"png");
        assert_eq!(fs::read(&backup).unwrap(), b"png");

        // Replacing the original leaves the backup intact
        let staged = dir.join("staged");
        fs::write(&staged, b"new").unwrap();
        move_artifact(&staged, &src).unwrap();
        assert_eq!(fs::read(&backup).unwrap(), b"png");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_move_missing_source_fails() {
        let dir = temp_dir();
        let err = move_artifact(&dir.join("ghost"), &dir.join("final")).unwrap_err();
        assert!(err.is_storage());
        assert!(!occupied(&dir.join("final")));

        fs::remove_dir_all(&dir).ok();
    }
}
