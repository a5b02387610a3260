//! Input sources for processing

use satchel_core::{Result, SatchelError};
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Where the bytes of an incoming asset come from.
///
/// Processors match on this exhaustively. A `Path` source is only ever read,
/// never moved or removed.
pub enum AssetSource {
    /// A readable byte stream, with an optional extension hint (e.g. from an
    /// uploaded file name)
    Stream {
        reader: Box<dyn Read + Send>,
        extension: Option<String>,
    },
    /// An existing file or directory
    Path(PathBuf),
}

impl AssetSource {
    pub fn path<P: AsRef<Path>>(path: P) -> Self {
        AssetSource::Path(path.as_ref().to_path_buf())
    }

    pub fn stream<R: Read + Send + 'static>(reader: R) -> Self {
        AssetSource::Stream {
            reader: Box::new(reader),
            extension: None,
        }
    }

    /// In-memory bytes as a stream source
    pub fn bytes(data: impl Into<Vec<u8>>, extension: Option<&str>) -> Self {
        AssetSource::Stream {
            reader: Box::new(std::io::Cursor::new(data.into())),
            extension: extension.map(|e| e.trim_start_matches('.').to_string()),
        }
    }

    /// Attach an extension hint to a stream source. No effect on paths.
    pub fn with_extension(self, ext: &str) -> Self {
        match self {
            AssetSource::Stream { reader, .. } => AssetSource::Stream {
                reader,
                extension: Some(ext.trim_start_matches('.').to_string()),
            },
            path @ AssetSource::Path(_) => path,
        }
    }

    /// Extension hint: the stream's hint, or the path's file extension
    pub fn extension(&self) -> Option<String> {
        match self {
            AssetSource::Stream { extension, .. } => extension.clone(),
            AssetSource::Path(path) => path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_string()),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, AssetSource::Path(p) if p.is_dir())
    }

    /// Read the whole source into memory. Directories are rejected.
    pub fn read_all(self) -> Result<Vec<u8>> {
        match self {
            AssetSource::Stream { mut reader, .. } => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Ok(buf)
            }
            AssetSource::Path(path) => {
                if path.is_dir() {
                    return Err(SatchelError::Processing(format!(
                        "Expected a file, got directory {}",
                        path.display()
                    )));
                }
                fs::read(&path).map_err(|e| SatchelError::storage(&path, e))
            }
        }
    }
}

impl fmt::Debug for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetSource::Stream { extension, .. } => f
                .debug_struct("Stream")
                .field("extension", extension)
                .finish_non_exhaustive(),
            AssetSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

impl From<PathBuf> for AssetSource {
    fn from(path: PathBuf) -> Self {
        AssetSource::Path(path)
    }
}

impl From<&Path> for AssetSource {
    fn from(path: &Path) -> Self {
        AssetSource::Path(path.to_path_buf())
    }
}

impl From<fs::File> for AssetSource {
    fn from(file: fs::File) -> Self {
        AssetSource::stream(file)
    }
}
