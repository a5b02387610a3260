//! Image asset processor

use crate::config::{ImageConfig, ImageOptions};
use crate::geometry::downsize;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, ImageFormat, ImageReader};
use satchel_asset::{
    AssetProcessor, AssetSource, Finalizer, LazyConfig, Metadata, Result, SatchelError, Staged,
    StorageContext,
};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Formats stored as-is; anything else is re-encoded
pub const IMAGE_FORMATS: &[ImageFormat] = &[ImageFormat::Jpeg, ImageFormat::Png];

/// Format used when the original is not in [`IMAGE_FORMATS`]
pub const DEFAULT_FORMAT: ImageFormat = ImageFormat::Jpeg;

/// Validates, resizes and normalizes uploaded images.
///
/// Stored metadata carries the `width` and `height` of the stored image.
pub struct ImageProcessor {
    config: LazyConfig<ImageConfig>,
}

impl ImageProcessor {
    /// Validate `options` now
    pub fn new(options: ImageOptions) -> Result<Self> {
        Ok(Self {
            config: LazyConfig::resolved(ImageConfig::from_options(options)?),
        })
    }

    /// Defer options to first use, e.g. to read them from application
    /// config that is not loaded yet when fields are declared
    pub fn lazy<F>(init: F) -> Self
    where
        F: Fn() -> Result<ImageOptions> + Send + Sync + 'static,
    {
        Self {
            config: LazyConfig::deferred(move || ImageConfig::from_options(init()?)),
        }
    }

    pub fn config(&self) -> Result<Arc<ImageConfig>> {
        self.config.get()
    }

    pub fn is_resolved(&self) -> bool {
        self.config.is_resolved()
    }
}

impl AssetProcessor for ImageProcessor {
    fn name(&self) -> &str {
        "image"
    }

    fn process(
        &self,
        ctx: &StorageContext,
        source: AssetSource,
        metadata: Option<Metadata>,
    ) -> Result<Staged> {
        let config = self.config.get()?;
        let data = source.read_all()?;

        let reader = ImageReader::new(Cursor::new(&data))
            .with_guessed_format()
            .map_err(|e| SatchelError::Processing(format!("Failed to open image: {}", e)))?;
        let format = reader
            .format()
            .ok_or_else(|| SatchelError::Processing("Unrecognized image format".to_string()))?;
        let original = reader
            .into_dimensions()
            .map_err(|e| SatchelError::Processing(format!("Failed to open image: {}", e)))?;

        if let Some(constraint) = &config.constraint {
            constraint.check(original)?;
        }

        let stored_format = if IMAGE_FORMATS.contains(&format) {
            format
        } else {
            debug!(from = ?format, to = ?DEFAULT_FORMAT, "re-encoding unsupported image format");
            DEFAULT_FORMAT
        };
        let extension = format_extension(stored_format);

        if stored_format == format && config.size == Some(original) {
            debug!(width = original.0, height = original.1, "image already at target size");
            let metadata = metadata.unwrap_or_else(|| Metadata::with_dimensions(original.0, original.1));
            return stage_bytes(ctx, &data, extension, metadata);
        }

        let img = image::load_from_memory_with_format(&data, format)
            .map_err(|e| SatchelError::Processing(format!("Failed to decode image: {}", e)))?;

        let (out, metadata) = if config.has_target() {
            let target = config.target_size(original);
            debug!(transform = %config.transform, width = target.0, height = target.1, "processing image");
            let out = downsize(img, target, config.transform);
            let metadata = Metadata::with_dimensions(out.width(), out.height());
            (out, metadata)
        } else {
            let metadata = metadata.unwrap_or_else(|| Metadata::with_dimensions(original.0, original.1));
            (img, metadata)
        };

        let bytes = encode(&out, stored_format, &config)?;
        stage_bytes(ctx, &bytes, extension, metadata)
    }

    fn resolve(&self) -> Result<()> {
        self.config.get().map(|_| ())
    }
}

/// Stored extension for a format
pub fn format_extension(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        other => other.extensions_str().first().copied().unwrap_or("img"),
    }
}

fn encode(img: &DynamicImage, format: ImageFormat, config: &ImageConfig) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let encoded = match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, config.quality))
        }
        ImageFormat::Png => {
            let compression = if config.optimize {
                CompressionType::Best
            } else {
                CompressionType::Default
            };
            img.write_with_encoder(PngEncoder::new_with_quality(
                &mut buf,
                compression,
                PngFilter::Adaptive,
            ))
        }
        other => img.write_to(&mut Cursor::new(&mut buf), other),
    };
    encoded.map_err(|e| SatchelError::Processing(format!("Failed to encode image: {}", e)))?;
    Ok(buf)
}

/// Write `bytes` to a fresh staging path, removing it again on failure
fn stage_bytes(
    ctx: &StorageContext,
    bytes: &[u8],
    extension: &str,
    metadata: Metadata,
) -> Result<Staged> {
    let path = ctx.staging_path(Some(extension))?;
    if let Err(e) = fs::write(&path, bytes) {
        remove_partial(&path);
        return Err(SatchelError::storage(&path, e));
    }
    Ok(Staged {
        path: path.clone(),
        extension: Some(extension.to_string()),
        metadata,
        finalize: Finalizer::remove_path(path),
    })
}

fn remove_partial(path: &Path) {
    if let Err(e) = satchel_asset::fsops::remove_artifact(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove partial image");
    }
}
