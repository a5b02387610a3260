//! Satchel Image - image processor for Satchel asset fields
//!
//! Validates uploads against size constraints, crops or fits them to a
//! target size, and normalizes the stored format.

pub mod config;
pub mod geometry;
mod processor;

pub use config::{ConstraintType, ImageConfig, ImageOptions, SizeConstraint, Transform};
pub use processor::{format_extension, ImageProcessor, DEFAULT_FORMAT, IMAGE_FORMATS};
