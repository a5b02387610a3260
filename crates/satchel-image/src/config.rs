//! Image field options and their validated form

use satchel_core::{Result, SatchelError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How an image is brought to its target size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    /// Crop to the target aspect ratio, then resize to the exact target
    #[default]
    Crop,
    /// Shrink to fit inside the target, keeping the aspect ratio
    Fit,
}

/// Check applied to the original dimensions before any transform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintType {
    #[default]
    None,
    Min,
    Max,
    Exact,
}

impl FromStr for Transform {
    type Err = SatchelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "crop" => Ok(Transform::Crop),
            "fit" => Ok(Transform::Fit),
            _ => Err(SatchelError::Configuration(format!(
                "Unknown transformation type '{}'. Use: crop, fit",
                s
            ))),
        }
    }
}

impl FromStr for ConstraintType {
    type Err = SatchelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(ConstraintType::None),
            "min" => Ok(ConstraintType::Min),
            "max" => Ok(ConstraintType::Max),
            "exact" => Ok(ConstraintType::Exact),
            _ => Err(SatchelError::Configuration(format!(
                "Unknown constraint type '{}'. Use: none, min, max, exact",
                s
            ))),
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Crop => write!(f, "crop"),
            Transform::Fit => write!(f, "fit"),
        }
    }
}

/// Options as declared on a field (or read from a config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageOptions {
    /// Target size as (width, height)
    #[serde(default)]
    pub size: Option<(u32, u32)>,
    /// Target width alone; height follows the aspect ratio
    #[serde(default)]
    pub width: Option<u32>,
    /// Target height alone; width follows the aspect ratio
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub constraint_type: ConstraintType,
    /// Defaults to `size` when a constraint type is set
    #[serde(default)]
    pub size_constraint: Option<(u32, u32)>,
    #[serde(default = "default_quality")]
    pub quality: u8,
    #[serde(default = "default_true")]
    pub optimize: bool,
    #[serde(default = "default_true")]
    pub progressive: bool,
}

fn default_quality() -> u8 {
    100
}

fn default_true() -> bool {
    true
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            size: None,
            width: None,
            height: None,
            transform: Transform::default(),
            constraint_type: ConstraintType::default(),
            size_constraint: None,
            quality: default_quality(),
            optimize: true,
            progressive: true,
        }
    }
}

impl ImageOptions {
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            size: Some((width, height)),
            ..Self::default()
        }
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn constraint(mut self, kind: ConstraintType, size: Option<(u32, u32)>) -> Self {
        self.constraint_type = kind;
        self.size_constraint = size;
        self
    }
}

/// A size check on the original image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeConstraint {
    pub kind: ConstraintType,
    pub size: (u32, u32),
}

impl SizeConstraint {
    /// Reject the original dimensions if they break the constraint.
    ///
    /// `exact` requires both axes to match.
    pub fn check(&self, (width, height): (u32, u32)) -> Result<()> {
        let (cw, ch) = self.size;
        let violation = match self.kind {
            ConstraintType::None => None,
            ConstraintType::Min if width < cw || height < ch => {
                Some("Size is less than minimum constraint")
            }
            ConstraintType::Max if width > cw || height > ch => {
                Some("Size is bigger than maximum constraint")
            }
            ConstraintType::Exact if width != cw || height != ch => {
                Some("Exact size constraint is not met")
            }
            _ => None,
        };
        match violation {
            Some(msg) => Err(SatchelError::Requirements(format!(
                "{}: got {}x{}, constraint {}x{}",
                msg, width, height, cw, ch
            ))),
            None => Ok(()),
        }
    }
}

/// Validated image configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ImageConfig {
    pub size: Option<(u32, u32)>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub transform: Transform,
    pub constraint: Option<SizeConstraint>,
    pub quality: u8,
    pub optimize: bool,
    pub progressive: bool,
}

impl ImageConfig {
    pub fn from_options(options: ImageOptions) -> Result<Self> {
        let ImageOptions {
            size,
            width,
            height,
            transform,
            constraint_type,
            size_constraint,
            quality,
            optimize,
            progressive,
        } = options;

        if size.is_some() && (width.is_some() || height.is_some()) {
            return Err(SatchelError::Configuration(
                "Use either size or width/height".to_string(),
            ));
        }
        let size = size.or(match (width, height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        });

        let has_zero = size.is_some_and(|(w, h)| w == 0 || h == 0)
            || width == Some(0)
            || height == Some(0)
            || size_constraint.is_some_and(|(w, h)| w == 0 || h == 0);
        if has_zero {
            return Err(SatchelError::Configuration(
                "Image dimensions must be positive".to_string(),
            ));
        }

        let constraint = match constraint_type {
            ConstraintType::None => {
                if size_constraint.is_some() {
                    return Err(SatchelError::Configuration(
                        "Size constraint is set but no constraint type is specified".to_string(),
                    ));
                }
                None
            }
            kind => {
                let size = size_constraint.or(size).ok_or_else(|| {
                    SatchelError::Configuration(format!(
                        "Constraint type '{:?}' needs size_constraint or size",
                        kind
                    ))
                })?;
                Some(SizeConstraint { kind, size })
            }
        };

        if !(1..=100).contains(&quality) {
            return Err(SatchelError::Configuration(format!(
                "Quality must be between 1 and 100, got {}",
                quality
            )));
        }

        Ok(Self {
            size,
            width: size.map(|(w, _)| w).or(width),
            height: size.map(|(_, h)| h).or(height),
            transform,
            constraint,
            quality,
            optimize,
            progressive,
        })
    }

    /// True when any of size, width or height is configured
    pub fn has_target(&self) -> bool {
        self.size.is_some() || self.width.is_some() || self.height.is_some()
    }

    /// Target size for an original of the given dimensions.
    ///
    /// With only one dimension configured, the other follows the original
    /// aspect ratio (floored, at least 1).
    pub fn target_size(&self, (ow, oh): (u32, u32)) -> (u32, u32) {
        if let Some(size) = self.size {
            return size;
        }
        match (self.width, self.height) {
            (Some(w), _) => (w, scale_dim(oh, w, ow)),
            (None, Some(h)) => (scale_dim(ow, h, oh), h),
            (None, None) => (ow, oh),
        }
    }
}

fn scale_dim(other: u32, configured: u32, original: u32) -> u32 {
    let scaled = f64::from(other) * (f64::from(configured) / f64::from(original.max(1)));
    (scaled.floor() as u32).max(1)
}

impl TryFrom<ImageOptions> for ImageConfig {
    type Error = SatchelError;

    fn try_from(options: ImageOptions) -> Result<Self> {
        Self::from_options(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(options: ImageOptions) -> Result<ImageConfig> {
        ImageConfig::from_options(options)
    }

    #[test]
    fn test_size_and_width_conflict() {
        let err = config(ImageOptions {
            size: Some((100, 100)),
            width: Some(50),
            ..ImageOptions::default()
        })
        .unwrap_err();
        assert!(matches!(err, SatchelError::Configuration(_)));
    }

    #[test]
    fn test_width_and_height_become_size() {
        let cfg = config(ImageOptions {
            width: Some(40),
            height: Some(30),
            ..ImageOptions::default()
        })
        .unwrap();
        assert_eq!(cfg.size, Some((40, 30)));
        assert_eq!(cfg.target_size((1000, 10)), (40, 30));
    }

    #[test]
    fn test_target_from_width_only() {
        let cfg = config(ImageOptions {
            width: Some(100),
            ..ImageOptions::default()
        })
        .unwrap();
        assert_eq!(cfg.target_size((200, 150)), (100, 75));
        assert_eq!(cfg.target_size((300, 100)), (100, 33));
    }

    #[test]
    fn test_target_from_height_only() {
        let cfg = config(ImageOptions {
            height: Some(50),
            ..ImageOptions::default()
        })
        .unwrap();
        assert_eq!(cfg.target_size((200, 150)), (66, 50));
    }

    #[test]
    fn test_constraint_defaults_to_size() {
        let cfg = config(ImageOptions::sized(100, 100).constraint(ConstraintType::Min, None)).unwrap();
        assert_eq!(
            cfg.constraint,
            Some(SizeConstraint {
                kind: ConstraintType::Min,
                size: (100, 100)
            })
        );
    }

    #[test]
    fn test_constraint_without_value() {
        let err = config(ImageOptions::default().constraint(ConstraintType::Max, None)).unwrap_err();
        assert!(matches!(err, SatchelError::Configuration(_)));
    }

    #[test]
    fn test_constraint_value_without_type() {
        let err = config(ImageOptions {
            size_constraint: Some((10, 10)),
            ..ImageOptions::default()
        })
        .unwrap_err();
        assert!(matches!(err, SatchelError::Configuration(_)));
    }

    #[test]
    fn test_zero_and_quality_rejected() {
        assert!(config(ImageOptions::sized(0, 10)).is_err());
        assert!(config(ImageOptions {
            quality: 0,
            ..ImageOptions::default()
        })
        .is_err());
    }

    #[test]
    fn test_constraint_checks() {
        let min = SizeConstraint {
            kind: ConstraintType::Min,
            size: (100, 100),
        };
        assert!(min.check((100, 120)).is_ok());
        assert!(matches!(
            min.check((50, 50)),
            Err(SatchelError::Requirements(_))
        ));
        assert!(min.check((150, 99)).is_err());

        let max = SizeConstraint {
            kind: ConstraintType::Max,
            size: (100, 100),
        };
        assert!(max.check((100, 20)).is_ok());
        assert!(max.check((101, 20)).is_err());

        let exact = SizeConstraint {
            kind: ConstraintType::Exact,
            size: (100, 100),
        };
        assert!(exact.check((100, 100)).is_ok());
        assert!(exact.check((100, 80)).is_err());
        assert!(exact.check((80, 80)).is_err());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("fit".parse::<Transform>().unwrap(), Transform::Fit);
        assert!(matches!(
            "stretch".parse::<Transform>(),
            Err(SatchelError::Configuration(_))
        ));
        assert_eq!("exact".parse::<ConstraintType>().unwrap(), ConstraintType::Exact);
        assert!("huge".parse::<ConstraintType>().is_err());
    }

    #[test]
    fn test_options_from_toml() {
        let options: ImageOptions = toml::from_str(
            r#"
size = [100, 100]
transform = "fit"
constraint_type = "min"
quality = 85
"#,
        )
        .unwrap();
        assert_eq!(options.size, Some((100, 100)));
        assert_eq!(options.transform, Transform::Fit);
        assert_eq!(options.quality, 85);
        assert!(options.progressive);

        let cfg = ImageConfig::try_from(options).unwrap();
        assert_eq!(cfg.constraint.unwrap().size, (100, 100));
    }
}
