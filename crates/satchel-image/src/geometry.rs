//! Crop and fit geometry

use crate::config::Transform;
use image::imageops::FilterType;
use image::DynamicImage;

/// Resampling filter used for every resize (bicubic)
const FILTER: FilterType = FilterType::CatmullRom;

/// Centered rectangle `(x, y, width, height)` of the original that has the
/// target's aspect ratio
pub fn crop_rect((iw, ih): (u32, u32), (tw, th): (u32, u32)) -> (u32, u32, u32, u32) {
    let iaspect = f64::from(iw) / f64::from(ih);
    let taspect = f64::from(tw) / f64::from(th);
    if iaspect > taspect {
        let left = ((f64::from(iw) - f64::from(ih) * taspect) / 2.0) as u32;
        (left, 0, iw - 2 * left, ih)
    } else {
        let upper = ((f64::from(ih) - f64::from(iw) / taspect) / 2.0) as u32;
        (0, upper, iw, ih - 2 * upper)
    }
}

/// Largest size with the original aspect ratio that fits in the target.
/// Never larger than the original.
pub fn fit_size((iw, ih): (u32, u32), (tw, th): (u32, u32)) -> (u32, u32) {
    if iw <= tw && ih <= th {
        return (iw, ih);
    }
    let scale = f64::min(
        f64::from(tw) / f64::from(iw),
        f64::from(th) / f64::from(ih),
    );
    let width = ((f64::from(iw) * scale).round() as u32).clamp(1, tw);
    let height = ((f64::from(ih) * scale).round() as u32).clamp(1, th);
    (width, height)
}

/// Bring `img` down to `target` with the given transform.
///
/// `Crop` only acts when the original exceeds the target on some axis;
/// `Fit` never upscales.
pub fn downsize(img: DynamicImage, target: (u32, u32), transform: Transform) -> DynamicImage {
    let original = (img.width(), img.height());
    match transform {
        Transform::Crop => {
            if original.0 <= target.0 && original.1 <= target.1 {
                return img;
            }
            let (x, y, w, h) = crop_rect(original, target);
            img.crop_imm(x, y, w, h)
                .resize_exact(target.0, target.1, FILTER)
        }
        Transform::Fit => {
            let (w, h) = fit_size(original, target);
            if (w, h) == original {
                return img;
            }
            img.resize_exact(w, h, FILTER)
        }
    }
}
