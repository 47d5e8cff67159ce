//! Barcode image fitting
//!
//! The barcode fills the target width unless that would make it taller
//! than the height budget, in which case the height budget wins and the
//! width shrinks to keep the aspect ratio.

use crate::geometry::PageGeometry;
use crate::{LabelError, Result};

/// Placed size of an image in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedSize {
    pub width: f64,
    pub height: f64,
}

/// Fit an image of `image_width` x `image_height` pixels into a box given
/// as percentages of the page size
pub fn fit_barcode(
    image_width: u32,
    image_height: u32,
    geometry: &PageGeometry,
    width_percent: f64,
    height_percent: f64,
) -> Result<FittedSize> {
    if image_width == 0 || image_height == 0 {
        return Err(LabelError::ZeroSizedImage {
            width: image_width,
            height: image_height,
        });
    }

    let (iw, ih) = (image_width as f64, image_height as f64);

    let mut width = geometry.width * (width_percent / 100.0);
    let mut scale = width / iw;
    let mut height = ih * scale;

    let max_height = geometry.height * (height_percent / 100.0);
    if height > max_height {
        scale = max_height / ih;
        height = max_height;
        width = iw * scale;
    }

    log::debug!(
        "Fitted {image_width}x{image_height}px barcode to {width:.2}x{height:.2}pt (scale {scale:.4})"
    );

    Ok(FittedSize { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn a4() -> PageGeometry {
        PageGeometry::new(0.0, 0.0, 595.0, 842.0)
    }

    #[test]
    fn test_width_fills_when_height_allows() {
        // 400x100 image, 20% of 595 = 119 wide -> 29.75 high, budget 101.04
        let size = fit_barcode(400, 100, &a4(), 20.0, 12.0).unwrap();
        assert_eq!(size.width, 595.0 * (20.0 / 100.0));
        assert!((size.height - 29.75).abs() < 1e-9);
    }

    #[test]
    fn test_height_caps_tall_images() {
        let g = PageGeometry::new(0.0, 0.0, 283.0, 170.0);
        // 20% of 283 = 56.6 wide; a square would be 56.6 high, budget 20.4
        let size = fit_barcode(300, 300, &g, 20.0, 12.0).unwrap();
        assert!((size.height - 20.4).abs() < 1e-9);
        assert!((size.width - 20.4).abs() < 1e-9);
    }

    #[test]
    fn test_aspect_ratio_preserved() {
        let g = PageGeometry::new(0.0, 0.0, 283.0, 170.0);
        for (w, h) in [(1, 1), (1000, 10), (10, 1000), (567, 283)] {
            for (wp, hp) in [(5.0, 5.0), (20.0, 12.0), (50.0, 30.0), (100.0, 1.0)] {
                let size = fit_barcode(w, h, &g, wp, hp).unwrap();
                let expected = w as f64 / h as f64;
                assert!(((size.width / size.height) - expected).abs() / expected < 1e-9);
                assert!(size.height <= g.height * hp / 100.0 + 1e-9);
            }
        }
    }

    #[test]
    fn test_exact_fit_keeps_width() {
        // Height lands exactly on the budget: width is not recomputed
        let g = PageGeometry::new(0.0, 0.0, 100.0, 100.0);
        let size = fit_barcode(200, 100, &g, 20.0, 10.0).unwrap();
        assert_eq!(size, FittedSize { width: 20.0, height: 10.0 });
    }

    #[test]
    fn test_zero_sized_image_is_rejected() {
        assert!(matches!(
            fit_barcode(0, 10, &a4(), 20.0, 12.0),
            Err(LabelError::ZeroSizedImage { width: 0, height: 10 })
        ));
        assert!(matches!(
            fit_barcode(10, 0, &a4(), 20.0, 12.0),
            Err(LabelError::ZeroSizedImage { .. })
        ));
    }
}
