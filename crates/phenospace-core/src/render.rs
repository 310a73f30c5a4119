//! Touching-cell overlays drawn onto the composite image.
//!
//! Separate from the statistics: consumes the same region rasters and
//! touching IDs, returns a new image, and never writes anything.

use std::collections::HashSet;

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::raster::{BACKGROUND, LabelImage, dimensions_of, ensure_same_size};
use crate::touch::TouchingIds;
use crate::types::{AnalysisError, Dimensions};

/// Overlay colors, one per phenotype of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayColors {
    /// Outline and fill color for phenotype 1.
    pub first: [u8; 3],
    /// Outline and fill color for phenotype 2.
    pub second: [u8; 3],
}

impl Default for OverlayColors {
    fn default() -> Self {
        Self {
            first: [255, 0, 255],
            second: [0, 255, 255],
        }
    }
}

/// Outline every region of both rasters and fill the touching ones.
///
/// Outlines are region pixels with a 4-neighbor outside the region (or
/// on the image edge). Phenotype 2 is drawn after phenotype 1.
///
/// # Errors
///
/// Returns [`AnalysisError::DimensionMismatch`] if the composite and the
/// rasters differ in size.
pub fn render_touch_overlay(
    composite: &RgbImage,
    first: &LabelImage,
    second: &LabelImage,
    touching: &TouchingIds,
    colors: OverlayColors,
) -> Result<RgbImage, AnalysisError> {
    let size = Dimensions {
        width: composite.width(),
        height: composite.height(),
    };
    ensure_same_size(size, dimensions_of(first))?;
    ensure_same_size(size, dimensions_of(second))?;

    let mut out = composite.clone();
    paint(&mut out, first, &touching.first, Rgb(colors.first));
    paint(&mut out, second, &touching.second, Rgb(colors.second));
    Ok(out)
}

fn paint(out: &mut RgbImage, labels: &LabelImage, filled: &[u32], color: Rgb<u8>) {
    let filled: HashSet<u32> = filled.iter().copied().collect();
    for (x, y, p) in labels.enumerate_pixels() {
        let id = p.0[0];
        if id == BACKGROUND {
            continue;
        }
        if filled.contains(&id) || is_edge(labels, x, y, id) {
            out.put_pixel(x, y, color);
        }
    }
}

fn is_edge(labels: &LabelImage, x: u32, y: u32, id: u32) -> bool {
    let (width, height) = labels.dimensions();
    if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
        return true;
    }
    [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)]
        .iter()
        .any(|&(nx, ny)| labels.get_pixel(nx, ny).0[0] != id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Luma;

    fn rect(labels: &mut LabelImage, id: u32, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                labels.put_pixel(x, y, Luma([id]));
            }
        }
    }

    #[test]
    fn outlines_untouched_and_fills_touching() {
        let composite = RgbImage::from_pixel(16, 8, Rgb([10, 10, 10]));
        let mut first = LabelImage::new(16, 8);
        let mut second = LabelImage::new(16, 8);
        rect(&mut first, 1, 1, 1, 5, 5);
        rect(&mut first, 2, 9, 1, 13, 5);
        rect(&mut second, 3, 6, 1, 7, 5);
        let touching = TouchingIds {
            first: vec![1],
            second: vec![3],
        };
        let colors = OverlayColors::default();
        let out = render_touch_overlay(&composite, &first, &second, &touching, colors).unwrap();

        // Cell 1 touches: its interior is filled.
        assert_eq!(*out.get_pixel(3, 3), Rgb(colors.first));
        // Cell 2 does not: edge drawn, interior untouched.
        assert_eq!(*out.get_pixel(9, 3), Rgb(colors.first));
        assert_eq!(*out.get_pixel(11, 3), Rgb([10, 10, 10]));
        // Phenotype 2 cell filled in its own color.
        assert_eq!(*out.get_pixel(6, 3), Rgb(colors.second));
        // Background untouched.
        assert_eq!(*out.get_pixel(15, 7), Rgb([10, 10, 10]));
    }

    #[test]
    fn composite_size_must_match() {
        let composite = RgbImage::new(4, 4);
        let labels = LabelImage::new(5, 4);
        let result = render_touch_overlay(
            &composite,
            &labels,
            &labels,
            &TouchingIds::default(),
            OverlayColors::default(),
        );
        assert!(matches!(
            result,
            Err(AnalysisError::DimensionMismatch { .. })
        ));
    }
}
