//! Interior points: the most-interior pixel of a nucleus label.
//!
//! Seeding a flood fill at the pixel farthest from the nucleus boundary
//! keeps the seed off thin or eroded nucleus edges, where a fill could
//! start on the wrong side of a membrane.

use std::collections::HashMap;

use image::{GrayImage, Luma};

use crate::raster::{BACKGROUND, LabelImage};

/// Inclusive bounding box of one label, in raster coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelBounds {
    /// Leftmost column.
    pub min_x: u32,
    /// Topmost row.
    pub min_y: u32,
    /// Rightmost column.
    pub max_x: u32,
    /// Bottom row.
    pub max_y: u32,
}

impl LabelBounds {
    const fn at(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        if x < self.min_x {
            self.min_x = x;
        }
        if x > self.max_x {
            self.max_x = x;
        }
        if y < self.min_y {
            self.min_y = y;
        }
        if y > self.max_y {
            self.max_y = y;
        }
    }

    /// Grow by one pixel on each side, clamped to a `width` x `height`
    /// raster.
    #[must_use]
    pub fn padded(self, width: u32, height: u32) -> Self {
        Self {
            min_x: self.min_x.saturating_sub(1),
            min_y: self.min_y.saturating_sub(1),
            max_x: (self.max_x + 1).min(width.saturating_sub(1)),
            max_y: (self.max_y + 1).min(height.saturating_sub(1)),
        }
    }

    /// Box width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    /// Box height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// Bounding boxes of every positive label, computed in one pass.
#[must_use]
pub fn label_bounds(labels: &LabelImage) -> HashMap<u32, LabelBounds> {
    let mut bounds: HashMap<u32, LabelBounds> = HashMap::new();
    for (x, y, pixel) in labels.enumerate_pixels() {
        let id = pixel.0[0];
        if id == BACKGROUND {
            continue;
        }
        bounds
            .entry(id)
            .and_modify(|b| b.include(x, y))
            .or_insert_with(|| LabelBounds::at(x, y));
    }
    bounds
}

/// The most-interior pixel of label `id` in `nucleus`, or `None` if the
/// label has no pixels.
///
/// Scans the whole raster for the bounding box; use
/// [`interior_point_in`] with [`label_bounds`] when locating many labels.
#[must_use]
pub fn interior_point(nucleus: &LabelImage, id: u32) -> Option<(u32, u32)> {
    let bounds = label_bounds(nucleus).get(&id).copied()?;
    interior_point_in(nucleus, id, bounds)
}

/// The most-interior pixel of label `id`, given its bounding box.
///
/// Crops the box (padded by one pixel where the raster allows), treats
/// every pixel not labelled `id` as boundary, and returns the first
/// pixel in row-major order at the maximum Euclidean distance from the
/// boundary. Coordinates are in the full raster.
#[must_use]
pub fn interior_point_in(nucleus: &LabelImage, id: u32, bounds: LabelBounds) -> Option<(u32, u32)> {
    let window = bounds.padded(nucleus.width(), nucleus.height());

    // Non-zero pixels are the distance transform's foreground, so the
    // cell itself is 0 and everything else is 255.
    let crop = GrayImage::from_fn(window.width(), window.height(), |x, y| {
        if nucleus.get_pixel(window.min_x + x, window.min_y + y).0[0] == id {
            Luma([0])
        } else {
            Luma([255])
        }
    });
    let distances = imageproc::distance_transform::euclidean_squared_distance_transform(&crop);

    let mut best: Option<((u32, u32), f64)> = None;
    for (x, y, pixel) in crop.enumerate_pixels() {
        if pixel.0[0] != 0 {
            continue;
        }
        let d = distances.get_pixel(x, y).0[0];
        if best.is_none_or(|(_, b)| d > b) {
            best = Some(((x, y), d));
        }
    }
    best.map(|((x, y), _)| (window.min_x + x, window.min_y + y))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fill_rect(labels: &mut LabelImage, id: u32, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                labels.put_pixel(x, y, Luma([id]));
            }
        }
    }

    #[test]
    fn missing_label_is_none() {
        let labels = LabelImage::new(8, 8);
        assert_eq!(interior_point(&labels, 3), None);
    }

    #[test]
    fn square_center_is_found() {
        let mut labels = LabelImage::new(12, 12);
        fill_rect(&mut labels, 5, 2, 3, 6, 7);
        assert_eq!(interior_point(&labels, 5), Some((4, 5)));
    }

    #[test]
    fn other_labels_are_boundary() {
        // Label 1 is a wide bar; label 2 covers its right half, so the
        // interior of 1 must lie in the left part.
        let mut labels = LabelImage::new(20, 7);
        fill_rect(&mut labels, 1, 1, 1, 18, 5);
        fill_rect(&mut labels, 2, 8, 1, 18, 5);
        let (x, y) = interior_point(&labels, 1).unwrap();
        assert_eq!(labels.get_pixel(x, y).0[0], 1);
        assert!(x < 8);
        assert_eq!(y, 3);
    }

    #[test]
    fn ties_resolve_to_first_in_row_major_order() {
        let mut labels = LabelImage::new(10, 10);
        fill_rect(&mut labels, 9, 3, 3, 6, 4);
        // A 4x2 block: every pixel is 1 from the boundary.
        assert_eq!(interior_point(&labels, 9), Some((3, 3)));
    }

    #[test]
    fn thin_neck_prefers_thick_lobe() {
        // A dumbbell: small lobe, one-pixel neck, large lobe.
        let mut labels = LabelImage::new(30, 13);
        fill_rect(&mut labels, 4, 1, 5, 3, 7);
        fill_rect(&mut labels, 4, 4, 6, 10, 6);
        fill_rect(&mut labels, 4, 11, 1, 21, 11);
        let (x, y) = interior_point(&labels, 4).unwrap();
        assert!((11..=21).contains(&x));
        assert_eq!((x, y), (16, 6));
    }

    #[test]
    fn label_at_raster_edge() {
        let mut labels = LabelImage::new(5, 5);
        fill_rect(&mut labels, 2, 0, 0, 2, 2);
        let point = interior_point(&labels, 2).unwrap();
        assert_eq!(labels.get_pixel(point.0, point.1).0[0], 2);
    }

    #[test]
    fn bounds_cover_all_labels() {
        let mut labels = LabelImage::new(10, 10);
        fill_rect(&mut labels, 1, 2, 3, 4, 5);
        labels.put_pixel(9, 0, Luma([1]));
        labels.put_pixel(0, 9, Luma([7]));
        let bounds = label_bounds(&labels);
        assert_eq!(bounds.len(), 2);
        assert_eq!(
            bounds[&1],
            LabelBounds {
                min_x: 2,
                min_y: 0,
                max_x: 9,
                max_y: 5
            }
        );
        assert_eq!(bounds[&7].width(), 1);
        assert_eq!(bounds[&1].padded(10, 10).max_x, 9);
        assert_eq!(bounds[&1].padded(10, 10).min_x, 1);
    }
}
