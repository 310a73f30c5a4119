//! Cell regions: reconstruct each cell's full compartment from its
//! nucleus and the surrounding membrane.
//!
//! Membrane pixels become walls. Each cell's nucleus interior point
//! seeds a 4-connected flood fill over background pixels, stopping at
//! walls and at pixels another cell already claimed. Fills are therefore
//! disjoint. Leftover walls are cleared to background at the end.

use image::Luma;

use crate::interior::{interior_point_in, label_bounds};
use crate::raster::{BACKGROUND, LabelImage, MEMBRANE_WALL, SegmentationMasks};

/// Region raster for one population, plus which cells made it in.
#[derive(Debug, Clone)]
pub struct CellRegions {
    /// Each filled pixel carries its cell's ID; everything else is 0.
    pub raster: LabelImage,
    /// Cells whose compartment was filled, in input order.
    pub filled: Vec<u32>,
    /// Cells with no nucleus pixels or whose seed was already taken.
    pub skipped: Vec<u32>,
}

impl CellRegions {
    /// Returns `true` if no region was filled.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.filled.is_empty()
    }
}

/// Build the region raster for `cell_ids` from `masks`.
///
/// Cells are processed in order; earlier cells win contested pixels.
/// Cells without a usable seed are skipped and logged, not reported as
/// errors.
#[must_use]
pub fn build_cell_regions(cell_ids: &[u32], masks: &SegmentationMasks) -> CellRegions {
    let nucleus = masks.nucleus();
    let bounds = label_bounds(nucleus);
    let mut raster = masks.membrane_walls();
    let mut filled = Vec::with_capacity(cell_ids.len());
    let mut skipped = Vec::new();

    for &id in cell_ids {
        let seed = bounds
            .get(&id)
            .and_then(|&b| interior_point_in(nucleus, id, b));
        let Some((x, y)) = seed else {
            log::debug!("cell {id}: no nucleus pixels, skipped");
            skipped.push(id);
            continue;
        };
        let count = flood_fill(&mut raster, x, y, id);
        if count == 0 {
            log::debug!("cell {id}: seed ({x}, {y}) is on a wall or a claimed pixel, skipped");
            skipped.push(id);
        } else {
            filled.push(id);
        }
    }

    clear_walls(&mut raster);
    CellRegions {
        raster,
        filled,
        skipped,
    }
}

/// Fill the 4-connected background component containing `(x, y)` with
/// `id`. Returns the number of pixels filled; 0 if the seed is not
/// background.
pub fn flood_fill(raster: &mut LabelImage, x: u32, y: u32, id: u32) -> usize {
    if x >= raster.width() || y >= raster.height() || raster.get_pixel(x, y).0[0] != BACKGROUND {
        return 0;
    }
    let (width, height) = raster.dimensions();
    let mut stack = vec![(x, y)];
    raster.put_pixel(x, y, Luma([id]));
    let mut count = 0;

    while let Some((cx, cy)) = stack.pop() {
        count += 1;
        let neighbors = [
            (cx.checked_sub(1), Some(cy)),
            ((cx + 1 < width).then_some(cx + 1), Some(cy)),
            (Some(cx), cy.checked_sub(1)),
            (Some(cx), (cy + 1 < height).then_some(cy + 1)),
        ];
        for (nx, ny) in neighbors {
            let (Some(nx), Some(ny)) = (nx, ny) else {
                continue;
            };
            if raster.get_pixel(nx, ny).0[0] == BACKGROUND {
                raster.put_pixel(nx, ny, Luma([id]));
                stack.push((nx, ny));
            }
        }
    }
    count
}

fn clear_walls(raster: &mut LabelImage) {
    for pixel in raster.pixels_mut() {
        if pixel.0[0] == MEMBRANE_WALL {
            pixel.0[0] = BACKGROUND;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Draw a hollow rectangle of membrane label `id`.
    fn ring(membrane: &mut LabelImage, id: u32, x0: u32, y0: u32, x1: u32, y1: u32) {
        for x in x0..=x1 {
            membrane.put_pixel(x, y0, Luma([id]));
            membrane.put_pixel(x, y1, Luma([id]));
        }
        for y in y0..=y1 {
            membrane.put_pixel(x0, y, Luma([id]));
            membrane.put_pixel(x1, y, Luma([id]));
        }
    }

    fn blob(nucleus: &mut LabelImage, id: u32, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                nucleus.put_pixel(x, y, Luma([id]));
            }
        }
    }

    #[test]
    fn enclosed_blob_fills_exactly_the_interior() {
        let mut nucleus = LabelImage::new(12, 12);
        let mut membrane = LabelImage::new(12, 12);
        ring(&mut membrane, 1, 2, 2, 9, 9);
        blob(&mut nucleus, 1, 5, 5, 6, 6);
        let masks = SegmentationMasks::new(nucleus, membrane).unwrap();

        let regions = build_cell_regions(&[1], &masks);
        assert_eq!(regions.filled, vec![1]);
        assert!(regions.skipped.is_empty());
        for (x, y, p) in regions.raster.enumerate_pixels() {
            let inside = (3..=8).contains(&x) && (3..=8).contains(&y);
            let expected = if inside { 1 } else { BACKGROUND };
            assert_eq!(p.0[0], expected, "pixel ({x}, {y})");
        }
    }

    #[test]
    fn missing_nucleus_is_skipped() {
        let masks = SegmentationMasks::new(LabelImage::new(6, 6), LabelImage::new(6, 6)).unwrap();
        let regions = build_cell_regions(&[4], &masks);
        assert!(regions.is_empty());
        assert_eq!(regions.skipped, vec![4]);
        assert!(regions.raster.pixels().all(|p| p.0[0] == BACKGROUND));
    }

    #[test]
    fn neighboring_cells_never_share_pixels() {
        // Two compartments sharing a membrane column at x = 6.
        let mut nucleus = LabelImage::new(13, 7);
        let mut membrane = LabelImage::new(13, 7);
        ring(&mut membrane, 1, 0, 0, 6, 6);
        ring(&mut membrane, 2, 6, 0, 12, 6);
        blob(&mut nucleus, 1, 2, 2, 4, 4);
        blob(&mut nucleus, 2, 8, 2, 10, 4);
        let masks = SegmentationMasks::new(nucleus, membrane).unwrap();

        let regions = build_cell_regions(&[1, 2], &masks);
        assert_eq!(regions.filled, vec![1, 2]);
        let count = |id| regions.raster.pixels().filter(|p| p.0[0] == id).count();
        assert_eq!(count(1), 25);
        assert_eq!(count(2), 25);
        assert_eq!(regions.raster.get_pixel(6, 3).0[0], BACKGROUND);
    }

    #[test]
    fn second_seed_in_claimed_compartment_is_skipped() {
        // Two nuclei inside one closed membrane: the first fill claims it.
        let mut nucleus = LabelImage::new(10, 10);
        let mut membrane = LabelImage::new(10, 10);
        ring(&mut membrane, 1, 0, 0, 9, 9);
        blob(&mut nucleus, 1, 2, 2, 3, 3);
        blob(&mut nucleus, 2, 6, 6, 7, 7);
        let masks = SegmentationMasks::new(nucleus, membrane).unwrap();

        let regions = build_cell_regions(&[1, 2], &masks);
        assert_eq!(regions.filled, vec![1]);
        assert_eq!(regions.skipped, vec![2]);
        assert!(regions.raster.pixels().all(|p| p.0[0] != 2));
    }

    #[test]
    fn cells_outside_the_subset_are_ignored() {
        let mut nucleus = LabelImage::new(13, 7);
        let mut membrane = LabelImage::new(13, 7);
        ring(&mut membrane, 1, 0, 0, 6, 6);
        ring(&mut membrane, 2, 6, 0, 12, 6);
        blob(&mut nucleus, 1, 2, 2, 4, 4);
        blob(&mut nucleus, 2, 8, 2, 10, 4);
        let masks = SegmentationMasks::new(nucleus, membrane).unwrap();

        let regions = build_cell_regions(&[2], &masks);
        assert_eq!(regions.filled, vec![2]);
        assert_eq!(regions.raster.get_pixel(3, 3).0[0], BACKGROUND);
        assert_eq!(regions.raster.get_pixel(9, 3).0[0], 2);
    }

    #[test]
    fn flood_fill_rejects_non_background_seed() {
        let mut raster = LabelImage::new(3, 3);
        raster.put_pixel(1, 1, Luma([MEMBRANE_WALL]));
        assert_eq!(flood_fill(&mut raster, 1, 1, 5), 0);
        assert_eq!(flood_fill(&mut raster, 7, 7, 5), 0);
        assert_eq!(flood_fill(&mut raster, 0, 0, 5), 8);
    }
}
