//! Touch detection between two region rasters.
//!
//! Regions built by [`crate::region`] never overlap, so adjacency is
//! tested by growing one side and looking for overlap with the other:
//!
//! - [`find_touching_cell_ids`] dilates each binary mask with a disk and
//!   reports, per side, the cells lying under the other side's dilation;
//! - [`find_touching_cell_pairs`] dilates both label rasters with a
//!   diamond and records the `(id1, id2)` labels meeting at each pixel,
//!   giving the distinct kissing pairs.
//!
//! Adjacent compartments are separated by their (cleared) membrane, so
//! both tests must reach across a wall one or two pixels wide.

use std::collections::BTreeSet;

use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;
use serde::{Deserialize, Serialize};

use crate::raster::{BACKGROUND, LabelImage, dimensions_of, ensure_same_size, foreground_mask};
use crate::types::AnalysisError;

/// Cells of each population that touch the other population.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchingIds {
    /// Phenotype-1 cells touching phenotype 2 (sorted, unique).
    pub first: Vec<u32>,
    /// Phenotype-2 cells touching phenotype 1 (sorted, unique).
    pub second: Vec<u32>,
}

/// Two adjacent cells, one per phenotype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TouchPair {
    /// Cell of phenotype 1.
    pub first: u32,
    /// Cell of phenotype 2.
    pub second: u32,
}

impl TouchPair {
    /// The same pair with the columns exchanged.
    #[must_use]
    pub const fn swapped(self) -> Self {
        Self {
            first: self.second,
            second: self.first,
        }
    }
}

/// Directional touch detection with a Euclidean disk of `radius` pixels.
///
/// # Errors
///
/// Returns [`AnalysisError::DimensionMismatch`] if the rasters differ in
/// size.
pub fn find_touching_cell_ids(
    first: &LabelImage,
    second: &LabelImage,
    radius: u8,
) -> Result<TouchingIds, AnalysisError> {
    ensure_same_size(dimensions_of(first), dimensions_of(second))?;
    let first_grown = dilate(&foreground_mask(first), Norm::L2, radius);
    let second_grown = dilate(&foreground_mask(second), Norm::L2, radius);
    Ok(TouchingIds {
        first: labels_under(first, &second_grown),
        second: labels_under(second, &first_grown),
    })
}

/// Sorted unique labels of `labels` where `mask` is set.
fn labels_under(labels: &LabelImage, mask: &GrayImage) -> Vec<u32> {
    labels
        .enumerate_pixels()
        .filter(|&(x, y, p)| p.0[0] != BACKGROUND && mask.get_pixel(x, y).0[0] != 0)
        .map(|(_, _, p)| p.0[0])
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Offsets `(dx, dy)` with `|dx| + |dy| <= r`.
fn diamond(r: i64) -> Vec<(i64, i64)> {
    (-r..=r)
        .flat_map(|dy| {
            let span = r - dy.abs();
            (-span..=span).map(move |dx| (dx, dy))
        })
        .collect()
}

/// Distinct touching pairs after dilating both rasters with a diamond of
/// `radius` pixels.
///
/// Two diamond dilations overlap exactly when the original pixels lie
/// within L1 distance `2 * radius`, so pairs are collected set-wise over
/// that neighborhood rather than through a max-filter, which would hide
/// all but the largest label under each pixel. A radius of 0 only pairs
/// overlapping pixels.
///
/// Swapping the inputs swaps the columns of the result.
///
/// # Errors
///
/// Returns [`AnalysisError::DimensionMismatch`] if the rasters differ in
/// size.
pub fn find_touching_cell_pairs(
    first: &LabelImage,
    second: &LabelImage,
    radius: u8,
) -> Result<Vec<TouchPair>, AnalysisError> {
    ensure_same_size(dimensions_of(first), dimensions_of(second))?;
    let offsets = diamond(2 * i64::from(radius));
    let width = i64::from(first.width());
    let height = i64::from(first.height());
    let mut pairs = BTreeSet::new();

    for (x, y, p) in first.enumerate_pixels() {
        let a = p.0[0];
        if a == BACKGROUND {
            continue;
        }
        for &(dx, dy) in &offsets {
            let nx = i64::from(x) + dx;
            let ny = i64::from(y) + dy;
            if nx < 0 || ny < 0 || nx >= width || ny >= height {
                continue;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let b = second.get_pixel(nx as u32, ny as u32).0[0];
            if b != BACKGROUND {
                pairs.insert(TouchPair {
                    first: a,
                    second: b,
                });
            }
        }
    }
    Ok(pairs.into_iter().collect())
}
