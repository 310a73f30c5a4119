//! Shared types for the phenospace analysis core.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::render::OverlayColors;
use crate::search::NeighborSearchKind;

/// Re-export `RgbImage` so downstream crates can pass composite images
/// without depending on `image` directly.
pub use image::RgbImage;

/// A 2D point in field coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (from the left edge).
    pub x: f64,
    /// Vertical position (from the top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Multiply both coordinates by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Unit of the cell positions in a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    /// Positions are raster pixel coordinates.
    Pixels,
    /// Positions are already in microns.
    #[default]
    Microns,
}

/// Conversion between raster pixels and microns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialScale {
    /// Physical size of one pixel edge.
    pub microns_per_pixel: f64,
}

impl SpatialScale {
    /// Create a scale from a pixel size in microns.
    #[must_use]
    pub const fn new(microns_per_pixel: f64) -> Self {
        Self { microns_per_pixel }
    }

    /// Convert a point in `units` to microns.
    #[must_use]
    pub fn to_microns(self, point: Point, units: Units) -> Point {
        match units {
            Units::Microns => point,
            Units::Pixels => point.scaled(self.microns_per_pixel),
        }
    }

    /// Convert a point in `units` to pixels.
    #[must_use]
    pub fn to_pixels(self, point: Point, units: Units) -> Point {
        match units {
            Units::Pixels => point,
            Units::Microns => point.scaled(1.0 / self.microns_per_pixel),
        }
    }
}

/// Configuration for all analyses.
///
/// Threaded explicitly through every operation that needs it; there is
/// no global default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Pixel edge length in microns. Used to convert pixel positions to
    /// microns for distances and micron positions to pixels for bounds.
    pub microns_per_pixel: f64,

    /// Dilation radius (pixels, Euclidean disk) for directional touch
    /// detection.
    pub touch_dilation_radius: u8,

    /// Diamond dilation radius (pixels) applied to both region rasters
    /// for mutual touching pairs.
    pub pair_dilation_radius: u8,

    /// Which neighbor search backs nearest-neighbor and radius queries.
    pub neighbor_search: NeighborSearchKind,

    /// Colors used when composing touching-cell overlays.
    pub overlay_colors: OverlayColors,
}

impl AnalysisConfig {
    /// Default pixel size: 0.5 microns, i.e. 2 pixels per micron at 20x.
    pub const DEFAULT_MICRONS_PER_PIXEL: f64 = 0.5;
    /// Default dilation radius for directional touch detection.
    pub const DEFAULT_TOUCH_DILATION_RADIUS: u8 = 2;
    /// Default neighborhood radius for mutual touching pairs.
    pub const DEFAULT_PAIR_DILATION_RADIUS: u8 = 1;

    /// The pixel/micron conversion described by this config.
    #[must_use]
    pub const fn scale(&self) -> SpatialScale {
        SpatialScale::new(self.microns_per_pixel)
    }

    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] if `microns_per_pixel` is
    /// not a finite positive number.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !self.microns_per_pixel.is_finite() || self.microns_per_pixel <= 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "microns_per_pixel must be finite and positive, got {}",
                self.microns_per_pixel
            )));
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            microns_per_pixel: Self::DEFAULT_MICRONS_PER_PIXEL,
            touch_dilation_radius: Self::DEFAULT_TOUCH_DILATION_RADIUS,
            pair_dilation_radius: Self::DEFAULT_PAIR_DILATION_RADIUS,
            neighbor_search: NeighborSearchKind::default(),
            overlay_colors: OverlayColors::default(),
        }
    }
}

/// Errors that can occur during analysis.
///
/// Absent populations and cells without nucleus pixels are not errors:
/// they degrade to zero-count rows and skipped cells respectively.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// A parameter is out of range.
    #[error("invalid analysis configuration: {0}")]
    InvalidConfig(String),

    /// A phenotype name is not defined in the phenotype rules.
    #[error("phenotype {0:?} is not defined in the phenotype rules")]
    UnknownPhenotype(String),

    /// A raster or image needed by the requested output is absent.
    #[error("missing required asset: {0}")]
    MissingAsset(String),

    /// Two cells in one field share an ID.
    #[error("duplicate cell id {0}")]
    DuplicateCellId(u32),

    /// Cell ID 0 collides with the raster background value.
    #[error("cell id 0 is reserved for raster background")]
    ZeroCellId,

    /// Cell ID `u32::MAX` collides with the membrane wall value.
    #[error("cell id {0} is reserved for membrane walls")]
    ReservedCellId(u32),

    /// A cell position lies outside the image.
    #[error("cell {id} at ({x:.2}, {y:.2}) px lies outside the {dimensions} image")]
    PositionOutOfBounds {
        /// Offending cell.
        id: u32,
        /// Horizontal position in pixels.
        x: f64,
        /// Vertical position in pixels.
        y: f64,
        /// Image size.
        dimensions: Dimensions,
    },

    /// Two rasters that must be aligned have different sizes.
    #[error("raster dimensions differ: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Size of the reference raster.
        expected: Dimensions,
        /// Size of the mismatched raster.
        actual: Dimensions,
    },
}
