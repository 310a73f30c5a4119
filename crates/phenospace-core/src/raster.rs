//! Label rasters: integer images whose pixel value is the owning cell ID.

use image::{GrayImage, ImageBuffer, Luma};

use crate::types::{AnalysisError, Dimensions};

/// A raster of cell IDs; 0 is background.
pub type LabelImage = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Pixel value for "no cell".
pub const BACKGROUND: u32 = 0;

/// Sentinel marking membrane pixels that bound a flood fill.
pub const MEMBRANE_WALL: u32 = u32::MAX;

/// Size of a label raster.
#[must_use]
pub fn dimensions_of(labels: &LabelImage) -> Dimensions {
    Dimensions {
        width: labels.width(),
        height: labels.height(),
    }
}

/// Check that two rasters share a size.
///
/// # Errors
///
/// Returns [`AnalysisError::DimensionMismatch`] when they differ.
pub fn ensure_same_size(expected: Dimensions, actual: Dimensions) -> Result<(), AnalysisError> {
    if expected == actual {
        Ok(())
    } else {
        Err(AnalysisError::DimensionMismatch { expected, actual })
    }
}

/// Widen a 16-bit label image (the usual on-disk encoding) to
/// [`LabelImage`].
#[must_use]
pub fn labels_from_luma16(image: &ImageBuffer<Luma<u16>, Vec<u16>>) -> LabelImage {
    LabelImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([u32::from(image.get_pixel(x, y).0[0])])
    })
}

/// Binary mask of labeled pixels: 255 where the label is positive.
#[must_use]
pub fn foreground_mask(labels: &LabelImage) -> GrayImage {
    GrayImage::from_fn(labels.width(), labels.height(), |x, y| {
        if labels.get_pixel(x, y).0[0] == BACKGROUND {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Aligned nucleus and membrane label rasters for one field.
#[derive(Debug, Clone)]
pub struct SegmentationMasks {
    nucleus: LabelImage,
    membrane: LabelImage,
}

impl SegmentationMasks {
    /// Pair a nucleus and a membrane raster.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::DimensionMismatch`] when the rasters are
    /// not the same size.
    pub fn new(nucleus: LabelImage, membrane: LabelImage) -> Result<Self, AnalysisError> {
        ensure_same_size(dimensions_of(&nucleus), dimensions_of(&membrane))?;
        Ok(Self { nucleus, membrane })
    }

    /// Shared raster size.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        dimensions_of(&self.nucleus)
    }

    /// Nucleus labels.
    #[must_use]
    pub const fn nucleus(&self) -> &LabelImage {
        &self.nucleus
    }

    /// Membrane labels.
    #[must_use]
    pub const fn membrane(&self) -> &LabelImage {
        &self.membrane
    }

    /// A fresh copy of the membrane raster with every membrane pixel set
    /// to [`MEMBRANE_WALL`] and everything else to [`BACKGROUND`].
    #[must_use]
    pub fn membrane_walls(&self) -> LabelImage {
        LabelImage::from_fn(self.membrane.width(), self.membrane.height(), |x, y| {
            if self.membrane.get_pixel(x, y).0[0] == BACKGROUND {
                Luma([BACKGROUND])
            } else {
                Luma([MEMBRANE_WALL])
            }
        })
    }
}
