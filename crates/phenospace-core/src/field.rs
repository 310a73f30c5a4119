//! Cells and fields: the tabular side of a segmented image.
//!
//! A [`Field`] is one imaged tissue region. It owns its cells in table
//! order, the unit of their positions, and optionally the segmentation
//! masks aligned to the same coordinate grid.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::phenotype::PhenotypeSelector;
use crate::raster::{MEMBRANE_WALL, SegmentationMasks};
use crate::types::{AnalysisError, Dimensions, Point, SpatialScale, Units};

/// One segmented cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Cell ID; equals the cell's value in the label rasters.
    pub id: u32,
    /// Cell center in the field's [`Units`].
    pub position: Point,
    /// Assigned phenotype, if any.
    #[serde(default)]
    pub phenotype: Option<String>,
    /// Coarse tissue region, e.g. `"tumor"` or `"stroma"`.
    #[serde(default)]
    pub tissue_category: Option<String>,
    /// Additional categorical columns (e.g. `"Phenotype CD8"`).
    #[serde(default)]
    pub categories: BTreeMap<String, String>,
    /// Numeric columns (e.g. mean marker expression).
    #[serde(default)]
    pub measurements: BTreeMap<String, f64>,
}

impl Cell {
    /// Create a cell with only an ID, position, and phenotype.
    #[must_use]
    pub fn new(id: u32, position: Point, phenotype: Option<&str>) -> Self {
        Self {
            id,
            position,
            phenotype: phenotype.map(str::to_owned),
            tissue_category: None,
            categories: BTreeMap::new(),
            measurements: BTreeMap::new(),
        }
    }

    /// Set the tissue category.
    #[must_use]
    pub fn with_category(mut self, category: &str) -> Self {
        self.tissue_category = Some(category.to_owned());
        self
    }

    /// Whether the cell lies in `category`; `None` matches every cell.
    #[must_use]
    pub fn in_category(&self, category: Option<&str>) -> bool {
        category.is_none_or(|c| self.tissue_category.as_deref() == Some(c))
    }
}

/// One imaged tissue region.
#[derive(Debug, Clone)]
pub struct Field {
    source: String,
    cells: Vec<Cell>,
    units: Units,
    dimensions: Option<Dimensions>,
    masks: Option<SegmentationMasks>,
}

impl Field {
    /// Create a field from its cells.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::ZeroCellId`] if any cell has ID 0,
    /// [`AnalysisError::ReservedCellId`] for the membrane wall value, and
    /// [`AnalysisError::DuplicateCellId`] if two cells share an ID.
    pub fn new(source: &str, cells: Vec<Cell>, units: Units) -> Result<Self, AnalysisError> {
        let mut seen = HashSet::with_capacity(cells.len());
        for cell in &cells {
            if cell.id == 0 {
                return Err(AnalysisError::ZeroCellId);
            }
            if cell.id == MEMBRANE_WALL {
                return Err(AnalysisError::ReservedCellId(cell.id));
            }
            if !seen.insert(cell.id) {
                return Err(AnalysisError::DuplicateCellId(cell.id));
            }
        }
        Ok(Self {
            source: source.to_owned(),
            cells,
            units,
            dimensions: None,
            masks: None,
        })
    }

    /// Attach segmentation masks; the field takes its dimensions from them.
    #[must_use]
    pub fn with_masks(mut self, masks: SegmentationMasks) -> Self {
        self.dimensions = Some(masks.dimensions());
        self.masks = Some(masks);
        self
    }

    /// Record the image size without attaching masks.
    #[must_use]
    pub const fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Identifier of the image this field came from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// All cells in table order.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Unit of the cell positions.
    #[must_use]
    pub const fn units(&self) -> Units {
        self.units
    }

    /// Image size, when known.
    #[must_use]
    pub const fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }

    /// Segmentation masks, when attached.
    #[must_use]
    pub const fn masks(&self) -> Option<&SegmentationMasks> {
        self.masks.as_ref()
    }

    /// Number of cells.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the field has no cells.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell positions converted to microns, in table order.
    #[must_use]
    pub fn positions_in_microns(&self, scale: SpatialScale) -> Vec<Point> {
        self.cells
            .iter()
            .map(|c| scale.to_microns(c.position, self.units))
            .collect()
    }

    /// Table indices of the cells matching `selector`, optionally
    /// restricted to one tissue category.
    #[must_use]
    pub fn select(&self, selector: &PhenotypeSelector, category: Option<&str>) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.in_category(category) && selector.matches(c))
            .map(|(i, _)| i)
            .collect()
    }

    /// IDs of the cells at the given table indices.
    #[must_use]
    pub fn ids_of(&self, indices: &[usize]) -> Vec<u32> {
        indices.iter().map(|&i| self.cells[i].id).collect()
    }

    /// Check that every position lies inside the image.
    ///
    /// Does nothing when the image size is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::PositionOutOfBounds`] for the first cell
    /// outside `[0, width] x [0, height]` (in pixels).
    pub fn check_bounds(&self, scale: SpatialScale) -> Result<(), AnalysisError> {
        let Some(dimensions) = self.dimensions else {
            return Ok(());
        };
        let width = f64::from(dimensions.width);
        let height = f64::from(dimensions.height);
        for cell in &self.cells {
            let p = scale.to_pixels(cell.position, self.units);
            if !(0.0..=width).contains(&p.x) || !(0.0..=height).contains(&p.y) {
                return Err(AnalysisError::PositionOutOfBounds {
                    id: cell.id,
                    x: p.x,
                    y: p.y,
                    dimensions,
                });
            }
        }
        Ok(())
    }
}
