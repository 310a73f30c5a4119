//! phenospace-core: Pure spatial analysis of segmented tissue (sans-IO).
//!
//! Two independent analyses run over one [`Field`] at a time:
//!
//! - **Point statistics**: cell positions -> [`DistanceMatrix`] (or an
//!   R\*-tree) -> nearest neighbors and within-radius counts.
//! - **Touching cells**: nucleus + membrane label rasters -> per-phenotype
//!   region rasters (interior-point seeded flood fill) -> touch detection
//!   by dilation -> aggregated rows and optional overlays.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! tables and rasters and returns structured data. Reading cell tables
//! and images, and writing results, lives in the `phenospace` binary.
//!
//! Every function is a pure function of its field, rules, and
//! [`AnalysisConfig`]; callers may process many fields in parallel.

pub mod distance;
pub mod field;
pub mod interior;
pub mod nearest;
pub mod phenotype;
pub mod raster;
pub mod region;
pub mod render;
pub mod report;
pub mod search;
pub mod touch;
pub mod types;
pub mod within;

pub use distance::DistanceMatrix;
pub use field::{Cell, Field};
pub use interior::interior_point;
pub use nearest::{
    NearestDistanceTable, NearestHit, NearestNeighborRecord, NearestNeighbors, NearestSummary,
    find_nearest_neighbors, mutual_nearest_neighbors, nearest_distances, nearest_neighbors,
    summarize_nearest,
};
pub use phenotype::{ColumnPredicate, PhenotypePair, PhenotypeRules, PhenotypeSelector};
pub use raster::{BACKGROUND, LabelImage, MEMBRANE_WALL, SegmentationMasks};
pub use region::{CellRegions, build_cell_regions};
pub use render::{OverlayColors, render_touch_overlay};
pub use report::{
    MutualTouchRow, PairTouches, TouchOptions, TouchOverlay, TouchReport, TouchRow, TouchRows,
    count_touching_cells,
};
pub use search::{FieldIndex, NeighborSearch, NeighborSearchKind, SpatialIndex};
pub use touch::{TouchPair, TouchingIds, find_touching_cell_ids, find_touching_cell_pairs};
pub use types::{
    AnalysisConfig, AnalysisError, Dimensions, Point, RgbImage, SpatialScale, Units,
};
pub use within::{WithinCount, WithinRow, count_within, count_within_many};
