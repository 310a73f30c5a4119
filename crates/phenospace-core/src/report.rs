//! Touching-cells report: run touch detection over a list of phenotype
//! pairs and aggregate the results into rows.
//!
//! All validation happens before any raster work: unknown phenotypes,
//! missing masks, and a missing composite (when overlays are requested)
//! fail immediately. An empty population is not an error; its pair gets
//! zero-count rows and no overlay.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::field::Field;
use crate::phenotype::{PhenotypePair, PhenotypeRules};
use crate::raster::{SegmentationMasks, ensure_same_size};
use crate::region::{CellRegions, build_cell_regions};
use crate::render::render_touch_overlay;
use crate::touch::{TouchPair, TouchingIds, find_touching_cell_ids, find_touching_cell_pairs};
use crate::types::{AnalysisConfig, AnalysisError, Dimensions, RgbImage};

/// What to compute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchOptions {
    /// Count mutual touching pairs instead of per-direction cells.
    pub mutual: bool,
    /// Compose an overlay image per pair.
    pub overlays: bool,
    /// Restrict both populations to one tissue category.
    pub category: Option<String>,
}

/// One direction of a pair: how many `phenotype` cells touch a
/// `touching` cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchRow {
    /// Field source.
    pub source: String,
    /// Population being counted.
    pub phenotype: String,
    /// Population it must touch.
    pub touching: String,
    /// Cells of `phenotype` touching `touching`.
    pub count: usize,
    /// `count / total`; `None` only when `total` is 0.
    pub fraction: Option<f64>,
    /// Cells of `phenotype` in the field.
    pub total: usize,
}

/// Mutual touching pairs between two populations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutualTouchRow {
    /// Field source.
    pub source: String,
    /// First phenotype.
    pub phenotype1: String,
    /// Second phenotype.
    pub phenotype2: String,
    /// Distinct touching `(cell1, cell2)` pairs.
    pub pair_count: usize,
    /// Cells of `phenotype1` in the field.
    pub total1: usize,
    /// Cells of `phenotype2` in the field.
    pub total2: usize,
}

/// Rows in the shape chosen by [`TouchOptions::mutual`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchRows {
    /// Two rows per pair.
    Directional(Vec<TouchRow>),
    /// One row per pair.
    Mutual(Vec<MutualTouchRow>),
}

/// Touching pairs found for one phenotype pair (mutual mode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairTouches {
    /// The phenotypes.
    pub pair: PhenotypePair,
    /// The cell pairs.
    pub touches: Vec<TouchPair>,
}

/// Overlay image for one pair.
#[derive(Debug, Clone)]
pub struct TouchOverlay {
    /// The phenotypes drawn.
    pub pair: PhenotypePair,
    /// The composite with outlines and fills.
    pub image: RgbImage,
}

/// Result of [`count_touching_cells`].
#[derive(Debug, Clone)]
pub struct TouchReport {
    /// Aggregated counts.
    pub rows: TouchRows,
    /// Cell pairs behind the mutual counts; empty in directional mode.
    pub touches: Vec<PairTouches>,
    /// Overlays, when requested.
    pub overlays: Vec<TouchOverlay>,
    /// Pairs whose overlay was requested but skipped (empty population).
    pub skipped_images: Vec<PhenotypePair>,
}

/// Count touching cells for every pair in `pairs`.
///
/// Region rasters are built once per phenotype and shared across pairs.
///
/// # Errors
///
/// - [`AnalysisError::InvalidConfig`] for an invalid config;
/// - [`AnalysisError::UnknownPhenotype`] if a pair names an undefined
///   phenotype;
/// - [`AnalysisError::MissingAsset`] if the field has no masks, or
///   overlays are requested without a composite;
/// - [`AnalysisError::DimensionMismatch`] if the composite does not match
///   the masks.
pub fn count_touching_cells(
    field: &Field,
    pairs: &[PhenotypePair],
    rules: &PhenotypeRules,
    composite: Option<&RgbImage>,
    options: &TouchOptions,
    config: &AnalysisConfig,
) -> Result<TouchReport, AnalysisError> {
    config.validate()?;
    rules.validate_pairs(pairs)?;
    let masks = field.masks().ok_or_else(|| {
        AnalysisError::MissingAsset(format!("{}: nucleus and membrane masks", field.source()))
    })?;
    let composite = if options.overlays {
        let image = composite.ok_or_else(|| {
            AnalysisError::MissingAsset(format!("{}: composite image", field.source()))
        })?;
        let size = Dimensions {
            width: image.width(),
            height: image.height(),
        };
        ensure_same_size(masks.dimensions(), size)?;
        Some(image)
    } else {
        None
    };

    let category = options.category.as_deref();
    let mut populations: HashMap<&str, Vec<u32>> = HashMap::new();
    for name in pairs.iter().flat_map(|p| [p.first.as_str(), p.second.as_str()]) {
        if !populations.contains_key(name) {
            let indices = field.select(rules.resolve(name)?, category);
            populations.insert(name, field.ids_of(&indices));
        }
    }

    // Regions are only needed for phenotypes in pairs where both sides
    // have cells; each is built once.
    let mut regions: HashMap<&str, CellRegions> = HashMap::new();
    for pair in pairs {
        let (first, second) = (pair.first.as_str(), pair.second.as_str());
        if populations[first].is_empty() || populations[second].is_empty() {
            continue;
        }
        for name in [first, second] {
            if !regions.contains_key(name) {
                regions.insert(name, build_regions(name, &populations[name], masks));
            }
        }
    }

    let mut directional = Vec::new();
    let mut mutual = Vec::new();
    let mut touches = Vec::new();
    let mut overlays = Vec::new();
    let mut skipped_images = Vec::new();

    for pair in pairs {
        let total1 = populations[pair.first.as_str()].len();
        let total2 = populations[pair.second.as_str()].len();
        let built = (
            regions.get(pair.first.as_str()),
            regions.get(pair.second.as_str()),
        );

        let (Some(first), Some(second)) = built else {
            log::info!(
                "{}: {} or {} has no cells, reporting zero touches",
                field.source(),
                pair.first,
                pair.second,
            );
            if options.mutual {
                mutual.push(mutual_row(field, pair, 0, total1, total2));
            } else {
                directional.extend(directional_rows(
                    field,
                    pair,
                    &TouchingIds::default(),
                    total1,
                    total2,
                ));
            }
            if options.overlays {
                log::warn!(
                    "{}: overlay for {} / {} skipped, empty population",
                    field.source(),
                    pair.first,
                    pair.second,
                );
                skipped_images.push(pair.clone());
            }
            continue;
        };

        let touching = if options.mutual {
            let found =
                find_touching_cell_pairs(&first.raster, &second.raster, config.pair_dilation_radius)?;
            log::debug!(
                "{}: {} / {}: {} touching pairs",
                field.source(),
                pair.first,
                pair.second,
                found.len(),
            );
            mutual.push(mutual_row(field, pair, found.len(), total1, total2));
            let ids = ids_in_pairs(&found);
            touches.push(PairTouches {
                pair: pair.clone(),
                touches: found,
            });
            ids
        } else {
            let ids = find_touching_cell_ids(
                &first.raster,
                &second.raster,
                config.touch_dilation_radius,
            )?;
            directional.extend(directional_rows(field, pair, &ids, total1, total2));
            ids
        };

        if let Some(image) = composite {
            let overlay = render_touch_overlay(
                image,
                &first.raster,
                &second.raster,
                &touching,
                config.overlay_colors,
            )?;
            overlays.push(TouchOverlay {
                pair: pair.clone(),
                image: overlay,
            });
        }
    }

    let rows = if options.mutual {
        TouchRows::Mutual(mutual)
    } else {
        TouchRows::Directional(directional)
    };
    Ok(TouchReport {
        rows,
        touches,
        overlays,
        skipped_images,
    })
}

fn build_regions(name: &str, ids: &[u32], masks: &SegmentationMasks) -> CellRegions {
    let regions = build_cell_regions(ids, masks);
    if !regions.skipped.is_empty() {
        log::debug!(
            "{name}: {} of {} cells had no usable nucleus seed",
            regions.skipped.len(),
            ids.len(),
        );
    }
    regions
}

fn ids_in_pairs(pairs: &[TouchPair]) -> TouchingIds {
    let mut first: Vec<u32> = pairs.iter().map(|p| p.first).collect();
    let mut second: Vec<u32> = pairs.iter().map(|p| p.second).collect();
    first.sort_unstable();
    first.dedup();
    second.sort_unstable();
    second.dedup();
    TouchingIds { first, second }
}

fn mutual_row(
    field: &Field,
    pair: &PhenotypePair,
    pair_count: usize,
    total1: usize,
    total2: usize,
) -> MutualTouchRow {
    MutualTouchRow {
        source: field.source().to_owned(),
        phenotype1: pair.first.clone(),
        phenotype2: pair.second.clone(),
        pair_count,
        total1,
        total2,
    }
}

#[allow(clippy::cast_precision_loss)]
fn fraction(count: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| count as f64 / total as f64)
}

fn directional_rows(
    field: &Field,
    pair: &PhenotypePair,
    touching: &TouchingIds,
    total1: usize,
    total2: usize,
) -> [TouchRow; 2] {
    let row = |phenotype: &str, other: &str, count: usize, total: usize| TouchRow {
        source: field.source().to_owned(),
        phenotype: phenotype.to_owned(),
        touching: other.to_owned(),
        count,
        fraction: fraction(count, total),
        total,
    };
    [
        row(&pair.first, &pair.second, touching.first.len(), total1),
        row(&pair.second, &pair.first, touching.second.len(), total2),
    ]
}
