//! Nearest-neighbor distances between phenotype populations.
//!
//! Directional results (`from` -> `to`) omit cells with no candidate;
//! they are never zero- or NaN-filled. Mutual pairs join the two
//! directions on swapped IDs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::field::Field;
use crate::phenotype::{PhenotypeRules, PhenotypeSelector};
use crate::search::NeighborSearch;
use crate::types::{AnalysisConfig, AnalysisError};

/// Nearest `to` cell for one `from` cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearestNeighborRecord {
    /// The "from" cell.
    pub from_id: u32,
    /// Its nearest "to" cell.
    pub to_id: u32,
    /// Distance in microns.
    pub distance: f64,
}

/// Nearest neighbors for each cell of `from` among `to` (table indices).
///
/// Cells without a candidate are omitted.
#[must_use]
pub fn find_nearest_neighbors(
    field: &Field,
    from: &[usize],
    to: &[usize],
    search: &impl NeighborSearch,
) -> Vec<NearestNeighborRecord> {
    let cells = field.cells();
    from.iter()
        .zip(search.nearest(from, to))
        .filter_map(|(&i, hit)| {
            hit.map(|(j, distance)| NearestNeighborRecord {
                from_id: cells[i].id,
                to_id: cells[j].id,
                distance,
            })
        })
        .collect()
}

/// Pairs `(a, b)` where `b` is `a`'s nearest neighbor and `a` is `b`'s.
///
/// Rows follow `a_to_b` order.
#[must_use]
pub fn mutual_nearest_neighbors(
    a_to_b: &[NearestNeighborRecord],
    b_to_a: &[NearestNeighborRecord],
) -> Vec<NearestNeighborRecord> {
    let reverse: HashSet<(u32, u32)> = b_to_a.iter().map(|r| (r.to_id, r.from_id)).collect();
    a_to_b
        .iter()
        .filter(|r| reverse.contains(&(r.from_id, r.to_id)))
        .copied()
        .collect()
}

/// Directional and mutual nearest neighbors for one phenotype pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestNeighbors {
    /// Field source.
    pub source: String,
    /// The first phenotype.
    pub from: String,
    /// The second phenotype.
    pub to: String,
    /// Nearest `to` cell for each `from` cell.
    pub forward: Vec<NearestNeighborRecord>,
    /// Nearest `from` cell for each `to` cell.
    pub backward: Vec<NearestNeighborRecord>,
    /// Mutual pairs, `from_id` in the first phenotype.
    pub mutual: Vec<NearestNeighborRecord>,
}

/// Nearest neighbors in both directions between two named phenotypes,
/// optionally restricted to one tissue category.
///
/// # Errors
///
/// Returns [`AnalysisError::UnknownPhenotype`] if either name is not in
/// `rules`, or [`AnalysisError::InvalidConfig`] for an invalid config.
pub fn nearest_neighbors(
    field: &Field,
    from: &str,
    to: &str,
    rules: &PhenotypeRules,
    category: Option<&str>,
    config: &AnalysisConfig,
) -> Result<NearestNeighbors, AnalysisError> {
    config.validate()?;
    let from_rule = rules.resolve(from)?;
    let to_rule = rules.resolve(to)?;

    let from_set = field.select(from_rule, category);
    let to_set = field.select(to_rule, category);
    let index = config.neighbor_search.index(field, config.scale());

    let forward = find_nearest_neighbors(field, &from_set, &to_set, &index);
    let backward = find_nearest_neighbors(field, &to_set, &from_set, &index);
    let mutual = mutual_nearest_neighbors(&forward, &backward);
    log::debug!(
        "{}: {from} -> {to}: {} forward, {} backward, {} mutual",
        field.source(),
        forward.len(),
        backward.len(),
        mutual.len(),
    );

    Ok(NearestNeighbors {
        source: field.source().to_owned(),
        from: from.to_owned(),
        to: to.to_owned(),
        forward,
        backward,
        mutual,
    })
}

/// Summary statistics over a directional result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearestSummary {
    /// Number of records.
    pub count: usize,
    /// Mean distance.
    pub mean: f64,
    /// Median distance.
    pub median: f64,
    /// Smallest distance.
    pub min: f64,
    /// Largest distance.
    pub max: f64,
}

/// Summarize distances; `None` for an empty result.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize_nearest(records: &[NearestNeighborRecord]) -> Option<NearestSummary> {
    if records.is_empty() {
        return None;
    }
    let mut distances: Vec<f64> = records.iter().map(|r| r.distance).collect();
    distances.sort_by(f64::total_cmp);
    let n = distances.len();
    let median = if n % 2 == 1 {
        distances[n / 2]
    } else {
        f64::midpoint(distances[n / 2 - 1], distances[n / 2])
    };
    Some(NearestSummary {
        count: n,
        mean: distances.iter().sum::<f64>() / n as f64,
        median,
        min: distances[0],
        max: distances[n - 1],
    })
}

/// Distance from one cell to the nearest cell of a phenotype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearestHit {
    /// Nearest cell of the phenotype.
    pub id: u32,
    /// Distance in microns.
    pub distance: f64,
}

/// Per-cell nearest distances to every requested phenotype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestDistanceTable {
    /// Field source.
    pub source: String,
    /// Phenotype names, one per column.
    pub phenotypes: Vec<String>,
    /// Cell IDs, one per row, in table order.
    pub cell_ids: Vec<u32>,
    /// `rows[r][c]`: nearest cell of `phenotypes[c]` to `cell_ids[r]`.
    pub rows: Vec<Vec<Option<NearestHit>>>,
}

/// For every cell (in `category`, if given), the nearest cell of each
/// named phenotype.
///
/// # Errors
///
/// Returns [`AnalysisError::UnknownPhenotype`] for a name missing from
/// `rules`, or [`AnalysisError::InvalidConfig`] for an invalid config.
pub fn nearest_distances<S: AsRef<str>>(
    field: &Field,
    phenotypes: &[S],
    rules: &PhenotypeRules,
    category: Option<&str>,
    config: &AnalysisConfig,
) -> Result<NearestDistanceTable, AnalysisError> {
    config.validate()?;
    let selectors = phenotypes
        .iter()
        .map(|p| rules.resolve(p.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    let all = field.select(&PhenotypeSelector::All, category);
    let index = config.neighbor_search.index(field, config.scale());

    let columns: Vec<Vec<Option<NearestHit>>> = selectors
        .iter()
        .map(|selector| {
            let targets = field.select(selector, category);
            index
                .nearest(&all, &targets)
                .into_iter()
                .map(|hit| {
                    hit.map(|(j, distance)| NearestHit {
                        id: field.cells()[j].id,
                        distance,
                    })
                })
                .collect()
        })
        .collect();

    let rows = (0..all.len())
        .map(|r| columns.iter().map(|col| col[r]).collect())
        .collect();

    Ok(NearestDistanceTable {
        source: field.source().to_owned(),
        phenotypes: phenotypes.iter().map(|p| p.as_ref().to_owned()).collect(),
        cell_ids: field.ids_of(&all),
        rows,
    })
}
