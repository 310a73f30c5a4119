//! Within-radius co-occurrence counts.
//!
//! For each "from" cell, count "to" cells within a radius. Counts are
//! per from-cell, so swapping the populations generally changes the
//! result.

use serde::{Deserialize, Serialize};

use crate::field::Field;
use crate::phenotype::{PhenotypePair, PhenotypeRules};
use crate::search::NeighborSearch;
use crate::types::{AnalysisConfig, AnalysisError};

/// Aggregate within-radius statistics for one population pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WithinCount {
    /// Size of the "from" population.
    pub from_count: usize,
    /// Size of the "to" population.
    pub to_count: usize,
    /// Total (from, to) pairs within the radius.
    pub within_count: usize,
    /// `within_count / from_count`; NaN when `from_count` is 0.
    pub within_mean: f64,
}

fn check_radius(radius: f64) -> Result<(), AnalysisError> {
    if radius.is_finite() && radius >= 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::InvalidConfig(format!(
            "radius must be finite and non-negative, got {radius}"
        )))
    }
}

/// Count `to` cells within `radius` microns of each `from` cell
/// (table indices), excluding self-matches.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidConfig`] for a negative or
/// non-finite radius.
#[allow(clippy::cast_precision_loss)]
pub fn count_within(
    from: &[usize],
    to: &[usize],
    radius: f64,
    search: &impl NeighborSearch,
) -> Result<WithinCount, AnalysisError> {
    check_radius(radius)?;
    let within_count: usize = search.within_counts(from, to, radius).iter().sum();
    let within_mean = if from.is_empty() {
        f64::NAN
    } else {
        within_count as f64 / from.len() as f64
    };
    Ok(WithinCount {
        from_count: from.len(),
        to_count: to.len(),
        within_count,
        within_mean,
    })
}

/// One row of a batch within-radius computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithinRow {
    /// Field source.
    pub source: String,
    /// Tissue category, or `None` for the whole field.
    pub category: Option<String>,
    /// The "from" phenotype.
    pub from: String,
    /// The "to" phenotype.
    pub to: String,
    /// Radius in microns.
    pub radius: f64,
    /// The statistics.
    #[serde(flatten)]
    pub counts: WithinCount,
}

/// [`count_within`] over every combination of category, pair, and
/// radius. A `None` category means the whole field.
///
/// Rows are ordered by category, then pair, then radius.
///
/// # Errors
///
/// Fails before counting anything with
/// [`AnalysisError::UnknownPhenotype`] if a pair names an undefined
/// phenotype, or [`AnalysisError::InvalidConfig`] for a bad radius or
/// config.
pub fn count_within_many(
    field: &Field,
    pairs: &[PhenotypePair],
    radii: &[f64],
    categories: &[Option<String>],
    rules: &PhenotypeRules,
    config: &AnalysisConfig,
) -> Result<Vec<WithinRow>, AnalysisError> {
    config.validate()?;
    rules.validate_pairs(pairs)?;
    for &radius in radii {
        check_radius(radius)?;
    }

    let index = config.neighbor_search.index(field, config.scale());
    let whole_field = [None];
    let categories = if categories.is_empty() {
        &whole_field[..]
    } else {
        categories
    };

    let mut rows = Vec::with_capacity(categories.len() * pairs.len() * radii.len());
    for category in categories {
        for pair in pairs {
            let from = field.select(rules.resolve(&pair.first)?, category.as_deref());
            let to = field.select(rules.resolve(&pair.second)?, category.as_deref());
            for &radius in radii {
                let counts = count_within(&from, &to, radius, &index)?;
                rows.push(WithinRow {
                    source: field.source().to_owned(),
                    category: category.clone(),
                    from: pair.first.clone(),
                    to: pair.second.clone(),
                    radius,
                    counts,
                });
            }
        }
    }
    log::info!("{}: {} within-radius rows", field.source(), rows.len());
    Ok(rows)
}
