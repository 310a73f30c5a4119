//! Neighbor search: nearest-member and within-radius queries between
//! populations of one field.
//!
//! # Strategy pattern
//!
//! [`NeighborSearch`] is answered either by a full [`DistanceMatrix`]
//! (the reference strategy, exact and simple) or by an R\*-tree over the
//! cell positions, which avoids the O(N^2) matrix on large fields. The
//! [`NeighborSearchKind`] enum selects the strategy at runtime and
//! [`FieldIndex`] holds the built structure.
//!
//! Populations are given as table indices into the field. A cell is
//! never its own neighbor, even when it belongs to both populations.
//!
//! # Ties
//!
//! When several candidates are equidistant, the matrix strategy returns
//! the first in `to` order. The R\*-tree returns whichever its traversal
//! yields first. Both are deterministic for a given input order, but they
//! need not agree with each other on ties.

use rstar::RTree;
use rstar::primitives::GeomWithData;
use serde::{Deserialize, Serialize};

use crate::distance::DistanceMatrix;
use crate::field::Field;
use crate::types::{Point, SpatialScale};

/// Selects which neighbor search structure to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborSearchKind {
    /// Full pairwise distance matrix.
    #[default]
    DistanceMatrix,
    /// R\*-tree over cell positions, built per target population.
    SpatialIndex,
}

impl NeighborSearchKind {
    /// Build the search structure for `field`.
    #[must_use]
    pub fn index(self, field: &Field, scale: SpatialScale) -> FieldIndex {
        match self {
            Self::DistanceMatrix => FieldIndex::Matrix(DistanceMatrix::from_field(field, scale)),
            Self::SpatialIndex => FieldIndex::Tree(SpatialIndex::new(
                field.positions_in_microns(scale),
            )),
        }
    }
}

/// Trait for neighbor search strategies.
pub trait NeighborSearch {
    /// For each index in `from`, the nearest index in `to` (excluding
    /// itself) and its distance in microns; `None` when `to` has no
    /// other member.
    fn nearest(&self, from: &[usize], to: &[usize]) -> Vec<Option<(usize, f64)>>;

    /// For each index in `from`, how many indices in `to` (excluding
    /// itself) lie within `radius` microns, inclusive.
    fn within_counts(&self, from: &[usize], to: &[usize], radius: f64) -> Vec<usize>;
}

impl NeighborSearch for DistanceMatrix {
    fn nearest(&self, from: &[usize], to: &[usize]) -> Vec<Option<(usize, f64)>> {
        from.iter()
            .map(|&i| {
                let mut best: Option<(usize, f64)> = None;
                for &j in to {
                    if i == j {
                        continue;
                    }
                    let d = self.get(i, j);
                    if best.is_none_or(|(_, b)| d < b) {
                        best = Some((j, d));
                    }
                }
                best
            })
            .collect()
    }

    fn within_counts(&self, from: &[usize], to: &[usize], radius: f64) -> Vec<usize> {
        from.iter()
            .map(|&i| {
                to.iter()
                    .filter(|&&j| j != i && self.get(i, j) <= radius)
                    .count()
            })
            .collect()
    }
}

/// R\*-tree entry: a position tagged with its table index.
type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// Cell positions (microns) queried through per-population R\*-trees.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    positions: Vec<Point>,
}

impl SpatialIndex {
    /// Wrap positions in table order.
    #[must_use]
    pub const fn new(positions: Vec<Point>) -> Self {
        Self { positions }
    }

    fn tree(&self, members: &[usize]) -> RTree<IndexedPoint> {
        let entries = members
            .iter()
            .map(|&j| {
                let p = self.positions[j];
                GeomWithData::new([p.x, p.y], j)
            })
            .collect();
        RTree::bulk_load(entries)
    }

    fn query(&self, i: usize) -> [f64; 2] {
        let p = self.positions[i];
        [p.x, p.y]
    }
}

impl NeighborSearch for SpatialIndex {
    fn nearest(&self, from: &[usize], to: &[usize]) -> Vec<Option<(usize, f64)>> {
        let tree = self.tree(to);
        from.iter()
            .map(|&i| {
                tree.nearest_neighbor_iter(&self.query(i))
                    .find(|entry| entry.data != i)
                    .map(|entry| {
                        let j = entry.data;
                        (j, self.positions[i].distance(self.positions[j]))
                    })
            })
            .collect()
    }

    fn within_counts(&self, from: &[usize], to: &[usize], radius: f64) -> Vec<usize> {
        let tree = self.tree(to);
        let radius_squared = radius * radius;
        from.iter()
            .map(|&i| {
                tree.locate_within_distance(self.query(i), radius_squared)
                    .filter(|entry| entry.data != i)
                    .count()
            })
            .collect()
    }
}

/// A built neighbor search structure for one field.
#[derive(Debug, Clone)]
pub enum FieldIndex {
    /// Full distance matrix.
    Matrix(DistanceMatrix),
    /// R\*-tree backed positions.
    Tree(SpatialIndex),
}

impl NeighborSearch for FieldIndex {
    fn nearest(&self, from: &[usize], to: &[usize]) -> Vec<Option<(usize, f64)>> {
        match self {
            Self::Matrix(m) => m.nearest(from, to),
            Self::Tree(t) => t.nearest(from, to),
        }
    }

    fn within_counts(&self, from: &[usize], to: &[usize], radius: f64) -> Vec<usize> {
        match self {
            Self::Matrix(m) => m.within_counts(from, to, radius),
            Self::Tree(t) => t.within_counts(from, to, radius),
        }
    }
}
