//! Pairwise distance matrix over the cells of a field.
//!
//! Computed once per field; phenotype populations are then answered by
//! slicing rows and columns by table index, never by recomputing.

use std::collections::HashMap;

use crate::field::Field;
use crate::types::{Point, SpatialScale};

/// Symmetric N x N matrix of Euclidean distances in microns.
///
/// Rows and columns follow the field's table order.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    ids: Vec<u32>,
    index: HashMap<u32, usize>,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Distances between all cells of `field`, converted to microns.
    #[must_use]
    pub fn from_field(field: &Field, scale: SpatialScale) -> Self {
        let ids: Vec<u32> = field.cells().iter().map(|c| c.id).collect();
        Self::from_points(&ids, &field.positions_in_microns(scale))
    }

    /// Distances between `points`, labelled by `ids` (same length).
    ///
    /// Extra entries in the longer slice are ignored. An empty input
    /// yields an empty matrix.
    #[must_use]
    pub fn from_points(ids: &[u32], points: &[Point]) -> Self {
        let n = ids.len().min(points.len());
        let mut values = vec![0.0; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = points[i].distance(points[j]);
                values[i * n + j] = d;
                values[j * n + i] = d;
            }
        }
        let ids = ids[..n].to_vec();
        let index = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        Self { ids, index, values }
    }

    /// Number of rows (and columns).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` for the 0 x 0 matrix.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Distance between table rows `i` and `j`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.len() + j]
    }

    /// Cell ID of row `i`.
    #[must_use]
    pub fn id(&self, i: usize) -> u32 {
        self.ids[i]
    }

    /// Row of the cell with `id`.
    #[must_use]
    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Row-major copy of the `rows` x `cols` block.
    #[must_use]
    pub fn submatrix(&self, rows: &[usize], cols: &[usize]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|&i| cols.iter().map(|&j| self.get(i, j)).collect())
            .collect()
    }
}
