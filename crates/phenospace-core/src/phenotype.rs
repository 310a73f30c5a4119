//! Phenotype rules: map a cell to membership in a named population.
//!
//! A [`PhenotypeSelector`] is a tagged variant evaluated by a single pure
//! function, [`PhenotypeSelector::matches`]. Named selectors are collected
//! in [`PhenotypeRules`], which every multi-phenotype analysis validates
//! against before touching any cell data.
//!
//! # Text syntax
//!
//! [`PhenotypeSelector::parse`] accepts the shorthand used in analysis
//! configuration files:
//!
//! - `"CD8+"` matches cells whose phenotype is `CD8+`, or whose
//!   `Phenotype CD8` column is `CD8+` (one column per marker);
//! - `"CD68+,CD163+"` matches either phenotype;
//! - `"CD3+/CD8+"` matches cells positive for both markers;
//! - `"All"` and `"Total Cells"` match every cell.

use serde::{Deserialize, Serialize};

use crate::field::Cell;
use crate::types::AnalysisError;

/// A test applied to one named cell column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnPredicate {
    /// Categorical column equals the value.
    Equals(String),
    /// Categorical column equals one of the values.
    OneOf(Vec<String>),
    /// Numeric column is at least the threshold.
    AtLeast(f64),
    /// Numeric column is strictly below the threshold.
    Below(f64),
}

/// Rule deciding whether a cell belongs to a phenotype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhenotypeSelector {
    /// Every cell.
    All,
    /// Direct phenotype label match.
    Label(String),
    /// Predicate over one named column.
    Column {
        /// Column name in [`Cell::categories`] or [`Cell::measurements`].
        column: String,
        /// Test applied to the column value.
        predicate: ColumnPredicate,
    },
    /// Union: any of the inner rules matches.
    AnyOf(Vec<Self>),
    /// Conjunction: all inner rules match.
    AllOf(Vec<Self>),
}

impl PhenotypeSelector {
    /// Shorthand for [`Self::Label`].
    #[must_use]
    pub fn label(name: &str) -> Self {
        Self::Label(name.to_owned())
    }

    /// Parse the text shorthand described in the module docs.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.eq_ignore_ascii_case("all") || text.eq_ignore_ascii_case("total cells") {
            return Self::All;
        }
        if text.contains(',') {
            return Self::AnyOf(text.split(',').map(Self::parse).collect());
        }
        if text.contains('/') {
            return Self::AllOf(
                text.split('/')
                    .map(|part| Self::label(part.trim()))
                    .collect(),
            );
        }
        Self::label(text)
    }

    /// Whether `cell` belongs to this phenotype.
    #[must_use]
    pub fn matches(&self, cell: &Cell) -> bool {
        match self {
            Self::All => true,
            Self::Label(name) => label_matches(cell, name),
            Self::Column { column, predicate } => column_matches(cell, column, predicate),
            Self::AnyOf(rules) => rules.iter().any(|r| r.matches(cell)),
            Self::AllOf(rules) => rules.iter().all(|r| r.matches(cell)),
        }
    }
}

fn label_matches(cell: &Cell, name: &str) -> bool {
    if cell.phenotype.as_deref() == Some(name) {
        return true;
    }
    // Per-marker phenotyping stores "CD8+" / "CD8-" in a "Phenotype CD8" column.
    let marker = name.strip_suffix(['+', '-']);
    marker.is_some_and(|m| {
        cell.categories
            .get(&format!("Phenotype {m}"))
            .is_some_and(|v| v == name)
    })
}

fn column_matches(cell: &Cell, column: &str, predicate: &ColumnPredicate) -> bool {
    match predicate {
        ColumnPredicate::Equals(value) => cell.categories.get(column) == Some(value),
        ColumnPredicate::OneOf(values) => cell
            .categories
            .get(column)
            .is_some_and(|v| values.contains(v)),
        ColumnPredicate::AtLeast(threshold) => cell
            .measurements
            .get(column)
            .is_some_and(|v| v >= threshold),
        ColumnPredicate::Below(threshold) => {
            cell.measurements.get(column).is_some_and(|v| v < threshold)
        }
    }
}

/// Named phenotype definitions, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhenotypeRules(Vec<(String, PhenotypeSelector)>);

impl PhenotypeRules {
    /// Create an empty rule set.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Build rules for names whose selectors follow from their text,
    /// e.g. `["CD8+", "CD68+,CD163+", "Total Cells"]`.
    #[must_use]
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut rules = Self::new();
        for name in names {
            let name = name.as_ref();
            rules.insert(name, PhenotypeSelector::parse(name));
        }
        rules
    }

    /// Define or replace a phenotype.
    pub fn insert(&mut self, name: &str, selector: PhenotypeSelector) {
        if let Some(entry) = self.0.iter_mut().find(|(n, _)| n == name) {
            entry.1 = selector;
        } else {
            self.0.push((name.to_owned(), selector));
        }
    }

    /// Look up a phenotype by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PhenotypeSelector> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// Look up a phenotype, failing if it is undefined.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::UnknownPhenotype`] if `name` has no rule.
    pub fn resolve(&self, name: &str) -> Result<&PhenotypeSelector, AnalysisError> {
        self.get(name)
            .ok_or_else(|| AnalysisError::UnknownPhenotype(name.to_owned()))
    }

    /// Check that every name in `pairs` has a rule.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::UnknownPhenotype`] for the first
    /// undefined name.
    pub fn validate_pairs(&self, pairs: &[PhenotypePair]) -> Result<(), AnalysisError> {
        for pair in pairs {
            self.resolve(&pair.first)?;
            self.resolve(&pair.second)?;
        }
        Ok(())
    }

    /// Phenotype names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    /// Number of defined phenotypes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no phenotype is defined.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An ordered pair of phenotype names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhenotypePair {
    /// The "from" phenotype (or phenotype 1 for touching cells).
    pub first: String,
    /// The "to" phenotype (or phenotype 2 for touching cells).
    pub second: String,
}

impl PhenotypePair {
    /// Create a pair.
    #[must_use]
    pub fn new(first: &str, second: &str) -> Self {
        Self {
            first: first.to_owned(),
            second: second.to_owned(),
        }
    }

    /// Parse `"first:second"`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] when the text has no `:`
    /// separator or either side is empty.
    pub fn parse(text: &str) -> Result<Self, AnalysisError> {
        let (first, second) = text.split_once(':').ok_or_else(|| {
            AnalysisError::InvalidConfig(format!("phenotype pair {text:?} is not `first:second`"))
        })?;
        let (first, second) = (first.trim(), second.trim());
        if first.is_empty() || second.is_empty() {
            return Err(AnalysisError::InvalidConfig(format!(
                "phenotype pair {text:?} has an empty side"
            )));
        }
        Ok(Self::new(first, second))
    }
}
