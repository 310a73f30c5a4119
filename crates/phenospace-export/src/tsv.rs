//! Tab-delimited export of result tables.
//!
//! Every table starts with a header row. Missing values (`None`, NaN,
//! or an infinite distance) are written as `NA`. Numbers use Rust's
//! shortest round-trip formatting, so re-reading a table reproduces the
//! values exactly.
//!
//! Tabs and line breaks inside names are replaced by spaces; they would
//! otherwise shift columns.

use std::fmt::Write;

use phenospace_core::{
    MutualTouchRow, NearestDistanceTable, NearestNeighborRecord, NearestNeighbors, TouchRow,
    WithinRow,
};

/// Written for absent or undefined values.
const MISSING: &str = "NA";

/// Category column value for rows computed over the whole field.
const ALL_CATEGORIES: &str = "all";

fn text(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}

fn number(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        MISSING.to_owned()
    }
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_owned(), number)
}

fn line(out: &mut String, fields: &[String]) {
    let _ = writeln!(out, "{}", fields.join("\t"));
}

fn header(out: &mut String, names: &[&str]) {
    let _ = writeln!(out, "{}", names.join("\t"));
}

/// Within-radius counts, one line per row.
///
/// # Examples
///
/// ```
/// use phenospace_core::{WithinCount, WithinRow};
/// use phenospace_export::within_to_tsv;
///
/// let row = WithinRow {
///     source: "field_1".to_owned(),
///     category: None,
///     from: "CD8+".to_owned(),
///     to: "Tumor".to_owned(),
///     radius: 25.0,
///     counts: WithinCount {
///         from_count: 0,
///         to_count: 4,
///         within_count: 0,
///         within_mean: f64::NAN,
///     },
/// };
/// let tsv = within_to_tsv(&[row]);
/// assert!(tsv.ends_with("field_1\tall\tCD8+\tTumor\t25\t0\t4\t0\tNA\n"));
/// ```
#[must_use]
pub fn within_to_tsv(rows: &[WithinRow]) -> String {
    let mut out = String::new();
    header(
        &mut out,
        &[
            "source",
            "category",
            "from",
            "to",
            "radius",
            "from_count",
            "to_count",
            "within_count",
            "within_mean",
        ],
    );
    for row in rows {
        line(
            &mut out,
            &[
                text(&row.source),
                text(row.category.as_deref().unwrap_or(ALL_CATEGORIES)),
                text(&row.from),
                text(&row.to),
                number(row.radius),
                row.counts.from_count.to_string(),
                row.counts.to_count.to_string(),
                row.counts.within_count.to_string(),
                number(row.counts.within_mean),
            ],
        );
    }
    out
}

/// Directional touching-cell counts.
#[must_use]
pub fn touch_to_tsv(rows: &[TouchRow]) -> String {
    let mut out = String::new();
    header(
        &mut out,
        &["source", "phenotype", "touching", "count", "fraction", "total"],
    );
    for row in rows {
        line(
            &mut out,
            &[
                text(&row.source),
                text(&row.phenotype),
                text(&row.touching),
                row.count.to_string(),
                optional(row.fraction),
                row.total.to_string(),
            ],
        );
    }
    out
}

/// Mutual touching-pair counts.
#[must_use]
pub fn mutual_touch_to_tsv(rows: &[MutualTouchRow]) -> String {
    let mut out = String::new();
    header(
        &mut out,
        &[
            "source",
            "phenotype1",
            "phenotype2",
            "pair_count",
            "total1",
            "total2",
        ],
    );
    for row in rows {
        line(
            &mut out,
            &[
                text(&row.source),
                text(&row.phenotype1),
                text(&row.phenotype2),
                row.pair_count.to_string(),
                row.total1.to_string(),
                row.total2.to_string(),
            ],
        );
    }
    out
}

/// Nearest neighbors for one or more phenotype pairs.
///
/// Each record becomes one line tagged with its `direction`: `forward`
/// (from -> to), `backward` (to -> from, IDs as found), or `mutual`.
#[must_use]
pub fn nearest_to_tsv(results: &[NearestNeighbors]) -> String {
    let mut out = String::new();
    header(
        &mut out,
        &[
            "source",
            "from",
            "to",
            "direction",
            "from_id",
            "to_id",
            "distance",
        ],
    );
    for result in results {
        let sections: [(&str, &str, &str, &[NearestNeighborRecord]); 3] = [
            ("forward", &result.from, &result.to, &result.forward),
            ("backward", &result.to, &result.from, &result.backward),
            ("mutual", &result.from, &result.to, &result.mutual),
        ];
        for (direction, from, to, records) in sections {
            for record in records {
                line(
                    &mut out,
                    &[
                        text(&result.source),
                        text(from),
                        text(to),
                        direction.to_owned(),
                        record.from_id.to_string(),
                        record.to_id.to_string(),
                        number(record.distance),
                    ],
                );
            }
        }
    }
    out
}

/// Per-cell nearest distances: `Distance to <P>` and `Cell ID <P>`
/// columns for every phenotype `P` in the table.
#[must_use]
pub fn nearest_distances_to_tsv(table: &NearestDistanceTable) -> String {
    let mut out = String::new();
    let mut names = vec!["source".to_owned(), "cell_id".to_owned()];
    for phenotype in &table.phenotypes {
        names.push(format!("Distance to {}", text(phenotype)));
        names.push(format!("Cell ID {}", text(phenotype)));
    }
    line(&mut out, &names);

    for (id, row) in table.cell_ids.iter().zip(&table.rows) {
        let mut fields = vec![text(&table.source), id.to_string()];
        for hit in row {
            match hit {
                Some(hit) => {
                    fields.push(number(hit.distance));
                    fields.push(hit.id.to_string());
                }
                None => {
                    fields.push(MISSING.to_owned());
                    fields.push(MISSING.to_owned());
                }
            }
        }
        line(&mut out, &fields);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use phenospace_core::{NearestHit, WithinCount};

    fn lines(tsv: &str) -> Vec<Vec<&str>> {
        tsv.lines().map(|l| l.split('\t').collect()).collect()
    }

    #[test]
    fn within_rows_and_missing_mean() {
        let rows = [
            WithinRow {
                source: "f".to_owned(),
                category: Some("tumor".to_owned()),
                from: "A".to_owned(),
                to: "B".to_owned(),
                radius: 6.0,
                counts: WithinCount {
                    from_count: 3,
                    to_count: 2,
                    within_count: 2,
                    within_mean: 2.0 / 3.0,
                },
            },
            WithinRow {
                source: "f".to_owned(),
                category: None,
                from: "C".to_owned(),
                to: "B".to_owned(),
                radius: 6.5,
                counts: WithinCount {
                    from_count: 0,
                    to_count: 2,
                    within_count: 0,
                    within_mean: f64::NAN,
                },
            },
        ];
        let tsv = within_to_tsv(&rows);
        let table = lines(&tsv);
        assert_eq!(table.len(), 3);
        assert_eq!(table[0].len(), 9);
        assert_eq!(table[1][1], "tumor");
        assert_eq!(table[1][8], (2.0_f64 / 3.0).to_string());
        assert_eq!(table[2][1], "all");
        assert_eq!(table[2][4], "6.5");
        assert_eq!(table[2][8], "NA");
    }

    #[test]
    fn touch_fraction_none_is_na() {
        let rows = [
            TouchRow {
                source: "f".to_owned(),
                phenotype: "CD8+".to_owned(),
                touching: "FoxP3+".to_owned(),
                count: 0,
                fraction: Some(0.0),
                total: 4,
            },
            TouchRow {
                source: "f".to_owned(),
                phenotype: "FoxP3+".to_owned(),
                touching: "CD8+".to_owned(),
                count: 0,
                fraction: None,
                total: 0,
            },
        ];
        let tsv = touch_to_tsv(&rows);
        let table = lines(&tsv);
        assert_eq!(
            table[0],
            vec!["source", "phenotype", "touching", "count", "fraction", "total"]
        );
        assert_eq!(table[1][4], "0");
        assert_eq!(table[2][4], "NA");
    }

    #[test]
    fn mutual_touch_columns() {
        let rows = [MutualTouchRow {
            source: "f".to_owned(),
            phenotype1: "CD8+".to_owned(),
            phenotype2: "Tumor".to_owned(),
            pair_count: 7,
            total1: 10,
            total2: 20,
        }];
        let tsv = mutual_touch_to_tsv(&rows);
        assert!(tsv.ends_with("f\tCD8+\tTumor\t7\t10\t20\n"));
    }

    #[test]
    fn nearest_sections_tagged_by_direction() {
        let record = |from_id, to_id, distance| NearestNeighborRecord {
            from_id,
            to_id,
            distance,
        };
        let result = NearestNeighbors {
            source: "f".to_owned(),
            from: "A".to_owned(),
            to: "B".to_owned(),
            forward: vec![record(1, 3, 2.5), record(2, 3, 4.0)],
            backward: vec![record(3, 1, 2.5)],
            mutual: vec![record(1, 3, 2.5)],
        };
        let tsv = nearest_to_tsv(&[result]);
        let table = lines(&tsv);
        assert_eq!(table.len(), 5);
        assert_eq!(table[1][3], "forward");
        assert_eq!(table[3][1..4], ["B", "A", "backward"]);
        assert_eq!(table[4][3..], ["mutual", "1", "3", "2.5"]);
    }

    #[test]
    fn nearest_distance_columns_per_phenotype() {
        let table = NearestDistanceTable {
            source: "f".to_owned(),
            phenotypes: vec!["CD8+".to_owned(), "Tumor".to_owned()],
            cell_ids: vec![5, 6],
            rows: vec![
                vec![Some(NearestHit { id: 6, distance: 1.5 }), None],
                vec![Some(NearestHit { id: 5, distance: 1.5 }), None],
            ],
        };
        let tsv = nearest_distances_to_tsv(&table);
        let out = lines(&tsv);
        assert_eq!(
            out[0],
            vec![
                "source",
                "cell_id",
                "Distance to CD8+",
                "Cell ID CD8+",
                "Distance to Tumor",
                "Cell ID Tumor",
            ]
        );
        assert_eq!(out[1], vec!["f", "5", "1.5", "6", "NA", "NA"]);
    }

    #[test]
    fn names_cannot_break_columns() {
        assert_eq!(text("a\tb\nc"), "a b c");
        assert_eq!(number(f64::INFINITY), "NA");
    }
}
