//! Integration test: touching-cell counts over a small synthetic field.
//!
//! Four compartments in a row, 7 pixels wide and sharing membrane walls:
//!
//! ```text
//!   x: 0     6     12    18      22    28
//!      | 1   | 2   | 3   |       | 4   |
//!      CD8+  Tumor CD8+          Tumor
//! ```
//!
//! Cells 1-2 and 2-3 share a wall; cell 4 stands alone four columns
//! past cell 3.

#![allow(clippy::unwrap_used, clippy::panic, clippy::float_cmp)]

use image::{Luma, Rgb};
use phenospace_core::{
    AnalysisConfig, AnalysisError, Cell, Field, LabelImage, PhenotypePair, PhenotypeRules, Point,
    RgbImage, SegmentationMasks, TouchOptions, TouchRow, TouchRows, Units, count_touching_cells,
};

const WIDTH: u32 = 30;
const HEIGHT: u32 = 9;

fn ring(membrane: &mut LabelImage, id: u32, x0: u32, x1: u32) {
    for x in x0..=x1 {
        membrane.put_pixel(x, 0, Luma([id]));
        membrane.put_pixel(x, HEIGHT - 1, Luma([id]));
    }
    for y in 0..HEIGHT {
        membrane.put_pixel(x0, y, Luma([id]));
        membrane.put_pixel(x1, y, Luma([id]));
    }
}

fn blob(nucleus: &mut LabelImage, id: u32, x0: u32) {
    for y in 3..=5 {
        for x in x0..x0 + 3 {
            nucleus.put_pixel(x, y, Luma([id]));
        }
    }
}

fn masks() -> SegmentationMasks {
    let mut nucleus = LabelImage::new(WIDTH, HEIGHT);
    let mut membrane = LabelImage::new(WIDTH, HEIGHT);
    for (id, x0) in [(1, 0), (2, 6), (3, 12), (4, 22)] {
        ring(&mut membrane, id, x0, x0 + 6);
        blob(&mut nucleus, id, x0 + 2);
    }
    SegmentationMasks::new(nucleus, membrane).unwrap()
}

fn cells() -> Vec<Cell> {
    vec![
        Cell::new(1, Point::new(3.0, 4.0), Some("CD8+")).with_category("stroma"),
        Cell::new(2, Point::new(9.0, 4.0), Some("Tumor")).with_category("tumor"),
        Cell::new(3, Point::new(15.0, 4.0), Some("CD8+")).with_category("tumor"),
        Cell::new(4, Point::new(25.0, 4.0), Some("Tumor")).with_category("stroma"),
    ]
}

fn field() -> Field {
    Field::new("slide_1 [1,2]", cells(), Units::Pixels)
        .unwrap()
        .with_masks(masks())
}

fn rules() -> PhenotypeRules {
    PhenotypeRules::from_names(&["CD8+", "Tumor", "FoxP3+"])
}

fn directional(rows: &TouchRows) -> &[TouchRow] {
    match rows {
        TouchRows::Directional(rows) => rows,
        TouchRows::Mutual(_) => panic!("expected directional rows"),
    }
}

#[test]
fn directional_counts_and_fractions() {
    let pairs = [PhenotypePair::new("CD8+", "Tumor")];
    let report = count_touching_cells(
        &field(),
        &pairs,
        &rules(),
        None,
        &TouchOptions::default(),
        &AnalysisConfig::default(),
    )
    .unwrap();

    let rows = directional(&report.rows);
    assert_eq!(rows.len(), 2);

    // Both CD8+ cells border cell 2.
    assert_eq!(rows[0].phenotype, "CD8+");
    assert_eq!(rows[0].touching, "Tumor");
    assert_eq!((rows[0].count, rows[0].total), (2, 2));
    assert_eq!(rows[0].fraction, Some(1.0));

    // Only cell 2 of the two tumor cells touches CD8+.
    assert_eq!(rows[1].phenotype, "Tumor");
    assert_eq!((rows[1].count, rows[1].total), (1, 2));
    assert_eq!(rows[1].fraction, Some(0.5));

    assert!(report.touches.is_empty());
    assert!(report.overlays.is_empty());
}

#[test]
fn mutual_pairs_are_symmetric() {
    let options = TouchOptions {
        mutual: true,
        ..TouchOptions::default()
    };
    let config = AnalysisConfig::default();
    let forward = count_touching_cells(
        &field(),
        &[PhenotypePair::new("CD8+", "Tumor")],
        &rules(),
        None,
        &options,
        &config,
    )
    .unwrap();
    let backward = count_touching_cells(
        &field(),
        &[PhenotypePair::new("Tumor", "CD8+")],
        &rules(),
        None,
        &options,
        &config,
    )
    .unwrap();

    let TouchRows::Mutual(rows) = &forward.rows else {
        panic!("expected mutual rows");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].pair_count, 2);
    assert_eq!((rows[0].total1, rows[0].total2), (2, 2));

    let mut forward_pairs = forward.touches[0].touches.clone();
    let mut backward_pairs: Vec<_> = backward.touches[0]
        .touches
        .iter()
        .map(|p| p.swapped())
        .collect();
    forward_pairs.sort();
    backward_pairs.sort();
    assert_eq!(forward_pairs, backward_pairs);
    assert_eq!(
        forward_pairs
            .iter()
            .map(|p| (p.first, p.second))
            .collect::<Vec<_>>(),
        vec![(1, 2), (3, 2)]
    );
}

#[test]
fn empty_population_reports_zero_rows_and_skips_image() {
    let composite = RgbImage::new(WIDTH, HEIGHT);
    let options = TouchOptions {
        overlays: true,
        ..TouchOptions::default()
    };
    let pairs = [PhenotypePair::new("CD8+", "FoxP3+")];
    let report = count_touching_cells(
        &field(),
        &pairs,
        &rules(),
        Some(&composite),
        &options,
        &AnalysisConfig::default(),
    )
    .unwrap();

    let rows = directional(&report.rows);
    assert_eq!(rows[0].count, 0);
    assert_eq!(rows[0].total, 2);
    assert_eq!(rows[0].fraction, Some(0.0));
    assert_eq!(rows[1].phenotype, "FoxP3+");
    assert_eq!(rows[1].total, 0);
    assert_eq!(rows[1].fraction, None);

    assert!(report.overlays.is_empty());
    assert_eq!(report.skipped_images, pairs.to_vec());
}

#[test]
fn overlays_fill_touching_cells() {
    let composite = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([20, 20, 20]));
    let options = TouchOptions {
        overlays: true,
        ..TouchOptions::default()
    };
    let config = AnalysisConfig::default();
    let report = count_touching_cells(
        &field(),
        &[PhenotypePair::new("CD8+", "Tumor")],
        &rules(),
        Some(&composite),
        &options,
        &config,
    )
    .unwrap();

    assert_eq!(report.overlays.len(), 1);
    let image = &report.overlays[0].image;
    assert_eq!(image.dimensions(), (WIDTH, HEIGHT));
    // Cell 1 touches: filled. Cell 4 does not: interior unchanged.
    assert_eq!(*image.get_pixel(3, 4), Rgb(config.overlay_colors.first));
    assert_eq!(*image.get_pixel(25, 4), Rgb([20, 20, 20]));
    assert_eq!(*image.get_pixel(23, 4), Rgb(config.overlay_colors.second));
}

#[test]
fn category_restricts_both_populations() {
    let options = TouchOptions {
        category: Some("tumor".to_owned()),
        ..TouchOptions::default()
    };
    let report = count_touching_cells(
        &field(),
        &[PhenotypePair::new("CD8+", "Tumor")],
        &rules(),
        None,
        &options,
        &AnalysisConfig::default(),
    )
    .unwrap();

    let rows = directional(&report.rows);
    assert_eq!((rows[0].count, rows[0].total), (1, 1));
    assert_eq!((rows[1].count, rows[1].total), (1, 1));
}

#[test]
fn unknown_phenotype_fails_up_front() {
    let result = count_touching_cells(
        &field(),
        &[
            PhenotypePair::new("CD8+", "Tumor"),
            PhenotypePair::new("CD8+", "CD4+"),
        ],
        &rules(),
        None,
        &TouchOptions::default(),
        &AnalysisConfig::default(),
    );
    assert!(matches!(
        result,
        Err(AnalysisError::UnknownPhenotype(name)) if name == "CD4+"
    ));
}

#[test]
fn missing_assets_fail() {
    let pairs = [PhenotypePair::new("CD8+", "Tumor")];
    let config = AnalysisConfig::default();

    let bare = Field::new("bare", cells(), Units::Pixels).unwrap();
    let result = count_touching_cells(
        &bare,
        &pairs,
        &rules(),
        None,
        &TouchOptions::default(),
        &config,
    );
    assert!(matches!(result, Err(AnalysisError::MissingAsset(_))));

    let options = TouchOptions {
        overlays: true,
        ..TouchOptions::default()
    };
    let result = count_touching_cells(&field(), &pairs, &rules(), None, &options, &config);
    assert!(matches!(result, Err(AnalysisError::MissingAsset(_))));

    let wrong_size = RgbImage::new(WIDTH + 1, HEIGHT);
    let result = count_touching_cells(
        &field(),
        &pairs,
        &rules(),
        Some(&wrong_size),
        &options,
        &config,
    );
    assert!(matches!(
        result,
        Err(AnalysisError::DimensionMismatch { .. })
    ));
}
