//! Reading field descriptions and label rasters from disk.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use image::{DynamicImage, Luma};
use phenospace_core::raster::labels_from_luma16;
use phenospace_core::{
    AnalysisError, Cell, Dimensions, Field, LabelImage, PhenotypeRules, PhenotypeSelector,
    RgbImage, SegmentationMasks, Units,
};
use serde::Deserialize;

/// One field as stored in its JSON description.
///
/// ```json
/// {
///   "source": "slide_1 [1,2]",
///   "units": "microns",
///   "phenotypes": ["CD8+", "Tumor", "CD68+,CD163+"],
///   "cells": [{ "id": 1, "position": { "x": 10.5, "y": 3.0 }, "phenotype": "CD8+" }]
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct FieldSpec {
    /// Field name, used in every output row and file name.
    pub source: String,
    /// Unit of the cell positions.
    #[serde(default)]
    pub units: Units,
    /// Image size, when known without masks.
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    /// Phenotype names in selector shorthand. When empty, every distinct
    /// phenotype label in the cells is used.
    #[serde(default)]
    pub phenotypes: Vec<String>,
    /// Explicit phenotype definitions, overriding shorthand names.
    #[serde(default)]
    pub rules: BTreeMap<String, PhenotypeSelector>,
    /// The cell table.
    pub cells: Vec<Cell>,
}

impl FieldSpec {
    /// Phenotype rules for this field.
    pub fn rules(&self) -> PhenotypeRules {
        let mut rules = if self.phenotypes.is_empty() {
            let labels: BTreeSet<&str> = self
                .cells
                .iter()
                .filter_map(|c| c.phenotype.as_deref())
                .collect();
            PhenotypeRules::from_names(&labels.into_iter().collect::<Vec<_>>())
        } else {
            PhenotypeRules::from_names(&self.phenotypes)
        };
        for (name, selector) in &self.rules {
            rules.insert(name, selector.clone());
        }
        rules
    }

    /// Build the field, attaching masks when given.
    pub fn into_field(self, masks: Option<SegmentationMasks>) -> Result<Field, AnalysisError> {
        let mut field = Field::new(&self.source, self.cells, self.units)?;
        if let Some(dimensions) = self.dimensions {
            field = field.with_dimensions(dimensions);
        }
        if let Some(masks) = masks {
            if let Some(declared) = self.dimensions
                && declared != masks.dimensions()
            {
                return Err(AnalysisError::DimensionMismatch {
                    expected: declared,
                    actual: masks.dimensions(),
                });
            }
            field = field.with_masks(masks);
        }
        Ok(field)
    }
}

/// Parse a field description file.
pub fn read_field_spec(path: &Path) -> Result<FieldSpec, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("Error parsing {}: {e}", path.display()))
}

/// Convert a decoded label image without rescaling its values.
///
/// Only 8- and 16-bit grayscale images are accepted: any other color
/// type would have to be converted, and conversion rescales values,
/// which would change the cell IDs.
pub fn labels_from_image(image: DynamicImage) -> Result<LabelImage, String> {
    match image {
        DynamicImage::ImageLuma16(labels) => Ok(labels_from_luma16(&labels)),
        DynamicImage::ImageLuma8(labels) => Ok(LabelImage::from_fn(
            labels.width(),
            labels.height(),
            |x, y| Luma([u32::from(labels.get_pixel(x, y).0[0])]),
        )),
        other => Err(format!(
            "label image must be 8- or 16-bit grayscale, found {:?}",
            other.color()
        )),
    }
}

/// Read one label raster (nucleus or membrane).
pub fn read_labels(path: &Path) -> Result<LabelImage, String> {
    let image =
        image::open(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    labels_from_image(image).map_err(|e| format!("{}: {e}", path.display()))
}

/// Read the nucleus and membrane rasters as one aligned pair.
pub fn read_masks(nucleus: &Path, membrane: &Path) -> Result<SegmentationMasks, String> {
    let masks = SegmentationMasks::new(read_labels(nucleus)?, read_labels(membrane)?)
        .map_err(|e| format!("{} / {}: {e}", nucleus.display(), membrane.display()))?;
    log::info!(
        "Loaded {} masks from {} and {}",
        masks.dimensions(),
        nucleus.display(),
        membrane.display(),
    );
    Ok(masks)
}

/// Read the composite image used as overlay background.
pub fn read_composite(path: &Path) -> Result<RgbImage, String> {
    let image =
        image::open(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    Ok(image.into_rgb8())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Rgb};

    const JSON: &str = r#"{
        "source": "slide_1 [1,2]",
        "units": "pixels",
        "cells": [
            { "id": 1, "position": { "x": 1.0, "y": 1.0 }, "phenotype": "CD8+" },
            { "id": 2, "position": { "x": 2.0, "y": 1.0 }, "phenotype": "Tumor" },
            { "id": 3, "position": { "x": 3.0, "y": 1.0 }, "phenotype": "CD8+" }
        ]
    }"#;

    #[test]
    fn phenotypes_default_to_cell_labels() {
        let spec: FieldSpec = serde_json::from_str(JSON).unwrap();
        let rules = spec.rules();
        assert_eq!(rules.names().collect::<Vec<_>>(), vec!["CD8+", "Tumor"]);
        let field = spec.into_field(None).unwrap();
        assert_eq!(field.len(), 3);
        assert_eq!(field.units(), Units::Pixels);
    }

    #[test]
    fn explicit_rules_override_shorthand() {
        let mut spec: FieldSpec = serde_json::from_str(JSON).unwrap();
        spec.phenotypes = vec!["CD8+".to_owned(), "Immune".to_owned()];
        spec.rules.insert(
            "Immune".to_owned(),
            PhenotypeSelector::AnyOf(vec![PhenotypeSelector::label("CD8+")]),
        );
        let rules = spec.rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(
            rules.get("Immune"),
            Some(&PhenotypeSelector::AnyOf(vec![PhenotypeSelector::label(
                "CD8+"
            )]))
        );
    }

    #[test]
    fn declared_dimensions_must_match_masks() {
        let mut spec: FieldSpec = serde_json::from_str(JSON).unwrap();
        spec.dimensions = Some(Dimensions {
            width: 10,
            height: 10,
        });
        let masks = SegmentationMasks::new(LabelImage::new(8, 8), LabelImage::new(8, 8)).unwrap();
        assert!(matches!(
            spec.into_field(Some(masks)),
            Err(AnalysisError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn eight_bit_labels_keep_their_values() {
        let mut gray = GrayImage::new(3, 1);
        gray.put_pixel(1, 0, Luma([7]));
        let labels = labels_from_image(DynamicImage::ImageLuma8(gray)).unwrap();
        assert_eq!(labels.get_pixel(1, 0).0[0], 7);
        assert_eq!(labels.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn sixteen_bit_labels_keep_their_values() {
        let mut wide: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::new(2, 2);
        wide.put_pixel(1, 1, Luma([40_000]));
        let labels = labels_from_image(DynamicImage::ImageLuma16(wide)).unwrap();
        assert_eq!(labels.get_pixel(1, 1).0[0], 40_000);
    }

    #[test]
    fn color_labels_rejected() {
        let rgb = RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));
        assert!(labels_from_image(DynamicImage::ImageRgb8(rgb)).is_err());
    }
}
