//! Output file naming and writing.
//!
//! Every file of one field starts with the field's source name, so the
//! results of many fields can share one directory:
//!
//! - tables: `<source>[_<category>]_<table>.tsv`
//! - overlays: `<source>[_<category>]_<phenotype1>_touch_<phenotype2>.png`

use std::path::{Path, PathBuf};

use phenospace_core::{PhenotypePair, RgbImage};

/// Destination for one field's results.
pub struct OutputDir {
    dir: PathBuf,
    stem: String,
}

impl OutputDir {
    /// Create `dir` if needed.
    pub fn create(dir: &Path, source: &str) -> Result<Self, String> {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("Error creating {}: {e}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            stem: file_component(source),
        })
    }

    fn prefix(&self, category: Option<&str>) -> String {
        match category {
            Some(category) => format!("{}_{}", self.stem, file_component(category)),
            None => self.stem.clone(),
        }
    }

    /// Path of a named table.
    pub fn table_path(&self, category: Option<&str>, table: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{table}.tsv", self.prefix(category)))
    }

    /// Path of the overlay image for `pair`.
    pub fn overlay_path(&self, category: Option<&str>, pair: &PhenotypePair) -> PathBuf {
        self.dir.join(format!(
            "{}_{}_touch_{}.png",
            self.prefix(category),
            file_component(&pair.first),
            file_component(&pair.second),
        ))
    }

    /// Write a table.
    pub fn write_table(
        &self,
        category: Option<&str>,
        table: &str,
        contents: &str,
    ) -> Result<(), String> {
        let path = self.table_path(category, table);
        std::fs::write(&path, contents)
            .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        log::info!("Wrote {} ({} bytes)", path.display(), contents.len());
        Ok(())
    }

    /// Write an overlay image as PNG.
    pub fn write_overlay(
        &self,
        category: Option<&str>,
        pair: &PhenotypePair,
        image: &RgbImage,
    ) -> Result<(), String> {
        let path = self.overlay_path(category, pair);
        image
            .save(&path)
            .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        log::info!("Wrote {}", path.display());
        Ok(())
    }
}

/// Make `text` safe as part of a file name. Keeps letters, digits, and
/// `+ - .` (phenotype names like `CD8+` stay readable); everything
/// else becomes `_`.
fn file_component(text: &str) -> String {
    text.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '+' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
