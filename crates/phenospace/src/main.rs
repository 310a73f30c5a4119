//! phenospace: spatial statistics and touching-cell detection for one
//! segmented tissue field.
//!
//! Reads a field description (JSON cell table plus phenotype names) and,
//! for touching-cell analysis, the nucleus and membrane label images.
//! Writes tab-delimited tables and optional overlay PNGs to the output
//! directory.
//!
//! # Usage
//!
//! ```text
//! phenospace field.json --within CD8+:Tumor --radius 25 --radius 50
//! phenospace field.json --nearest CD8+:Tumor --distances
//! phenospace field.json --touch CD8+:Tumor --nucleus nuc.png \
//!     --membrane mem.png --composite composite.png --write-images
//! ```

#![allow(clippy::print_stderr)]

mod input;
mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use flexi_logger::Logger;
use phenospace_core::{
    AnalysisConfig, AnalysisError, Field, NeighborSearchKind, PhenotypePair, PhenotypeRules,
    RgbImage, TouchOptions, TouchRows, count_touching_cells, count_within_many, nearest_distances,
    nearest_neighbors, summarize_nearest,
};
use phenospace_export::{
    mutual_touch_to_tsv, nearest_distances_to_tsv, nearest_to_tsv, touch_to_tsv, within_to_tsv,
};

use crate::output::OutputDir;

/// Spatial statistics and touching-cell detection for segmented
/// multiplexed tissue images.
#[derive(Parser)]
#[command(name = "phenospace", version)]
struct Cli {
    /// Field description (JSON): source, units, phenotypes, and cells.
    field_json: PathBuf,

    /// Count `TO` cells within each `--radius` of `FROM` cells (repeatable).
    #[arg(long, value_name = "FROM:TO")]
    within: Vec<String>,

    /// Radius in microns for `--within` (repeatable).
    #[arg(long, value_name = "MICRONS")]
    radius: Vec<f64>,

    /// Nearest neighbors between two phenotypes, both directions and
    /// mutual (repeatable).
    #[arg(long, value_name = "FROM:TO")]
    nearest: Vec<String>,

    /// Write the per-cell table of distances to the nearest cell of
    /// every phenotype.
    #[arg(long)]
    distances: bool,

    /// Touching cells between two phenotypes (repeatable).
    #[arg(long, value_name = "P1:P2")]
    touch: Vec<String>,

    /// Count mutual touching pairs instead of per-direction cells.
    #[arg(long)]
    mutual: bool,

    /// Nucleus label image (8- or 16-bit grayscale).
    #[arg(long)]
    nucleus: Option<PathBuf>,

    /// Membrane label image (8- or 16-bit grayscale).
    #[arg(long)]
    membrane: Option<PathBuf>,

    /// Composite image used as overlay background.
    #[arg(long)]
    composite: Option<PathBuf>,

    /// Write a touching-cell overlay PNG per pair (needs `--composite`).
    #[arg(long)]
    write_images: bool,

    /// Directory for tables and images.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Restrict analyses to a tissue category (repeatable). Without it,
    /// the whole field is analyzed.
    #[arg(long)]
    category: Vec<String>,

    /// Pixel edge length in microns.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_MICRONS_PER_PIXEL)]
    microns_per_pixel: f64,

    /// Dilation radius in pixels for directional touch detection.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_TOUCH_DILATION_RADIUS)]
    touch_radius: u8,

    /// Dilation radius in pixels for mutual touching pairs.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_PAIR_DILATION_RADIUS)]
    pair_radius: u8,

    /// Neighbor search structure.
    #[arg(long, value_enum, default_value_t = Search::Matrix)]
    search: Search,

    /// Full analysis config as a JSON string.
    ///
    /// When provided, all other analysis parameter flags are ignored.
    /// The JSON must be a valid `AnalysisConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Log specification, e.g. `info` or `info,phenospace_core=debug`.
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Neighbor search strategy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Search {
    /// Full pairwise distance matrix.
    Matrix,
    /// R*-tree over cell positions.
    Tree,
}

/// Build an [`AnalysisConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<AnalysisConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        AnalysisConfig {
            microns_per_pixel: cli.microns_per_pixel,
            touch_dilation_radius: cli.touch_radius,
            pair_dilation_radius: cli.pair_radius,
            neighbor_search: match cli.search {
                Search::Matrix => NeighborSearchKind::DistanceMatrix,
                Search::Tree => NeighborSearchKind::SpatialIndex,
            },
            ..AnalysisConfig::default()
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Phenotype pairs requested on the command line.
struct Requests {
    within: Vec<PhenotypePair>,
    nearest: Vec<PhenotypePair>,
    touch: Vec<PhenotypePair>,
}

fn parse_pairs(texts: &[String]) -> Result<Vec<PhenotypePair>, String> {
    texts
        .iter()
        .map(|t| PhenotypePair::parse(t).map_err(|e| e.to_string()))
        .collect()
}

impl Requests {
    fn from_cli(cli: &Cli) -> Result<Self, String> {
        let requests = Self {
            within: parse_pairs(&cli.within)?,
            nearest: parse_pairs(&cli.nearest)?,
            touch: parse_pairs(&cli.touch)?,
        };
        if !requests.within.is_empty() && cli.radius.is_empty() {
            return Err("--within needs at least one --radius".to_owned());
        }
        if requests.within.is_empty() && !cli.radius.is_empty() {
            log::warn!("--radius given without --within; ignored");
        }
        if requests.touch.is_empty() && cli.write_images {
            log::warn!("--write-images given without --touch; no images to write");
        }
        if requests.is_empty() && !cli.distances {
            return Err(
                "nothing to do: give --within, --nearest, --distances, or --touch".to_owned(),
            );
        }
        Ok(requests)
    }

    const fn is_empty(&self) -> bool {
        self.within.is_empty() && self.nearest.is_empty() && self.touch.is_empty()
    }

    /// Fail on any phenotype name the field does not define.
    fn check_phenotypes(&self, rules: &PhenotypeRules) -> Result<(), String> {
        for pairs in [&self.within, &self.nearest, &self.touch] {
            rules.validate_pairs(pairs).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

fn require_file(path: Option<&Path>, flag: &str, purpose: &str) -> Result<PathBuf, String> {
    let path = path.ok_or_else(|| {
        AnalysisError::MissingAsset(format!("{flag} is required for {purpose}")).to_string()
    })?;
    if !path.is_file() {
        return Err(AnalysisError::MissingAsset(path.display().to_string()).to_string());
    }
    Ok(path.to_path_buf())
}

/// Image inputs, checked before anything is read.
struct Assets {
    masks: Option<(PathBuf, PathBuf)>,
    composite: Option<PathBuf>,
}

fn check_assets(cli: &Cli, requests: &Requests) -> Result<Assets, String> {
    require_file(Some(&cli.field_json), "FIELD_JSON", "every analysis")?;
    if requests.touch.is_empty() {
        return Ok(Assets {
            masks: None,
            composite: None,
        });
    }
    let nucleus = require_file(cli.nucleus.as_deref(), "--nucleus", "--touch")?;
    let membrane = require_file(cli.membrane.as_deref(), "--membrane", "--touch")?;
    let composite = if cli.write_images {
        Some(require_file(
            cli.composite.as_deref(),
            "--composite",
            "--write-images",
        )?)
    } else {
        None
    };
    Ok(Assets {
        masks: Some((nucleus, membrane)),
        composite,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _logger = match Logger::try_with_str(&cli.log_level).and_then(|l| l.log_to_stderr().start())
    {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Error initializing logging from {:?}: {e}", cli.log_level);
            return ExitCode::FAILURE;
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;
    let requests = Requests::from_cli(cli)?;
    let assets = check_assets(cli, &requests)?;

    let spec = input::read_field_spec(&cli.field_json)?;
    let rules = spec.rules();
    requests.check_phenotypes(&rules)?;
    let masks = match &assets.masks {
        Some((nucleus, membrane)) => Some(input::read_masks(nucleus, membrane)?),
        None => None,
    };
    let composite = match &assets.composite {
        Some(path) => Some(input::read_composite(path)?),
        None => None,
    };
    let field = spec.into_field(masks).map_err(|e| e.to_string())?;
    field
        .check_bounds(config.scale())
        .map_err(|e| format!("{}: {e}", field.source()))?;
    log::info!(
        "{}: {} cells, {} phenotypes",
        field.source(),
        field.len(),
        rules.len()
    );

    let out = OutputDir::create(&cli.output_dir, field.source())?;

    if !requests.within.is_empty() {
        let categories: Vec<Option<String>> = cli.category.iter().cloned().map(Some).collect();
        let rows = count_within_many(
            &field,
            &requests.within,
            &cli.radius,
            &categories,
            &rules,
            &config,
        )
        .map_err(|e| e.to_string())?;
        out.write_table(None, "within", &within_to_tsv(&rows))?;
    }

    let scopes: Vec<Option<&str>> = if cli.category.is_empty() {
        vec![None]
    } else {
        cli.category.iter().map(|c| Some(c.as_str())).collect()
    };
    for category in scopes {
        let scope = Scope {
            field: &field,
            rules: &rules,
            config: &config,
            category,
            out: &out,
        };
        scope.nearest(&requests.nearest)?;
        if cli.distances {
            scope.distances()?;
        }
        if !requests.touch.is_empty() {
            scope.touch(&requests.touch, composite.as_ref(), cli.mutual)?;
        }
    }
    Ok(())
}

/// Per-category analyses writing their own tables.
struct Scope<'a> {
    field: &'a Field,
    rules: &'a PhenotypeRules,
    config: &'a AnalysisConfig,
    category: Option<&'a str>,
    out: &'a OutputDir,
}

impl Scope<'_> {
    fn nearest(&self, pairs: &[PhenotypePair]) -> Result<(), String> {
        if pairs.is_empty() {
            return Ok(());
        }
        let mut results = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let result = nearest_neighbors(
                self.field,
                &pair.first,
                &pair.second,
                self.rules,
                self.category,
                self.config,
            )
            .map_err(|e| e.to_string())?;
            if let Some(summary) = summarize_nearest(&result.forward) {
                log::info!(
                    "{} -> {}: {} cells, mean {:.2} um, median {:.2} um, {} mutual",
                    pair.first,
                    pair.second,
                    summary.count,
                    summary.mean,
                    summary.median,
                    result.mutual.len(),
                );
            }
            results.push(result);
        }
        self.out
            .write_table(self.category, "nearest", &nearest_to_tsv(&results))
    }

    fn distances(&self) -> Result<(), String> {
        let names: Vec<&str> = self.rules.names().collect();
        let table = nearest_distances(self.field, &names, self.rules, self.category, self.config)
            .map_err(|e| e.to_string())?;
        self.out.write_table(
            self.category,
            "distances",
            &nearest_distances_to_tsv(&table),
        )
    }

    fn touch(
        &self,
        pairs: &[PhenotypePair],
        composite: Option<&RgbImage>,
        mutual: bool,
    ) -> Result<(), String> {
        let options = TouchOptions {
            mutual,
            overlays: composite.is_some(),
            category: self.category.map(str::to_owned),
        };
        let report = count_touching_cells(
            self.field,
            pairs,
            self.rules,
            composite,
            &options,
            self.config,
        )
        .map_err(|e| e.to_string())?;

        match &report.rows {
            TouchRows::Directional(rows) => {
                self.out
                    .write_table(self.category, "touches", &touch_to_tsv(rows))?;
            }
            TouchRows::Mutual(rows) => {
                self.out
                    .write_table(self.category, "touch_pairs", &mutual_touch_to_tsv(rows))?;
            }
        }
        for overlay in &report.overlays {
            self.out
                .write_overlay(self.category, &overlay.pair, &overlay.image)?;
        }
        Ok(())
    }
}
