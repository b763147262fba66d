//! Cache-aware batch period search.
//!
//! One JSON result file per object under the output directory; an object
//! whose file already exists is skipped, so an interrupted batch resumes
//! from where it stopped by rerunning the same command. Result files are
//! written to a temporary sibling and renamed into place.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::backend::{searcher, Algorithm, ComputeBackend};
use super::grid::{FrequencyGrid, SearchMode};
use super::{best_peak, Peak, Periodogram, Spectrum, TERRESTRIAL_BANDS};
use crate::lightcurve::{LightCurve, MIN_EPOCHS};

/// Batch runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Directory holding one `<name>.json` result per object.
    pub output_dir: PathBuf,
    /// Compute backend. A batch with no backend selected fails before any
    /// work starts.
    pub backend: Option<ComputeBackend>,
    /// Algorithms to run per object, one spectrum each.
    pub algorithms: Vec<Algorithm>,
    pub mode: SearchMode,
    /// Frequency bands masked out of every search, cycles per day.
    pub bands: Vec<[f64; 2]>,
    /// Curves with fewer epochs than this are rejected, not searched.
    pub min_epochs: usize,
}

impl RunnerConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            backend: None,
            algorithms: vec![Algorithm::Gls],
            mode: SearchMode::ShortPeriod,
            bands: TERRESTRIAL_BANDS.to_vec(),
            min_epochs: MIN_EPOCHS,
        }
    }
}

/// Strongest peak one algorithm found, `None` when its whole spectrum was
/// masked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmPeak {
    pub algorithm: Algorithm,
    pub peak: Option<Peak>,
}

/// One object's period search result as persisted to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodResult {
    pub mode: SearchMode,
    /// The grid and every algorithm's power array, as searched.
    pub periodogram: Periodogram,
    /// Best peak per algorithm, in configuration order.
    pub peaks: Vec<AlgorithmPeak>,
}

impl PeriodResult {
    pub fn name(&self) -> &str {
        &self.periodogram.name
    }

    /// The peak one algorithm found, if it ran and found one.
    pub fn peak(&self, algorithm: Algorithm) -> Option<&Peak> {
        self.peaks
            .iter()
            .find(|p| p.algorithm == algorithm)
            .and_then(|p| p.peak.as_ref())
    }
}

/// Counts of how a batch went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Searched and written this run.
    pub processed: usize,
    /// Result file already existed.
    pub skipped: usize,
    /// Rejected or failed; reported, not fatal.
    pub failed: usize,
}

/// Runs the configured period-search algorithms over a batch of light
/// curves.
///
/// Fails up front when no backend or no algorithms are configured.
/// Per-object failures are reported and counted but do not stop the batch.
pub fn run_batch(curves: &[LightCurve], config: &RunnerConfig) -> Result<BatchSummary> {
    let Some(backend) = config.backend else {
        bail!("No compute backend selected; set one before running the batch");
    };
    if config.algorithms.is_empty() {
        bail!("No period-search algorithms configured");
    }
    let search = searcher(backend)?;
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", config.output_dir))?;

    let bar = ProgressBar::new(curves.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message("Period search");

    let mut summary = BatchSummary::default();
    for lc in curves {
        let result_path = result_path(&config.output_dir, lc.name());
        if result_path.is_file() {
            summary.skipped += 1;
            bar.inc(1);
            continue;
        }
        match search_one(lc, config, search.as_ref()) {
            Ok(result) => {
                write_result(&result_path, &result)?;
                summary.processed += 1;
            }
            Err(err) => {
                eprintln!("Warning: period search failed for {}: {:#}", lc.name(), err);
                summary.failed += 1;
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    Ok(summary)
}

/// Result file path for an object name.
pub fn result_path(output_dir: &Path, name: &str) -> PathBuf {
    output_dir.join(format!("{name}.json"))
}

fn search_one(
    lc: &LightCurve,
    config: &RunnerConfig,
    search: &dyn super::PeriodSearch,
) -> Result<PeriodResult> {
    lc.require_min_epochs(config.min_epochs)?;
    let baseline = lc.baseline_days();
    let grid = FrequencyGrid::for_baseline(baseline, config.mode)?;

    let mut spectra = Vec::with_capacity(config.algorithms.len());
    let mut peaks = Vec::with_capacity(config.algorithms.len());
    for &algorithm in &config.algorithms {
        let powers = search.powers(algorithm, lc, &grid, &config.bands)?;
        peaks.push(AlgorithmPeak {
            algorithm,
            peak: best_peak(&grid, &powers),
        });
        spectra.push(Spectrum { algorithm, powers });
    }

    Ok(PeriodResult {
        mode: config.mode,
        periodogram: Periodogram {
            name: lc.name().to_string(),
            ra: lc.ra(),
            dec: lc.dec(),
            filter: lc.filter(),
            baseline_days: baseline,
            grid,
            spectra,
        },
        peaks,
    })
}

fn write_result(path: &Path, result: &PeriodResult) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    let file = std::fs::File::create(&tmp_path)
        .with_context(|| format!("Failed to create result file: {:?}", tmp_path))?;
    serde_json::to_writer_pretty(&file, result)
        .with_context(|| format!("Failed to serialize result for {}", result.name()))?;
    file.sync_all()?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move result into place: {:?}", path))?;
    Ok(())
}

/// Loads a previously written result.
pub fn read_result(path: &Path) -> Result<PeriodResult> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open result file: {:?}", path))?;
    serde_json::from_reader(file).with_context(|| format!("Malformed result file: {:?}", path))
}
