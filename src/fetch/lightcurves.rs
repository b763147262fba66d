//! Join-table assembly and batch light-curve fetching.
//!
//! The join table lines a catalog table up with the feature database:
//! ingestion check, classifier labels, and a projected feature snapshot
//! per object. Photometry is then pulled per object through a bounded
//! worker pool, with per-object JSON artifacts so a rerun reuses what a
//! previous run already downloaded.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::labels::{aggregate_votes, select_label, write_label_table};
use super::{FeatureDatabase, FetchError, FetchResult, LabelService, PhotometryService};
use crate::catalog::SourceTable;
use crate::lightcurve::{LightCurve, MIN_EPOCHS};
use crate::retry::Retry;

/// Search radius for resolving a catalog position to a database object
/// and for photometry queries, arcseconds.
pub const PHOT_RADIUS_ARCSEC: f64 = 1.0;

/// Feature-document projection pulled for every joined object.
pub const FEATURE_COLUMNS: [&str; 12] = [
    "_id",
    "ra",
    "dec",
    "period",
    "significance",
    "pdot",
    "amplitude",
    "stetson_j",
    "stetson_k",
    "inv_vonneumannratio",
    "skew",
    "n",
];

/// Fetch tuning knobs.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Worker pool size for photometry; 1 runs sequentially.
    pub workers: usize,
    pub retry: Retry,
    /// Directory of per-object light-curve artifacts, reused across runs.
    pub artifact_dir: Option<PathBuf>,
    /// Where to persist the aggregated label table, if anywhere.
    pub label_table: Option<PathBuf>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            workers: 8,
            retry: Retry::default(),
            artifact_dir: None,
            label_table: None,
        }
    }
}

/// One catalog row joined against the feature database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRow {
    pub name: String,
    pub ra: f64,
    pub dec: f64,
    pub objid: i64,
    /// Unanimous training label, if the classifiers agreed.
    pub label: Option<String>,
    /// Projected feature document.
    pub features: serde_json::Value,
}

/// Resolves catalog positions to database objids.
///
/// `None` entries are positions with no ingested counterpart within
/// [`PHOT_RADIUS_ARCSEC`].
pub fn check_ingested(
    db: &dyn FeatureDatabase,
    table: &SourceTable,
    retry: &Retry,
) -> FetchResult<Vec<Option<i64>>> {
    let positions: Vec<(f64, f64)> = table.records().iter().map(|r| (r.ra, r.dec)).collect();
    retry.run(|| db.resolve_objids(&positions, PHOT_RADIUS_ARCSEC))
}

/// Builds the join table for every ingested row of `table`.
///
/// Rows without an ingested counterpart are reported and dropped; labels
/// and feature snapshots are fetched in one query each over the surviving
/// objids. The vote query is skipped entirely when the label store lists
/// no classification programs. With a label-table path configured, the
/// aggregated vote records are persisted alongside the join table.
pub fn build_join_table(
    db: &dyn FeatureDatabase,
    labels: &dyn LabelService,
    table: &SourceTable,
    options: &FetchOptions,
) -> FetchResult<Vec<ObjectRow>> {
    let objids = check_ingested(db, table, &options.retry)?;

    let mut rows: Vec<ObjectRow> = Vec::new();
    let mut missing = 0usize;
    for (record, objid) in table.records().iter().zip(&objids) {
        match objid {
            Some(objid) => rows.push(ObjectRow {
                name: record.name.clone(),
                ra: record.ra,
                dec: record.dec,
                objid: *objid,
                label: None,
                features: serde_json::Value::Null,
            }),
            None => missing += 1,
        }
    }
    if missing > 0 {
        eprintln!("Warning: {missing} objects are not ingested and were dropped");
    }
    if rows.is_empty() {
        return Ok(rows);
    }

    let ids: Vec<i64> = rows.iter().map(|r| r.objid).collect();

    let programs = options.retry.run(|| labels.programs())?;
    let votes = if programs.is_empty() {
        Vec::new()
    } else {
        options.retry.run(|| labels.votes(&ids))?
    };
    let records = aggregate_votes(&votes);
    for row in &mut rows {
        if let Some(record) = records.iter().find(|r| r.objid == row.objid) {
            row.label = select_label(record).map(str::to_string);
        }
    }
    if let Some(path) = &options.label_table {
        write_label_table(path, &records)?;
    }

    let features = options.retry.run(|| db.features(&ids, &FEATURE_COLUMNS))?;
    if features.len() != rows.len() {
        return Err(FetchError::service(format!(
            "Feature query returned {} documents for {} objects",
            features.len(),
            rows.len()
        )));
    }
    for (row, doc) in rows.iter_mut().zip(features) {
        row.features = doc;
    }
    Ok(rows)
}

/// Fetches photometry for every joined object.
///
/// Curves with fewer than [`MIN_EPOCHS`] epochs are discarded; each kept
/// curve carries the row's selected label, database period and score, and
/// feature snapshot in its metadata. Per-object failures are reported and
/// skipped, not fatal. With an artifact directory set, each object's
/// curves are written there as JSON and reloaded instead of re-queried on
/// the next run.
pub fn fetch_lightcurves(
    photometry: &dyn PhotometryService,
    rows: &[ObjectRow],
    options: &FetchOptions,
) -> FetchResult<Vec<LightCurve>> {
    if let Some(dir) = &options.artifact_dir {
        std::fs::create_dir_all(dir)?;
    }

    let bar = ProgressBar::new(rows.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message("Fetching light curves");

    let fetch_one = |row: &ObjectRow| -> Vec<LightCurve> {
        let result = fetch_object(photometry, row, options);
        bar.inc(1);
        match result {
            Ok(curves) => curves,
            Err(err) => {
                eprintln!("Warning: photometry failed for {}: {}", row.name, err);
                Vec::new()
            }
        }
    };

    let fetched: Vec<Vec<LightCurve>> = if options.workers > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.workers)
            .build()
            .map_err(|e| FetchError::service(e.to_string()))?;
        pool.install(|| rows.par_iter().map(fetch_one).collect())
    } else {
        rows.iter().map(fetch_one).collect()
    };
    bar.finish_and_clear();

    Ok(fetched.into_iter().flatten().collect())
}

fn fetch_object(
    photometry: &dyn PhotometryService,
    row: &ObjectRow,
    options: &FetchOptions,
) -> FetchResult<Vec<LightCurve>> {
    let artifact = options
        .artifact_dir
        .as_ref()
        .map(|dir| artifact_path(dir, &row.name));

    if let Some(path) = &artifact {
        if path.is_file() {
            let file = std::fs::File::open(path)?;
            return Ok(serde_json::from_reader(file)?);
        }
    }

    let curves = options
        .retry
        .run(|| photometry.photometry(row.ra, row.dec, PHOT_RADIUS_ARCSEC))?;
    let curves: Vec<LightCurve> = curves
        .into_iter()
        .filter(|lc| lc.len() >= MIN_EPOCHS)
        .map(|lc| {
            // Surveys the photometry service tagged are kept as-is.
            let mut metadata = lc.metadata().clone();
            metadata.label = row.label.clone();
            metadata.period = row.features.get("period").and_then(|v| v.as_f64());
            metadata.score = row.features.get("significance").and_then(|v| v.as_f64());
            metadata.features = feature_vector(row);
            lc.with_metadata(metadata)
        })
        .collect();

    if let Some(path) = &artifact {
        write_artifact(path, &curves)?;
    }
    Ok(curves)
}

/// Numeric feature snapshot of a join row, in [`FEATURE_COLUMNS`] order.
///
/// Non-numeric and missing entries read as 0, so the vector shape is the
/// same for every object whatever its document carries.
pub fn feature_vector(row: &ObjectRow) -> Vec<f64> {
    FEATURE_COLUMNS
        .iter()
        .map(|&column| row.features.get(column).and_then(|v| v.as_f64()).unwrap_or(0.0))
        .collect()
}

/// Persists a join table as JSON, atomically.
pub fn write_join_table(path: &Path, rows: &[ObjectRow]) -> FetchResult<()> {
    let tmp_path = path.with_extension("json.tmp");
    let file = std::fs::File::create(&tmp_path)?;
    serde_json::to_writer_pretty(&file, rows)?;
    file.sync_all()?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Loads a previously persisted join table, so a rerun picks up where the
/// database queries left off.
pub fn read_join_table(path: &Path) -> FetchResult<Vec<ObjectRow>> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

/// Artifact file path for an object name.
pub fn artifact_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.json"))
}

fn write_artifact(path: &Path, curves: &[LightCurve]) -> FetchResult<()> {
    let tmp_path = path.with_extension("json.tmp");
    let file = std::fs::File::create(&tmp_path)?;
    serde_json::to_writer(&file, curves)?;
    file.sync_all()?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
