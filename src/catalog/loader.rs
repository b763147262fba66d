//! Survey catalog directory loader.
//!
//! A catalog directory holds one shard per processed field chunk, text or
//! binary, named `<field>_<num>` with the chunk index trailing the stem.
//! Shards are concatenated in reverse-lexicographic name order so that
//! later reprocessings land first and win the per-name dedup pass, then
//! the significance rank column is filled over the combined table.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use super::binary::read_binary_shard;
use super::table::{SourceTable, CLASS_UNKNOWN, CLASS_UNMATCHED};
use super::text::read_text_shard;
use crate::coords::angular_separation_arcsec;
use crate::retry::Retry;

/// Match radius for classification enrichment queries, arcseconds.
pub const ENRICH_RADIUS_ARCSEC: f64 = 2.0;

/// One classification counterpart returned by an [`ObjectTypeService`].
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTypeMatch {
    pub ra: f64,
    pub dec: f64,
    /// Object-type label, e.g. `"EB*"` or `"RRLyr"`.
    pub otype: String,
}

/// Remote object-type lookup, queried in one batch per table.
pub trait ObjectTypeService {
    /// Returns counterparts within `radius_arcsec` of any queried position.
    /// The result is not ordered and may contain fewer or more entries than
    /// `positions`.
    fn query_object_types(
        &self,
        positions: &[(f64, f64)],
        radius_arcsec: f64,
    ) -> Result<Vec<ObjectTypeMatch>>;
}

/// Controls shard selection and remote-query behavior for a directory load.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Keep only shards whose file stem starts with `<field>_`.
    pub field: Option<String>,
    /// Retry policy for enrichment queries.
    pub retry: Retry,
}

/// Reads one shard, dispatching on the file extension: `.bin` is the
/// memory-mapped binary layout, anything else the whitespace text layout.
pub fn read_shard(path: &Path) -> Result<SourceTable> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("bin") => read_binary_shard(path),
        _ => read_text_shard(path),
    }
}

/// Loads every shard of a catalog directory into one uniform table.
///
/// Malformed shards are reported and skipped rather than failing the whole
/// load. After concatenation the table is deduplicated by name (first
/// occurrence wins, i.e. the newest shard) and the rank column is filled.
/// With an object-type service supplied, the classification column is then
/// enriched under `options.retry`.
pub fn load_catalog_dir(
    dir: &Path,
    options: &LoadOptions,
    object_types: Option<&dyn ObjectTypeService>,
) -> Result<SourceTable> {
    let shards = enumerate_shards(dir, options.field.as_deref())?;

    let bar = ProgressBar::new(shards.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message("Loading shards");

    let mut table = SourceTable::new();
    for shard in &shards {
        match load_one_shard(shard) {
            Ok(part) => table.extend(part),
            Err(err) => eprintln!("Warning: skipping shard {:?}: {:#}", shard, err),
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    let removed = table.dedup_by_name();
    if removed > 0 {
        eprintln!("Dropped {removed} duplicate sources from older shards");
    }
    table.compute_rank();
    if let Some(service) = object_types {
        enrich_object_types(&mut table, service, &options.retry)?;
    }
    Ok(table)
}

fn load_one_shard(path: &Path) -> Result<SourceTable> {
    let catnum = shard_number(path);
    let mut part = read_shard(path)?;
    for record in part.records_mut() {
        record.catnum = catnum;
    }
    Ok(part)
}

/// Enumerates shard files under `dir` in reverse-lexicographic name order.
///
/// Magnitude sidecars (`*_mag.bin`) belong to their shard and are not
/// shards themselves.
pub fn enumerate_shards(dir: &Path, field: Option<&str>) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read catalog directory: {:?}", dir))?;

    let mut shards = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem.ends_with("_mag") {
            continue;
        }
        if let Some(field) = field {
            if !stem.starts_with(&format!("{field}_")) {
                continue;
            }
        }
        shards.push(path);
    }
    shards.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
    Ok(shards)
}

/// Chunk index parsed from the trailing `_<num>` of a shard stem, 0 when
/// the stem carries none.
pub fn shard_number(path: &Path) -> u32 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|stem| stem.rsplit('_').next())
        .and_then(|tail| tail.parse().ok())
        .unwrap_or(0)
}

/// Fills the classification column from a remote object-type lookup.
///
/// The service is queried once for the whole table; each returned
/// counterpart labels the nearest table row within
/// [`ENRICH_RADIUS_ARCSEC`]. Rows still unlabeled afterwards are marked
/// [`CLASS_UNMATCHED`] so downstream consumers can tell "queried, no
/// counterpart" from "never queried". A query that still fails after
/// retries is reported and leaves the table unenriched.
pub fn enrich_object_types(
    table: &mut SourceTable,
    service: &dyn ObjectTypeService,
    retry: &Retry,
) -> Result<()> {
    if table.is_empty() {
        return Ok(());
    }
    let positions: Vec<(f64, f64)> = table.records().iter().map(|r| (r.ra, r.dec)).collect();
    let matches = match retry.run(|| service.query_object_types(&positions, ENRICH_RADIUS_ARCSEC)) {
        Ok(matches) => matches,
        Err(err) => {
            eprintln!("Warning: object-type enrichment failed, proceeding unenriched: {err:#}");
            return Ok(());
        }
    };

    let records = table.records_mut();
    for m in &matches {
        let mut best: Option<(usize, f64)> = None;
        for (i, record) in records.iter().enumerate() {
            let sep = angular_separation_arcsec(record.ra, record.dec, m.ra, m.dec);
            if sep <= ENRICH_RADIUS_ARCSEC && best.map_or(true, |(_, d)| sep < d) {
                best = Some((i, sep));
            }
        }
        if let Some((i, _)) = best {
            records[i].classification = m.otype.clone();
        }
    }
    for record in records.iter_mut() {
        if record.classification == CLASS_UNKNOWN {
            record.classification = CLASS_UNMATCHED.to_string();
        }
    }
    Ok(())
}
