//! Whitespace-delimited catalog readers.
//!
//! Two text layouts flow through here: reference catalogs, whose column
//! set depends on their [`ReferenceFamily`], and survey shards with the
//! fixed 44-column feature layout. Each reference line parses into a
//! tagged [`ReferenceRow`] first and is normalized into the uniform
//! [`SourceRecord`] schema at the boundary.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::family::ReferenceFamily;
use super::table::{make_record, SourceRecord, SourceTable};
use crate::coords::synthesize_name;

/// Positional error assumed for catalogs that do not report one, arcsec.
const DEFAULT_ERR_ARCSEC: f64 = 5.0;
/// Number of feature-statistics columns in a survey shard.
pub(crate) const SHARD_STATS_COLUMNS: usize = 36;
/// Full survey shard column count: name, objid, ra, dec, period, sig,
/// pdot, filt plus the statistics vector.
pub(crate) const SHARD_COLUMNS: usize = 8 + SHARD_STATS_COLUMNS;

/// One parsed line of a reference catalog, tagged by family.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceRow {
    PositionOnly {
        ra: f64,
        dec: f64,
    },
    Crts {
        name: String,
        ra: f64,
        dec: f64,
        period: f64,
        classification: String,
    },
    Vlss {
        name: String,
        ra: f64,
        dec: f64,
        err_arcsec: f64,
    },
    Fermi {
        name: String,
        ra: f64,
        dec: f64,
        amaj: f64,
        amin: f64,
        phi: f64,
    },
    Xray {
        name: String,
        ra: f64,
        dec: f64,
        err_arcsec: f64,
    },
    Generic {
        name: String,
        ra: f64,
        dec: f64,
    },
}

impl ReferenceRow {
    /// Parses one whitespace-delimited line according to `family`.
    pub fn parse(family: ReferenceFamily, line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match family {
            ReferenceFamily::PositionOnly => Ok(Self::PositionOnly {
                ra: field_f64(&fields, 0)?,
                dec: field_f64(&fields, 1)?,
            }),
            ReferenceFamily::Crts => Ok(Self::Crts {
                name: field_str(&fields, 0)?,
                ra: field_f64(&fields, 1)?,
                dec: field_f64(&fields, 2)?,
                period: field_f64(&fields, 3)?,
                classification: field_str(&fields, 4)?,
            }),
            ReferenceFamily::Vlss => {
                let e1 = field_f64(&fields, 3)?;
                let e2 = field_f64(&fields, 4)?;
                Ok(Self::Vlss {
                    name: field_str(&fields, 0)?,
                    ra: field_f64(&fields, 1)?,
                    dec: field_f64(&fields, 2)?,
                    err_arcsec: libm::sqrt(e1 * e1 + e2 * e2) * 3600.0,
                })
            }
            ReferenceFamily::Fermi => Ok(Self::Fermi {
                name: field_str(&fields, 0)?,
                ra: field_f64(&fields, 1)?,
                dec: field_f64(&fields, 2)?,
                amaj: field_f64(&fields, 3)?,
                amin: field_f64(&fields, 4)?,
                phi: field_f64(&fields, 5)?,
            }),
            ReferenceFamily::Xray => Ok(Self::Xray {
                name: field_str(&fields, 0)?,
                ra: field_f64(&fields, 1)?,
                dec: field_f64(&fields, 2)?,
                err_arcsec: field_f64(&fields, 3)?,
            }),
            ReferenceFamily::Generic => Ok(Self::Generic {
                name: field_str(&fields, 0)?,
                ra: field_f64(&fields, 1)?,
                dec: field_f64(&fields, 2)?,
            }),
        }
    }

    /// Positional uncertainty of this row, arcseconds.
    pub fn positional_error_arcsec(&self) -> f64 {
        match self {
            Self::Vlss { err_arcsec, .. } | Self::Xray { err_arcsec, .. } => *err_arcsec,
            Self::Fermi { amaj, amin, .. } => libm::sqrt(amaj * amaj + amin * amin) * 3600.0,
            Self::PositionOnly { .. } | Self::Crts { .. } | Self::Generic { .. } => {
                DEFAULT_ERR_ARCSEC
            }
        }
    }

    /// Normalizes into the uniform output schema. Rows without a name get
    /// one synthesized from the sky position.
    pub fn normalize(self) -> SourceRecord {
        match self {
            Self::PositionOnly { ra, dec } => make_record(synthesize_name(ra, dec), ra, dec),
            Self::Crts {
                name,
                ra,
                dec,
                period,
                classification,
            } => {
                let mut r = make_record(name, ra, dec);
                r.period = Some(period);
                r.classification = classification;
                r
            }
            Self::Vlss { name, ra, dec, .. }
            | Self::Fermi { name, ra, dec, .. }
            | Self::Xray { name, ra, dec, .. }
            | Self::Generic { name, ra, dec } => make_record(name, ra, dec),
        }
    }
}

/// Reads a plain-text reference catalog into the uniform table.
///
/// The column family is detected once from the file name. Malformed lines
/// are an error for the whole file.
pub fn read_reference_text(path: &Path) -> Result<SourceTable> {
    let family = ReferenceFamily::from_path(path);
    let file =
        File::open(path).with_context(|| format!("Failed to open reference catalog: {path:?}"))?;

    let mut records = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = ReferenceRow::parse(family, &line)
            .with_context(|| format!("{path:?} line {}", lineno + 1))?;
        records.push(row.normalize());
    }
    SourceTable::from_records(records)
}

/// Reads a whitespace-delimited survey shard (44-column feature layout).
pub fn read_text_shard(path: &Path) -> Result<SourceTable> {
    let file = File::open(path).with_context(|| format!("Failed to open shard: {path:?}"))?;

    let mut records = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record =
            parse_shard_line(&line).with_context(|| format!("{path:?} line {}", lineno + 1))?;
        records.push(record);
    }
    SourceTable::from_records(records)
}

fn parse_shard_line(line: &str) -> Result<SourceRecord> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != SHARD_COLUMNS {
        bail!("Expected {} columns, got {}", SHARD_COLUMNS, fields.len());
    }
    let mut record = make_record(field_str(&fields, 0)?, field_f64(&fields, 2)?, field_f64(&fields, 3)?);
    record.objid = fields[1].parse().with_context(|| format!("Bad objid: {}", fields[1]))?;
    record.period = Some(field_f64(&fields, 4)?);
    record.sig = field_f64(&fields, 5)?;
    Ok(record)
}

fn field_str(fields: &[&str], index: usize) -> Result<String> {
    fields
        .get(index)
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Missing column {index}"))
}

fn field_f64(fields: &[&str], index: usize) -> Result<f64> {
    let raw = fields
        .get(index)
        .ok_or_else(|| anyhow::anyhow!("Missing column {index}"))?;
    raw.parse()
        .with_context(|| format!("Bad numeric value in column {index}: {raw}"))
}
