//! Uniform source table shared by every catalog format.
//!
//! All readers normalize into [`SourceRecord`], whatever their input
//! schema. A [`SourceTable`] owns its records arena-style; rows reference
//! each other only by index.

use anyhow::{bail, Result};

/// Classification value for rows no reader or enrichment pass labeled.
pub const CLASS_UNKNOWN: &str = "unknown";
/// Classification value after an enrichment query found no counterpart.
pub const CLASS_UNMATCHED: &str = "N/A";

/// One catalog row in the uniform output schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    /// Object identifier; synthesized from the sky position when the
    /// input format carries none.
    pub name: String,
    /// Numeric source id within the survey database, 0 when absent.
    pub objid: i64,
    /// Right ascension in degrees, [0, 360).
    pub ra: f64,
    /// Declination in degrees, [-90, 90].
    pub dec: f64,
    /// Best-fit period in days, if the catalog reports one.
    pub period: Option<f64>,
    /// Detection significance; doubles as the ordering key for ranks.
    pub sig: f64,
    /// Apparent magnitude, NaN when unknown.
    pub mag: f64,
    /// Classification label; [`CLASS_UNKNOWN`] or [`CLASS_UNMATCHED`]
    /// sentinels when no label applies.
    pub classification: String,
    /// Index of the originating shard within its catalog directory.
    pub catnum: u32,
    /// Fractional significance rank within the full table, NaN until
    /// [`SourceTable::compute_rank`] runs.
    pub rank: f64,
}

impl SourceRecord {
    /// Validates the position invariants: ra in [0, 360), dec in [-90, 90].
    pub fn validate(&self) -> Result<()> {
        if !(0.0..360.0).contains(&self.ra) {
            bail!("RA out of range for {}: {}", self.name, self.ra);
        }
        if !(-90.0..=90.0).contains(&self.dec) {
            bail!("Dec out of range for {}: {}", self.name, self.dec);
        }
        Ok(())
    }
}

/// Ordered collection of [`SourceRecord`] sharing the uniform schema.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    records: Vec<SourceRecord>,
}

impl SourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from validated records.
    ///
    /// # Errors
    /// Returns an error if any record violates the position invariants.
    pub fn from_records(records: Vec<SourceRecord>) -> Result<Self> {
        for record in &records {
            record.validate()?;
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SourceRecord> {
        self.records.get(index)
    }

    /// Appends another table's records, preserving both orders.
    pub fn extend(&mut self, other: SourceTable) {
        self.records.extend(other.records);
    }

    /// Removes records whose name was already seen, keeping the first
    /// occurrence. With shards concatenated newest-first this keeps the
    /// latest reprocessing of each object. Returns the number removed.
    pub fn dedup_by_name(&mut self) -> usize {
        let mut seen = std::collections::HashSet::with_capacity(self.records.len());
        let before = self.records.len();
        self.records.retain(|r| seen.insert(r.name.clone()));
        before - self.records.len()
    }

    /// Fills the `rank` column: each record's fractional position in
    /// ascending significance order, `1/n` for the lowest significance and
    /// 1 for the highest. Ranks are strictly positive so rank ratios stay
    /// finite. Used to break cross-match ties.
    pub fn compute_rank(&mut self) {
        let n = self.records.len();
        if n == 0 {
            return;
        }
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&i, &j| {
            self.records[i]
                .sig
                .partial_cmp(&self.records[j].sig)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (position, &row) in order.iter().enumerate() {
            self.records[row].rank = (position + 1) as f64 / n as f64;
        }
    }

    pub(crate) fn records_mut(&mut self) -> &mut Vec<SourceRecord> {
        &mut self.records
    }
}

/// Convenience constructor used across the catalog readers and tests.
pub(crate) fn make_record(name: impl Into<String>, ra: f64, dec: f64) -> SourceRecord {
    SourceRecord {
        name: name.into(),
        objid: 0,
        ra,
        dec,
        period: None,
        sig: 0.0,
        mag: f64::NAN,
        classification: CLASS_UNKNOWN.to_string(),
        catnum: 0,
        rank: f64::NAN,
    }
}
