//! Sky cross-matching between source tables.
//!
//! Matches every row of a primary table against the nearest counterpart in
//! a secondary table, under an angular threshold and per-table
//! significance floors. The secondary table is bucketed into a HEALPix
//! [`SkyIndex`] so each lookup touches a handful of pixels.

pub mod healpix;
pub mod index;

pub use index::SkyIndex;

use anyhow::{Context, Result};
use libm::cos;
use std::io::Write;
use std::path::Path;

use crate::catalog::{SourceRecord, SourceTable};

/// HEALPix order of the match index; ~3.4 arcmin pixels.
pub const DEFAULT_INDEX_ORDER: u32 = 10;

/// How the secondary table is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Both tables come from survey processing: the secondary significance
    /// floor applies and matches carry the significance-rank ratio.
    SurveyPair,
    /// The secondary is an external reference catalog: no significance
    /// floor on its rows, and the rank ratio is pinned to 1.
    Reference,
}

/// Cross-match tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct CrossMatchParams {
    /// Maximum separation for a match, arcseconds.
    pub radius_arcsec: f64,
    /// Minimum significance for a primary row to be matched at all.
    pub min_sig_primary: f64,
    /// Minimum significance for a secondary row to count as a counterpart.
    /// Ignored in [`MatchMode::Reference`].
    pub min_sig_secondary: f64,
    pub mode: MatchMode,
    /// HEALPix order of the secondary index.
    pub index_order: u32,
}

impl Default for CrossMatchParams {
    fn default() -> Self {
        Self {
            radius_arcsec: 2.0,
            min_sig_primary: 0.0,
            min_sig_secondary: 0.0,
            mode: MatchMode::SurveyPair,
            index_order: DEFAULT_INDEX_ORDER,
        }
    }
}

/// One matched pair in the output table.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossMatch {
    /// Primary row name.
    pub name: String,
    pub ra: f64,
    pub dec: f64,
    pub match_ra: f64,
    pub match_dec: f64,
    /// RA offset to the counterpart, arcsec on the sky (cos dec applied).
    pub dra_arcsec: f64,
    /// Dec offset to the counterpart, arcsec.
    pub ddec_arcsec: f64,
    pub separation_arcsec: f64,
    pub period: Option<f64>,
    pub match_period: Option<f64>,
    pub sig: f64,
    pub match_sig: f64,
    /// `min(rank_a/rank_b, rank_b/rank_a)`; 1 in reference mode.
    pub rank_ratio: f64,
    /// Counterpart magnitude, NaN when unknown.
    pub mag: f64,
    /// Counterpart classification label.
    pub classification: String,
}

/// Matches `primary` rows against the nearest `secondary` counterpart.
///
/// Rows below the primary significance floor are skipped. The counterpart
/// is always the nearest secondary row within the radius, found before any
/// significance cut: in [`MatchMode::SurveyPair`] a nearest row below the
/// secondary floor disqualifies the pair rather than deferring to a
/// farther above-floor row. At most one match per primary row, ordered as
/// the primary table is.
pub fn crossmatch(
    primary: &SourceTable,
    secondary: &SourceTable,
    params: &CrossMatchParams,
) -> Vec<CrossMatch> {
    let index = SkyIndex::build(secondary, params.index_order);

    let mut matches = Vec::new();
    for record in primary.records() {
        if record.sig < params.min_sig_primary {
            continue;
        }
        let Some((row, sep)) =
            index.nearest(secondary, record.ra, record.dec, params.radius_arcsec)
        else {
            continue;
        };
        let counterpart = &secondary.records()[row];
        if params.mode == MatchMode::SurveyPair && counterpart.sig < params.min_sig_secondary {
            continue;
        }
        matches.push(build_match(record, counterpart, sep, params.mode));
    }
    matches
}

fn build_match(
    primary: &SourceRecord,
    counterpart: &SourceRecord,
    separation_arcsec: f64,
    mode: MatchMode,
) -> CrossMatch {
    let rank_ratio = match mode {
        MatchMode::Reference => 1.0,
        MatchMode::SurveyPair => {
            let a = primary.rank / counterpart.rank;
            let b = counterpart.rank / primary.rank;
            a.min(b)
        }
    };
    let cos_dec = cos(primary.dec * std::f64::consts::PI / 180.0);
    CrossMatch {
        name: primary.name.clone(),
        ra: primary.ra,
        dec: primary.dec,
        match_ra: counterpart.ra,
        match_dec: counterpart.dec,
        dra_arcsec: (counterpart.ra - primary.ra) * cos_dec * 3600.0,
        ddec_arcsec: (counterpart.dec - primary.dec) * 3600.0,
        separation_arcsec,
        period: primary.period,
        match_period: counterpart.period,
        sig: primary.sig,
        match_sig: counterpart.sig,
        rank_ratio,
        mag: counterpart.mag,
        classification: counterpart.classification.clone(),
    }
}

/// Writes matches as a whitespace-delimited table.
///
/// The file appears atomically: content goes to a temporary sibling first
/// and is renamed into place, so readers never see a partial table.
pub fn write_matches(path: &Path, matches: &[CrossMatch]) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    {
        let mut file = std::fs::File::create(&tmp_path)
            .with_context(|| format!("Failed to create match table: {:?}", tmp_path))?;
        writeln!(
            file,
            "# name ra dec match_ra match_dec dra ddec sep period match_period sig match_sig ratio mag classification"
        )?;
        writeln!(
            file,
            "# dra and ddec are on-sky offsets in arcsec; dra carries the cos(dec) factor"
        )?;
        for m in matches {
            writeln!(
                file,
                "{} {:.8} {:.8} {:.8} {:.8} {:.4} {:.4} {:.4} {} {} {:.4} {:.4} {:.6} {:.3} {}",
                m.name,
                m.ra,
                m.dec,
                m.match_ra,
                m.match_dec,
                m.dra_arcsec,
                m.ddec_arcsec,
                m.separation_arcsec,
                m.period.map_or("-".to_string(), |p| format!("{p:.8}")),
                m.match_period.map_or("-".to_string(), |p| format!("{p:.8}")),
                m.sig,
                m.match_sig,
                m.rank_ratio,
                m.mag,
                m.classification,
            )?;
        }
        file.flush()?;
    }
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move match table into place: {:?}", path))?;
    Ok(())
}
