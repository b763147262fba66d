//! Period-search algorithms and compute backends.
//!
//! The [`PeriodSearch`] seam takes the algorithm to run and the frequency
//! bands to mask, so callers configure a search without caring where the
//! powers are computed.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::grid::FrequencyGrid;
use super::{aov, gls};
use crate::lightcurve::LightCurve;

/// Period-search algorithms the batch can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Generalized Lomb-Scargle, floating mean with inverse variance
    /// weights.
    Gls,
    /// Phase-binned analysis of variance.
    Aov,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Gls => "gls",
            Algorithm::Aov => "aov",
        }
    }
}

/// Where periodogram powers are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputeBackend {
    Cpu,
    Gpu,
}

/// Power spectrum evaluation over a frequency grid.
pub trait PeriodSearch: Sync {
    /// Power at every grid frequency for one algorithm, in grid order.
    /// Frequencies inside any `exclude` band are masked to zero power
    /// rather than searched.
    fn powers(
        &self,
        algorithm: Algorithm,
        lc: &LightCurve,
        grid: &FrequencyGrid,
        exclude: &[[f64; 2]],
    ) -> Result<Vec<f64>>;
}

/// Builds the searcher for a backend.
///
/// # Errors
/// Returns an error for [`ComputeBackend::Gpu`]; no GPU path is compiled
/// into this crate.
pub fn searcher(backend: ComputeBackend) -> Result<Box<dyn PeriodSearch>> {
    match backend {
        ComputeBackend::Cpu => Ok(Box::new(CpuSearch)),
        ComputeBackend::Gpu => bail!("GPU period search is not available in this build"),
    }
}

/// Multithreaded CPU implementation of every [`Algorithm`].
pub struct CpuSearch;

impl PeriodSearch for CpuSearch {
    fn powers(
        &self,
        algorithm: Algorithm,
        lc: &LightCurve,
        grid: &FrequencyGrid,
        exclude: &[[f64; 2]],
    ) -> Result<Vec<f64>> {
        match algorithm {
            Algorithm::Gls => gls::powers(lc, grid, exclude),
            Algorithm::Aov => aov::powers(lc, grid, exclude),
        }
    }
}
