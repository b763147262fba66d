//! Frequency grid construction for period searches.
//!
//! The grid depends only on the observation baseline and the search mode;
//! two objects with the same baseline always search the same frequencies.

use anyhow::{bail, Result};
use libm::ceil;
use serde::{Deserialize, Serialize};

/// Grid oversampling relative to the natural resolution `1/baseline`.
pub const SAMPLES_PER_PEAK: f64 = 3.0;

/// Which part of frequency space a search covers, cycles per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMode {
    /// Down to periods of half a day over the full season.
    LongPeriod,
    /// Up to minute-scale periods; the ceiling depends on the baseline.
    ShortPeriod,
}

/// Uniform frequency grid `fmin + i * df` for `i` in `0..nf`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyGrid {
    /// Lowest searched frequency, cycles per day.
    pub fmin: f64,
    /// Grid spacing, cycles per day.
    pub df: f64,
    /// Number of grid points.
    pub nf: usize,
}

impl FrequencyGrid {
    /// Builds the grid for an observation baseline in days.
    ///
    /// Short-period searches over baselines under 10 days start at 18
    /// cycles/day and reach 1440 (one-minute periods); longer baselines
    /// start at `2/baseline` and stop at 480. Long-period searches always
    /// span `2/baseline` to 48. Spacing is `1/(3 * baseline)`.
    ///
    /// # Errors
    /// Returns an error for a non-positive baseline.
    pub fn for_baseline(baseline_days: f64, mode: SearchMode) -> Result<Self> {
        if !(baseline_days > 0.0) {
            bail!("Baseline must be positive, got {baseline_days}");
        }
        let (fmin, fmax) = match mode {
            SearchMode::LongPeriod => (2.0 / baseline_days, 48.0),
            SearchMode::ShortPeriod => {
                if baseline_days < 10.0 {
                    (18.0, 1440.0)
                } else {
                    (2.0 / baseline_days, 480.0)
                }
            }
        };
        let df = 1.0 / (SAMPLES_PER_PEAK * baseline_days);
        let nf = ceil((fmax - fmin) / df) as usize;
        Ok(Self { fmin, df, nf })
    }

    /// The `i`-th grid frequency.
    pub fn frequency(&self, i: usize) -> f64 {
        self.fmin + i as f64 * self.df
    }

    /// All grid frequencies, ascending.
    pub fn frequencies(&self) -> Vec<f64> {
        (0..self.nf).map(|i| self.frequency(i)).collect()
    }
}
