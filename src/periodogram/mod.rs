//! Period searching.
//!
//! A search evaluates one or more power statistics over a baseline-derived
//! [`FrequencyGrid`], masking known contamination bands inside the search
//! itself, and collects the spectra into a per-object [`Periodogram`]. The
//! [`runner`] module batches searches over many objects with per-object
//! result caching.

pub mod aov;
pub mod backend;
pub mod gls;
pub mod grid;
pub mod runner;

pub use backend::{searcher, Algorithm, ComputeBackend, CpuSearch, PeriodSearch};
pub use grid::{FrequencyGrid, SearchMode, SAMPLES_PER_PEAK};
pub use runner::{run_batch, AlgorithmPeak, BatchSummary, PeriodResult, RunnerConfig};

use serde::{Deserialize, Serialize};

/// Frequency bands dominated by terrestrial and sampling artifacts,
/// cycles per day. Masked out of every search by default: sidereal-day
/// aliases at the integers, their high harmonics near 46-48, and the
/// window-function band around half a cycle per day.
pub const TERRESTRIAL_BANDS: [[f64; 2]; 9] = [
    [0.03, 0.04],
    [47.99, 48.01],
    [46.99, 47.01],
    [45.99, 46.01],
    [3.95, 4.05],
    [2.95, 3.05],
    [1.95, 2.05],
    [0.95, 1.05],
    [0.48, 0.52],
];

/// Whether a frequency falls inside any of the given bands.
pub fn in_bands(freq: f64, bands: &[[f64; 2]]) -> bool {
    bands.iter().any(|&[lo, hi]| (lo..=hi).contains(&freq))
}

/// Whether a frequency falls in a terrestrial contamination band.
pub fn in_terrestrial_band(freq: f64) -> bool {
    in_bands(freq, &TERRESTRIAL_BANDS)
}

/// One algorithm's power array over a shared frequency grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    pub algorithm: Algorithm,
    /// Power per grid frequency; masked bins carry zero.
    pub powers: Vec<f64>,
}

/// Power spectra for one object: the frequency grid, one power array per
/// algorithm, and the light curve the search ran on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Periodogram {
    pub name: String,
    pub ra: f64,
    pub dec: f64,
    /// Survey filter id of the searched curve.
    pub filter: u32,
    pub baseline_days: f64,
    pub grid: FrequencyGrid,
    pub spectra: Vec<Spectrum>,
}

impl Periodogram {
    /// The spectrum one algorithm produced, if it ran.
    pub fn spectrum(&self, algorithm: Algorithm) -> Option<&Spectrum> {
        self.spectra.iter().find(|s| s.algorithm == algorithm)
    }
}

/// Strongest peak of one power spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Peak frequency, cycles per day.
    pub frequency: f64,
    /// `1 / frequency`, days.
    pub period: f64,
    /// Power at the peak.
    pub power: f64,
    /// Peak height in standard deviations above the mean power.
    pub significance: f64,
}

/// Finds the strongest peak of a spectrum.
///
/// Masked bins carry zero power and never qualify; significance is
/// measured against the unmasked remainder of the spectrum. Returns `None`
/// when no bin carries power, i.e. the whole grid was masked or the curve
/// was constant.
pub fn best_peak(grid: &FrequencyGrid, powers: &[f64]) -> Option<Peak> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &p) in powers.iter().enumerate() {
        if p <= 0.0 {
            continue;
        }
        if best.map_or(true, |(_, bp)| p > bp) {
            best = Some((i, p));
        }
    }
    let (i, power) = best?;

    let unmasked: Vec<f64> = powers.iter().copied().filter(|&p| p > 0.0).collect();
    let n = unmasked.len() as f64;
    let mean: f64 = unmasked.iter().sum::<f64>() / n;
    let var: f64 = unmasked.iter().map(|&p| (p - mean) * (p - mean)).sum::<f64>() / n;
    let std = libm::sqrt(var);
    let significance = if std > 0.0 { (power - mean).abs() / std } else { 0.0 };

    let frequency = grid.frequency(i);
    Some(Peak {
        frequency,
        period: 1.0 / frequency,
        power,
        significance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terrestrial_band_membership() {
        assert!(in_terrestrial_band(1.0));
        assert!(in_terrestrial_band(0.5));
        assert!(in_terrestrial_band(48.0));
        assert!(in_terrestrial_band(3.0));
        assert!(!in_terrestrial_band(1.5));
        assert!(!in_terrestrial_band(25.2));
        assert!(!in_terrestrial_band(0.1));
    }

    #[test]
    fn test_in_bands_takes_any_band_list() {
        let bands = [[10.0, 11.0], [20.0, 21.0]];
        assert!(in_bands(10.5, &bands));
        assert!(in_bands(20.0, &bands));
        assert!(!in_bands(15.0, &bands));
        assert!(!in_bands(1.0, &bands));
    }

    #[test]
    fn test_best_peak_ignores_masked_bins() {
        let grid = FrequencyGrid {
            fmin: 0.9,
            df: 0.1,
            nf: 10,
        };
        // Bin 1 (1.0 c/d) was masked by the search; the clean 1.4 c/d bin
        // must win.
        let mut powers = vec![0.1; 10];
        powers[1] = 0.0;
        powers[5] = 0.6;

        let peak = best_peak(&grid, &powers).unwrap();
        assert!((peak.frequency - 1.4).abs() < 1e-12);
        assert_eq!(peak.power, 0.6);
        assert!((peak.period - 1.0 / 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_best_peak_fully_masked_spectrum() {
        let grid = FrequencyGrid {
            fmin: 2.95,
            df: 0.01,
            nf: 5,
        };
        assert!(best_peak(&grid, &[0.0; 5]).is_none());
    }

    #[test]
    fn test_significance_grows_with_peak_height() {
        let grid = FrequencyGrid {
            fmin: 10.0,
            df: 0.1,
            nf: 100,
        };
        let mut low = vec![0.1; 100];
        low[50] = 0.3;
        let mut high = vec![0.1; 100];
        high[50] = 0.9;

        let sig_low = best_peak(&grid, &low).unwrap().significance;
        let sig_high = best_peak(&grid, &high).unwrap().significance;
        assert!(sig_high > sig_low);
    }

    #[test]
    fn test_significance_ignores_masked_bins() {
        let grid = FrequencyGrid {
            fmin: 10.0,
            df: 0.1,
            nf: 100,
        };
        let mut clean = vec![0.1; 100];
        clean[50] = 0.9;
        let mut masked = clean.clone();
        for p in masked.iter_mut().take(40) {
            *p = 0.0;
        }

        // Zeroed bins are excluded from the mean and std, not averaged in.
        let sig_clean = best_peak(&grid, &clean).unwrap().significance;
        let sig_masked = best_peak(&grid, &masked).unwrap().significance;
        assert!(sig_masked > 3.0, "sig = {sig_masked}");
        assert!((sig_clean - sig_masked).abs() / sig_clean < 0.3);
    }

    #[test]
    fn test_flat_spectrum_zero_significance() {
        let grid = FrequencyGrid {
            fmin: 10.0,
            df: 0.1,
            nf: 20,
        };
        assert_eq!(best_peak(&grid, &[0.2; 20]).unwrap().significance, 0.0);
    }
}
