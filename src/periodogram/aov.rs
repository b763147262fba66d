//! Phase-binned analysis of variance.
//!
//! Schwarzenberg-Czerny (1989) statistic: fold the curve at each trial
//! frequency, bin the phases, and compare the between-bin scatter of the
//! bin means against the within-bin scatter. Periodic signals concentrate
//! variance between bins and score high.

use anyhow::{bail, Result};
use rayon::prelude::*;

use super::grid::FrequencyGrid;
use super::in_bands;
use crate::lightcurve::LightCurve;

/// Number of phase bins per folded curve.
pub(crate) const PHASE_BINS: usize = 10;

/// AOV statistic at every grid frequency, in grid order. Frequencies
/// inside any `exclude` band are masked to zero power.
pub(crate) fn powers(lc: &LightCurve, grid: &FrequencyGrid, exclude: &[[f64; 2]]) -> Result<Vec<f64>> {
    if lc.len() <= PHASE_BINS {
        bail!(
            "Need more than {PHASE_BINS} epochs for the analysis of variance, got {}",
            lc.len()
        );
    }

    let times = lc.times();
    let mags = lc.mags();
    let n = times.len();
    let mean: f64 = mags.iter().sum::<f64>() / n as f64;

    let powers = (0..grid.nf)
        .into_par_iter()
        .map(|i| {
            let freq = grid.frequency(i);
            if in_bands(freq, exclude) {
                return 0.0;
            }
            let mut sums = [0.0_f64; PHASE_BINS];
            let mut squares = [0.0_f64; PHASE_BINS];
            let mut counts = [0_usize; PHASE_BINS];
            for j in 0..n {
                let phase = (times[j] * freq).fract();
                let phase = if phase < 0.0 { phase + 1.0 } else { phase };
                let bin = ((phase * PHASE_BINS as f64) as usize).min(PHASE_BINS - 1);
                sums[bin] += mags[j];
                squares[bin] += mags[j] * mags[j];
                counts[bin] += 1;
            }

            let mut between = 0.0;
            let mut within = 0.0;
            let mut occupied = 0_usize;
            for b in 0..PHASE_BINS {
                if counts[b] == 0 {
                    continue;
                }
                occupied += 1;
                let nb = counts[b] as f64;
                let bin_mean = sums[b] / nb;
                between += nb * (bin_mean - mean) * (bin_mean - mean);
                within += squares[b] - nb * bin_mean * bin_mean;
            }
            if occupied < 2 || within <= 0.0 {
                return 0.0;
            }
            let s1 = between / (occupied - 1) as f64;
            let s2 = within / (n - occupied) as f64;
            s1 / s2
        })
        .collect();
    Ok(powers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use libm::sin;

    fn sinusoid(freq: f64, n: usize, span_days: f64) -> LightCurve {
        let phi = 0.618_033_988_75_f64;
        let times: Vec<f64> = (0..n)
            .map(|i| ((i as f64 * phi) % 1.0) * span_days)
            .collect();
        let mags: Vec<f64> = times
            .iter()
            .map(|&t| 17.0 + 0.3 * sin(2.0 * std::f64::consts::PI * freq * t))
            .collect();
        LightCurve::new("test", 10.0, 20.0, 2, times, mags, vec![0.02; n]).unwrap()
    }

    #[test]
    fn test_recovers_injected_frequency() {
        let f0 = 3.6;
        let lc = sinusoid(f0, 400, 20.0);
        let grid = FrequencyGrid {
            fmin: 3.0,
            df: 0.005,
            nf: 400,
        };

        let powers = powers(&lc, &grid, &[]).unwrap();
        let best = powers
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap()
            .0;
        assert!(
            (grid.frequency(best) - f0).abs() <= 2.0 * grid.df,
            "best = {}",
            grid.frequency(best)
        );
    }

    #[test]
    fn test_excluded_bands_are_masked_to_zero() {
        let lc = sinusoid(3.6, 200, 20.0);
        let grid = FrequencyGrid {
            fmin: 3.0,
            df: 0.01,
            nf: 100,
        };
        let powers = powers(&lc, &grid, &[[3.0, 5.0]]).unwrap();
        assert_eq!(powers, vec![0.0; 100]);
    }

    #[test]
    fn test_constant_curve_zero_power() {
        let n = 100;
        let times: Vec<f64> = (0..n).map(|i| i as f64 * 0.13).collect();
        let lc =
            LightCurve::new("flat", 0.0, 0.0, 1, times, vec![17.0; n], vec![0.02; n]).unwrap();
        let grid = FrequencyGrid {
            fmin: 1.0,
            df: 0.1,
            nf: 10,
        };
        assert_eq!(powers(&lc, &grid, &[]).unwrap(), vec![0.0; 10]);
    }

    #[test]
    fn test_too_few_epochs() {
        let n = PHASE_BINS;
        let times: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let lc =
            LightCurve::new("x", 0.0, 0.0, 1, times, vec![17.0; n], vec![0.02; n]).unwrap();
        let grid = FrequencyGrid {
            fmin: 1.0,
            df: 0.1,
            nf: 10,
        };
        assert!(powers(&lc, &grid, &[]).is_err());
    }
}
