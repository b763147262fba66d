//! Photometric light curves.
//!
//! The three columns of a [`LightCurve`] are immutable after construction:
//! they are validated to the same length once, so every consumer can index
//! them in lockstep without re-checking. Training metadata — the selected
//! label, the database period and score, and a feature snapshot — is
//! attached separately via [`CurveMetadata`] once the curve has been
//! joined against the survey database.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum epoch count for a light curve to be worth analyzing.
pub const MIN_EPOCHS: usize = 50;

pub type LightCurveResult<T> = Result<T, LightCurveError>;

#[derive(Debug, Error)]
pub enum LightCurveError {
    #[error("Mismatched columns for {name}: {times} times, {mags} magnitudes, {errors} errors")]
    MismatchedColumns {
        name: String,
        times: usize,
        mags: usize,
        errors: usize,
    },

    #[error("Light curve for {name} has {epochs} epochs, need at least {min}")]
    TooFewEpochs {
        name: String,
        epochs: usize,
        min: usize,
    },
}

/// Training metadata carried by a fetched curve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveMetadata {
    /// Originating survey, when the photometry source reports one.
    pub survey: Option<String>,
    /// Unanimous training label, if the classifiers agreed on one.
    pub label: Option<String>,
    /// Best-fit period from the feature database, days.
    pub period: Option<f64>,
    /// Detection score from the feature database.
    pub score: Option<f64>,
    /// Fixed-shape numeric feature snapshot, one entry per feature column.
    pub features: Vec<f64>,
}

/// One object's photometric time series in a single filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightCurve {
    name: String,
    ra: f64,
    dec: f64,
    /// Survey filter id the photometry was taken in.
    filter: u32,
    #[serde(default)]
    metadata: CurveMetadata,
    /// Observation times, heliocentric Julian days.
    times: Vec<f64>,
    mags: Vec<f64>,
    errors: Vec<f64>,
}

impl LightCurve {
    /// Builds a light curve, validating that all columns agree in length.
    pub fn new(
        name: impl Into<String>,
        ra: f64,
        dec: f64,
        filter: u32,
        times: Vec<f64>,
        mags: Vec<f64>,
        errors: Vec<f64>,
    ) -> LightCurveResult<Self> {
        let name = name.into();
        if times.len() != mags.len() || times.len() != errors.len() {
            return Err(LightCurveError::MismatchedColumns {
                name,
                times: times.len(),
                mags: mags.len(),
                errors: errors.len(),
            });
        }
        Ok(Self {
            name,
            ra,
            dec,
            filter,
            metadata: CurveMetadata::default(),
            times,
            mags,
            errors,
        })
    }

    /// Replaces the training metadata, consuming and returning the curve.
    pub fn with_metadata(mut self, metadata: CurveMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn metadata(&self) -> &CurveMetadata {
        &self.metadata
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ra(&self) -> f64 {
        self.ra
    }

    pub fn dec(&self) -> f64 {
        self.dec
    }

    pub fn filter(&self) -> u32 {
        self.filter
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn mags(&self) -> &[f64] {
        &self.mags
    }

    pub fn errors(&self) -> &[f64] {
        &self.errors
    }

    /// Number of epochs.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Errors unless the curve has at least [`MIN_EPOCHS`] epochs.
    pub fn require_min_epochs(&self, min: usize) -> LightCurveResult<()> {
        if self.len() < min {
            return Err(LightCurveError::TooFewEpochs {
                name: self.name.clone(),
                epochs: self.len(),
                min,
            });
        }
        Ok(())
    }

    /// Observation time span in days, 0 for fewer than two epochs.
    pub fn baseline_days(&self) -> f64 {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &t in &self.times {
            min = min.min(t);
            max = max.max(t);
        }
        if self.times.len() < 2 {
            0.0
        } else {
            max - min
        }
    }
}
