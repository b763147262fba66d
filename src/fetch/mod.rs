//! Remote survey-database access.
//!
//! Three service seams: the feature database (object resolution and
//! feature documents), the classifier label store, and the photometry
//! archive. Everything network-facing sits behind these traits; the rest
//! of the module is pure join and selection logic, which is what the tests
//! drive with in-memory implementations.

pub mod labels;
pub mod lightcurves;

pub use labels::{
    aggregate_votes, read_label_table, select_label, short_label, write_label_table, LabelRecord,
    LabelVote, TARGET_LABELS,
};
pub use lightcurves::{
    build_join_table, check_ingested, feature_vector, fetch_lightcurves, read_join_table,
    write_join_table, FetchOptions, ObjectRow, FEATURE_COLUMNS, PHOT_RADIUS_ARCSEC,
};

use thiserror::Error;

use crate::lightcurve::{LightCurve, LightCurveError};

pub type FetchResult<T> = Result<T, FetchError>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Remote query failed: {message}")]
    Service { message: String },

    #[error("Object {name} is not ingested in the feature database")]
    NotIngested { name: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization failed: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("Bad light curve: {source}")]
    LightCurve {
        #[from]
        source: LightCurveError,
    },
}

impl FetchError {
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
        }
    }

    pub fn not_ingested(name: impl Into<String>) -> Self {
        Self::NotIngested { name: name.into() }
    }
}

/// Feature database: object resolution and feature-document projection.
pub trait FeatureDatabase: Sync {
    /// Resolves sky positions to database object ids, `None` where no
    /// source lies within `radius_arcsec`. One entry per input position.
    fn resolve_objids(
        &self,
        positions: &[(f64, f64)],
        radius_arcsec: f64,
    ) -> FetchResult<Vec<Option<i64>>>;

    /// Feature documents for the given objects, projected to `columns`.
    /// One document per objid, in input order.
    fn features(&self, objids: &[i64], columns: &[&str]) -> FetchResult<Vec<serde_json::Value>>;
}

/// Classifier vote store.
pub trait LabelService: Sync {
    /// Names of the classification programs with stored votes. An empty
    /// listing means the store holds no classifications at all.
    fn programs(&self) -> FetchResult<Vec<String>>;

    /// Every individual classifier vote recorded for the given objects,
    /// across all programs.
    fn votes(&self, objids: &[i64]) -> FetchResult<Vec<LabelVote>>;
}

/// Photometry archive.
pub trait PhotometryService: Sync {
    /// All light curves within `radius_arcsec` of a position, one per
    /// matched source and filter.
    fn photometry(&self, ra: f64, dec: f64, radius_arcsec: f64) -> FetchResult<Vec<LightCurve>>;
}
