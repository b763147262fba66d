//! Catalog cross-matching and periodogram batch tooling for a ZTF
//! variable-star survey pipeline.
//!
//! The crate covers the compute core of a periodic-source classification
//! pipeline: reading heterogeneous source catalogs into a uniform table,
//! cross-matching position-indexed tables on the sky, joining expert label
//! records against a feature database to materialize labeled light curves,
//! and running resumable periodogram batches over them.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`catalog`] | Shard/reference-catalog readers, [`SourceTable`](catalog::SourceTable), directory loader |
//! | [`crossmatch`] | HEALPix-indexed nearest-neighbor sky matching |
//! | [`fetch`] | Remote service seams, label aggregation, light-curve retrieval |
//! | [`lightcurve`] | Validated photometric time series |
//! | [`periodogram`] | Frequency grids, multi-algorithm spectra, cache-aware batch runner |
//! | [`coords`] | Angular separation, sexagesimal identifier synthesis |
//! | [`retry`] | Bounded fixed-delay retry for remote calls |
//!
//! # Quick Start
//!
//! ```ignore
//! use ztf_periodic::catalog::{load_catalog_dir, LoadOptions};
//! use ztf_periodic::crossmatch::{crossmatch, CrossMatchParams};
//!
//! let primary = load_catalog_dir(Path::new("catalogs/LS"), &LoadOptions::default(), None)?;
//! let secondary = load_catalog_dir(Path::new("catalogs/CE"), &LoadOptions::default(), None)?;
//!
//! let matches = crossmatch(&primary, &secondary, &CrossMatchParams {
//!     radius_arcsec: 2.0,
//!     min_sig_primary: 10.0,
//!     min_sig_secondary: 7.0,
//!     ..Default::default()
//! });
//! ```
//!
//! Remote collaborators (feature database, label store, photometry
//! service, object-type lookup) are trait seams in [`fetch`] and
//! [`catalog::loader`]; this crate never opens a network connection
//! itself.

pub mod catalog;
pub mod coords;
pub mod crossmatch;
pub mod fetch;
pub mod lightcurve;
pub mod periodogram;
pub mod retry;
