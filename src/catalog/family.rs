//! Reference-catalog family detection.
//!
//! The upstream catalogs share no schema; which whitespace columns a file
//! carries depends on its provenance, encoded by convention in the file
//! name. The family is decided once here and threaded through as a typed
//! tag, instead of re-sniffing the name at every branch.

use std::path::Path;

/// Column layout of a plain-text reference catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceFamily {
    /// `{ra, dec}` only; names are synthesized from the position.
    PositionOnly,
    /// `{name, ra, dec, period, classification}`.
    Crts,
    /// `{name, ra, dec, e1, e2}` with the positional error as the scaled
    /// Euclidean norm of the two axis errors.
    Vlss,
    /// `{name, ra, dec, amaj, amin, phi}`: error ellipse axes and angle.
    Fermi,
    /// `{name, ra, dec, err}`.
    Xray,
    /// `{name, ra, dec}` fallback.
    Generic,
}

impl ReferenceFamily {
    /// Detects the family from a catalog file name.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if name.contains("blue") || name.contains("uvex") || name.contains("xraybinary") {
            Self::PositionOnly
        } else if name.contains("CRTS") {
            Self::Crts
        } else if name.contains("vlss") {
            Self::Vlss
        } else if name.contains("fermi") {
            Self::Fermi
        } else if name.contains("swift") || name.contains("xmm") {
            Self::Xray
        } else {
            Self::Generic
        }
    }
}
