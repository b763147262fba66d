//! Angular separation and sexagesimal identifier synthesis.
//!
//! Positions are (RA, Dec) in degrees, RA in [0, 360), Dec in [-90, 90].
//! Separations use the Vincenty formula, which stays accurate at all
//! angular scales including the sub-arcsecond matches this crate cares
//! about.

use libm::{atan2, cos, fabs, sin, sqrt, trunc};

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

/// Angular distance between two sky positions, in degrees.
///
/// Vincenty formula on the unit sphere; accurate at all separations.
pub fn angular_separation_deg(ra1_deg: f64, dec1_deg: f64, ra2_deg: f64, dec2_deg: f64) -> f64 {
    let d1 = dec1_deg * DEG_TO_RAD;
    let d2 = dec2_deg * DEG_TO_RAD;
    let dlon = (ra2_deg - ra1_deg) * DEG_TO_RAD;

    let (s1, c1) = (sin(d1), cos(d1));
    let (s2, c2) = (sin(d2), cos(d2));
    let (sl, cl) = (sin(dlon), cos(dlon));

    let num = sqrt((c2 * sl) * (c2 * sl) + (c1 * s2 - s1 * c2 * cl) * (c1 * s2 - s1 * c2 * cl));
    let den = s1 * s2 + c1 * c2 * cl;
    atan2(num, den) * RAD_TO_DEG
}

/// Angular distance between two sky positions, in arcseconds.
pub fn angular_separation_arcsec(ra1_deg: f64, dec1_deg: f64, ra2_deg: f64, dec2_deg: f64) -> f64 {
    angular_separation_deg(ra1_deg, dec1_deg, ra2_deg, dec2_deg) * 3600.0
}

/// Formats a value in hours or degrees as a sexagesimal string with
/// zero-padded two-decimal seconds, e.g. `to_sexagesimal(-5.5, ":", false)`
/// gives `"-05:30:00.00"`.
///
/// An exactly-zero value formats through the negative branch (`"-00…"`);
/// the upstream catalogs encode it that way and identifiers built from it
/// must keep matching.
pub fn to_sexagesimal(val: f64, delimiter: &str, force_sign: bool) -> String {
    let negative = val <= 0.0;
    let val = fabs(val);
    let degree = trunc(val) as i64;
    let minute = trunc((val - degree as f64) * 60.0) as i64;
    let second = (val - degree as f64 - minute as f64 / 60.0) * 3600.0;

    if degree == 0 && negative {
        return format!("-00{delimiter}{minute:02}{delimiter}{second:05.2}");
    }
    let deg_str = if force_sign || negative {
        let signed = if negative { -degree } else { degree };
        format!("{signed:+03}")
    } else {
        format!("{degree:02}")
    };
    format!("{deg_str}{delimiter}{minute:02}{delimiter}{second:05.2}")
}

/// Synthesizes the survey identifier for a sky position.
///
/// RA is converted to hours and Dec kept in degrees, both rendered as
/// undelimited sexagesimal strings; the identifier is `ZTFJ` plus the
/// first 4 characters of each, extended to 5 on the Dec side when the
/// string carries a leading minus so the sign survives truncation.
pub fn synthesize_name(ra_deg: f64, dec_deg: f64) -> String {
    let ra_hex = to_sexagesimal(ra_deg * 24.0 / 360.0, "", false);
    let dec_hex = to_sexagesimal(dec_deg, "", false);
    let dec_take = if dec_hex.starts_with('-') { 5 } else { 4 };
    format!("ZTFJ{}{}", &ra_hex[..4], &dec_hex[..dec_take])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separation_same_point() {
        assert!(angular_separation_deg(10.0, 20.0, 10.0, 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_separation_equator_quarter() {
        let d = angular_separation_deg(0.0, 0.0, 90.0, 0.0);
        assert!((d - 90.0).abs() < 1e-10);
    }

    #[test]
    fn test_separation_antipodes() {
        let d = angular_separation_deg(0.0, 0.0, 180.0, 0.0);
        assert!((d - 180.0).abs() < 1e-10);
    }

    #[test]
    fn test_separation_small_offset_arcsec() {
        // Offsets of 1.08 arcsec in RA (at dec 20) and 0.72 arcsec in Dec.
        let sep = angular_separation_arcsec(10.0, 20.0, 10.0003, 20.0002);
        assert!((sep - 1.24).abs() < 0.02, "sep = {sep}");
    }

    #[test]
    fn test_sexagesimal_positive() {
        assert_eq!(to_sexagesimal(12.5, ":", false), "12:30:00.00");
    }

    #[test]
    fn test_sexagesimal_negative() {
        assert_eq!(to_sexagesimal(-5.5, "", false), "-053000.00");
    }

    #[test]
    fn test_sexagesimal_negative_below_one() {
        assert_eq!(to_sexagesimal(-0.5, "", false), "-003000.00");
    }

    #[test]
    fn test_sexagesimal_force_sign() {
        assert_eq!(to_sexagesimal(5.25, ":", true), "+05:15:00.00");
    }

    #[test]
    fn test_sexagesimal_pads_seconds_to_five_chars() {
        assert_eq!(to_sexagesimal(10.0 + 30.5 / 3600.0, ":", false), "10:00:30.50");
        assert_eq!(to_sexagesimal(10.0 + 3.5 / 3600.0, ":", false), "10:00:03.50");
    }

    #[test]
    fn test_sexagesimal_zero_is_negative() {
        // Upstream convention: exactly zero renders with the minus branch.
        assert!(to_sexagesimal(0.0, "", false).starts_with("-00"));
    }

    #[test]
    fn test_name_positive_dec() {
        assert_eq!(synthesize_name(10.0, 20.0), "ZTFJ00402000");
    }

    #[test]
    fn test_name_negative_dec_keeps_sign() {
        let name = synthesize_name(150.0, -5.5);
        assert_eq!(name, "ZTFJ1000-0530");
    }

    #[test]
    fn test_name_shallow_negative_dec() {
        let name = synthesize_name(150.0, -0.5);
        assert_eq!(name, "ZTFJ1000-0030");
    }

    #[test]
    fn test_name_is_deterministic() {
        for &(ra, dec) in &[(0.0, 0.0), (359.9999, 89.9999), (183.7, -42.3)] {
            assert_eq!(synthesize_name(ra, dec), synthesize_name(ra, dec));
        }
    }
}
