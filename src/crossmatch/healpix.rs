//! HEALPix pixelization for the spatial match index.
//!
//! Nested-scheme pixel indexing (Gorski et al. 2005) and a conservative
//! disc query. The disc query samples a sub-pixel grid over the search
//! cone and may return pixels that only graze it, but never misses one
//! that overlaps.

use std::collections::HashSet;

use crate::coords::angular_separation_deg;

const PI: f64 = std::f64::consts::PI;
const TWOPI: f64 = 2.0 * std::f64::consts::PI;

/// Converts (RA, Dec) in degrees to a nested-scheme pixel index in
/// `[0, 12 * 4^order)`.
pub fn ang2pix_nest(order: u32, ra_deg: f64, dec_deg: f64) -> u64 {
    let phi = ra_deg * PI / 180.0;
    let z = libm::sin(dec_deg * PI / 180.0);
    let nside = 1u64 << order;
    let (face, ix, iy) = face_and_position(phi, z, nside);
    face as u64 * nside * nside + xy2pix_nest(ix, iy, order)
}

/// Returns every nested pixel overlapping the disc around (`ra_deg`,
/// `dec_deg`) of `radius_deg`, plus possibly a few neighbors.
pub fn query_disc_nest(order: u32, ra_deg: f64, dec_deg: f64, radius_deg: f64) -> Vec<u64> {
    let nside = 1u64 << order;

    // Approximate pixel size; half-pixel sampling keeps the cover complete.
    let pixel_size_deg = 58.6 / nside as f64;
    let step = pixel_size_deg * 0.5;

    let mut pixels = HashSet::new();

    // Pad by one pixel to catch pixels straddling the boundary.
    let dec_min = (dec_deg - radius_deg - pixel_size_deg).max(-90.0);
    let dec_max = (dec_deg + radius_deg + pixel_size_deg).min(90.0);

    let mut dec = dec_min;
    while dec <= dec_max {
        // RA spacing widens toward the poles.
        let cos_dec = libm::cos(dec * PI / 180.0).max(0.01);
        let ra_step = step / cos_dec;

        let ra_range = if libm::fabs(dec) > 89.0 {
            360.0
        } else {
            (radius_deg / cos_dec).min(180.0) * 2.0
        };
        let ra_min = ra_deg - ra_range / 2.0;
        let ra_max = ra_deg + ra_range / 2.0;

        let mut ra = ra_min;
        while ra <= ra_max {
            let ra_norm = ((ra % 360.0) + 360.0) % 360.0;
            let dist = angular_separation_deg(ra_deg, dec_deg, ra_norm, dec);
            if dist <= radius_deg + pixel_size_deg {
                pixels.insert(ang2pix_nest(order, ra_norm, dec));
            }
            ra += ra_step;
        }
        dec += step;
    }

    pixels.into_iter().collect()
}

fn face_and_position(phi: f64, z: f64, nside: u64) -> (u32, u64, u64) {
    let z_abs = libm::fabs(z);
    let tt = phi_to_tt(phi);
    if z_abs <= 2.0 / 3.0 {
        equatorial_face(tt, z, nside)
    } else {
        polar_face(tt, z, z_abs, nside)
    }
}

/// Maps phi onto the 0..4 quadrant coordinate.
fn phi_to_tt(phi: f64) -> f64 {
    let phi_norm = if phi < 0.0 { phi + TWOPI } else { phi };
    phi_norm * 2.0 / PI
}

/// Equatorial belt, -2/3 <= z <= 2/3.
fn equatorial_face(tt: f64, z: f64, nside: u64) -> (u32, u64, u64) {
    let temp1 = nside as f64 * (0.5 + tt);
    let temp2 = nside as f64 * z * 0.75;
    let jp = (temp1 - temp2) as i64;
    let jm = (temp1 + temp2) as i64;
    let nside_i = nside as i64;
    let ifp = jp / nside_i;
    let ifm = jm / nside_i;
    let face = equatorial_face_number(ifp, ifm);
    let ix = jm - (face as i64 % 4) * nside_i;
    let iy = nside_i - 1 - (jp - (face as i64 / 4) * nside_i);
    (face, ix as u64, iy as u64)
}

fn equatorial_face_number(ifp: i64, ifm: i64) -> u32 {
    match (ifp, ifm) {
        (4, _) => ((ifm + 4) % 4) as u32,
        (_, 4) => ((ifp + 4) % 4 + 4) as u32,
        _ if ifp == ifm => (ifp + 4) as u32,
        _ if ifp < ifm => ifp as u32,
        _ => (ifm + 8) as u32,
    }
}

/// Polar caps, |z| > 2/3.
fn polar_face(tt: f64, z: f64, z_abs: f64, nside: u64) -> (u32, u64, u64) {
    let tp = tt - libm::floor(tt);
    let tmp = nside as f64 * libm::sqrt(3.0 * (1.0 - z_abs));
    let jp = ((tp * tmp) as i64).min(nside as i64 - 1);
    let jm = (((1.0 - tp) * tmp) as i64).min(nside as i64 - 1);
    let ntt = libm::floor(tt) as u32;
    let face_offset = if z > 0.0 { 0 } else { 8 };
    let face = (ntt % 4) + face_offset;
    let (ix, iy) = if z > 0.0 {
        (nside as i64 - jm - 1, nside as i64 - jp - 1)
    } else {
        (jp, jm)
    };
    (face, ix as u64, iy as u64)
}

/// Z-order interleave of (ix, iy) within a base face.
fn xy2pix_nest(ix: u64, iy: u64, order: u32) -> u64 {
    let mut result: u64 = 0;
    for i in 0..order {
        let bit_x = (ix >> i) & 1;
        let bit_y = (iy >> i) & 1;
        result |= (bit_x << (2 * i)) | (bit_y << (2 * i + 1));
    }
    result
}
