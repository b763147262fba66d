//! HEALPix-bucketed position index over a source table.

use std::collections::HashMap;

use super::healpix::{ang2pix_nest, query_disc_nest};
use crate::catalog::SourceTable;
use crate::coords::angular_separation_arcsec;

/// Pixel-bucketed index of table row positions.
///
/// Built once per table; candidate lookups touch only the pixels a search
/// disc overlaps instead of scanning every row.
pub struct SkyIndex {
    order: u32,
    buckets: HashMap<u64, Vec<usize>>,
}

impl SkyIndex {
    /// Indexes every row of `table` at the given HEALPix order.
    ///
    /// Order 10 gives ~3.4 arcmin pixels, comfortably larger than the
    /// arcsecond-scale match radii this crate uses.
    pub fn build(table: &SourceTable, order: u32) -> Self {
        let mut buckets: HashMap<u64, Vec<usize>> = HashMap::new();
        for (i, record) in table.records().iter().enumerate() {
            let pixel = ang2pix_nest(order, record.ra, record.dec);
            buckets.entry(pixel).or_default().push(i);
        }
        Self { order, buckets }
    }

    /// Row indices whose pixel overlaps the disc around (`ra`, `dec`).
    ///
    /// Conservative: callers still filter by exact angular separation.
    pub fn candidates(&self, ra_deg: f64, dec_deg: f64, radius_arcsec: f64) -> Vec<usize> {
        let radius_deg = radius_arcsec / 3600.0;
        let mut out = Vec::new();
        for pixel in query_disc_nest(self.order, ra_deg, dec_deg, radius_deg) {
            if let Some(rows) = self.buckets.get(&pixel) {
                out.extend_from_slice(rows);
            }
        }
        out
    }

    /// Nearest row of `table` within `radius_arcsec`, with its separation.
    pub fn nearest(
        &self,
        table: &SourceTable,
        ra_deg: f64,
        dec_deg: f64,
        radius_arcsec: f64,
    ) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for i in self.candidates(ra_deg, dec_deg, radius_arcsec) {
            let record = &table.records()[i];
            let sep = angular_separation_arcsec(ra_deg, dec_deg, record.ra, record.dec);
            if sep <= radius_arcsec && best.map_or(true, |(_, d)| sep < d) {
                best = Some((i, sep));
            }
        }
        best
    }
}
