//! Memory-mapped reader for binary survey shards.
//!
//! A binary shard has two contiguous sections:
//!
//! 1. **Header** (16 bytes) — magic, version, row count
//! 2. **Row data** (`count × 200` bytes) — [`ShardRow`] structs
//!
//! A shard may carry a magnitude sidecar next to it, `<stem>_mag.bin`,
//! with its own small header and one `f32` per row in the same order.
//! Rows carry no identifier strings; names are synthesized from the sky
//! position when the shard is normalized into a [`SourceTable`].

use anyhow::{bail, Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

use super::table::{make_record, SourceTable};
use crate::coords::synthesize_name;

const SHARD_MAGIC: &[u8; 4] = b"ZCAT";
const SHARD_VERSION: u32 = 1;
const MAG_MAGIC: &[u8; 4] = b"ZMAG";
const HEADER_SIZE: usize = 16;

/// Number of feature statistics stored per row.
pub const ROW_STATS: usize = 36;

/// A single shard row (200 bytes, `repr(C)`).
///
/// Laid out for zero-copy reads from the memory-mapped file.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ShardRow {
    /// Numeric source id within the survey database.
    pub objid: i64,
    /// Right ascension in degrees.
    pub ra: f64,
    /// Declination in degrees.
    pub dec: f64,
    /// Best-fit period in days.
    pub period: f64,
    /// Detection significance.
    pub sig: f64,
    /// Period derivative.
    pub pdot: f64,
    /// Light-curve feature statistics.
    pub stats: [f32; ROW_STATS],
    /// Survey filter id.
    pub filt: u32,
    pub(crate) _padding: u32,
}

const _: () = assert!(std::mem::size_of::<ShardRow>() == 200);

/// Memory-mapped handle to a binary shard.
///
/// Created by [`BinaryShard::open`]. Row slices borrow directly from the
/// map with no allocation or copying.
pub struct BinaryShard {
    mmap: Mmap,
    count: usize,
}

impl BinaryShard {
    /// Open and memory-map a binary shard.
    ///
    /// Validates the header (magic bytes, version, row count against the
    /// file length) and returns immediately; no row data is touched until
    /// [`BinaryShard::rows`].
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, is too small, or has
    /// an invalid header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("Failed to open shard file: {:?}", path))?;

        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("Failed to memory-map shard file: {:?}", path))?;

        if mmap.len() < HEADER_SIZE {
            bail!("Shard file too small: {} bytes", mmap.len());
        }

        let count = parse_header(&mmap, SHARD_MAGIC)?;
        let expected = HEADER_SIZE + count * std::mem::size_of::<ShardRow>();
        if mmap.len() < expected {
            bail!(
                "Shard file too small for {} rows: {} bytes, expected {}",
                count,
                mmap.len(),
                expected
            );
        }

        Ok(Self { mmap, count })
    }

    /// Number of rows in the shard.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns a zero-copy slice of all rows.
    ///
    /// Returns an empty slice if the mapped data is misaligned.
    pub fn rows(&self) -> &[ShardRow] {
        if self.count == 0 {
            return &[];
        }
        let bytes = &self.mmap[HEADER_SIZE..];
        let ptr = bytes.as_ptr();
        if (ptr as usize) % std::mem::align_of::<ShardRow>() != 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(ptr as *const ShardRow, self.count) }
    }
}

fn parse_header(mmap: &Mmap, magic: &[u8; 4]) -> Result<usize> {
    let header = &mmap[0..HEADER_SIZE];
    if &header[0..4] != magic {
        bail!(
            "Invalid shard magic: expected {:?}, got {:?}",
            magic,
            &header[0..4]
        );
    }
    let version = u32::from_le_bytes(header[4..8].try_into().unwrap());
    if version != SHARD_VERSION {
        bail!(
            "Unsupported shard version: expected {}, got {}",
            SHARD_VERSION,
            version
        );
    }
    let count = u64::from_le_bytes(header[8..16].try_into().unwrap());
    Ok(count as usize)
}

/// Path of the magnitude sidecar belonging to a shard.
pub fn mag_sidecar_path(shard: &Path) -> std::path::PathBuf {
    let stem = shard
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    shard.with_file_name(format!("{stem}_mag.bin"))
}

/// Reads the magnitude sidecar of a shard.
///
/// # Errors
/// Returns an error on a bad header or if the row count does not match
/// `expected_count`.
pub fn read_mag_sidecar(path: &Path, expected_count: usize) -> Result<Vec<f32>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open magnitude file: {:?}", path))?;
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to memory-map magnitude file: {:?}", path))?;

    if mmap.len() < HEADER_SIZE {
        bail!("Magnitude file too small: {} bytes", mmap.len());
    }
    let count = parse_header(&mmap, MAG_MAGIC)?;
    if count != expected_count {
        bail!(
            "Magnitude row count mismatch: shard has {}, sidecar has {}",
            expected_count,
            count
        );
    }
    let expected = HEADER_SIZE + count * std::mem::size_of::<f32>();
    if mmap.len() < expected {
        bail!(
            "Magnitude file too small for {} rows: {} bytes",
            count,
            mmap.len()
        );
    }

    let mut mags = Vec::with_capacity(count);
    for i in 0..count {
        let offset = HEADER_SIZE + i * 4;
        mags.push(f32::from_le_bytes(
            mmap[offset..offset + 4].try_into().unwrap(),
        ));
    }
    Ok(mags)
}

/// Reads a binary shard into the uniform table, merging the magnitude
/// sidecar when one sits next to the shard file.
pub fn read_binary_shard(path: &Path) -> Result<SourceTable> {
    let shard = BinaryShard::open(path)?;

    let mag_path = mag_sidecar_path(path);
    let mags = if mag_path.is_file() {
        Some(read_mag_sidecar(&mag_path, shard.len())?)
    } else {
        None
    };

    let mut records = Vec::with_capacity(shard.len());
    for (i, row) in shard.rows().iter().enumerate() {
        let mut record = make_record(synthesize_name(row.ra, row.dec), row.ra, row.dec);
        record.objid = row.objid;
        record.period = Some(row.period);
        record.sig = row.sig;
        if let Some(mags) = &mags {
            record.mag = mags[i] as f64;
        }
        records.push(record);
    }
    SourceTable::from_records(records)
}
