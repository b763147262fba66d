//! Heterogeneous catalog ingest.
//!
//! Reference catalogs (plain text, family-dependent columns) and survey
//! shards (text or memory-mapped binary) all normalize into the uniform
//! [`SourceTable`] schema. The [`loader`] module assembles whole catalog
//! directories: shard enumeration, dedup, significance ranks, and optional
//! classification enrichment.

pub mod binary;
pub mod family;
pub mod loader;
pub mod table;
pub mod text;

pub use binary::{read_binary_shard, BinaryShard, ShardRow};
pub use family::ReferenceFamily;
pub use loader::{
    enrich_object_types, load_catalog_dir, read_shard, LoadOptions, ObjectTypeMatch,
    ObjectTypeService, ENRICH_RADIUS_ARCSEC,
};
pub use table::{SourceRecord, SourceTable, CLASS_UNKNOWN, CLASS_UNMATCHED};
pub use text::{read_reference_text, read_text_shard, ReferenceRow};
