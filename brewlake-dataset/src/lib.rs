//! Hive-style partitioned Parquet datasets.
//!
//! A dataset is a directory tree whose partition columns are encoded as
//! `column=value` path segments, with Parquet data files at the leaves:
//!
//! ```text
//! fact/batch=2025-09-27/country=us/state=ca/part=0/chunk-00000.parquet
//! ```
//!
//! # Architecture
//!
//! - [`partition`]: segment encoding, escaping and parsing.
//! - [`writer`]: single-file Parquet writes (always via a hidden temp name and a
//!   rename) and additive partitioned appends.
//! - [`reader`]: single-file Parquet reads.
//! - [`PartitionedDataset`]: file discovery, schema unification, and chunked scans
//!   that rebuild partition columns from each file's path.
//! - [`swap`]: replacing a partition subtree by staging a new copy next to it and
//!   renaming it into place.
//!
//! Names starting with `.` or `_` are invisible to discovery, so in-flight temp
//! files and staging directories never leak into scans.

pub mod dataset;
pub mod partition;
pub mod reader;
pub mod swap;
pub mod writer;

pub use dataset::{DataFile, DatasetScan, PartitionedDataset};
pub use partition::{HIVE_DEFAULT_PARTITION, PartitionPath, escape_value, parse_segment};
pub use reader::{read_parquet_file, read_parquet_schema};
pub use swap::{Reconciled, SubtreeSwap, reconcile_subtree};
pub use writer::{WriterConfig, write_parquet_atomic, write_partitioned};

// Re-export common types for convenience
pub use arrow::datatypes::SchemaRef;
pub use arrow::record_batch::RecordBatch;

/// Whether a directory entry name is hidden from dataset discovery.
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}
