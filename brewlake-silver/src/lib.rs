//! Silver fact layer.
//!
//! Raw brewery records are joined against the dimension stores and appended to
//! a Hive-style layout keyed `batch/country/state/part`
//! ([`fact_writer`]); afterwards each batch is deduplicated by entity identity
//! and its subtree replaced in one swap ([`dedup`]).

pub mod dedup;
pub mod fact_writer;

pub use dedup::{DedupOptions, DedupOutcome, DedupReport, batch_dir, dedup_batch};
pub use fact_writer::{
    DimensionLookups, DimensionMisses, FactWriteReport, write_facts, write_facts_with,
};
