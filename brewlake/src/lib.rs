//! Medallion lake for brewery listings.
//!
//! Raw JSON pages fetched upstream land under `raw/year=/month=/day=`. The
//! silver pass ([`run_silver`]) normalizes categorical columns through the
//! dimension stores, appends partitioned facts for the run day and then
//! deduplicates that day's batch. The gold pass ([`run_gold`]) recomputes the
//! distinct-name summary per location and brewery type over the whole fact
//! store. The two passes hand off through marker files ([`SignalDir`]).
//!
//! Layer crates are re-exported for callers that need a single stage:
//!
//! - [`dataset`]: Hive-partitioned Parquet reads, writes and subtree swaps.
//! - [`dimension`]: normalization and dimension stores.
//! - [`ingest`]: raw day discovery and JSON decoding.
//! - [`silver`]: fact writes and batch deduplication.
//! - [`gold`]: the aggregation summary.

pub mod config;
pub mod pipeline;
pub mod signal;

pub use brewlake_dataset as dataset;
pub use brewlake_dimension as dimension;
pub use brewlake_gold as gold;
pub use brewlake_ingest as ingest;
pub use brewlake_silver as silver;

pub use brewlake_dimension::normalize;
pub use brewlake_result::{Error, ErrorKind, Result};
pub use brewlake_types::{BatchId, RunContext};
pub use config::{ConfigUpdate, LakeConfig};
pub use pipeline::{GoldReport, SilverReport, day_batch_id, run_dedup, run_gold, run_silver};
pub use signal::{Signal, SignalDir};
