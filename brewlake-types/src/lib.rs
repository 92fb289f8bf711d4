//! Shared types for the brewlake workspace.
//!
//! - [`schema`]: the fixed brewery entity shape as Arrow schemas plus column name constants.
//! - [`BatchId`]: validated ingestion-run identifier used as the top-level fact partition.
//! - [`RunContext`]: explicit diagnostics handle threaded through every operation.

pub mod batch;
pub mod context;
pub mod schema;

pub use batch::BatchId;
pub use context::RunContext;
pub use schema::{
    AGGREGATION_KEY_COLUMNS, IDENTITY_COLUMNS, REQUIRED_COLUMNS, fact_file_schema, raw_schema,
    require_columns,
};
