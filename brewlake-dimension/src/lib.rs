//! Dimension stores: durable original to normalized key mappings.
//!
//! Each categorical column of a brewery record (country, state, city,
//! brewery type) is resolved through its own store, a two-column Parquet file
//! `dim_<column>.parquet` holding `<column>` and `<column>_norm`. Stores only
//! grow: every run merges the mappings it saw, newest value winning.

pub mod normalize;
pub mod store;

pub use normalize::{normalize, normalize_str};
pub use store::{
    Dimension, DimensionPaths, DimensionStore, NORM_SUFFIX, UpdateReport, update_dimension,
};
