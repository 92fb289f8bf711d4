//! Error types and result definitions for the brewlake workspace.
//!
//! Every brewlake crate returns [`Result<T>`] with the single [`Error`] enum so
//! failures propagate across crate boundaries with `?` and keep their context.
//!
//! # Error Categories
//!
//! Variants fall into four groups, reported by [`Error::kind`]:
//!
//! - **Configuration/schema** ([`Error::InvalidArgumentError`], [`Error::Schema`]):
//!   missing required columns, unreadable dimension stores, empty required inputs.
//!   Never retried.
//! - **Data quality** ([`Error::DataQuality`]): a batch lost every record to filtering.
//! - **Storage** ([`Error::Io`], [`Error::Storage`], [`Error::Parquet`], [`Error::Arrow`]):
//!   failures while reading, writing, renaming or deleting partition files.
//! - **Internal** ([`Error::Internal`], [`Error::Unexpected`]): anything else, wrapped
//!   with its original cause so the invoking scheduler can mark the run failed.

pub mod error;
pub mod result;

pub use error::{Error, ErrorKind};
pub use result::Result;
