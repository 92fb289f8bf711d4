use std::path::{Path, PathBuf};
use std::{fmt, io};
use thiserror::Error;

/// Unified error type for all brewlake operations.
///
/// Each variant carries the context needed to diagnose the failure without
/// re-reading logs: the offending path, batch id, or list of missing columns.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error without a more specific path context.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Arrow error while building, casting, or slicing record batches.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error while encoding or decoding a data file.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Storage failure tied to a concrete path on disk.
    ///
    /// Raised while creating, renaming, or deleting partition directories and
    /// files. A failure in the middle of a batch rewrite is reported here with
    /// the operation that was in flight.
    #[error("failed to {op} {path:?}: {source}")]
    Storage {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid input or configuration.
    ///
    /// Covers empty required inputs, unreadable dimension stores that a join
    /// depends on, malformed batch identifiers, and bad configuration values.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// Required columns are structurally absent.
    #[error("missing columns in {context}: {missing:?}")]
    Schema {
        context: String,
        missing: Vec<String>,
    },

    /// A raw input file could not be decoded.
    #[error("failed to decode {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Filtering removed every record from a batch.
    #[error("data quality check failed: {0}")]
    DataQuality(String),

    /// Internal error indicating a bug or violated invariant.
    #[error("An internal operation failed: {0}")]
    Internal(String),

    /// Unexpected failure wrapped with the operation that observed it.
    #[error("{context} failed: {source}")]
    Unexpected {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Coarse classification of an [`Error`], used by callers deciding how to report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    DataQuality,
    Storage,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::DataQuality => write!(f, "data-quality"),
            ErrorKind::Storage => write!(f, "storage"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}

impl Error {
    /// Build a schema error listing every missing column.
    pub fn schema<C, I, S>(context: C, missing: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Error::Schema {
            context: context.into(),
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    /// Attach a path and the in-flight operation to an I/O error.
    #[inline]
    pub fn storage(op: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
        Error::Storage {
            op,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Build a decode error from any displayable cause.
    #[inline]
    pub fn decode<E: fmt::Display>(path: impl AsRef<Path>, err: E) -> Self {
        Error::Decode {
            path: path.as_ref().to_path_buf(),
            reason: err.to_string(),
        }
    }

    /// Wrap an arbitrary error as [`Error::Unexpected`].
    pub fn unexpected<E>(context: impl Into<String>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Unexpected {
            context: context.into(),
            source: Box::new(err),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgumentError(_) | Error::Schema { .. } | Error::Decode { .. } => {
                ErrorKind::Configuration
            }
            Error::DataQuality(_) => ErrorKind::DataQuality,
            Error::Io(_) | Error::Storage { .. } | Error::Parquet(_) | Error::Arrow(_) => {
                ErrorKind::Storage
            }
            Error::Internal(_) | Error::Unexpected { .. } => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_missing_columns() {
        let err = Error::schema("batch=2025-09-27", ["name", "city"]);
        let msg = err.to_string();
        assert!(msg.contains("batch=2025-09-27"));
        assert!(msg.contains("\"name\""));
        assert!(msg.contains("\"city\""));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn storage_error_keeps_path_and_source() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = Error::storage("remove", "/lake/fact/batch=x", io_err);
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.to_string().contains("remove"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn unexpected_wraps_cause() {
        let io_err = io::Error::other("boom");
        let err = Error::unexpected("gold aggregation", io_err);
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.to_string(), "gold aggregation failed: boom");
    }
}
