use crate::error::Error;

/// Result type alias used throughout brewlake.
pub type Result<T> = std::result::Result<T, Error>;
