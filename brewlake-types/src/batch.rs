use std::fmt;

use brewlake_result::{Error, Result};

/// Identifier of one ingestion run, e.g. `2025-09-27`.
///
/// Forms the `batch=<id>` top-level partition of the fact layout, so it must be
/// a single non-empty path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(String);

impl BatchId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidArgumentError(
                "batch id must not be empty".into(),
            ));
        }
        if trimmed == "." || trimmed == ".." || trimmed.contains(['/', '\\']) {
            return Err(Error::InvalidArgumentError(format!(
                "batch id '{id}' must be a single path segment"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BatchId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for BatchId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_date_labels() {
        let id = BatchId::new(" 2025-09-27 ").unwrap();
        assert_eq!(id.as_str(), "2025-09-27");
        assert_eq!(id.to_string(), "2025-09-27");
    }

    #[test]
    fn rejects_path_like_labels() {
        for bad in ["", "  ", ".", "..", "a/b", "a\\b"] {
            assert!(BatchId::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
