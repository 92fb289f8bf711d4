//! Marker files announcing that a layer is ready for its consumer.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use brewlake_result::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The silver pass finished; the gold pass may run.
    SilverReady,
    /// A new gold summary was written.
    GoldUpdated,
}

impl Signal {
    pub fn file_name(self) -> &'static str {
        match self {
            Signal::SilverReady => "silver_ready",
            Signal::GoldUpdated => "gold_updated",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Directory holding one empty marker file per raised signal.
#[derive(Debug, Clone)]
pub struct SignalDir {
    dir: PathBuf,
}

impl SignalDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, signal: Signal) -> PathBuf {
        self.dir.join(signal.file_name())
    }

    /// Raise `signal`. Raising an already raised signal is a no-op.
    pub fn emit(&self, signal: Signal) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::storage("create directory", &self.dir, e))?;
        let path = self.path(signal);
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| Error::storage("create", &path, e))?;
        tracing::info!(signal = %signal, path = %path.display(), "signal emitted");
        Ok(path)
    }

    pub fn is_raised(&self, signal: Signal) -> bool {
        self.path(signal).is_file()
    }

    /// Clear `signal`, returning whether it was raised.
    pub fn consume(&self, signal: Signal) -> Result<bool> {
        let path = self.path(signal);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(signal = %signal, "signal consumed");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::storage("remove", &path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_then_consume() {
        let dir = tempfile::tempdir().unwrap();
        let signals = SignalDir::new(dir.path().join("signals"));
        assert!(!signals.is_raised(Signal::SilverReady));

        signals.emit(Signal::SilverReady).unwrap();
        signals.emit(Signal::SilverReady).unwrap();
        assert!(signals.is_raised(Signal::SilverReady));
        assert_eq!(fs::metadata(signals.path(Signal::SilverReady)).unwrap().len(), 0);

        assert!(signals.consume(Signal::SilverReady).unwrap());
        assert!(!signals.consume(Signal::SilverReady).unwrap());
        assert!(!signals.is_raised(Signal::GoldUpdated));
    }
}
