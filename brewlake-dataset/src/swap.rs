//! Replacing a partition subtree without a window where it is gone.
//!
//! The new contents are written into a hidden staging sibling. Commit renames
//! the live directory to a hidden trash sibling, renames staging into place,
//! then deletes the trash. Staging is only renamed after it is complete, so an
//! interrupted commit always leaves enough on disk for [`reconcile_subtree`]
//! to settle on either the old or the new contents.

use std::fs;
use std::path::{Path, PathBuf};

use brewlake_result::{Error, Result};

/// Outcome of [`reconcile_subtree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// No leftovers were found.
    Clean,
    /// A staging copy was abandoned before commit; the old contents stand.
    DiscardedStaging,
    /// A commit stopped after the live directory moved aside; it was completed.
    CompletedSwap,
    /// A commit stopped after staging was in place; the trash was removed.
    RemovedTrash,
    /// Only the moved-aside live directory survived; it was put back.
    RestoredPrevious,
}

fn sibling(target: &Path, prefix: &str) -> Result<PathBuf> {
    let name = target.file_name().ok_or_else(|| {
        Error::InvalidArgumentError(format!("{} has no directory name", target.display()))
    })?;
    Ok(target.with_file_name(format!("{prefix}{}", name.to_string_lossy())))
}

fn staging_path(target: &Path) -> Result<PathBuf> {
    sibling(target, ".staging-")
}

fn trash_path(target: &Path) -> Result<PathBuf> {
    sibling(target, ".trash-")
}

fn remove_tree(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::storage("remove", path, e)),
    }
}

fn rename(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to).map_err(|e| Error::storage("rename", from, e))
}

/// Settle leftovers of an interrupted swap of `target`.
pub fn reconcile_subtree(target: &Path) -> Result<Reconciled> {
    let staging = staging_path(target)?;
    let trash = trash_path(target)?;

    if trash.exists() {
        if target.exists() {
            remove_tree(&trash)?;
            return Ok(Reconciled::RemovedTrash);
        }
        if !staging.exists() {
            rename(&trash, target)?;
            return Ok(Reconciled::RestoredPrevious);
        }
        rename(&staging, target)?;
        remove_tree(&trash)?;
        return Ok(Reconciled::CompletedSwap);
    }

    if staging.exists() {
        remove_tree(&staging)?;
        return Ok(Reconciled::DiscardedStaging);
    }

    Ok(Reconciled::Clean)
}

/// An in-progress replacement of one directory subtree.
///
/// Dropping an uncommitted swap discards the staging directory.
#[derive(Debug)]
pub struct SubtreeSwap {
    target: PathBuf,
    staging: PathBuf,
    trash: PathBuf,
    committed: bool,
}

impl SubtreeSwap {
    /// Start a swap of `target` with an empty staging directory.
    pub fn begin(target: &Path) -> Result<Self> {
        let staging = staging_path(target)?;
        let trash = trash_path(target)?;
        remove_tree(&staging)?;
        fs::create_dir_all(&staging).map_err(|e| Error::storage("create directory", &staging, e))?;
        Ok(Self {
            target: target.to_path_buf(),
            staging,
            trash,
            committed: false,
        })
    }

    /// Directory receiving the replacement contents.
    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Move the staged contents into place.
    pub fn commit(mut self) -> Result<()> {
        let had_target = self.target.exists();
        if had_target {
            rename(&self.target, &self.trash)?;
        }
        rename(&self.staging, &self.target)?;
        self.committed = true;
        if had_target {
            remove_tree(&self.trash)?;
        }
        Ok(())
    }
}

impl Drop for SubtreeSwap {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_dir_all(&self.staging);
        }
    }
}
