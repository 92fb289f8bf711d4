use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;
use brewlake_result::Result;
use time::Date;

use crate::conform::conform_records;
use crate::json::read_raw_records;
use crate::layout::{FileGroup, list_raw_files, plan_groups, raw_day_dir};

/// Files read together into one batch unless overridden.
pub const DEFAULT_FILES_PER_BATCH: usize = 10;

#[derive(Debug, Clone)]
pub struct RawReadOptions {
    pub files_per_batch: usize,
}

impl Default for RawReadOptions {
    fn default() -> Self {
        Self {
            files_per_batch: DEFAULT_FILES_PER_BATCH,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawReader {
    options: RawReadOptions,
}

impl RawReader {
    pub fn new(options: RawReadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RawReadOptions {
        &self.options
    }

    /// Read `files` in order into one conformed batch.
    pub fn read_files(&self, files: &[PathBuf]) -> Result<RecordBatch> {
        let mut records = Vec::new();
        for file in files {
            let decoded = read_raw_records(file)?;
            tracing::debug!(path = %file.display(), records = decoded.len(), "read raw file");
            records.extend(decoded);
        }
        conform_records(&records)
    }

    /// Plan the groups of the raw files fetched on `day`.
    pub fn open_day(&self, raw_root: &Path, day: Date) -> Result<RawReadSession> {
        let dir = raw_day_dir(raw_root, day);
        let files = list_raw_files(&dir)?;
        let groups = plan_groups(&files, self.options.files_per_batch);
        tracing::info!(
            path = %dir.display(),
            files = files.len(),
            groups = groups.len(),
            "planned raw file groups"
        );
        Ok(RawReadSession {
            reader: self.clone(),
            dir,
            file_count: files.len(),
            groups: groups.into(),
        })
    }
}

/// A group of raw files decoded into one batch.
#[derive(Debug, Clone)]
pub struct RawGroup {
    pub index: usize,
    pub part: usize,
    pub files: Vec<PathBuf>,
    pub batch: RecordBatch,
}

/// Lazily decodes the planned groups of one raw day, in file order.
pub struct RawReadSession {
    reader: RawReader,
    dir: PathBuf,
    file_count: usize,
    groups: VecDeque<FileGroup>,
}

impl RawReadSession {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    pub fn remaining_groups(&self) -> usize {
        self.groups.len()
    }
}

impl Iterator for RawReadSession {
    type Item = Result<RawGroup>;

    fn next(&mut self) -> Option<Self::Item> {
        let group = self.groups.pop_front()?;
        let batch = match self.reader.read_files(&group.files) {
            Ok(batch) => batch,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(RawGroup {
            index: group.index,
            part: group.part,
            files: group.files,
            batch,
        }))
    }
}
