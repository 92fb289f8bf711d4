//! Raw directory layout: `<raw>/year=YYYY/month=MM/day=DD/*.json`.

use std::fs;
use std::path::{Path, PathBuf};

use brewlake_result::{Error, Result};
use time::Date;

/// Directory holding the raw files fetched on `day`.
pub fn raw_day_dir(raw_root: &Path, day: Date) -> PathBuf {
    raw_root
        .join(format!("year={}", day.year()))
        .join(format!("month={:02}", u8::from(day.month())))
        .join(format!("day={:02}", day.day()))
}

/// Every `*.json` file directly inside `dir`, sorted by name.
///
/// A missing directory has no files.
pub fn list_raw_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::storage("list", dir, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::storage("list", dir, e))?;
        let path = entry.path();
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        if is_json && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// A run of consecutive raw files processed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileGroup {
    /// Zero-based position of the group.
    pub index: usize,
    /// Offset of the group's first file; used as the fact `part` number.
    pub part: usize,
    pub files: Vec<PathBuf>,
}

/// Split sorted `files` into groups of at most `files_per_batch`.
pub fn plan_groups(files: &[PathBuf], files_per_batch: usize) -> Vec<FileGroup> {
    let size = files_per_batch.max(1);
    files
        .chunks(size)
        .enumerate()
        .map(|(index, chunk)| FileGroup {
            index,
            part: index * size,
            files: chunk.to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn day_dir_is_zero_padded() {
        let dir = raw_day_dir(Path::new("raw"), date!(2025 - 03 - 07));
        assert_eq!(dir, Path::new("raw/year=2025/month=03/day=07"));
    }

    #[test]
    fn lists_only_json_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page_002.json", "page_001.json", "notes.txt"] {
            fs::write(dir.path().join(name), b"[]").unwrap();
        }
        let files = list_raw_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["page_001.json", "page_002.json"]);
        assert!(list_raw_files(&dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn groups_carry_file_offsets() {
        let files: Vec<PathBuf> = (0..25).map(|i| PathBuf::from(format!("{i:03}.json"))).collect();
        let groups = plan_groups(&files, 10);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[1].part, 10);
        assert_eq!(groups[2].files.len(), 5);
        assert_eq!(groups[2].part, 20);
    }
}
