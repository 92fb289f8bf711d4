//! Parquet file writing utilities.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use arrow::array::{Array, StringArray, UInt32Array};
use arrow::compute::{cast, take_record_batch};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use brewlake_result::{Error, Result};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rustc_hash::FxHashMap;

use crate::partition::PartitionPath;

const CHUNK_PREFIX: &str = "chunk-";
const CHUNK_SUFFIX: &str = ".parquet";

/// Parquet encoding settings for every file the dataset layer writes.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub compression: Compression,
    pub max_row_group_size: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            max_row_group_size: 8192,
        }
    }
}

impl WriterConfig {
    fn properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.max_row_group_size)
            .build()
    }
}

fn temp_sibling(path: &Path) -> Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        Error::InvalidArgumentError(format!("{} has no file name", path.display()))
    })?;
    Ok(path.with_file_name(format!(
        ".{}.{}.tmp",
        name.to_string_lossy(),
        std::process::id()
    )))
}

/// Write `batch` as a single Parquet file at `path`, replacing any previous file.
///
/// Bytes go to a hidden sibling first and are renamed over `path`, so readers
/// see either the old file or the complete new one. A zero-row batch still
/// produces a file carrying the schema.
pub fn write_parquet_atomic(path: &Path, batch: &RecordBatch, config: &WriterConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::storage("create directory", parent, e))?;
    }
    let tmp = temp_sibling(path)?;

    let result = (|| -> Result<()> {
        let file = File::create(&tmp).map_err(|e| Error::storage("create", &tmp, e))?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(config.properties()))?;
        if batch.num_rows() > 0 {
            writer.write(batch)?;
        }
        writer.close()?;
        Ok(())
    })();

    if let Err(err) = result {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }

    fs::rename(&tmp, path).map_err(|e| Error::storage("rename", &tmp, e))
}

fn chunk_index(name: &str) -> Option<u64> {
    name.strip_prefix(CHUNK_PREFIX)?
        .strip_suffix(CHUNK_SUFFIX)?
        .parse()
        .ok()
}

/// Next unused `chunk-NNNNN.parquet` path inside `dir`.
pub fn next_chunk_path(dir: &Path) -> Result<PathBuf> {
    let mut next = 0u64;
    match fs::read_dir(dir) {
        Ok(entries) => {
            for entry in entries {
                let entry = entry.map_err(|e| Error::storage("list", dir, e))?;
                let name = entry.file_name();
                if let Some(idx) = chunk_index(&name.to_string_lossy()) {
                    next = next.max(idx + 1);
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::storage("list", dir, e)),
    }
    Ok(dir.join(format!("{CHUNK_PREFIX}{next:05}{CHUNK_SUFFIX}")))
}

fn partition_values(batch: &RecordBatch, column: &str) -> Result<StringArray> {
    let idx = batch
        .schema()
        .index_of(column)
        .map_err(|_| Error::schema("partitioned write", [column]))?;
    let as_text = cast(batch.column(idx), &DataType::Utf8)?;
    as_text
        .as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .ok_or_else(|| Error::Internal(format!("partition column '{column}' did not cast to Utf8")))
}

/// Append `batch` below `root`, one new file per distinct partition.
///
/// `partition_columns` are removed from the stored files and encoded as
/// directory segments in the given order. Existing files are never touched;
/// each partition directory receives a fresh chunk file. Returns the written
/// paths in first-seen partition order.
pub fn write_partitioned(
    root: &Path,
    batch: &RecordBatch,
    partition_columns: &[&str],
    config: &WriterConfig,
) -> Result<Vec<PathBuf>> {
    if batch.num_rows() == 0 {
        return Ok(Vec::new());
    }

    let schema = batch.schema();
    let mut key_arrays = Vec::with_capacity(partition_columns.len());
    let mut key_indices = Vec::with_capacity(partition_columns.len());
    for column in partition_columns {
        key_arrays.push(partition_values(batch, column)?);
        key_indices.push(schema.index_of(column)?);
    }

    let data_indices: Vec<usize> = (0..schema.fields().len())
        .filter(|idx| !key_indices.contains(idx))
        .collect();
    let data = batch.project(&data_indices)?;

    let mut group_of: FxHashMap<Vec<Option<String>>, usize> = FxHashMap::default();
    let mut groups: Vec<(Vec<Option<String>>, Vec<u32>)> = Vec::new();
    for row in 0..batch.num_rows() {
        let key: Vec<Option<String>> = key_arrays
            .iter()
            .map(|arr| arr.is_valid(row).then(|| arr.value(row).to_string()))
            .collect();
        let slot = *group_of.entry(key.clone()).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row as u32);
    }

    let mut written = Vec::with_capacity(groups.len());
    for (key, rows) in groups {
        let mut partition = PartitionPath::new();
        for (column, value) in partition_columns.iter().zip(key) {
            partition.push(*column, value);
        }
        let dir = partition.to_path(root);
        fs::create_dir_all(&dir).map_err(|e| Error::storage("create directory", &dir, e))?;

        let file = next_chunk_path(&dir)?;
        let chunk = take_record_batch(&data, &UInt32Array::from(rows))?;
        write_parquet_atomic(&file, &chunk, config)?;
        tracing::debug!(path = %file.display(), rows = chunk.num_rows(), "wrote partition chunk");
        written.push(file);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_parquet_file;
    use arrow::array::UInt64Array;
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    fn sample() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("country", DataType::Utf8, true),
            Field::new("name", DataType::Utf8, true),
            Field::new("part", DataType::UInt64, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec![Some("us"), Some("br"), Some("us"), None])),
                Arc::new(StringArray::from(vec!["a", "b", "c", "d"])),
                Arc::new(UInt64Array::from(vec![0, 0, 0, 0])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_write_parquet_atomic_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("total.parquet");
        write_parquet_atomic(&path, &sample(), &WriterConfig::default()).unwrap();

        let names: Vec<String> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["total.parquet".to_string()]);

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"PAR1");
    }

    #[test]
    fn test_next_chunk_path_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            next_chunk_path(dir.path()).unwrap(),
            dir.path().join("chunk-00000.parquet")
        );
        fs::write(dir.path().join("chunk-00004.parquet"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        assert_eq!(
            next_chunk_path(dir.path()).unwrap(),
            dir.path().join("chunk-00005.parquet")
        );
    }

    #[test]
    fn test_write_partitioned_groups_and_strips_keys() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_partitioned(
            dir.path(),
            &sample(),
            &["country", "part"],
            &WriterConfig::default(),
        )
        .unwrap();

        assert_eq!(written.len(), 3);
        assert_eq!(
            written[0],
            dir.path().join("country=us").join("part=0").join("chunk-00000.parquet")
        );
        assert!(written[2].to_string_lossy().contains("country=__HIVE_DEFAULT_PARTITION__"));

        let us = read_parquet_file(&written[0]).unwrap();
        assert_eq!(us[0].num_rows(), 2);
        assert_eq!(us[0].num_columns(), 1);
        assert_eq!(us[0].schema().field(0).name(), "name");
    }

    #[test]
    fn test_write_partitioned_is_additive() {
        let dir = tempfile::tempdir().unwrap();
        let config = WriterConfig::default();
        write_partitioned(dir.path(), &sample(), &["country"], &config).unwrap();
        let second = write_partitioned(dir.path(), &sample(), &["country"], &config).unwrap();
        assert_eq!(
            second[0],
            dir.path().join("country=us").join("chunk-00001.parquet")
        );
        assert!(dir.path().join("country=us").join("chunk-00000.parquet").exists());
    }

    #[test]
    fn test_missing_partition_column_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_partitioned(dir.path(), &sample(), &["state"], &WriterConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }
}
