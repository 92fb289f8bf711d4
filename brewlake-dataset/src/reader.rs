//! Parquet file reading utilities.

use std::fs::File;
use std::path::Path;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use brewlake_result::{Error, Result};
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};

fn open_builder(path: &Path) -> Result<ParquetRecordBatchReaderBuilder<File>> {
    let file = File::open(path).map_err(|e| Error::storage("open", path, e))?;
    ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
        Error::decode(path, format!("failed to create Parquet reader: {e}"))
    })
}

/// Read only the Arrow schema stored in a Parquet footer.
pub fn read_parquet_schema(path: &Path) -> Result<SchemaRef> {
    Ok(open_builder(path)?.schema().clone())
}

/// Open a streaming reader yielding batches of at most `batch_size` rows.
pub fn open_parquet_reader(path: &Path, batch_size: usize) -> Result<ParquetRecordBatchReader> {
    open_builder(path)?
        .with_batch_size(batch_size.max(1))
        .build()
        .map_err(|e| Error::decode(path, format!("failed to build Parquet reader: {e}")))
}

/// Read a whole Parquet file into memory.
pub fn read_parquet_file(path: &Path) -> Result<Vec<RecordBatch>> {
    let reader = open_parquet_reader(path, 8192)?;

    let mut batches = Vec::new();
    for batch_result in reader {
        let batch = batch_result
            .map_err(|e| Error::decode(path, format!("failed to read Parquet batch: {e}")))?;
        batches.push(batch);
    }

    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{WriterConfig, write_parquet_atomic};
    use arrow::array::{StringArray, UInt64Array};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    #[test]
    fn test_read_parquet_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::UInt64, false),
            Field::new("name", DataType::Utf8, false),
        ]));

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(UInt64Array::from(vec![1, 2, 3])),
                Arc::new(StringArray::from(vec!["a", "b", "c"])),
            ],
        )
        .unwrap();

        write_parquet_atomic(&path, &batch, &WriterConfig::default()).unwrap();

        let batches = read_parquet_file(&path).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].num_rows(), 3);
        assert_eq!(read_parquet_schema(&path).unwrap().fields().len(), 2);
    }

    #[test]
    fn test_reader_respects_batch_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.parquet");
        let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::UInt64, false)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(UInt64Array::from((0..10).collect::<Vec<u64>>()))],
        )
        .unwrap();
        write_parquet_atomic(&path, &batch, &WriterConfig::default()).unwrap();

        let sizes: Vec<usize> = open_parquet_reader(&path, 4)
            .unwrap()
            .map(|b| b.unwrap().num_rows())
            .collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_missing_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_parquet_file(&dir.path().join("nope.parquet")).unwrap_err();
        assert!(matches!(err, Error::Storage { op: "open", .. }));
    }
}
