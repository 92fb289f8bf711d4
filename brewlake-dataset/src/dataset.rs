//! Discovery and chunked scans over a partitioned directory tree.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, RecordBatch, StringArray, new_null_array};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use brewlake_result::{Error, Result};
use parquet::arrow::arrow_reader::ParquetRecordBatchReader;
use rustc_hash::FxHashMap;
use walkdir::WalkDir;

use crate::is_hidden_name;
use crate::partition::PartitionPath;
use crate::reader::{open_parquet_reader, read_parquet_schema};

/// One Parquet file of a dataset together with the partition values in its path.
#[derive(Debug, Clone)]
pub struct DataFile {
    pub path: PathBuf,
    pub partition: PartitionPath,
    pub schema: SchemaRef,
}

/// A Hive-style partitioned dataset rooted at a directory.
///
/// The dataset schema is the union of every file's columns (first-seen order)
/// followed by the partition columns found in paths. Partition columns are
/// Utf8 and take precedence over a stored column of the same name. Columns a
/// file lacks are read as nulls.
#[derive(Debug, Clone)]
pub struct PartitionedDataset {
    root: PathBuf,
    files: Vec<DataFile>,
    schema: SchemaRef,
}

impl PartitionedDataset {
    /// Discover every visible file below `root`.
    ///
    /// A missing root yields an empty dataset rather than an error; use
    /// [`Path::exists`] first when absence must be told apart from emptiness.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut files = Vec::new();

        if root.is_dir() {
            let walker = WalkDir::new(&root)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| {
                    entry.depth() == 0 || !is_hidden_name(&entry.file_name().to_string_lossy())
                });
            for entry in walker {
                let entry = entry.map_err(|e| {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                    Error::storage("walk", path, e.into())
                })?;
                let is_parquet = entry.path().extension().is_some_and(|ext| ext == "parquet");
                if !entry.file_type().is_file() || !is_parquet {
                    continue;
                }
                let path = entry.into_path();
                let schema = read_parquet_schema(&path)?;
                let partition = PartitionPath::from_file(&root, &path);
                files.push(DataFile {
                    path,
                    partition,
                    schema,
                });
            }
        }

        let schema = unify_schema(&files)?;
        tracing::debug!(
            root = %root.display(),
            files = files.len(),
            columns = schema.fields().len(),
            "opened partitioned dataset"
        );

        Ok(Self {
            root,
            files,
            schema,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[DataFile] {
        &self.files
    }

    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Stream the dataset as batches of at most `chunk_size` rows.
    pub fn scan(&self, chunk_size: usize) -> DatasetScan {
        DatasetScan {
            schema: Arc::clone(&self.schema),
            pending: self.files.iter().cloned().collect(),
            current: None,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Read the whole dataset into one batch shaped like [`Self::schema`].
    pub fn read_all(&self, chunk_size: usize) -> Result<RecordBatch> {
        let batches = self.scan(chunk_size).collect::<Result<Vec<_>>>()?;
        Ok(concat_batches(&self.schema, &batches)?)
    }
}

fn unify_schema(files: &[DataFile]) -> Result<SchemaRef> {
    let mut partition_columns: Vec<String> = Vec::new();
    for file in files {
        for (column, _) in file.partition.segments() {
            if !partition_columns.contains(column) {
                partition_columns.push(column.clone());
            }
        }
    }

    let mut fields: Vec<Field> = Vec::new();
    let mut position: FxHashMap<String, usize> = FxHashMap::default();
    for file in files {
        for field in file.schema.fields() {
            if partition_columns.contains(field.name()) {
                continue;
            }
            match position.get(field.name()) {
                None => {
                    position.insert(field.name().clone(), fields.len());
                    fields.push(Field::new(field.name(), field.data_type().clone(), true));
                }
                Some(&idx) => {
                    let existing = fields[idx].data_type();
                    if existing == &DataType::Null && field.data_type() != &DataType::Null {
                        fields[idx] = Field::new(field.name(), field.data_type().clone(), true);
                    } else if existing != field.data_type()
                        && field.data_type() != &DataType::Null
                        && !arrow::compute::can_cast_types(field.data_type(), existing)
                    {
                        return Err(Error::InvalidArgumentError(format!(
                            "column '{}' has incompatible types {:?} and {:?} in {}",
                            field.name(),
                            existing,
                            field.data_type(),
                            file.path.display()
                        )));
                    }
                }
            }
        }
    }

    for column in partition_columns {
        fields.push(Field::new(column, DataType::Utf8, true));
    }

    Ok(Arc::new(Schema::new(fields)))
}

/// Iterator over a dataset's rows, one file at a time.
pub struct DatasetScan {
    schema: SchemaRef,
    pending: VecDeque<DataFile>,
    current: Option<(DataFile, ParquetRecordBatchReader)>,
    chunk_size: usize,
}

impl DatasetScan {
    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }
}

/// Project a file batch onto the dataset schema.
fn conform(schema: &SchemaRef, file: &DataFile, batch: RecordBatch) -> Result<RecordBatch> {
    let rows = batch.num_rows();
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        if let Some((_, value)) = file
            .partition
            .segments()
            .iter()
            .find(|(column, _)| column == field.name())
        {
            let array = match value {
                Some(v) => StringArray::from(vec![v.as_str(); rows]),
                None => StringArray::from(vec![None::<&str>; rows]),
            };
            columns.push(Arc::new(array));
            continue;
        }

        let column = match batch.column_by_name(field.name()) {
            Some(array) if array.data_type() == field.data_type() => Arc::clone(array),
            Some(array) => cast(array, field.data_type())?,
            None => new_null_array(field.data_type(), rows),
        };
        columns.push(column);
    }
    Ok(RecordBatch::try_new(Arc::clone(schema), columns)?)
}

impl Iterator for DatasetScan {
    type Item = Result<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                let file = self.pending.pop_front()?;
                match open_parquet_reader(&file.path, self.chunk_size) {
                    Ok(reader) => self.current = Some((file, reader)),
                    Err(e) => return Some(Err(e)),
                }
            }

            let (file, reader) = self.current.as_mut()?;
            match reader.next() {
                Some(Ok(batch)) => return Some(conform(&self.schema, file, batch)),
                Some(Err(e)) => {
                    let path = file.path.clone();
                    self.current = None;
                    return Some(Err(Error::decode(path, e)));
                }
                None => self.current = None,
            }
        }
    }
}
