//! Dimension-joined, partitioned fact writes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, RecordBatch, StringArray, UInt64Array};
use arrow::compute::filter_record_batch;
use arrow::datatypes::{DataType, Field, Schema};
use brewlake_dataset::{WriterConfig, write_partitioned};
use brewlake_dimension::{Dimension, DimensionPaths, DimensionStore};
use brewlake_result::{Error, Result};
use brewlake_types::schema::{BATCH, FACT_PARTITION_COLUMNS, NAME, PART};
use brewlake_types::{BatchId, REQUIRED_COLUMNS, RunContext, require_columns};

/// Loaded lookup tables for the four dimensions.
#[derive(Debug, Clone, Default)]
pub struct DimensionLookups {
    country: DimensionStore,
    state: DimensionStore,
    city: DimensionStore,
    brewery_type: DimensionStore,
}

impl DimensionLookups {
    /// Load every store named by `paths`. Any missing store is an error.
    pub fn load(paths: &DimensionPaths) -> Result<Self> {
        let load = |dim: Dimension| DimensionStore::load(paths.get(dim), dim.column());
        Ok(Self {
            country: load(Dimension::Country)?,
            state: load(Dimension::State)?,
            city: load(Dimension::City)?,
            brewery_type: load(Dimension::BreweryType)?,
        })
    }

    pub fn with_store(mut self, dimension: Dimension, store: DimensionStore) -> Self {
        match dimension {
            Dimension::Country => self.country = store,
            Dimension::State => self.state = store,
            Dimension::City => self.city = store,
            Dimension::BreweryType => self.brewery_type = store,
        }
        self
    }

    pub fn get(&self, dimension: Dimension) -> &DimensionStore {
        match dimension {
            Dimension::Country => &self.country,
            Dimension::State => &self.state,
            Dimension::City => &self.city,
            Dimension::BreweryType => &self.brewery_type,
        }
    }
}

/// Rows per dimension whose value had no normalized key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DimensionMisses {
    pub country: usize,
    pub state: usize,
    pub city: usize,
    pub brewery_type: usize,
}

impl DimensionMisses {
    fn record(&mut self, dimension: Dimension, misses: usize) {
        match dimension {
            Dimension::Country => self.country = misses,
            Dimension::State => self.state = misses,
            Dimension::City => self.city = misses,
            Dimension::BreweryType => self.brewery_type = misses,
        }
    }

    pub fn total(&self) -> usize {
        self.country + self.state + self.city + self.brewery_type
    }
}

/// Outcome of [`write_facts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactWriteReport {
    pub rows_in: usize,
    pub rows_written: usize,
    pub misses: DimensionMisses,
    pub files: Vec<PathBuf>,
}

impl FactWriteReport {
    pub fn rows_dropped(&self) -> usize {
        self.rows_in - self.rows_written
    }
}

/// Resolve, filter and append one batch of raw records to the fact store.
///
/// Loads the four dimension stores from `dims` and delegates to
/// [`write_facts_with`].
pub fn write_facts(
    batch: &RecordBatch,
    batch_id: &BatchId,
    part: usize,
    dims: &DimensionPaths,
    fact_root: &Path,
    ctx: &RunContext,
) -> Result<FactWriteReport> {
    require_columns(&batch.schema(), &REQUIRED_COLUMNS, "fact writer input")?;
    let lookups = DimensionLookups::load(dims)?;
    write_facts_with(batch, batch_id, part, &lookups, fact_root, ctx)
}

fn resolved_keys(
    resolved: &[(Dimension, StringArray)],
    dimension: Dimension,
) -> Result<&StringArray> {
    resolved
        .iter()
        .find(|(dim, _)| *dim == dimension)
        .map(|(_, keys)| keys)
        .ok_or_else(|| Error::Internal(format!("{dimension} keys were not resolved")))
}

fn valid_mask(arrays: &[&StringArray], rows: usize) -> BooleanArray {
    (0..rows)
        .map(|i| Some(arrays.iter().all(|a| a.is_valid(i))))
        .collect()
}

/// [`write_facts`] against already loaded lookups.
///
/// Records whose country, state or city do not resolve, or whose `name` is
/// null, are dropped; unresolved brewery types are kept with a null key. Each
/// (country, state) group is appended as a new file below
/// `batch=<id>/country=<c>/state=<s>/part=<part>/`; existing files are
/// never rewritten.
pub fn write_facts_with(
    batch: &RecordBatch,
    batch_id: &BatchId,
    part: usize,
    lookups: &DimensionLookups,
    fact_root: &Path,
    ctx: &RunContext,
) -> Result<FactWriteReport> {
    let _guard = ctx.enter();
    let schema = batch.schema();
    require_columns(&schema, &REQUIRED_COLUMNS, "fact writer input")?;
    if batch.num_rows() == 0 {
        return Err(Error::InvalidArgumentError(format!(
            "fact writer received no records for batch {batch_id} part {part}"
        )));
    }

    let mut misses = DimensionMisses::default();
    let mut resolved: Vec<(Dimension, StringArray)> = Vec::with_capacity(Dimension::ALL.len());
    for dim in Dimension::ALL {
        let values = batch
            .column_by_name(dim.column())
            .ok_or_else(|| Error::schema("fact writer input", [dim.column()]))?;
        let (keys, missed) = lookups.get(dim).resolve(values)?;
        misses.record(dim, missed);
        resolved.push((dim, keys));
    }
    if misses.total() > 0 {
        tracing::warn!(
            batch = %batch_id,
            part,
            country = misses.country,
            state = misses.state,
            city = misses.city,
            brewery_type = misses.brewery_type,
            "unresolved dimension values"
        );
    }

    let mut fields = Vec::with_capacity(schema.fields().len() + 2);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len() + 2);
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        if field.name() == BATCH || field.name() == PART {
            continue;
        }
        match resolved.iter().find(|(dim, _)| dim.column() == field.name()) {
            Some((_, keys)) => {
                fields.push(Arc::new(Field::new(field.name(), DataType::Utf8, true)));
                columns.push(Arc::new(keys.clone()));
            }
            None => {
                fields.push(Arc::clone(field));
                columns.push(Arc::clone(column));
            }
        }
    }

    let rows_in = batch.num_rows();
    fields.push(Arc::new(Field::new(BATCH, DataType::Utf8, false)));
    columns.push(Arc::new(StringArray::from(vec![batch_id.as_str(); rows_in])));
    fields.push(Arc::new(Field::new(PART, DataType::UInt64, false)));
    columns.push(Arc::new(UInt64Array::from(vec![part as u64; rows_in])));
    let joined = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;

    let names = arrow::compute::cast(
        batch
            .column_by_name(NAME)
            .ok_or_else(|| Error::schema("fact writer input", [NAME]))?,
        &DataType::Utf8,
    )?;
    let names = names
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::Internal("name column did not cast to Utf8".into()))?;
    let mask = valid_mask(
        &[
            resolved_keys(&resolved, Dimension::Country)?,
            resolved_keys(&resolved, Dimension::State)?,
            resolved_keys(&resolved, Dimension::City)?,
            names,
        ],
        rows_in,
    );
    let kept = filter_record_batch(&joined, &mask)?;

    if kept.num_rows() == 0 {
        return Err(Error::DataQuality(format!(
            "all {rows_in} records of batch {batch_id} part {part} lack a name \
             or a resolved country, state or city"
        )));
    }
    if misses.brewery_type > 0 {
        tracing::info!(
            batch = %batch_id,
            part,
            rows = misses.brewery_type,
            "keeping records without a brewery_type key"
        );
    }
    tracing::info!(
        batch = %batch_id,
        part,
        before = rows_in,
        after = kept.num_rows(),
        "filtered records missing identity keys"
    );

    let files = write_partitioned(
        fact_root,
        &kept,
        &FACT_PARTITION_COLUMNS,
        &WriterConfig::default(),
    )?;
    tracing::info!(
        batch = %batch_id,
        part,
        rows = kept.num_rows(),
        files = files.len(),
        "appended fact files"
    );

    Ok(FactWriteReport {
        rows_in,
        rows_written: kept.num_rows(),
        misses,
        files,
    })
}
