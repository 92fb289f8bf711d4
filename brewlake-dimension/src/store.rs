//! Persisted dimension mappings.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, RecordBatch, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema};
use brewlake_dataset::{WriterConfig, read_parquet_file, read_parquet_schema, write_parquet_atomic};
use brewlake_result::{Error, Result};
use brewlake_types::RunContext;
use brewlake_types::schema::{BREWERY_TYPE, CITY, COUNTRY, STATE};
use rustc_hash::FxHashMap;

use crate::normalize::normalize_str;

/// Suffix of the normalized column paired with every dimension column.
pub const NORM_SUFFIX: &str = "_norm";

/// The categorical columns resolved through a dimension store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Country,
    State,
    City,
    BreweryType,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Country,
        Dimension::State,
        Dimension::City,
        Dimension::BreweryType,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Dimension::Country => COUNTRY,
            Dimension::State => STATE,
            Dimension::City => CITY,
            Dimension::BreweryType => BREWERY_TYPE,
        }
    }

    pub fn norm_column(self) -> String {
        norm_column(self.column())
    }

    /// File name of the store inside a dimension directory.
    pub fn file_name(self) -> String {
        format!("dim_{}.parquet", self.column())
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

fn norm_column(original_col: &str) -> String {
    format!("{original_col}{NORM_SUFFIX}")
}

/// Locations of the four dimension stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionPaths {
    country: PathBuf,
    state: PathBuf,
    city: PathBuf,
    brewery_type: PathBuf,
}

impl DimensionPaths {
    /// Stores named `dim_<column>.parquet` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            country: dir.join(Dimension::Country.file_name()),
            state: dir.join(Dimension::State.file_name()),
            city: dir.join(Dimension::City.file_name()),
            brewery_type: dir.join(Dimension::BreweryType.file_name()),
        }
    }

    pub fn with_path(mut self, dimension: Dimension, path: impl Into<PathBuf>) -> Self {
        *self.slot(dimension) = path.into();
        self
    }

    pub fn get(&self, dimension: Dimension) -> &Path {
        match dimension {
            Dimension::Country => &self.country,
            Dimension::State => &self.state,
            Dimension::City => &self.city,
            Dimension::BreweryType => &self.brewery_type,
        }
    }

    fn slot(&mut self, dimension: Dimension) -> &mut PathBuf {
        match dimension {
            Dimension::Country => &mut self.country,
            Dimension::State => &mut self.state,
            Dimension::City => &mut self.city,
            Dimension::BreweryType => &mut self.brewery_type,
        }
    }
}

/// Outcome of [`update_dimension`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub path: PathBuf,
    /// Rows in the incoming batch.
    pub rows_in: usize,
    /// Incoming rows with both sides of the mapping present.
    pub rows_valid: usize,
    /// Mappings in the store after the write.
    pub rows_persisted: usize,
    /// Whether an existing store was discarded because it could not be used.
    pub reset: bool,
}

fn utf8_column(batch: &RecordBatch, name: &str) -> Result<Option<StringArray>> {
    let Some(array) = batch.column_by_name(name) else {
        return Ok(None);
    };
    let as_text = cast(array, &DataType::Utf8)?;
    as_text
        .as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .map(Some)
        .ok_or_else(|| Error::Internal(format!("column '{name}' did not cast to Utf8")))
}

/// Read every non-null (original, normalized) pair of a persisted store.
fn read_pairs(path: &Path, original_col: &str) -> Result<Vec<(String, String)>> {
    let norm_col = norm_column(original_col);
    let schema = read_parquet_schema(path)?;
    brewlake_types::require_columns(
        &schema,
        &[original_col, norm_col.as_str()],
        &format!("dimension store {}", path.display()),
    )?;

    let mut pairs = Vec::new();
    for batch in read_parquet_file(path)? {
        let (Some(originals), Some(norms)) = (
            utf8_column(&batch, original_col)?,
            utf8_column(&batch, &norm_col)?,
        ) else {
            return Err(Error::schema(
                format!("dimension store {}", path.display()),
                [original_col.to_string(), norm_col.clone()],
            ));
        };
        for row in 0..batch.num_rows() {
            if originals.is_valid(row) && norms.is_valid(row) {
                pairs.push((originals.value(row).to_string(), norms.value(row).to_string()));
            }
        }
    }
    Ok(pairs)
}

fn mapping_batch(original_col: &str, merged: &BTreeMap<String, String>) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new(original_col, DataType::Utf8, true),
        Field::new(norm_column(original_col), DataType::Utf8, true),
    ]));
    let originals: ArrayRef = Arc::new(StringArray::from_iter_values(merged.keys()));
    let norms: ArrayRef = Arc::new(StringArray::from_iter_values(merged.values()));
    Ok(RecordBatch::try_new(schema, vec![originals, norms])?)
}

/// Merge the mappings in `mappings` into the store at `filepath`.
///
/// `mappings` must hold `original_col`; `<original_col>_norm` is used when
/// present and derived with [`normalize_str`] otherwise. Pairs with a null on
/// either side are dropped. The existing store is read first and incoming
/// pairs applied after it, so a conflicting original takes the newest
/// normalized value. An existing store that cannot be read, or that lacks
/// either column, is replaced by the incoming pairs. The result is sorted by
/// original value and written in full.
pub fn update_dimension(
    mappings: &RecordBatch,
    original_col: &str,
    filepath: &Path,
    ctx: &RunContext,
) -> Result<UpdateReport> {
    let _guard = ctx.enter();

    if mappings.num_rows() == 0 {
        return Err(Error::InvalidArgumentError(format!(
            "dimension update for '{original_col}' received no rows"
        )));
    }
    let Some(originals) = utf8_column(mappings, original_col)? else {
        return Err(Error::schema(
            format!("dimension update for {}", filepath.display()),
            [original_col],
        ));
    };
    let norms = utf8_column(mappings, &norm_column(original_col))?;

    let mut incoming = Vec::with_capacity(originals.len());
    for row in 0..originals.len() {
        if originals.is_null(row) {
            continue;
        }
        let original = originals.value(row);
        let normalized = match &norms {
            Some(norms) if norms.is_null(row) => continue,
            Some(norms) => norms.value(row).to_string(),
            None => normalize_str(original),
        };
        incoming.push((original.to_string(), normalized));
    }

    let mut reset = false;
    let existing = if filepath.exists() {
        match read_pairs(filepath, original_col) {
            Ok(pairs) => pairs,
            Err(err) => {
                tracing::warn!(
                    path = %filepath.display(),
                    error = %err,
                    "dimension store unusable; rewriting from incoming mappings"
                );
                reset = true;
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let rows_valid = incoming.len();
    let merged: BTreeMap<String, String> = existing.into_iter().chain(incoming).collect();

    let batch = mapping_batch(original_col, &merged)?;
    write_parquet_atomic(filepath, &batch, &WriterConfig::default())?;

    tracing::info!(
        dimension = original_col,
        path = %filepath.display(),
        rows_in = mappings.num_rows(),
        rows_valid,
        rows_persisted = merged.len(),
        "dimension store updated"
    );

    Ok(UpdateReport {
        path: filepath.to_path_buf(),
        rows_in: mappings.num_rows(),
        rows_valid,
        rows_persisted: merged.len(),
        reset,
    })
}

/// In-memory lookup table loaded from a persisted store.
#[derive(Debug, Clone, Default)]
pub struct DimensionStore {
    map: FxHashMap<String, String>,
}

impl DimensionStore {
    /// Load the store at `path` whose original column is `original_col`.
    ///
    /// A store that is missing or cannot be read is a configuration error:
    /// facts cannot be resolved without it.
    pub fn load(path: &Path, original_col: &str) -> Result<Self> {
        if !path.exists() {
            return Err(Error::InvalidArgumentError(format!(
                "dimension store {} does not exist",
                path.display()
            )));
        }
        let pairs = read_pairs(path, original_col).map_err(|e| {
            Error::InvalidArgumentError(format!(
                "dimension store {} is unreadable: {e}",
                path.display()
            ))
        })?;
        Ok(Self {
            map: pairs.into_iter().collect(),
        })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            map: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn lookup(&self, original: &str) -> Option<&str> {
        self.map.get(original).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Resolve every value of `values`; null and unmapped values become null.
    ///
    /// Returns the resolved array and the number of rows left unresolved.
    pub fn resolve(&self, values: &ArrayRef) -> Result<(StringArray, usize)> {
        let as_text = cast(values, &DataType::Utf8)?;
        let text = as_text
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| Error::Internal("dimension values did not cast to Utf8".into()))?;
        let resolved: StringArray = text
            .iter()
            .map(|value| value.and_then(|v| self.lookup(v)))
            .collect();
        let misses = resolved.null_count();
        Ok((resolved, misses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(columns: Vec<(&str, Vec<Option<&str>>)>) -> RecordBatch {
        RecordBatch::try_from_iter(
            columns
                .into_iter()
                .map(|(name, values)| (name, Arc::new(StringArray::from(values)) as ArrayRef)),
        )
        .unwrap()
    }

    #[test]
    fn paths_follow_dimension_names() {
        let paths = DimensionPaths::in_dir("/lake/dim");
        assert_eq!(
            paths.get(Dimension::BreweryType),
            Path::new("/lake/dim/dim_brewery_type.parquet")
        );
        let paths = paths.with_path(Dimension::City, "/elsewhere/cities.parquet");
        assert_eq!(paths.get(Dimension::City), Path::new("/elsewhere/cities.parquet"));
        assert_eq!(Dimension::State.norm_column(), "state_norm");
    }

    #[test]
    fn derives_missing_norm_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dim_state.parquet");
        let input = batch(vec![("state", vec![Some("São Paulo"), None, Some("California")])]);

        let report = update_dimension(&input, "state", &path, &RunContext::detached()).unwrap();
        assert_eq!(report.rows_in, 3);
        assert_eq!(report.rows_valid, 2);
        assert_eq!(report.rows_persisted, 2);

        let store = DimensionStore::load(&path, "state").unwrap();
        assert_eq!(store.lookup("São Paulo"), Some("sao_paulo"));
        assert_eq!(store.lookup("California"), Some("california"));
    }

    #[test]
    fn empty_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = batch(vec![("city", vec![])]);
        let path = dir.path().join("d.parquet");
        let err = update_dimension(&input, "city", &path, &RunContext::detached()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgumentError(_)));
    }

    #[test]
    fn missing_original_column_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = batch(vec![("town", vec![Some("x")])]);
        let path = dir.path().join("d.parquet");
        let err = update_dimension(&input, "city", &path, &RunContext::detached()).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn resolve_counts_misses() {
        let store = DimensionStore::from_pairs([("US", "us"), ("Brazil", "brazil")]);
        let values: ArrayRef = Arc::new(StringArray::from(vec![Some("US"), None, Some("Peru")]));
        let (resolved, misses) = store.resolve(&values).unwrap();
        assert_eq!(misses, 2);
        assert_eq!(resolved.value(0), "us");
        assert!(resolved.is_null(1));
        assert!(resolved.is_null(2));
    }

    #[test]
    fn load_missing_store_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DimensionStore::load(&dir.path().join("dim_city.parquet"), "city").unwrap_err();
        assert_eq!(err.kind(), brewlake_result::ErrorKind::Configuration);
    }
}
