//! Incremental distinct-name counting per aggregation key.

use std::cmp::Ordering;
use std::sync::{Arc, OnceLock};

use arrow::array::{Array, ArrayRef, RecordBatch, StringArray, UInt64Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use brewlake_result::{Error, Result};
use brewlake_types::AGGREGATION_KEY_COLUMNS;
use brewlake_types::schema::{COUNT, NAME};
use rustc_hash::{FxHashMap, FxHashSet};

/// Values of (country, state, city, brewery_type); null values form their own group.
pub type GroupKey = [Option<String>; 4];

/// Shape of the gold summary.
pub fn gold_schema() -> SchemaRef {
    static SCHEMA: OnceLock<SchemaRef> = OnceLock::new();
    Arc::clone(SCHEMA.get_or_init(|| {
        let mut fields: Vec<Field> = AGGREGATION_KEY_COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Utf8, true))
            .collect();
        fields.push(Field::new(COUNT, DataType::UInt64, false));
        Arc::new(Schema::new(fields))
    }))
}

#[derive(Debug, Default)]
struct GroupState {
    count: u64,
    names: FxHashSet<String>,
}

fn utf8(batch: &RecordBatch, column: &str) -> Result<StringArray> {
    let array = batch
        .column_by_name(column)
        .ok_or_else(|| Error::schema("fact chunk", [column]))?;
    cast(array, &DataType::Utf8)?
        .as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .ok_or_else(|| Error::Internal(format!("column '{column}' did not cast to Utf8")))
}

fn cmp_nulls_last(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn cmp_keys(a: &GroupKey, b: &GroupKey) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| cmp_nulls_last(x, y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Running count of distinct names per aggregation key.
///
/// A name adds to a key's count only the first time it is seen under that
/// key, so the result does not depend on how rows are split into chunks or
/// in what order chunks arrive. Rows with a null name are not counted.
#[derive(Debug, Default)]
pub struct GroupCounter {
    groups: FxHashMap<GroupKey, GroupState>,
    rows_seen: usize,
}

impl GroupCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one chunk into the counts.
    pub fn observe(&mut self, chunk: &RecordBatch) -> Result<()> {
        let keys = AGGREGATION_KEY_COLUMNS
            .iter()
            .map(|column| utf8(chunk, column))
            .collect::<Result<Vec<_>>>()?;
        let names = utf8(chunk, NAME)?;

        for row in 0..chunk.num_rows() {
            if names.is_null(row) {
                continue;
            }
            let key: GroupKey = std::array::from_fn(|i| {
                keys[i].is_valid(row).then(|| keys[i].value(row).to_string())
            });
            let state = self.groups.entry(key).or_default();
            let name = names.value(row);
            if !state.names.contains(name) {
                state.names.insert(name.to_string());
                state.count += 1;
            }
        }
        self.rows_seen += chunk.num_rows();
        Ok(())
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn rows_seen(&self) -> usize {
        self.rows_seen
    }

    pub fn count(&self, key: &GroupKey) -> Option<u64> {
        self.groups.get(key).map(|g| g.count)
    }

    /// Counts sorted by count descending, ties by key ascending with nulls last.
    pub fn finish(self) -> Vec<(GroupKey, u64)> {
        let mut out: Vec<(GroupKey, u64)> = self
            .groups
            .into_iter()
            .map(|(key, state)| (key, state.count))
            .collect();
        out.sort_by(|(ka, ca), (kb, cb)| cb.cmp(ca).then_with(|| cmp_keys(ka, kb)));
        out
    }
}

/// Gold summary batch from sorted counts.
pub fn summary_batch(rows: &[(GroupKey, u64)]) -> Result<RecordBatch> {
    let mut columns: Vec<ArrayRef> = (0..AGGREGATION_KEY_COLUMNS.len())
        .map(|i| {
            Arc::new(
                rows.iter()
                    .map(|(key, _)| key[i].as_deref())
                    .collect::<StringArray>(),
            ) as ArrayRef
        })
        .collect();
    columns.push(Arc::new(UInt64Array::from_iter_values(
        rows.iter().map(|(_, count)| *count),
    )));
    Ok(RecordBatch::try_new(gold_schema(), columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(rows: &[(&str, &str, &str, Option<&str>, Option<&str>)]) -> RecordBatch {
        let col = |f: fn(&(&str, &str, &str, Option<&str>, Option<&str>)) -> Option<String>| {
            Arc::new(rows.iter().map(f).collect::<StringArray>()) as ArrayRef
        };
        RecordBatch::try_from_iter(vec![
            ("country", col(|r| Some(r.0.to_string()))),
            ("state", col(|r| Some(r.1.to_string()))),
            ("city", col(|r| Some(r.2.to_string()))),
            ("brewery_type", col(|r| r.3.map(str::to_string))),
            ("name", col(|r| r.4.map(str::to_string))),
        ])
        .unwrap()
    }

    fn key(city: &str, brewery_type: Option<&str>) -> GroupKey {
        [
            Some("us".into()),
            Some("ca".into()),
            Some(city.into()),
            brewery_type.map(Into::into),
        ]
    }

    #[test]
    fn names_repeated_across_chunks_count_once() {
        let mut counter = GroupCounter::new();
        counter
            .observe(&chunk(&[
                ("us", "ca", "sf", Some("micro"), Some("A")),
                ("us", "ca", "sf", Some("micro"), Some("A")),
            ]))
            .unwrap();
        counter
            .observe(&chunk(&[("us", "ca", "sf", Some("micro"), Some("B"))]))
            .unwrap();
        counter
            .observe(&chunk(&[("us", "ca", "sf", Some("micro"), Some("A"))]))
            .unwrap();
        assert_eq!(counter.count(&key("sf", Some("micro"))), Some(2));
        assert_eq!(counter.rows_seen(), 4);
    }

    #[test]
    fn null_keys_group_and_null_names_skip() {
        let mut counter = GroupCounter::new();
        counter
            .observe(&chunk(&[
                ("us", "ca", "sf", None, Some("A")),
                ("us", "ca", "sf", None, Some("B")),
                ("us", "ca", "sf", None, None),
            ]))
            .unwrap();
        assert_eq!(counter.count(&key("sf", None)), Some(2));
        assert_eq!(counter.group_count(), 1);
    }

    #[test]
    fn finish_orders_by_count_then_key() {
        let mut counter = GroupCounter::new();
        counter
            .observe(&chunk(&[
                ("us", "ca", "b", Some("micro"), Some("x")),
                ("us", "ca", "a", Some("micro"), Some("x")),
                ("us", "ca", "c", Some("micro"), Some("x")),
                ("us", "ca", "c", Some("micro"), Some("y")),
                ("us", "ca", "a", None, Some("x")),
            ]))
            .unwrap();
        let rows = counter.finish();
        let order: Vec<(Option<&str>, Option<&str>, u64)> = rows
            .iter()
            .map(|(k, c)| (k[2].as_deref(), k[3].as_deref(), *c))
            .collect();
        assert_eq!(
            order,
            vec![
                (Some("c"), Some("micro"), 2),
                (Some("a"), Some("micro"), 1),
                (Some("a"), None, 1),
                (Some("b"), Some("micro"), 1),
            ]
        );

        let batch = summary_batch(&rows).unwrap();
        assert_eq!(batch.schema(), gold_schema());
        assert_eq!(batch.num_rows(), 4);
    }

    #[test]
    fn missing_key_column_is_schema_error() {
        let batch = chunk(&[("us", "ca", "sf", Some("micro"), Some("A"))])
            .project(&[0, 1, 2, 4])
            .unwrap();
        let err = GroupCounter::new().observe(&batch).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }
}
