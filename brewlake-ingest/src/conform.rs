//! Conforming loose records to the raw entity schema.

use std::collections::BTreeSet;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, RecordBatch, RecordBatchOptions, StringArray};
use arrow::datatypes::{DataType, Schema};
use brewlake_result::Result;
use brewlake_types::raw_schema;
use serde_json::Value;

use crate::json::RawRecord;

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        nested => Some(nested.to_string()),
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Build a batch holding every entity column seen in at least one record.
///
/// Columns keep the canonical entity order. Text columns take strings as is
/// and stringify numbers and booleans; coordinate columns take numbers or
/// numeric strings, anything else becoming null. Keys outside the entity
/// shape are dropped, and entity columns no record mentions are left out of
/// the batch entirely.
pub fn conform_records(records: &[RawRecord]) -> Result<RecordBatch> {
    let raw = raw_schema();
    let mut present = vec![false; raw.fields().len()];
    let mut unknown: BTreeSet<&str> = BTreeSet::new();
    for record in records {
        for key in record.keys() {
            match raw.index_of(key) {
                Ok(idx) => present[idx] = true,
                Err(_) => {
                    unknown.insert(key.as_str());
                }
            }
        }
    }
    if !unknown.is_empty() {
        tracing::debug!(columns = ?unknown, "ignoring columns outside the entity schema");
    }

    let mut fields = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();
    for (field, _) in raw.fields().iter().zip(&present).filter(|(_, seen)| **seen) {
        let name = field.name().as_str();
        let values = records.iter().map(|record| record.get(name));
        let column: ArrayRef = match field.data_type() {
            DataType::Float64 => Arc::new(
                values
                    .map(|v| v.and_then(as_float))
                    .collect::<Float64Array>(),
            ),
            _ => Arc::new(values.map(|v| v.and_then(as_text)).collect::<StringArray>()),
        };
        fields.push(Arc::clone(field));
        columns.push(column);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(records.len()));
    Ok(RecordBatch::try_new_with_options(
        Arc::new(Schema::new(fields)),
        columns,
        &options,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use serde_json::json;

    fn records(values: Value) -> Vec<RawRecord> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn stringifies_text_and_parses_coordinates() {
        let batch = conform_records(&records(json!([
            {"name": "Alpha", "postal_code": 94107, "latitude": "37.77", "longitude": -122.4},
            {"name": null, "postal_code": "13083", "latitude": "n/a", "extra": true}
        ])))
        .unwrap();

        let schema = batch.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["name", "postal_code", "latitude", "longitude"]);

        let postal = batch
            .column_by_name("postal_code")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(postal.value(0), "94107");
        assert_eq!(postal.value(1), "13083");

        let lat = batch
            .column_by_name("latitude")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(lat.value(0), 37.77);
        assert!(lat.is_null(1));

        assert!(batch.column_by_name("name").unwrap().is_null(1));
        assert!(batch.column_by_name("longitude").unwrap().is_null(1));
    }

    #[test]
    fn unseen_columns_are_absent() {
        let batch = conform_records(&records(json!([{"name": "x", "city": "y"}]))).unwrap();
        assert!(batch.column_by_name("country").is_none());
        assert_eq!(batch.num_columns(), 2);
    }

    #[test]
    fn no_records_gives_empty_batch() {
        let batch = conform_records(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 0);
    }
}
