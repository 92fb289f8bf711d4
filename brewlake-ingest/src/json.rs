//! Decoding raw JSON files into loose records.

use std::path::Path;

use brewlake_result::{Error, Result};
use serde_json::{Deserializer, Map, Value};

/// One decoded upstream object, keyed by field name.
pub type RawRecord = Map<String, Value>;

fn into_record(value: Value, path: &Path) -> Result<RawRecord> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Array(_) => Err(Error::decode(path, "expected a JSON object, found an array")),
        other => Err(Error::decode(
            path,
            format!("expected a JSON object, found {other}"),
        )),
    }
}

/// Decode `text` read from `path`.
///
/// Accepts one JSON array of objects, or a stream of objects separated by
/// whitespace (newline-delimited JSON). Empty input has no records.
pub fn parse_raw_records(text: &str, path: &Path) -> Result<Vec<RawRecord>> {
    let text = text.trim_start_matches('\u{feff}').trim_start();
    if text.starts_with('[') {
        let values: Vec<Value> = serde_json::from_str(text).map_err(|e| Error::decode(path, e))?;
        return values.into_iter().map(|v| into_record(v, path)).collect();
    }

    let mut records = Vec::new();
    for value in Deserializer::from_str(text).into_iter::<Value>() {
        let value = value.map_err(|e| Error::decode(path, e))?;
        records.push(into_record(value, path)?);
    }
    Ok(records)
}

/// Read and decode one raw file.
pub fn read_raw_records(path: &Path) -> Result<Vec<RawRecord>> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::storage("read", path, e))?;
    parse_raw_records(&text, path)
}
