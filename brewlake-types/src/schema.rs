//! Fixed brewery entity schema.
//!
//! Raw records and fact files share one column vocabulary. The raw schema holds
//! every known entity column; fact files drop `country` and `state`, which live
//! in the partition path next to `batch` and `part`.

use std::sync::{Arc, OnceLock};

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use brewlake_result::{Error, Result};

pub const ID: &str = "id";
pub const NAME: &str = "name";
pub const BREWERY_TYPE: &str = "brewery_type";
pub const ADDRESS_1: &str = "address_1";
pub const ADDRESS_2: &str = "address_2";
pub const ADDRESS_3: &str = "address_3";
pub const CITY: &str = "city";
pub const STATE_PROVINCE: &str = "state_province";
pub const POSTAL_CODE: &str = "postal_code";
pub const COUNTRY: &str = "country";
pub const STATE: &str = "state";
pub const STREET: &str = "street";
pub const WEBSITE_URL: &str = "website_url";
pub const PHONE: &str = "phone";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";

/// Partition column naming the ingestion run.
pub const BATCH: &str = "batch";
/// Partition column naming the shard of a run.
pub const PART: &str = "part";

/// Output column of the gold summary.
pub const COUNT: &str = "count";

/// Columns that must be present (and, apart from `brewery_type`, non-null) for a
/// record to reach the fact store.
pub const REQUIRED_COLUMNS: [&str; 5] = [NAME, COUNTRY, STATE, CITY, BREWERY_TYPE];

/// Columns defining "the same real-world entity" within a batch.
pub const IDENTITY_COLUMNS: [&str; 5] = [NAME, COUNTRY, STATE, CITY, BREWERY_TYPE];

/// Group-by key of the gold summary.
pub const AGGREGATION_KEY_COLUMNS: [&str; 4] = [COUNTRY, STATE, CITY, BREWERY_TYPE];

/// Partition columns of the fact layout, outermost first.
pub const FACT_PARTITION_COLUMNS: [&str; 4] = [BATCH, COUNTRY, STATE, PART];

/// Free-text columns stored as Utf8.
pub const TEXT_COLUMNS: [&str; 14] = [
    ID,
    NAME,
    BREWERY_TYPE,
    ADDRESS_1,
    ADDRESS_2,
    ADDRESS_3,
    CITY,
    STATE_PROVINCE,
    POSTAL_CODE,
    COUNTRY,
    STATE,
    STREET,
    WEBSITE_URL,
    PHONE,
];

/// Coordinates stored as Float64.
pub const NUMERIC_COLUMNS: [&str; 2] = [LATITUDE, LONGITUDE];

/// Canonical column order of a raw entity record.
const RAW_COLUMN_ORDER: [&str; 16] = [
    ID,
    NAME,
    BREWERY_TYPE,
    ADDRESS_1,
    ADDRESS_2,
    ADDRESS_3,
    CITY,
    STATE_PROVINCE,
    POSTAL_CODE,
    COUNTRY,
    STATE,
    STREET,
    WEBSITE_URL,
    PHONE,
    LATITUDE,
    LONGITUDE,
];

/// Arrow type of a known entity column, or `None` for columns outside the entity shape.
pub fn column_type(name: &str) -> Option<DataType> {
    if NUMERIC_COLUMNS.contains(&name) {
        Some(DataType::Float64)
    } else if TEXT_COLUMNS.contains(&name) {
        Some(DataType::Utf8)
    } else {
        None
    }
}

/// Field definition of a known entity column. All entity fields are nullable.
pub fn entity_field(name: &str) -> Option<Field> {
    column_type(name).map(|dt| Field::new(name, dt, true))
}

/// Every known entity column in canonical order.
pub fn raw_schema() -> SchemaRef {
    static SCHEMA: OnceLock<SchemaRef> = OnceLock::new();
    Arc::clone(SCHEMA.get_or_init(|| {
        let fields: Vec<Field> = RAW_COLUMN_ORDER
            .iter()
            .filter_map(|name| entity_field(name))
            .collect();
        Arc::new(Schema::new(fields))
    }))
}

/// Columns physically stored in fact data files.
pub fn fact_file_schema() -> SchemaRef {
    static SCHEMA: OnceLock<SchemaRef> = OnceLock::new();
    Arc::clone(SCHEMA.get_or_init(|| {
        let fields: Vec<Field> = RAW_COLUMN_ORDER
            .iter()
            .filter(|name| !FACT_PARTITION_COLUMNS.contains(name))
            .filter_map(|name| entity_field(name))
            .collect();
        Arc::new(Schema::new(fields))
    }))
}

/// Columns from `required` that `schema` does not contain, in the order given.
pub fn missing_columns(schema: &Schema, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|col| schema.index_of(col).is_err())
        .map(|col| col.to_string())
        .collect()
}

/// Fail with [`Error::Schema`] when any of `required` is absent from `schema`.
pub fn require_columns(schema: &Schema, required: &[&str], context: &str) -> Result<()> {
    let missing = missing_columns(schema, required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::schema(context, missing))
    }
}
