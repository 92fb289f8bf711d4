//! Builders for brewery record batches used across test suites.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use brewlake_types::schema::{
    BREWERY_TYPE, CITY, COUNTRY, ID, LATITUDE, LONGITUDE, NAME, PHONE, STATE, STREET, WEBSITE_URL,
};

/// One raw brewery record. Unset fields are null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRow {
    pub id: Option<String>,
    pub name: Option<String>,
    pub brewery_type: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub street: Option<String>,
    pub phone: Option<String>,
    pub website_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl EntityRow {
    pub fn new(name: &str, country: &str, state: &str, city: &str, brewery_type: &str) -> Self {
        Self {
            name: Some(name.into()),
            country: Some(country.into()),
            state: Some(state.into()),
            city: Some(city.into()),
            brewery_type: Some(brewery_type.into()),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn street(mut self, street: &str) -> Self {
        self.street = Some(street.into());
        self
    }

    pub fn phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn website(mut self, url: &str) -> Self {
        self.website_url = Some(url.into());
        self
    }

    pub fn coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }
}

/// Batch holding one row per record with the raw entity column names.
pub fn entity_batch(rows: &[EntityRow]) -> RecordBatch {
    let text = |get: fn(&EntityRow) -> Option<&str>| -> ArrayRef {
        Arc::new(rows.iter().map(get).collect::<StringArray>())
    };
    let float = |get: fn(&EntityRow) -> Option<f64>| -> ArrayRef {
        Arc::new(rows.iter().map(get).collect::<Float64Array>())
    };

    let columns: Vec<(&str, ArrayRef)> = vec![
        (ID, text(|r| r.id.as_deref())),
        (NAME, text(|r| r.name.as_deref())),
        (BREWERY_TYPE, text(|r| r.brewery_type.as_deref())),
        (CITY, text(|r| r.city.as_deref())),
        (STATE, text(|r| r.state.as_deref())),
        (COUNTRY, text(|r| r.country.as_deref())),
        (STREET, text(|r| r.street.as_deref())),
        (PHONE, text(|r| r.phone.as_deref())),
        (WEBSITE_URL, text(|r| r.website_url.as_deref())),
        (LATITUDE, float(|r| r.latitude)),
        (LONGITUDE, float(|r| r.longitude)),
    ];

    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect();
    let arrays = columns.into_iter().map(|(_, array)| array).collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
        .expect("fixture columns share one length")
}

/// Values of a Utf8 column as owned options, for assertions.
pub fn string_column(batch: &RecordBatch, column: &str) -> Vec<Option<String>> {
    let array = batch
        .column_by_name(column)
        .unwrap_or_else(|| panic!("column {column} missing"));
    let text = arrow::compute::cast(array, &DataType::Utf8).expect("column casts to Utf8");
    let text = text
        .as_any()
        .downcast_ref::<StringArray>()
        .expect("Utf8 array");
    (0..text.len())
        .map(|i| text.is_valid(i).then(|| text.value(i).to_string()))
        .collect()
}
