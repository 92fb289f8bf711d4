use std::fs;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, RecordBatch, StringArray};
use brewlake_dataset::read_parquet_file;
use brewlake_dimension::{DimensionStore, update_dimension};
use brewlake_test_utils::init_tracing_for_tests;
use brewlake_types::RunContext;

fn mappings(original: &str, pairs: &[(&str, &str)]) -> RecordBatch {
    let originals: ArrayRef = Arc::new(StringArray::from_iter_values(pairs.iter().map(|p| p.0)));
    let norms: ArrayRef = Arc::new(StringArray::from_iter_values(pairs.iter().map(|p| p.1)));
    RecordBatch::try_from_iter(vec![
        (original.to_string(), originals),
        (format!("{original}_norm"), norms),
    ])
    .unwrap()
}

fn stored_originals(path: &std::path::Path, column: &str) -> Vec<String> {
    read_parquet_file(path)
        .unwrap()
        .iter()
        .flat_map(|batch| {
            let col = batch
                .column_by_name(column)
                .unwrap()
                .as_any()
                .downcast_ref::<StringArray>()
                .unwrap()
                .clone();
            (0..col.len()).map(move |i| col.value(i).to_string())
        })
        .collect()
}

#[test]
fn newest_mapping_wins_and_output_is_sorted() {
    init_tracing_for_tests();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dim_country.parquet");
    let ctx = RunContext::new("dimension-test");

    update_dimension(
        &mappings("country", &[("United States", "us_old"), ("Brazil", "brazil")]),
        "country",
        &path,
        &ctx,
    )
    .unwrap();
    let report = update_dimension(
        &mappings("country", &[("United States", "united_states"), ("Austria", "austria")]),
        "country",
        &path,
        &ctx,
    )
    .unwrap();

    assert_eq!(report.rows_persisted, 3);
    assert!(!report.reset);
    assert_eq!(
        stored_originals(&path, "country"),
        vec!["Austria", "Brazil", "United States"]
    );
    let store = DimensionStore::load(&path, "country").unwrap();
    assert_eq!(store.lookup("United States"), Some("united_states"));
    assert_eq!(store.lookup("Brazil"), Some("brazil"));
}

#[test]
fn duplicate_originals_in_one_batch_keep_the_last() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dim_city.parquet");
    update_dimension(
        &mappings("city", &[("Portland", "portland_me"), ("Portland", "portland")]),
        "city",
        &path,
        &RunContext::detached(),
    )
    .unwrap();
    let store = DimensionStore::load(&path, "city").unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.lookup("Portland"), Some("portland"));
}

#[test]
fn unreadable_store_is_replaced() {
    init_tracing_for_tests();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dim_state.parquet");
    fs::write(&path, b"not parquet").unwrap();

    let report = update_dimension(
        &mappings("state", &[("Oregon", "oregon")]),
        "state",
        &path,
        &RunContext::detached(),
    )
    .unwrap();
    assert!(report.reset);
    assert_eq!(report.rows_persisted, 1);
    assert_eq!(stored_originals(&path, "state"), vec!["Oregon"]);
}

#[test]
fn store_missing_columns_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dim_state.parquet");
    // A store written for another column cannot be merged into.
    update_dimension(
        &mappings("region", &[("Alpha", "alpha")]),
        "region",
        &path,
        &RunContext::detached(),
    )
    .unwrap();

    let report = update_dimension(
        &mappings("state", &[("Oregon", "oregon")]),
        "state",
        &path,
        &RunContext::detached(),
    )
    .unwrap();
    assert!(report.reset);
    assert_eq!(DimensionStore::load(&path, "state").unwrap().len(), 1);
}

#[test]
fn null_pairs_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dim_brewery_type.parquet");
    let batch = RecordBatch::try_from_iter(vec![
        (
            "brewery_type",
            Arc::new(StringArray::from(vec![Some("micro"), Some("Brewpub"), None])) as ArrayRef,
        ),
        (
            "brewery_type_norm",
            Arc::new(StringArray::from(vec![Some("micro"), None, Some("x")])) as ArrayRef,
        ),
    ])
    .unwrap();

    let report =
        update_dimension(&batch, "brewery_type", &path, &RunContext::detached()).unwrap();
    assert_eq!(report.rows_valid, 1);
    assert_eq!(stored_originals(&path, "brewery_type"), vec!["micro"]);
}

#[test]
fn repeated_update_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dim_city.parquet");
    let input = mappings("city", &[("San Francisco", "san_francisco"), ("Campinas", "campinas")]);
    update_dimension(&input, "city", &path, &RunContext::detached()).unwrap();
    let first = stored_originals(&path, "city");
    update_dimension(&input, "city", &path, &RunContext::detached()).unwrap();
    assert_eq!(stored_originals(&path, "city"), first);
}
