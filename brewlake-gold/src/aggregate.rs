use std::path::{Path, PathBuf};

use arrow::array::RecordBatch;
use brewlake_dataset::{PartitionedDataset, WriterConfig, write_parquet_atomic};
use brewlake_result::Result;
use brewlake_types::schema::NAME;
use brewlake_types::{AGGREGATION_KEY_COLUMNS, RunContext, require_columns};

use crate::counter::{GroupCounter, gold_schema, summary_batch};

/// File name of the gold summary inside its output directory.
pub const TOTAL_FILE: &str = "total.parquet";

#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Upper bound on rows held per scanned chunk.
    pub chunk_size: usize,
    /// Check key columns against the dataset schema even when no chunk has rows.
    pub validate_empty_schema: bool,
    pub writer: WriterConfig,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            chunk_size: 65_536,
            validate_empty_schema: false,
            writer: WriterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateReport {
    pub path: PathBuf,
    pub groups: usize,
    pub rows_scanned: usize,
    pub chunks: usize,
}

fn required_columns() -> Vec<&'static str> {
    let mut cols = AGGREGATION_KEY_COLUMNS.to_vec();
    cols.push(NAME);
    cols
}

/// Count distinct names per (country, state, city, brewery_type) over the
/// whole fact store and write the sorted summary to `<out_dir>/total.parquet`.
///
/// A missing store, or one without rows, produces an empty summary with the
/// full column set. The previous summary is replaced in one rename.
pub fn aggregate_to_gold(
    fact_root: &Path,
    out_dir: &Path,
    options: &AggregateOptions,
    ctx: &RunContext,
) -> Result<AggregateReport> {
    let _guard = ctx.enter();
    let out = out_dir.join(TOTAL_FILE);
    tracing::info!(
        source = %fact_root.display(),
        output = %out.display(),
        chunk_size = options.chunk_size,
        "starting gold aggregation"
    );

    if !fact_root.is_dir() {
        tracing::warn!(
            source = %fact_root.display(),
            "fact store not found; writing empty summary"
        );
        write_parquet_atomic(&out, &RecordBatch::new_empty(gold_schema()), &options.writer)?;
        return Ok(AggregateReport {
            path: out,
            groups: 0,
            rows_scanned: 0,
            chunks: 0,
        });
    }

    let required = required_columns();
    let dataset = PartitionedDataset::open(fact_root)?;
    let mut counter = GroupCounter::new();
    let mut chunks = 0usize;
    let mut validated = false;
    for chunk in dataset.scan(options.chunk_size) {
        let chunk = chunk?;
        chunks += 1;
        if chunk.num_rows() == 0 {
            continue;
        }
        if !validated {
            require_columns(&chunk.schema(), &required, "fact chunk")?;
            validated = true;
        }
        counter.observe(&chunk)?;
    }

    if !validated && options.validate_empty_schema && !dataset.is_empty() {
        require_columns(&dataset.schema(), &required, "fact store")?;
    }

    let rows_scanned = counter.rows_seen();
    if counter.group_count() == 0 {
        tracing::warn!(chunks, rows = rows_scanned, "no groups aggregated; writing empty summary");
        write_parquet_atomic(&out, &RecordBatch::new_empty(gold_schema()), &options.writer)?;
        return Ok(AggregateReport {
            path: out,
            groups: 0,
            rows_scanned,
            chunks,
        });
    }

    let rows = counter.finish();
    let summary = summary_batch(&rows)?;
    write_parquet_atomic(&out, &summary, &options.writer)?;
    tracing::info!(
        output = %out.display(),
        groups = rows.len(),
        rows = rows_scanned,
        chunks,
        "gold summary written"
    );

    Ok(AggregateReport {
        path: out,
        groups: rows.len(),
        rows_scanned,
        chunks,
    })
}
