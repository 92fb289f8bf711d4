//! Batch-scoped deduplication of the fact store.
//!
//! Records of one batch sharing an identity key collapse to the most complete
//! one, and the batch subtree is replaced by the surviving rows. The
//! replacement goes through [`SubtreeSwap`], so readers see the old or the new
//! batch and an interrupted run is settled at the start of the next.

use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use arrow::array::{Array, RecordBatch, UInt32Array};
use arrow::compute::take_record_batch;
use arrow::row::{RowConverter, SortField};
use brewlake_dataset::{
    PartitionPath, PartitionedDataset, Reconciled, SubtreeSwap, WriterConfig, reconcile_subtree,
    write_partitioned,
};
use brewlake_result::{Error, Result};
use brewlake_types::schema::{BATCH, COUNTRY, PART, STATE};
use brewlake_types::{BatchId, IDENTITY_COLUMNS, RunContext, require_columns};
use rustc_hash::FxHashSet;

/// Partition columns below a batch directory, outermost first.
const BATCH_PARTITION_COLUMNS: [&str; 3] = [COUNTRY, STATE, PART];

#[derive(Debug, Clone)]
pub struct DedupOptions {
    /// Rows per read while loading the batch.
    ///
    /// This bounds read granularity only. The whole batch is concatenated
    /// before deduplication, so peak memory is roughly twice the batch size.
    pub scan_chunk_size: usize,
    pub writer: WriterConfig,
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self {
            scan_chunk_size: 65_536,
            writer: WriterConfig::default(),
        }
    }
}

/// What [`dedup_batch`] did with the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    /// No `batch=<id>` directory exists.
    MissingBatch,
    /// The directory holds no records.
    EmptyBatch,
    /// The batch was replaced by its deduplicated rows.
    Rewritten,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupReport {
    pub batch: BatchId,
    pub outcome: DedupOutcome,
    /// Leftovers of an earlier interrupted rewrite found at start.
    pub reconciled: Reconciled,
    pub rows_before: usize,
    pub rows_after: usize,
    pub files_written: usize,
}

impl DedupReport {
    pub fn removed(&self) -> usize {
        self.rows_before - self.rows_after
    }
}

/// Directory of `batch` below the fact root.
pub fn batch_dir(fact_root: &Path, batch: &BatchId) -> PathBuf {
    PartitionPath::new()
        .with(BATCH, Some(batch.as_str()))
        .to_path(fact_root)
}

/// Number of populated cells per row across `columns`.
fn completeness(batch: &RecordBatch, columns: &[usize]) -> Vec<u32> {
    let mut scores = vec![0u32; batch.num_rows()];
    for &idx in columns {
        let array = batch.column(idx);
        match array.logical_nulls() {
            None => scores.iter_mut().for_each(|s| *s += 1),
            Some(nulls) => {
                for (row, score) in scores.iter_mut().enumerate() {
                    if nulls.is_valid(row) {
                        *score += 1;
                    }
                }
            }
        }
    }
    scores
}

/// Row indices to keep, one per identity key.
///
/// With scoring columns, rows are stably ordered by identity key (nulls last)
/// and then by completeness, highest first, and the first row of each key is
/// kept. Without them the first row of each key in input order is kept.
fn survivors(batch: &RecordBatch, identity: &[usize], scoring: &[usize]) -> Result<Vec<u32>> {
    let fields = identity
        .iter()
        .map(|&idx| {
            SortField::new_with_options(
                batch.schema().field(idx).data_type().clone(),
                arrow::compute::SortOptions {
                    descending: false,
                    nulls_first: false,
                },
            )
        })
        .collect();
    let converter = RowConverter::new(fields)?;
    let keys: Vec<_> = identity.iter().map(|&idx| batch.column(idx).clone()).collect();
    let rows = converter.convert_columns(&keys)?;

    if scoring.is_empty() {
        let mut seen = FxHashSet::default();
        return Ok((0..batch.num_rows())
            .filter(|&i| seen.insert(rows.row(i)))
            .map(|i| i as u32)
            .collect());
    }

    let scores = completeness(batch, scoring);
    let mut order: Vec<usize> = (0..batch.num_rows()).collect();
    order.sort_by_key(|&i| (rows.row(i), Reverse(scores[i])));

    let mut keep = Vec::new();
    let mut previous = None;
    for i in order {
        let key = rows.row(i);
        if previous != Some(key) {
            keep.push(i as u32);
            previous = Some(key);
        }
    }
    Ok(keep)
}

/// Collapse duplicate entities of `batch` and replace its subtree.
pub fn dedup_batch(
    batch: &BatchId,
    fact_root: &Path,
    options: &DedupOptions,
    ctx: &RunContext,
) -> Result<DedupReport> {
    let _guard = ctx.enter();
    let target = batch_dir(fact_root, batch);

    let reconciled = reconcile_subtree(&target)?;
    if reconciled != Reconciled::Clean {
        tracing::warn!(
            batch = %batch,
            outcome = ?reconciled,
            "settled an interrupted batch rewrite"
        );
    }

    let mut report = DedupReport {
        batch: batch.clone(),
        outcome: DedupOutcome::MissingBatch,
        reconciled,
        rows_before: 0,
        rows_after: 0,
        files_written: 0,
    };

    if !target.is_dir() {
        tracing::info!(
            batch = %batch,
            path = %target.display(),
            "batch not found; nothing to deduplicate"
        );
        return Ok(report);
    }

    let dataset = PartitionedDataset::open(&target)?;
    let all = dataset.read_all(options.scan_chunk_size)?;
    if all.num_rows() == 0 {
        tracing::warn!(batch = %batch, "batch holds no records");
        report.outcome = DedupOutcome::EmptyBatch;
        return Ok(report);
    }

    let context = format!("{BATCH}={batch}");
    require_columns(&all.schema(), &IDENTITY_COLUMNS, &context)?;
    let schema = all.schema();
    let identity: Vec<usize> = IDENTITY_COLUMNS
        .iter()
        .map(|col| schema.index_of(col))
        .collect::<std::result::Result<_, _>>()?;
    let scoring: Vec<usize> = (0..schema.fields().len())
        .filter(|idx| !identity.contains(idx))
        .collect();
    if scoring.is_empty() {
        tracing::warn!(
            batch = %batch,
            "no descriptive columns to score; keeping first occurrences"
        );
    }

    let keep = survivors(&all, &identity, &scoring)?;
    let deduped = take_record_batch(&all, &UInt32Array::from(keep))?;

    for column in BATCH_PARTITION_COLUMNS {
        if deduped.column_by_name(column).is_none() {
            return Err(Error::schema(context.clone(), [column]));
        }
    }

    let swap = SubtreeSwap::begin(&target)?;
    let files = write_partitioned(
        swap.staging_dir(),
        &deduped,
        &BATCH_PARTITION_COLUMNS,
        &options.writer,
    )?;
    swap.commit()?;

    report.outcome = DedupOutcome::Rewritten;
    report.rows_before = all.num_rows();
    report.rows_after = deduped.num_rows();
    report.files_written = files.len();
    tracing::info!(
        batch = %batch,
        before = report.rows_before,
        after = report.rows_after,
        removed = report.removed(),
        "deduplicated batch"
    );
    Ok(report)
}
