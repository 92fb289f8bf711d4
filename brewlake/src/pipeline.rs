//! The silver and gold passes for one run day.

use std::path::PathBuf;

use arrow::array::RecordBatch;
use brewlake_dimension::{Dimension, UpdateReport, update_dimension};
use brewlake_gold::{AggregateOptions, AggregateReport, aggregate_to_gold};
use brewlake_ingest::{RawReadOptions, RawReader};
use brewlake_result::Result;
use brewlake_silver::{DedupOptions, DedupReport, FactWriteReport, dedup_batch, write_facts};
use brewlake_types::{BatchId, RunContext};
use time::Date;

use crate::config::LakeConfig;
use crate::signal::{Signal, SignalDir};

/// Batch label of a run day, e.g. `2025-09-27`.
pub fn day_batch_id(day: Date) -> Result<BatchId> {
    BatchId::new(format!(
        "{:04}-{:02}-{:02}",
        day.year(),
        u8::from(day.month()),
        day.day()
    ))
}

#[derive(Debug, Clone)]
pub struct SilverReport {
    pub batch: BatchId,
    pub raw_files: usize,
    /// File groups holding at least one record.
    pub groups_written: usize,
    pub dimensions: Vec<UpdateReport>,
    pub facts: Vec<FactWriteReport>,
    pub dedup: DedupReport,
    pub signal: PathBuf,
}

impl SilverReport {
    pub fn rows_written(&self) -> usize {
        self.facts.iter().map(|f| f.rows_written).sum()
    }
}

#[derive(Debug, Clone)]
pub struct GoldReport {
    pub aggregate: AggregateReport,
    /// Whether a pending silver-ready signal was consumed.
    pub consumed_silver_ready: bool,
    pub signal: PathBuf,
}

/// Update dimensions from a group and append its facts.
fn silver_group(
    config: &LakeConfig,
    batch_id: &BatchId,
    part: usize,
    records: &RecordBatch,
    ctx: &RunContext,
) -> Result<(Vec<UpdateReport>, FactWriteReport)> {
    let dims = config.dimension_paths();
    let mut updates = Vec::with_capacity(Dimension::ALL.len());
    for dim in Dimension::ALL {
        if records.column_by_name(dim.column()).is_none() {
            tracing::warn!(
                dimension = %dim,
                part,
                "column absent from raw group; dimension not updated"
            );
            continue;
        }
        updates.push(update_dimension(
            records,
            dim.column(),
            dims.get(dim),
            &ctx.stage("dimensions"),
        )?);
    }
    let facts = write_facts(
        records,
        batch_id,
        part,
        &dims,
        &config.fact_dir,
        &ctx.stage("facts"),
    )?;
    Ok((updates, facts))
}

/// Turn the raw files of `day` into deduplicated silver facts.
///
/// Each group of `files_per_batch` raw files updates the four dimension
/// stores and is appended to `batch=<day>` with `part` set to the group's
/// first file offset. The batch is then deduplicated and the silver-ready
/// signal raised. A day without raw files still runs deduplication and raises
/// the signal, so the gold pass sees a consistent store.
pub fn run_silver(config: &LakeConfig, day: Date, ctx: &RunContext) -> Result<SilverReport> {
    config.validate()?;
    let batch_id = day_batch_id(day)?;
    let _guard = ctx.enter();

    let reader = RawReader::new(RawReadOptions {
        files_per_batch: config.files_per_batch,
    });
    let session = reader.open_day(&config.raw_dir, day)?;
    let raw_files = session.file_count();
    if raw_files == 0 {
        tracing::warn!(
            path = %session.dir().display(),
            batch = %batch_id,
            "no raw files for run day"
        );
    }

    let mut dimensions = Vec::new();
    let mut facts = Vec::new();
    for group in session {
        let group = group?;
        tracing::info!(
            group = group.index + 1,
            files = group.files.len(),
            rows = group.batch.num_rows(),
            "processing raw group"
        );
        if group.batch.num_rows() == 0 {
            tracing::warn!(group = group.index + 1, "raw group holds no records; skipping");
            continue;
        }
        let (updates, written) =
            silver_group(config, &batch_id, group.part, &group.batch, ctx)?;
        dimensions.extend(updates);
        facts.push(written);
    }

    let dedup_options = DedupOptions {
        scan_chunk_size: config.scan_chunk_size,
        ..DedupOptions::default()
    };
    let dedup = dedup_batch(
        &batch_id,
        &config.fact_dir,
        &dedup_options,
        &ctx.stage("dedup"),
    )?;
    let signal = SignalDir::new(&config.signal_dir).emit(Signal::SilverReady)?;

    let report = SilverReport {
        batch: batch_id,
        raw_files,
        groups_written: facts.len(),
        dimensions,
        facts,
        dedup,
        signal,
    };
    tracing::info!(
        batch = %report.batch,
        groups = report.groups_written,
        rows = report.rows_written(),
        deduplicated = report.dedup.rows_after,
        "silver pass finished"
    );
    Ok(report)
}

/// Deduplicate the batch of `day` on its own.
pub fn run_dedup(config: &LakeConfig, day: Date, ctx: &RunContext) -> Result<DedupReport> {
    config.validate()?;
    let batch_id = day_batch_id(day)?;
    let options = DedupOptions {
        scan_chunk_size: config.scan_chunk_size,
        ..DedupOptions::default()
    };
    dedup_batch(&batch_id, &config.fact_dir, &options, &ctx.stage("dedup"))
}

/// Recompute the gold summary into `gold/batch=<day>/total.parquet`.
///
/// Consumes a pending silver-ready signal and raises gold-updated.
pub fn run_gold(config: &LakeConfig, day: Date, ctx: &RunContext) -> Result<GoldReport> {
    config.validate()?;
    let batch_id = day_batch_id(day)?;
    let _guard = ctx.enter();
    let signals = SignalDir::new(&config.signal_dir);
    if !signals.is_raised(Signal::SilverReady) {
        tracing::info!("no pending silver-ready signal; aggregating current store");
    }

    let options = AggregateOptions {
        chunk_size: config.scan_chunk_size,
        ..AggregateOptions::default()
    };
    let out_dir = config.gold_batch_dir(&batch_id);
    let aggregate =
        aggregate_to_gold(&config.fact_dir, &out_dir, &options, &ctx.stage("gold"))?;

    let consumed_silver_ready = signals.consume(Signal::SilverReady)?;
    let signal = signals.emit(Signal::GoldUpdated)?;
    Ok(GoldReport {
        aggregate,
        consumed_silver_ready,
        signal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn batch_id_is_iso_day() {
        assert_eq!(day_batch_id(date!(2025 - 09 - 07)).unwrap().as_str(), "2025-09-07");
    }
}
