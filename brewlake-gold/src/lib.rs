//! Gold layer: one summary of distinct brewery names per
//! (country, state, city, brewery_type), recomputed from the whole silver
//! fact store.
//!
//! The store is scanned in bounded chunks and folded into a [`GroupCounter`],
//! so memory grows with the number of groups and names rather than with the
//! number of fact files.

pub mod aggregate;
pub mod counter;

pub use aggregate::{AggregateOptions, AggregateReport, TOTAL_FILE, aggregate_to_gold};
pub use counter::{GroupCounter, GroupKey, gold_schema, summary_batch};
