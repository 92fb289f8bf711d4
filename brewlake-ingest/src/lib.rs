//! Raw layer input: upstream brewery pages saved as JSON under a
//! `year=YYYY/month=MM/day=DD` directory per fetch day.
//!
//! Files are read in name order and in groups; each group becomes one Arrow
//! batch conformed to the fixed entity schema, ready for the fact writer.

pub mod conform;
pub mod json;
pub mod layout;
pub mod reader;

pub use conform::conform_records;
pub use json::{RawRecord, parse_raw_records, read_raw_records};
pub use layout::{FileGroup, list_raw_files, plan_groups, raw_day_dir};
pub use reader::{DEFAULT_FILES_PER_BATCH, RawGroup, RawReadOptions, RawReadSession, RawReader};
