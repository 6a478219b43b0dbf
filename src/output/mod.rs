//! Output module for crawl records and run reports
//!
//! This module handles:
//! - The sink traits pipelines stream feed items and edges into
//! - Tab-separated corpus and edge files
//! - The end-of-run report printed at shutdown
//!
//! The SQLite sink lives in [`crate::storage`].

pub mod stats;
mod traits;
mod tsv;

pub use stats::{print_report, RunReport};
pub use traits::{EdgeSink, OutputError, OutputResult, RecordSink, TimelineSink};
pub use tsv::{format_timestamp, sanitize_field, TsvCorpusWriter, TsvEdgeWriter, TIMESTAMP_FORMAT};
