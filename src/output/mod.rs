//! Output module for saved pages and run reports
//!
//! This module handles:
//! - Filesystem-safe folder and file names
//! - Saving rendered pages as HTML
//! - Run summaries and ledger statistics

pub mod filename;
mod page_sink;
pub mod stats;

pub use filename::{asset_file_name, folder_name, page_file_name, MAX_TITLE_CHARS};
pub use page_sink::PageSink;
pub use stats::{
    load_statistics, print_statistics, JobStatistics, LedgerStatistics, RunSummary,
};
