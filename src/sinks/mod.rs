pub mod csv_sink;
pub mod gsheets;

use crate::domain::{DedupScope, Listing};
use crate::scraper::ScraperError;
use chrono::{DateTime, Local};
use std::path::PathBuf;

pub use csv_sink::FileSink;
pub use gsheets::{GoogleSheetsClient, SheetsApi, SpreadsheetSink};

/// Deduplicated listings for one postal code, in first-seen order.
pub type ResultBatch = Vec<Listing>;

/// Where a finalized sink put its output.
#[derive(Debug, Clone, PartialEq)]
pub enum Commit {
    File(PathBuf),
    Spreadsheet { id: String, url: String },
}

/// Destination for deduplicated results.
pub trait ResultSink {
    /// Scope of the dedup index that should feed this sink.
    fn dedup_scope(&self) -> DedupScope;

    /// Record one postal code's batch.
    fn add(&mut self, postal_code: &str, batch: ResultBatch) -> Result<(), ScraperError>;

    /// Commit everything recorded so far. Consumes the sink.
    fn finalize(self: Box<Self>) -> Result<Commit, ScraperError>;
}

/// `zillow_data_<MM_DD_YYYY__HH_MM_SS>_<description>`, shared by file and
/// document names.
pub fn output_name(run_started: DateTime<Local>, description: &str) -> String {
    format!(
        "zillow_data_{}_{}",
        run_started.format("%m_%d_%Y__%H_%M_%S"),
        description
    )
}
