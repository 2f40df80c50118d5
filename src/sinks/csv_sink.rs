use crate::domain::{DedupScope, Listing, FIELDNAMES};
use crate::scraper::ScraperError;
use crate::sinks::{output_name, Commit, ResultBatch, ResultSink};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes every postal code's listings into one CSV file on finalize.
pub struct FileSink {
    path: PathBuf,
    listings: Vec<Listing>,
}

impl FileSink {
    pub fn new(outdir: &Path, description: &str, run_started: DateTime<Local>) -> Self {
        let name = format!("{}.csv", output_name(run_started, description));
        Self {
            path: outdir.join(name),
            listings: Vec::new(),
        }
    }
}

impl ResultSink for FileSink {
    fn dedup_scope(&self) -> DedupScope {
        DedupScope::Run
    }

    fn add(&mut self, postal_code: &str, batch: ResultBatch) -> Result<(), ScraperError> {
        info!(postal_code, listings = batch.len(), "queued batch for file");
        self.listings.extend(batch);
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Commit, ScraperError> {
        let FileSink { path, listings } = *self;
        info!(path = %path.display(), properties = listings.len(), "saving");

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(FIELDNAMES)?;
        for listing in &listings {
            writer.write_record(listing.field_values())?;
        }
        writer.flush()?;

        Ok(Commit::File(path))
    }
}
