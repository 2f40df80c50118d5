// pipeline.rs
use crate::config::PostalCode;
use crate::domain::{DedupIndex, DedupScope};
use crate::scraper::{ListingExtractor, PageSource, ScraperError};
use crate::sinks::{Commit, ResultSink};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub postal_codes: usize,
    pub pages: usize,
    pub extracted: usize,
    pub kept: usize,
    pub commit: Commit,
}

/// Crawl, extract and dedup each postal code in order, hand each batch to the
/// sink, then finalize the sink once.
///
/// Any error aborts the run on the spot; the sink is only finalized when every
/// postal code made it through.
pub fn run(
    postal_codes: &[PostalCode],
    source: &dyn PageSource,
    extractor: &ListingExtractor,
    mut sink: Box<dyn ResultSink>,
    verbose: bool,
) -> Result<RunSummary, ScraperError> {
    let scope = sink.dedup_scope();
    let mut run_index = DedupIndex::new();

    let mut pages_parsed = 0;
    let mut extracted = 0;
    let mut kept = 0;

    for postal_code in postal_codes {
        let postal_code = postal_code.as_str();
        let pages = source.pages(postal_code)?;

        let mut local_index = DedupIndex::new();
        let index = match scope {
            DedupScope::Run => &mut run_index,
            DedupScope::PerPostalCode => &mut local_index,
        };

        let mut batch = Vec::new();
        for page in &pages {
            debug!(postal_code, page = page.page, "parsing page");
            let listings = extractor.extract(page)?;
            extracted += listings.len();

            let fresh = index.filter(listings);
            if verbose {
                for listing in &fresh {
                    info!(
                        address = %listing.address,
                        beds = ?listing.bedrooms,
                        baths = ?listing.bathrooms,
                        area = ?listing.area,
                        "Found"
                    );
                }
            }
            batch.extend(fresh);
        }
        pages_parsed += pages.len();

        info!(
            postal_code,
            pages = pages.len(),
            listings = batch.len(),
            seen = index.len(),
            "postal code done"
        );
        kept += batch.len();
        sink.add(postal_code, batch)?;
    }

    let commit = sink.finalize()?;
    let summary = RunSummary {
        postal_codes: postal_codes.len(),
        pages: pages_parsed,
        extracted,
        kept,
        commit,
    };
    info!(?summary, "run complete");
    Ok(summary)
}
