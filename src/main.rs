use crate::config::{OutputTarget, RunConfig, SHEETS_TOKEN_ENV};
use crate::scraper::{
    HttpFetcher, ListingExtractor, PageSource, PaginationCrawler, RandomPacing, SavedPages,
};
use crate::sinks::{Commit, FileSink, GoogleSheetsClient, ResultSink, SpreadsheetSink};
use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod domain;
mod pipeline;
mod scraper;
mod sinks;

#[cfg(test)]
mod tests;

/// Collect Zillow for-sale listings for one or more zip codes.
#[derive(Parser)]
#[command(name = "zillow_scraper", version, subcommand_precedence_over_arg = true)]
struct Cli {
    /// Zip code(s) to search
    #[arg(required = true)]
    zip_codes: Vec<String>,

    /// Log every listing found
    #[arg(short, long)]
    verbose: bool,

    /// Parse saved result pages instead of crawling (single zip code only)
    #[arg(long, num_args = 1..)]
    filenames: Vec<PathBuf>,

    /// Route requests through this proxy (e.g. socks5h://127.0.0.1:9050)
    #[arg(long)]
    proxy: Option<String>,

    #[command(subcommand)]
    save: SaveOption,
}

#[derive(Subcommand)]
enum SaveOption {
    /// Save outputs locally as CSV
    Local {
        /// Output directory
        #[arg(long)]
        outdir: PathBuf,
    },
    /// Save outputs to a shared spreadsheet
    Web {
        /// Email to share the spreadsheet with
        #[arg(long)]
        email: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = match &cli.save {
        SaveOption::Local { outdir } => OutputTarget::local(outdir.clone())?,
        SaveOption::Web { email } => OutputTarget::web(email)?,
    };
    let config = RunConfig::new(
        &cli.zip_codes,
        output,
        cli.verbose,
        cli.filenames.clone(),
        cli.proxy.clone(),
    )?;

    let run_started = Local::now();
    let description = config.description();

    let sink: Box<dyn ResultSink> = match &config.output {
        OutputTarget::Local { outdir } => Box::new(FileSink::new(outdir, &description, run_started)),
        OutputTarget::Web { email } => {
            let token = std::env::var(SHEETS_TOKEN_ENV)
                .with_context(|| format!("{SHEETS_TOKEN_ENV} environment variable not set"))?;
            let api = GoogleSheetsClient::new(token)?;
            Box::new(SpreadsheetSink::new(api, email, &description, run_started))
        }
    };

    let extractor = ListingExtractor::new()?;
    let fetcher;
    let pacing = RandomPacing;
    let source: Box<dyn PageSource + '_> = if config.filenames.is_empty() {
        fetcher = HttpFetcher::new(config.proxy.as_deref())?;
        Box::new(PaginationCrawler::new(&fetcher, &pacing)?)
    } else {
        tracing::info!(files = ?config.filenames, "reading saved pages");
        Box::new(SavedPages::new(config.filenames.clone()))
    };

    let summary = pipeline::run(
        &config.postal_codes,
        source.as_ref(),
        &extractor,
        sink,
        config.verbose,
    )
    .context("scrape failed")?;

    match &summary.commit {
        Commit::File(path) => println!("Saved {} properties to {}", summary.kept, path.display()),
        Commit::Spreadsheet { url, .. } => {
            println!("Shared {} properties in {}", summary.kept, url)
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
