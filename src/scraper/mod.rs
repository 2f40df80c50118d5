pub mod crawler;
pub mod extractor;
pub mod fetcher;
pub mod models;
pub mod pacing;
mod scraper_error;

pub use crawler::{PageBody, PageSource, PaginationCrawler, SavedPages};
pub use extractor::ListingExtractor;
pub use fetcher::{FetchResponse, Fetcher, HttpFetcher};
pub use pacing::{NoPacing, Pacing, RandomPacing};
pub use scraper_error::ScraperError;
