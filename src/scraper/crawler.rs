// crawler.rs
use crate::domain::listing::ZILLOW_URL;
use crate::scraper::fetcher::{fetch_page, Fetcher};
use crate::scraper::pacing::Pacing;
use crate::scraper::ScraperError;
use scraper::{Html, Selector};
use std::path::PathBuf;
use tracing::{info, warn};
use url::Url;

/// Listings per results page.
pub const PAGE_SIZE: usize = 40;

const RESULT_COUNT_SELECTOR: &str = r#"div[class="search-subtitle"] > span[class="result-count"]"#;
const NEXT_PAGE_SELECTOR: &str = r#"li[class="zsg-pagination-next"] > a"#;

/// Raw text of one fetched results page.
#[derive(Debug, Clone)]
pub struct PageBody {
    pub page: u32,
    pub html: String,
}

/// Anything that can hand over the result pages for a postal code.
pub trait PageSource {
    fn pages(&self, postal_code: &str) -> Result<Vec<PageBody>, ScraperError>;
}

/// Per-postal-code crawl state.
#[derive(Debug)]
pub struct CrawlSession {
    pub postal_code: String,
    pub start_url: String,
    pub total_results: usize,
    pub pages_to_query: usize,
    pub pages: Vec<PageBody>,
    pub failed_pages: Vec<u32>,
}

/// Extra pages to request after the first one.
///
/// Floors on purpose: up to `PAGE_SIZE - 1` listings on a trailing partial
/// page are not requested.
pub fn pages_to_query(total_results: usize) -> usize {
    total_results / PAGE_SIZE
}

/// Number of the last page to request when `extra` pages follow the first.
fn last_page(extra: usize) -> Result<u32, ScraperError> {
    u32::try_from(extra)
        .ok()
        .and_then(|n| n.checked_add(1))
        .ok_or_else(|| ScraperError::Parse(format!("too many result pages: {extra}")))
}

pub struct PaginationCrawler<'a> {
    fetcher: &'a dyn Fetcher,
    pacing: &'a dyn Pacing,
    base_url: String,
    result_count: Selector,
    next_page: Selector,
}

impl<'a> PaginationCrawler<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, pacing: &'a dyn Pacing) -> Result<Self, ScraperError> {
        Self::with_base_url(fetcher, pacing, ZILLOW_URL)
    }

    pub fn with_base_url(
        fetcher: &'a dyn Fetcher,
        pacing: &'a dyn Pacing,
        base_url: &str,
    ) -> Result<Self, ScraperError> {
        let parse = |s: &str| Selector::parse(s).map_err(|e| ScraperError::Parse(e.to_string()));

        Ok(Self {
            fetcher,
            pacing,
            base_url: base_url.trim_end_matches('/').to_string(),
            result_count: parse(RESULT_COUNT_SELECTOR)?,
            next_page: parse(NEXT_PAGE_SELECTOR)?,
        })
    }

    pub fn starting_url(&self, postal_code: &str) -> String {
        format!(
            "{}/homes/for_sale/{}_rb/?fromHomePage=true&shouldFireSellPageImplicitClaimGA=false&fromHomePageTab=buy",
            self.base_url, postal_code
        )
    }

    pub fn crawl(&self, postal_code: &str) -> Result<CrawlSession, ScraperError> {
        let start_url = self.starting_url(postal_code);
        info!(postal_code, url = %start_url, "reading root page results");

        let first = fetch_page(self.fetcher, self.pacing, &start_url)?;

        let (total_results, template) = {
            let document = Html::parse_document(&first);
            let total_results = self.total_results(&document)?;
            let template = if pages_to_query(total_results) > 0 {
                Some(self.next_page_template(&document, &start_url)?)
            } else {
                None
            };
            (total_results, template)
        };
        let extra = pages_to_query(total_results);
        info!(postal_code, total_results, extra_pages = extra, "found results");

        let mut session = CrawlSession {
            postal_code: postal_code.to_string(),
            start_url,
            total_results,
            pages_to_query: extra,
            pages: vec![PageBody {
                page: 1,
                html: first,
            }],
            failed_pages: Vec::new(),
        };

        let Some(template) = template else {
            return Ok(session);
        };

        let mut order: Vec<u32> = (2..=last_page(extra)?).collect();
        self.pacing.order_pages(&mut order);

        for page in order {
            let url = template.url_for(page);
            match fetch_page(self.fetcher, self.pacing, &url) {
                Ok(html) => {
                    info!(postal_code, page, of = extra + 1, "pulled results page");
                    session.pages.push(PageBody { page, html });

                    let delay = self.pacing.page_delay();
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(postal_code, page, error = %e, "failed to fetch page, skipping");
                    session.failed_pages.push(page);
                }
            }
        }

        Ok(session)
    }

    fn total_results(&self, document: &Html) -> Result<usize, ScraperError> {
        let text: String = document
            .select(&self.result_count)
            .next()
            .ok_or_else(|| ScraperError::Parse("result count not found".into()))?
            .text()
            .collect();

        let first_word = text
            .split_whitespace()
            .next()
            .ok_or_else(|| ScraperError::Parse("result count is empty".into()))?;

        first_word
            .replace(',', "")
            .parse()
            .map_err(|_| ScraperError::Parse(format!("unreadable result count: {text:?}")))
    }

    fn next_page_template(
        &self,
        document: &Html,
        start_url: &str,
    ) -> Result<NextPageTemplate, ScraperError> {
        let href = document
            .select(&self.next_page)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| ScraperError::Parse("next page link not found".into()))?;

        NextPageTemplate::from_href(start_url, href)
    }
}

impl PageSource for PaginationCrawler<'_> {
    fn pages(&self, postal_code: &str) -> Result<Vec<PageBody>, ScraperError> {
        let session = self.crawl(postal_code)?;
        info!(
            postal_code = %session.postal_code,
            url = %session.start_url,
            total_results = session.total_results,
            fetched = session.pages.len(),
            expected = session.pages_to_query + 1,
            "crawl finished"
        );
        if !session.failed_pages.is_empty() {
            warn!(
                postal_code,
                failed = ?session.failed_pages,
                "some pages were skipped"
            );
        }
        Ok(session.pages)
    }
}

/// Page URLs built from the "next" link: `/homes/for_sale/98101_rb/2_p/`
/// becomes `<origin>/homes/for_sale/98101_rb/{page}_p`.
#[derive(Debug, Clone, PartialEq)]
pub struct NextPageTemplate {
    prefix: String,
}

impl NextPageTemplate {
    pub fn from_href(start_url: &str, href: &str) -> Result<Self, ScraperError> {
        let base = Url::parse(start_url)
            .map_err(|e| ScraperError::Parse(format!("bad start url {start_url}: {e}")))?;
        let mut next = base
            .join(href)
            .map_err(|e| ScraperError::Parse(format!("bad next page link {href}: {e}")))?;
        next.set_query(None);
        next.set_fragment(None);

        let path = next.path().trim_end_matches('/');
        let parent = match path.rfind('/') {
            Some(idx) => &path[..idx],
            None => "",
        };
        let parent = parent.to_string();
        next.set_path(&parent);

        Ok(Self {
            prefix: next.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, page: u32) -> String {
        format!("{}/{}_p", self.prefix, page)
    }
}

/// Previously downloaded result pages read from disk instead of crawling.
pub struct SavedPages {
    files: Vec<PathBuf>,
}

impl SavedPages {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }
}

impl PageSource for SavedPages {
    fn pages(&self, postal_code: &str) -> Result<Vec<PageBody>, ScraperError> {
        info!(postal_code, files = self.files.len(), "reading saved pages");
        self.files
            .iter()
            .enumerate()
            .map(|(i, path)| -> Result<PageBody, ScraperError> {
                Ok(PageBody {
                    page: i as u32 + 1,
                    html: std::fs::read_to_string(path)?,
                })
            })
            .collect()
    }
}
