// fetcher.rs
use crate::scraper::pacing::Pacing;
use crate::scraper::ScraperError;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const USER_AGENT_VALUE: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0 Safari/537.36";

pub const MAX_ATTEMPTS: u32 = 5;

/// Phrase served in place of results once the client has been flagged as a bot.
pub const BOT_CHALLENGE_MARKER: &str = "Please verify you're a human to continue.";

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

/// One HTTP GET. Retrying is the caller's job.
pub trait Fetcher {
    fn get(&self, url: &str, headers: &HeaderMap) -> Result<FetchResponse, ScraperError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(proxy: Option<&str>) -> Result<Self, ScraperError> {
        let mut builder = Client::builder().timeout(Duration::from_secs(60));

        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| ScraperError::Config(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ScraperError::Network(e.to_string()))?;

        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn get(&self, url: &str, headers: &HeaderMap) -> Result<FetchResponse, ScraperError> {
        let resp = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .map_err(|e| ScraperError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .map_err(|e| ScraperError::Network(e.to_string()))?;

        Ok(FetchResponse { status, body })
    }
}

pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
    headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));
    headers
}

/// GET `url` with up to `MAX_ATTEMPTS` attempts.
///
/// Non-200 statuses and transport errors are retried after
/// `pacing.retry_delay(attempt)`. A 200 whose body carries the bot-challenge
/// marker is returned immediately as `Blocked`.
pub fn fetch_page(
    fetcher: &dyn Fetcher,
    pacing: &dyn Pacing,
    url: &str,
) -> Result<String, ScraperError> {
    let headers = default_headers();
    let mut last_status = String::from("<none>");

    for attempt in 1..=MAX_ATTEMPTS {
        let start = Instant::now();
        debug!(attempt, url, "fetching");

        match fetcher.get(url, &headers) {
            Ok(resp) if resp.status == 200 => {
                if resp.body.contains(BOT_CHALLENGE_MARKER) {
                    return Err(ScraperError::Blocked {
                        url: url.to_string(),
                    });
                }
                debug!(attempt, elapsed = ?start.elapsed(), "fetch succeeded");
                return Ok(resp.body);
            }
            Ok(resp) => {
                warn!(attempt, url, status = resp.status, "non-success status");
                last_status = resp.status.to_string();
            }
            Err(e) => {
                warn!(attempt, url, error = %e, "request failed");
                last_status = e.to_string();
            }
        }

        if attempt < MAX_ATTEMPTS {
            let delay = pacing.retry_delay(attempt);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
    }

    Err(ScraperError::Fetch {
        url: url.to_string(),
        attempts: MAX_ATTEMPTS,
        status: last_status,
    })
}
