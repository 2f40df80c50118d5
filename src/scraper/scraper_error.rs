use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    /// Transport-level failure of a single attempt (connect, timeout, body read).
    #[error("Network error: {0}")]
    Network(String),

    /// Every attempt for a URL came back with a non-success status.
    #[error("Fetch failed for {url} after {attempts} attempts (last status: {status})")]
    Fetch {
        url: String,
        attempts: u32,
        status: String,
    },

    #[error("Blocked by site at {url}: bot challenge served")]
    Blocked { url: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ScraperError {
    /// Whether the error must abort the whole run rather than a single page.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ScraperError::Network(_) | ScraperError::Fetch { .. })
    }
}
