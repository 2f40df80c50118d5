// config.rs
use crate::scraper::ScraperError;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+$").expect("email pattern is valid")
});

/// Environment variable holding the spreadsheet backend's bearer token.
pub const SHEETS_TOKEN_ENV: &str = "GOOGLE_SHEETS_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostalCode(String);

impl PostalCode {
    pub fn parse(raw: &str) -> Result<Self, ScraperError> {
        let trimmed = raw.trim();
        if trimmed.chars().count() != 5 {
            return Err(ScraperError::Config(format!(
                "invalid zip code argument {raw:?}: expected 5 characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// CSV file written into `outdir`.
    Local { outdir: PathBuf },
    /// Remote spreadsheet shared with `email`.
    Web { email: String },
}

impl OutputTarget {
    pub fn web(email: &str) -> Result<Self, ScraperError> {
        if !EMAIL_RE.is_match(email) {
            return Err(ScraperError::Config(format!("invalid email {email:?}")));
        }
        Ok(OutputTarget::Web {
            email: email.to_string(),
        })
    }

    pub fn local(outdir: PathBuf) -> Result<Self, ScraperError> {
        if !outdir.is_dir() {
            return Err(ScraperError::Config(format!(
                "output directory {} does not exist",
                outdir.display()
            )));
        }
        Ok(OutputTarget::Local { outdir })
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub postal_codes: Vec<PostalCode>,
    pub output: OutputTarget,
    pub verbose: bool,
    /// Saved result pages to parse instead of crawling.
    pub filenames: Vec<PathBuf>,
    pub proxy: Option<String>,
}

impl RunConfig {
    pub fn new(
        postal_codes: &[String],
        output: OutputTarget,
        verbose: bool,
        filenames: Vec<PathBuf>,
        proxy: Option<String>,
    ) -> Result<Self, ScraperError> {
        if postal_codes.is_empty() {
            return Err(ScraperError::Config("at least one zip code is required".into()));
        }
        let postal_codes = postal_codes
            .iter()
            .map(|p| PostalCode::parse(p))
            .collect::<Result<Vec<_>, _>>()?;

        if !filenames.is_empty() && postal_codes.len() != 1 {
            return Err(ScraperError::Config(
                "saved pages can only be parsed for a single zip code".into(),
            ));
        }

        Ok(Self {
            postal_codes,
            output,
            verbose,
            filenames,
            proxy,
        })
    }

    /// Label used in output names: the postal codes joined by `_`.
    pub fn description(&self) -> String {
        self.postal_codes
            .iter()
            .map(PostalCode::as_str)
            .collect::<Vec<_>>()
            .join("_")
    }
}
