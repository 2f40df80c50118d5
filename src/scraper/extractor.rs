// extractor.rs
use crate::domain::listing::{Listing, ListingSource};
use crate::scraper::crawler::PageBody;
use crate::scraper::models::{is_single_family, LdJsonResidence, MarkupCard, SearchPageStore};
use serde_json::Value;
use crate::scraper::ScraperError;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

const SEARCH_STORE_SELECTOR: &str = r#"script[data-zrr-shared-data-key="mobileSearchPageStore"]"#;
const CARD_SELECTOR: &str = r#"article[class="list-card list-card-short list-card_not-saved"]"#;
const LD_JSON_SELECTOR: &str = r#"li > script[type="application/ld+json"]"#;
const CARD_ADDRESS_SELECTOR: &str = r#"h3[class="list-card-addr"]"#;
const CARD_PRICE_SELECTOR: &str = r#"div[class="list-card-price"]"#;
const CARD_BROKER_SELECTOR: &str = r#"div[class="list-card-truncate"]"#;
const CARD_BADGE_SELECTOR: &str =
    r#"div[class="list-card-top"] div[class="list-card-variable-text list-card-img-overlay"]"#;

const DAYS_ON_ZILLOW_PHRASE: &str = "days on Zillow";

/// Turns one result page into candidate listings. Both strategies always run;
/// structured-blob results come first.
pub struct ListingExtractor {
    search_store: Selector,
    card: Selector,
    ld_json: Selector,
    card_address: Selector,
    card_price: Selector,
    card_broker: Selector,
    card_badge: Selector,
}

impl ListingExtractor {
    pub fn new() -> Result<Self, ScraperError> {
        let parse = |s: &str| Selector::parse(s).map_err(|e| ScraperError::Parse(e.to_string()));

        Ok(Self {
            search_store: parse(SEARCH_STORE_SELECTOR)?,
            card: parse(CARD_SELECTOR)?,
            ld_json: parse(LD_JSON_SELECTOR)?,
            card_address: parse(CARD_ADDRESS_SELECTOR)?,
            card_price: parse(CARD_PRICE_SELECTOR)?,
            card_broker: parse(CARD_BROKER_SELECTOR)?,
            card_badge: parse(CARD_BADGE_SELECTOR)?,
        })
    }

    pub fn extract(&self, page: &PageBody) -> Result<Vec<Listing>, ScraperError> {
        let document = Html::parse_document(&page.html);

        let mut sources = self.structured_sources(&document)?;
        let structured = sources.len();
        sources.extend(self.markup_sources(&document)?);

        debug!(
            page = page.page,
            structured,
            markup = sources.len() - structured,
            "extracted candidates"
        );

        Ok(sources.into_iter().map(ListingSource::into_listing).collect())
    }

    fn structured_sources(&self, document: &Html) -> Result<Vec<ListingSource>, ScraperError> {
        let Some(element) = document.select(&self.search_store).next() else {
            return Ok(Vec::new());
        };

        let raw: String = element.text().collect();
        let json_text = raw.replace("<!--", "").replace("-->", "");
        let json_text = json_text.trim();
        if json_text.is_empty() {
            return Ok(Vec::new());
        }

        let store: SearchPageStore = serde_json::from_str(json_text)
            .map_err(|e| ScraperError::Parse(format!("search page store: {e}")))?;

        Ok(store
            .search_results
            .map(|r| r.list_results)
            .unwrap_or_default()
            .into_iter()
            .map(ListingSource::FromStructuredData)
            .collect())
    }

    fn markup_sources(&self, document: &Html) -> Result<Vec<ListingSource>, ScraperError> {
        let cards: Vec<MarkupCard> = document
            .select(&self.card)
            .map(|card| self.read_card(card))
            .collect();

        let mut fragments = Vec::new();
        for script in document.select(&self.ld_json) {
            let raw: String = script.text().collect();
            let value: Value = serde_json::from_str(raw.trim())
                .map_err(|e| ScraperError::Parse(format!("ld+json fragment: {e}")))?;
            if !is_single_family(&value) {
                continue;
            }
            let fragment: LdJsonResidence = serde_json::from_value(value)
                .map_err(|e| ScraperError::Parse(format!("ld+json residence: {e}")))?;
            fragments.push(fragment);
        }

        // Paired by position only; there is no shared key between the two.
        if cards.len() != fragments.len() {
            warn!(
                cards = cards.len(),
                fragments = fragments.len(),
                "card and fragment counts differ; extra entries dropped"
            );
        }

        Ok(cards
            .into_iter()
            .zip(fragments)
            .map(|(card, fragment)| ListingSource::FromMarkup { card, fragment })
            .collect())
    }

    fn read_card(&self, card: ElementRef<'_>) -> MarkupCard {
        let days_on_zillow = card
            .select(&self.card_badge)
            .next()
            .and_then(|badge| parse_days_on_zillow(&badge.text().collect::<String>()));

        MarkupCard {
            address: clean_text(card, &self.card_address),
            price: clean_text(card, &self.card_price),
            broker: clean_text(card, &self.card_broker),
            days_on_zillow,
        }
    }
}

/// All text under every match, whitespace collapsed. `None` when blank.
fn clean_text(root: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let joined = root
        .select(selector)
        .flat_map(|el| el.text())
        .collect::<Vec<_>>()
        .join(" ");
    let cleaned = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    (!cleaned.is_empty()).then_some(cleaned)
}

/// "12 days on Zillow" -> 12. Anything else -> None.
fn parse_days_on_zillow(text: &str) -> Option<i64> {
    if !text.contains(DAYS_ON_ZILLOW_PHRASE) {
        return None;
    }
    text.split_whitespace().next()?.parse().ok()
}
