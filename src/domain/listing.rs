// src/domain/listing.rs

use crate::scraper::models::{LdJsonResidence, ListResult, MarkupCard};
use serde::Deserialize;
use std::fmt;

pub const ZILLOW_URL: &str = "https://www.zillow.com";

/// Output columns, alphabetically sorted. Shared by every sink.
pub const FIELDNAMES: [&str; 10] = [
    "address",
    "broker",
    "city",
    "days_on_zillow",
    "info",
    "postal_code",
    "price",
    "property_url",
    "state",
    "title",
];

/// Price exactly as the page supplied it: either a display string ("$350,000")
/// or a bare number from the structured blob. Never normalized.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Price {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Number(n) => write!(f, "{n}"),
            Price::Text(s) => f.write_str(s),
        }
    }
}

/// One search result, flattened from whichever extraction path produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub title: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub price: Option<Price>,
    pub info: String,
    pub broker: String,
    pub property_url: String,
    pub days_on_zillow: Option<i64>,
    pub bedrooms: Option<f64>,
    pub bathrooms: Option<f64>,
    pub area: Option<f64>,
    pub is_for_sale: bool,
}

impl Default for Listing {
    fn default() -> Self {
        Self {
            title: String::new(),
            address: String::new(),
            city: String::new(),
            state: String::new(),
            postal_code: String::new(),
            price: None,
            info: String::new(),
            broker: String::new(),
            property_url: String::new(),
            days_on_zillow: None,
            bedrooms: None,
            bathrooms: None,
            area: None,
            is_for_sale: true,
        }
    }
}

impl Listing {
    /// Cell values in `FIELDNAMES` order. Missing values render as empty cells.
    pub fn field_values(&self) -> [String; 10] {
        [
            self.address.clone(),
            self.broker.clone(),
            self.city.clone(),
            self.days_on_zillow.map(|d| d.to_string()).unwrap_or_default(),
            self.info.clone(),
            self.postal_code.clone(),
            self.price.as_ref().map(|p| p.to_string()).unwrap_or_default(),
            self.property_url.clone(),
            self.state.clone(),
            self.title.clone(),
        ]
    }
}

/// Raw material for a Listing, tagged by the extraction path that found it.
#[derive(Debug)]
pub enum ListingSource {
    FromStructuredData(ListResult),
    FromMarkup {
        card: MarkupCard,
        fragment: LdJsonResidence,
    },
}

impl ListingSource {
    pub fn into_listing(self) -> Listing {
        match self {
            ListingSource::FromStructuredData(result) => from_structured_data(result),
            ListingSource::FromMarkup { card, fragment } => from_markup(card, fragment),
        }
    }
}

fn from_structured_data(result: ListResult) -> Listing {
    let home = result.hdp_data.and_then(|h| h.home_info).unwrap_or_default();

    let info = format!(
        "{} bds, {} ba, {} sqft",
        display_number(result.beds),
        display_number(result.baths),
        display_number(result.area)
    );

    Listing {
        title: result.status_text.unwrap_or_default(),
        address: result.address_with_zip.unwrap_or_default(),
        city: home.city.unwrap_or_default(),
        state: home.state.unwrap_or_default(),
        postal_code: home.zipcode.unwrap_or_default(),
        price: result.price,
        info,
        broker: result.broker_name.unwrap_or_default(),
        property_url: result.detail_url.as_deref().map(absolute_url).unwrap_or_default(),
        days_on_zillow: home.days_on_zillow,
        bedrooms: result.beds,
        bathrooms: result.baths,
        area: result.area,
        is_for_sale: true,
    }
}

fn from_markup(card: MarkupCard, fragment: LdJsonResidence) -> Listing {
    let address = fragment.address.unwrap_or_default();
    let bedrooms = fragment.number_of_rooms;

    Listing {
        title: fragment.status_text.unwrap_or_default(),
        address: card.address.unwrap_or_default(),
        city: address.address_locality.unwrap_or_default(),
        state: address.address_region.unwrap_or_default(),
        postal_code: address.postal_code.unwrap_or_default(),
        price: card.price.map(Price::Text),
        info: format!("{} bds", display_number(bedrooms)),
        broker: card.broker.unwrap_or_default(),
        property_url: fragment.url.as_deref().map(absolute_url).unwrap_or_default(),
        days_on_zillow: card.days_on_zillow,
        bedrooms,
        bathrooms: None,
        area: None,
        // Cards only ever confirm for-sale; absence of the marker is not a contradiction.
        is_for_sale: true,
    }
}

fn display_number(n: Option<f64>) -> String {
    n.map(|v| v.to_string()).unwrap_or_default()
}

/// Prefix the site origin onto relative detail links.
pub fn absolute_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else if raw.starts_with('/') {
        format!("{ZILLOW_URL}{raw}")
    } else {
        format!("{ZILLOW_URL}/{raw}")
    }
}
