use crate::domain::listing::Price;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

// mobileSearchPageStore
//  └── searchResults
//       └── listResults[]
//            ├── addressWithZip
//            ├── price
//            ├── beds / baths / area
//            ├── brokerName
//            ├── detailUrl
//            ├── statusText
//            └── hdpData
//                 └── homeInfo
//                      ├── city
//                      ├── state
//                      ├── zipcode
//                      └── daysOnZillow

#[derive(Debug, Deserialize)]
pub struct SearchPageStore {
    #[serde(rename = "searchResults")]
    pub search_results: Option<SearchResults>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResults {
    #[serde(rename = "listResults", default)]
    pub list_results: Vec<ListResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult {
    pub address_with_zip: Option<String>,
    pub price: Option<Price>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub beds: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub baths: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub area: Option<f64>,
    pub broker_name: Option<String>,
    pub detail_url: Option<String>,
    pub status_text: Option<String>,
    pub hdp_data: Option<HdpData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HdpData {
    pub home_info: Option<HomeInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeInfo {
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub zipcode: Option<String>,
    #[serde(default, deserialize_with = "lenient_integer")]
    pub days_on_zillow: Option<i64>,
}

pub const SINGLE_FAMILY_TYPE: &str = "SingleFamilyResidence";

/// Per-card `application/ld+json` fragment. Only decoded once the raw value
/// passed [`is_single_family`]; other `@type`s may have any shape.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LdJsonResidence {
    pub address: Option<PostalAddress>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub number_of_rooms: Option<f64>,
    pub url: Option<String>,
    pub status_text: Option<String>,
}

pub fn is_single_family(fragment: &Value) -> bool {
    fragment.get("@type").and_then(Value::as_str) == Some(SINGLE_FAMILY_TYPE)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    pub address_locality: Option<String>,
    pub address_region: Option<String>,
    pub postal_code: Option<String>,
}

/// Text pulled out of one result card's markup, already whitespace-cleaned.
#[derive(Debug, Default)]
pub struct MarkupCard {
    pub address: Option<String>,
    pub price: Option<String>,
    pub broker: Option<String>,
    pub days_on_zillow: Option<i64>,
}

/// Accepts `3`, `2.5`, `"3"` or `null`; anything else becomes `None`.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    })
}

/// Accepts `"98101"` or `98101`.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Whole numbers only; `7.0` and `"7"` pass, `7.5` does not.
fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
