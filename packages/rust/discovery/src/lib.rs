//! Company discovery through the Google Places text-search API.
//!
//! Each configured text query (e.g. "commercial hvac contractors in Austin TX")
//! is sent to `places:searchText`. Results are mapped to [`CompanyRecord`]s
//! keyed by their deterministic identity, ready for the storage upsert.

mod parser;

use std::time::Duration;

use chrono::{DateTime, Utc};
use dealscout_shared::{
    CompanyRecord, DealScoutError, DiscoveryConfig, Field, Result, resolve_identity,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

pub use parser::{ParsedAddress, parse_address};

/// Timeout in seconds for a single search request.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Response fields we ask Places to return.
const FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress,places.websiteUri,\
places.nationalPhoneNumber,places.rating,places.userRatingCount,nextPageToken";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchTextRequest<'a> {
    text_query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    region_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

/// One page of text-search results.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacesPage {
    #[serde(default)]
    pub places: Vec<Place>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisplayName {
    #[serde(default)]
    pub text: String,
}

/// A business returned by Places.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: Option<String>,
    pub display_name: Option<DisplayName>,
    pub formatted_address: Option<String>,
    pub website_uri: Option<String>,
    pub national_phone_number: Option<String>,
    pub rating: Option<f64>,
    pub user_rating_count: Option<i64>,
}

impl Place {
    /// Map this place to a pending company record discovered at `discovered_at`.
    ///
    /// The name falls back to the website, then to `"Unknown"`.
    pub fn to_company(&self, discovered_at: DateTime<Utc>) -> CompanyRecord {
        let website = non_blank(self.website_uri.as_deref());
        let address = non_blank(self.formatted_address.as_deref());
        let name = self
            .display_name
            .as_ref()
            .and_then(|d| non_blank(Some(d.text.as_str())))
            .or(website)
            .unwrap_or("Unknown");

        let id = resolve_identity(website, name, address);
        let mut record = CompanyRecord::new(id, discovered_at).with(Field::Name, name);

        if let Some(url) = website {
            record = record.with(Field::Url, url);
        }
        if let Some(phone) = non_blank(self.national_phone_number.as_deref()) {
            record = record.with(Field::Phone, phone);
        }
        if let Some(address) = address {
            let parsed = parse_address(address);
            record = record.with(Field::Address, address);
            for (field, value) in [
                (Field::City, parsed.city),
                (Field::State, parsed.state),
                (Field::Zip, parsed.zip),
                (Field::Country, parsed.country),
            ] {
                if let Some(value) = value {
                    record = record.with(field, value);
                }
            }
        }
        if let Some(rating) = self.rating {
            record = record.with(Field::GoogleRating, rating);
        }
        if let Some(reviews) = self.user_rating_count {
            record = record.with(Field::GoogleReviews, reviews);
        }
        record
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the Places (New) `places:searchText` endpoint.
pub struct PlacesClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl PlacesClient {
    pub fn new(api_key: &str, config: &DiscoveryConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| DealScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Fetch one page of results for `text_query`.
    #[instrument(skip_all, fields(query = %text_query, paged = page_token.is_some()))]
    pub async fn search_text(
        &self,
        text_query: &str,
        region_code: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<PlacesPage> {
        let url = format!("{}/places:searchText", self.base_url);
        let request = SearchTextRequest {
            text_query,
            region_code: region_code.filter(|r| !r.is_empty()),
            page_token,
        };

        let response = self
            .http
            .post(&url)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&request)
            .send()
            .await
            .map_err(|e| DealScoutError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DealScoutError::Network(format!(
                "{url}: HTTP {status}: {body}"
            )));
        }

        let page: PlacesPage = response
            .json()
            .await
            .map_err(|e| DealScoutError::parse(format!("invalid places response: {e}")))?;

        debug!(
            places = page.places.len(),
            has_next = page.next_page_token.is_some(),
            "places page received"
        );
        Ok(page)
    }
}
