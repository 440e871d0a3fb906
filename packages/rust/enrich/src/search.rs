//! Serper (Google Search) client for web and news queries.

use std::time::Duration;

use dealscout_shared::{DealScoutError, ModuleConfig, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One organic web-search result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

/// One news-search result.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NewsItem {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing)]
    pub snippet: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Deserialize)]
struct OrganicResponse {
    #[serde(default)]
    organic: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    news: Vec<NewsItem>,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    gl: &'a str,
    hl: &'a str,
    num: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tbs: Option<&'a str>,
}

/// Thin client over the Serper `search` and `news` endpoints.
#[derive(Clone)]
pub struct SearchClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl SearchClient {
    pub fn new(api_key: &str, base_url: &str, config: &ModuleConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()
            .map_err(|e| DealScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Run a US/English web search and return up to `num` organic hits.
    pub async fn search(&self, query: &str, num: u32) -> Result<Vec<SearchHit>> {
        let request = SearchRequest {
            q: query,
            gl: "us",
            hl: "en",
            num,
            tbs: None,
        };
        let response: OrganicResponse = self.post("search", &request).await?;
        Ok(response.organic)
    }

    /// Run a news search, optionally restricted by a `tbs` time filter (e.g. `qdr:y5`).
    pub async fn news(&self, query: &str, num: u32, tbs: Option<&str>) -> Result<Vec<NewsItem>> {
        let request = SearchRequest {
            q: query,
            gl: "us",
            hl: "en",
            num,
            tbs,
        };
        let response: NewsResponse = self.post("news", &request).await?;
        Ok(response.news)
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        request: &SearchRequest<'_>,
    ) -> Result<T> {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!(endpoint, query = request.q, "serper request");

        let response = self
            .http
            .post(&url)
            .header("X-API-KEY", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| DealScoutError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DealScoutError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| DealScoutError::parse(format!("invalid serper response: {e}")))
    }
}
