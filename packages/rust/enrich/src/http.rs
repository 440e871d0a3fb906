//! Shared HTTP plumbing for website-scraping modules.

use std::time::Duration;

use dealscout_shared::{DealScoutError, ModuleConfig, Result};
use reqwest::Client;
use scraper::Html;
use tracing::debug;

/// Elements whose text never counts as page copy.
const HIDDEN_TAGS: &[&str] = &["script", "style", "nav", "noscript"];

/// Build the HTTP client used for outbound module requests.
pub fn build_client(config: &ModuleConfig) -> Result<Client> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(config.http_timeout_seconds))
        .build()
        .map_err(|e| DealScoutError::Network(format!("failed to build HTTP client: {e}")))
}

/// Fetches company web pages. Error statuses yield `None`, transport failures `Err`.
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(config: &ModuleConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
        })
    }

    /// GET `url` and return the body as text, or `None` for a 4xx/5xx response.
    pub async fn get_text(&self, url: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DealScoutError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            debug!(%url, %status, "page unavailable");
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .map_err(|e| DealScoutError::Network(format!("{url}: body read failed: {e}")))?;
        Ok(Some(body))
    }

    /// GET `url` and return the raw body bytes, or `None` for a 4xx/5xx response.
    pub async fn get_bytes(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DealScoutError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            debug!(%url, %status, "page unavailable");
            return Ok(None);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DealScoutError::Network(format!("{url}: body read failed: {e}")))?;
        Ok(Some(body.to_vec()))
    }
}

/// `url` followed by each subpage path, e.g. `https://acme.com/about`.
pub(crate) fn candidate_pages(url: &str, subpages: &[&str]) -> Vec<String> {
    let base = url.trim_end_matches('/');
    std::iter::once(url.to_string())
        .chain(subpages.iter().map(|p| format!("{base}/{p}")))
        .collect()
}

/// Human-readable page text with scripts, styles and navigation removed.
/// Whitespace runs collapse to a single space.
pub(crate) fn visible_text(doc: &Html) -> String {
    let mut words: Vec<&str> = Vec::new();
    for node in doc.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_TAGS.contains(&e.name()))
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}
