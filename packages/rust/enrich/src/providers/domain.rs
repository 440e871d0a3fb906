use async_trait::async_trait;
use dealscout_shared::{CompanyRecord, CompanyUpdate, Field, Result};
use url::Url;

use crate::module::EnrichmentModule;

/// Rewrites the company website to its canonical `https://<host>` form.
pub struct DomainNormalizer;

#[async_trait]
impl EnrichmentModule for DomainNormalizer {
    fn name(&self) -> &str {
        "domain"
    }

    async fn enrich(&self, record: &CompanyRecord) -> Result<CompanyUpdate> {
        let mut update = CompanyUpdate::new();
        let Some(url) = record.text(Field::Url) else {
            return Ok(update);
        };

        match canonical_url(url) {
            Some(cleaned) if cleaned != url => {
                update.set(Field::Url, cleaned);
            }
            _ => {}
        }
        Ok(update)
    }
}

/// `https://` + lowercase host (and port, if any) with `www.` removed.
/// Paths and query strings are dropped. `None` if no host can be parsed.
pub fn canonical_url(url: &str) -> Option<String> {
    let url = url.trim();
    let parsed = if url.starts_with("http://") || url.starts_with("https://") {
        Url::parse(url)
    } else {
        Url::parse(&format!("https://{url}"))
    }
    .ok()?;

    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host.is_empty() {
        return None;
    }

    Some(match parsed.port() {
        Some(port) => format!("https://{host}:{port}"),
        None => format!("https://{host}"),
    })
}
