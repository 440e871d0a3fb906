use async_trait::async_trait;
use dealscout_shared::{CompanyRecord, CompanyUpdate, Field, Result};
use scraper::Html;

use crate::http::{PageFetcher, visible_text};
use crate::module::EnrichmentModule;

/// Markup or copy that only shows up on sites that sell online.
const SIGNATURES: &[&str] = &[
    "cdn.shopify.com",
    "woocommerce",
    "wp-e-commerce",
    "add to cart",
    "checkout",
];

/// Flags companies whose homepage carries an online-store signature.
pub struct EcommerceDetector {
    fetcher: PageFetcher,
}

impl EcommerceDetector {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl EnrichmentModule for EcommerceDetector {
    fn name(&self) -> &str {
        "ecommerce"
    }

    async fn enrich(&self, record: &CompanyRecord) -> Result<CompanyUpdate> {
        let mut update = CompanyUpdate::new();
        let Some(url) = record.text(Field::Url) else {
            return Ok(update);
        };

        let Some(body) = self.fetcher.get_text(url).await? else {
            return Ok(update);
        };

        if looks_like_store(&body) {
            update.set(Field::IsEcommerce, true);
        }
        Ok(update)
    }
}

fn looks_like_store(body: &str) -> bool {
    let raw = body.to_lowercase();
    if SIGNATURES.iter().any(|sig| raw.contains(sig)) {
        return true;
    }
    // Entity-encoded or tag-split button labels only match once rendered.
    let doc = Html::parse_document(body);
    visible_text(&doc).to_lowercase().contains("add to cart")
}
