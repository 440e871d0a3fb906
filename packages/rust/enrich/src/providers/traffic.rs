use async_trait::async_trait;
use dealscout_shared::{CompanyRecord, CompanyUpdate, Field, Result};

use crate::http::PageFetcher;
use crate::module::EnrichmentModule;

/// Rough traffic tier inferred from homepage weight. Disabled by default.
pub struct TrafficEstimator {
    fetcher: PageFetcher,
}

impl TrafficEstimator {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl EnrichmentModule for TrafficEstimator {
    fn name(&self) -> &str {
        "traffic"
    }

    async fn enrich(&self, record: &CompanyRecord) -> Result<CompanyUpdate> {
        let mut update = CompanyUpdate::new();
        let Some(url) = record.text(Field::Url) else {
            return Ok(update);
        };

        if let Some(body) = self.fetcher.get_bytes(url).await? {
            update.set(Field::WebTrafficEstimate, traffic_tier(body.len()));
        }
        Ok(update)
    }
}

fn traffic_tier(page_bytes: usize) -> i64 {
    match page_bytes {
        0..50_000 => 10,
        50_000..200_000 => 30,
        200_000..1_000_000 => 60,
        _ => 80,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{company, module_config};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn tiers_by_size() {
        assert_eq!(traffic_tier(0), 10);
        assert_eq!(traffic_tier(49_999), 10);
        assert_eq!(traffic_tier(50_000), 30);
        assert_eq!(traffic_tier(250_000), 60);
        assert_eq!(traffic_tier(1_000_000), 80);
    }

    #[tokio::test]
    async fn estimates_from_homepage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(60_000)))
            .mount(&server)
            .await;

        let estimator = TrafficEstimator::new(PageFetcher::new(&module_config()).unwrap());
        let record = company("Heavy", Some(&server.uri()));
        let update = estimator.enrich(&record).await.unwrap();
        assert_eq!(
            update.get(Field::WebTrafficEstimate).and_then(|v| v.as_integer()),
            Some(30)
        );
    }

    #[tokio::test]
    async fn error_page_is_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let estimator = TrafficEstimator::new(PageFetcher::new(&module_config()).unwrap());
        let record = company("Down", Some(&server.uri()));
        assert!(estimator.enrich(&record).await.unwrap().is_empty());
    }
}
