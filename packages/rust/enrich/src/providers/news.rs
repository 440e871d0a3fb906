use async_trait::async_trait;
use dealscout_shared::{CompanyRecord, CompanyUpdate, DealScoutError, Field, Result};
use tracing::info;

use crate::module::EnrichmentModule;
use crate::search::{NewsItem, SearchClient};

const MAX_ARTICLES: u32 = 5;
const MAX_ALERTS: usize = 2;
/// Serper time filter: last five years.
const LOOKBACK: &str = "qdr:y5";

const RISK_KEYWORDS: &[&str] = &[
    "lawsuit",
    "sue",
    "bankrupt",
    "fraud",
    "scandal",
    "court",
    "guilty",
    "fine",
    "violation",
    "investigation",
];

pub const CLEAN_NO_NEWS: &str = "Clean (No local negative news)";
pub const CLEAN_IRRELEVANT: &str = "Clean (News found but validated as irrelevant/safe)";

/// Searches local news for legal or financial trouble and records risk flags.
pub struct NewsFinder {
    search: Option<SearchClient>,
}

impl NewsFinder {
    pub fn new(search: Option<SearchClient>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl EnrichmentModule for NewsFinder {
    fn name(&self) -> &str {
        "news_finder"
    }

    async fn enrich(&self, record: &CompanyRecord) -> Result<CompanyUpdate> {
        let mut update = CompanyUpdate::new();
        let (Some(search), Some(name)) = (&self.search, record.text(Field::Name)) else {
            return Ok(update);
        };
        let city = record.text(Field::City).unwrap_or_default();

        info!(company = name, city, "checking news");
        let query = format!(
            r#""{name}" "{city}" lawsuit OR bankruptcy OR fraud OR scandal OR "court case" OR complaint"#
        );
        let articles = search.news(&query, MAX_ARTICLES, Some(LOOKBACK)).await?;

        if articles.is_empty() {
            update.set(Field::RiskFlags, CLEAN_NO_NEWS);
            return Ok(update);
        }

        let alerts = risk_alerts(&articles, name, city);
        let news_json = serde_json::to_string(&articles)
            .map_err(|e| DealScoutError::parse(format!("failed to encode news: {e}")))?;

        info!(articles = articles.len(), alerts = alerts.len(), "news check done");
        update.set(Field::RecentNews, news_json);
        if alerts.is_empty() {
            update.set(Field::RiskFlags, CLEAN_IRRELEVANT);
        } else {
            update.set(Field::RiskFlags, alerts.join(" | "));
        }
        Ok(update)
    }
}

/// `ALERT: <title>` for each article that mentions a risk keyword and this
/// company (or its city), capped at [`MAX_ALERTS`].
fn risk_alerts(articles: &[NewsItem], name: &str, city: &str) -> Vec<String> {
    let simple_name = simplify_name(name);
    let city = city.trim().to_lowercase();

    articles
        .iter()
        .filter(|item| {
            let blob = format!("{} {}", item.title, item.snippet).to_lowercase();
            let has_risk = RISK_KEYWORDS.iter().any(|k| blob.contains(k));
            let is_relevant = (!simple_name.is_empty() && blob.contains(&simple_name))
                || (!city.is_empty() && blob.contains(&city));
            has_risk && is_relevant
        })
        .take(MAX_ALERTS)
        .map(|item| format!("ALERT: {}", item.title))
        .collect()
}

/// Lowercased name with corporate suffixes removed ("Quality HVAC Inc" -> "quality hvac").
fn simplify_name(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| c == ',' || c == '.'))
        .filter(|w| !matches!(*w, "inc" | "llc" | "corp" | "co" | "ltd"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{company, module_config};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn item(title: &str, snippet: &str) -> NewsItem {
        NewsItem {
            title: title.into(),
            snippet: snippet.into(),
            ..NewsItem::default()
        }
    }

    #[test]
    fn simplifies_corporate_suffixes() {
        assert_eq!(simplify_name("Quality HVAC, Inc."), "quality hvac");
        assert_eq!(simplify_name("Bolt Electric LLC"), "bolt electric");
    }

    #[test]
    fn alerts_need_risk_and_relevance() {
        let articles = vec![
            item("Quality HVAC sued by customer", "A lawsuit was filed"),
            item("HVAC industry faces lawsuit wave", "National story"),
            item("Quality HVAC sponsors little league", "Community news"),
            item("Austin contractor fined", "A violation in Austin"),
            item("Quality HVAC in court again", "another court date"),
        ];
        let alerts = risk_alerts(&articles, "Quality HVAC Inc", "Austin");
        assert_eq!(
            alerts,
            vec![
                "ALERT: Quality HVAC sued by customer",
                "ALERT: Austin contractor fined"
            ]
        );
    }

    #[test]
    fn empty_city_does_not_make_everything_relevant() {
        let articles = vec![item("Industry lawsuit", "nationwide")];
        assert!(risk_alerts(&articles, "Acme", "").is_empty());
    }

    #[tokio::test]
    async fn records_news_and_alerts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/news"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "news": [
                    {"title": "Acme Roofing hit with lawsuit", "snippet": "court filing",
                     "date": "1 month ago", "source": "Gazette", "link": "https://news.example/1"}
                ]
            })))
            .mount(&server)
            .await;

        let client = SearchClient::new("k", &server.uri(), &module_config()).unwrap();
        let record = company("Acme Roofing", None).with(Field::City, "Denver");
        let update = NewsFinder::new(Some(client)).enrich(&record).await.unwrap();

        assert_eq!(
            update.get(Field::RiskFlags).and_then(|v| v.as_text()),
            Some("ALERT: Acme Roofing hit with lawsuit")
        );
        let news: serde_json::Value =
            serde_json::from_str(update.get(Field::RecentNews).and_then(|v| v.as_text()).unwrap())
                .unwrap();
        assert_eq!(news[0]["source"], "Gazette");
        assert!(news[0].get("snippet").is_none());
    }

    #[tokio::test]
    async fn no_articles_is_clean() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"news": []})))
            .mount(&server)
            .await;

        let client = SearchClient::new("k", &server.uri(), &module_config()).unwrap();
        let record = company("Quiet Co", None);
        let update = NewsFinder::new(Some(client)).enrich(&record).await.unwrap();
        assert_eq!(
            update.get(Field::RiskFlags).and_then(|v| v.as_text()),
            Some(CLEAN_NO_NEWS)
        );
        assert!(!update.contains(Field::RecentNews));
    }
}
