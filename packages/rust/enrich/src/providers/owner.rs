use async_trait::async_trait;
use dealscout_shared::{CompanyRecord, CompanyUpdate, Field, Result};
use tracing::{debug, info};

use crate::ai::{AiClient, number_field, text_field};
use crate::module::EnrichmentModule;
use crate::search::{SearchClient, SearchHit};

const MAX_RESULTS: u32 = 5;
const MAX_EVIDENCE_CHARS: usize = 3000;
/// Owner names below this model confidence are discarded.
const MIN_CONFIDENCE: f64 = 0.5;

/// Identifies the owner from business-directory search snippets, read by the model.
pub struct OwnerFinder {
    search: Option<SearchClient>,
    ai: Option<AiClient>,
}

impl OwnerFinder {
    pub fn new(search: Option<SearchClient>, ai: Option<AiClient>) -> Self {
        Self { search, ai }
    }
}

#[async_trait]
impl EnrichmentModule for OwnerFinder {
    fn name(&self) -> &str {
        "owner_finder"
    }

    async fn enrich(&self, record: &CompanyRecord) -> Result<CompanyUpdate> {
        let mut update = CompanyUpdate::new();
        if record.has(Field::OwnerName) {
            return Ok(update);
        }
        let (Some(search), Some(ai), Some(name)) =
            (&self.search, &self.ai, record.text(Field::Name))
        else {
            return Ok(update);
        };

        let city = record.text(Field::City).unwrap_or_default();
        let state = record.text(Field::State).unwrap_or_default();
        let query = format!(
            r#"site:linkedin.com OR site:zoominfo.com OR site:buzzfile.com "{name}" {city} {state} (Owner OR CEO OR President OR Principal)"#
        );

        info!(company = name, "searching for owner");
        let hits = search.search(&query, MAX_RESULTS).await?;
        if hits.is_empty() {
            return Ok(update);
        }

        let reply = ai.complete_json(&owner_prompt(name, &evidence(&hits))).await?;
        let owner = text_field(&reply, "owner_name");
        let confidence = number_field(&reply, "confidence").unwrap_or(0.0);

        match owner {
            Some(owner) if confidence > MIN_CONFIDENCE => {
                let source = text_field(&reply, "source").unwrap_or_else(|| "Web Search".into());
                info!(company = name, %owner, confidence, "owner found");
                update.set(Field::OwnerName, owner);
                update.set(Field::OwnerSource, format!("Owner search: {source}"));
            }
            _ => debug!(company = name, confidence, "no confident owner"),
        }
        Ok(update)
    }
}

/// Search snippets flattened into one block, capped at [`MAX_EVIDENCE_CHARS`].
fn evidence(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| format!("SOURCE: {}\nTEXT: {}\n\n", h.title, h.snippet))
        .collect::<String>()
        .chars()
        .take(MAX_EVIDENCE_CHARS)
        .collect()
}

fn owner_prompt(company: &str, evidence: &str) -> String {
    format!(
        r#"Identify the owner, CEO, or president of "{company}" using ONLY these search snippets.

Search results:
{evidence}

Instructions:
- Look for names attached to titles like Owner, CEO, President, Founder, Principal.
- If several names appear, prefer the Owner.
- If no name is clearly identified, return null.

Return only a JSON object:
{{
  "owner_name": "Full Name" or null,
  "title": "Their Title" or null,
  "source": "Where you found this" or null,
  "confidence": 0.0 to 1.0
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{chat_reply, company, module_config};
    use dealscout_shared::AiConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn finder(server: &MockServer, ai_reply: &str) -> OwnerFinder {
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "organic": [{"title": "Jane Doe - Owner - Acme HVAC | LinkedIn",
                             "snippet": "Jane Doe, owner of Acme HVAC in Austin"}]
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(chat_reply(ai_reply))
            .mount(server)
            .await;

        let search = SearchClient::new("k", &server.uri(), &module_config()).unwrap();
        let ai = AiClient::new(
            "sk",
            &AiConfig {
                base_url: server.uri(),
                ..AiConfig::default()
            },
        )
        .unwrap();
        OwnerFinder::new(Some(search), Some(ai))
    }

    #[tokio::test]
    async fn confident_owner_is_recorded() {
        let server = MockServer::start().await;
        let finder = finder(
            &server,
            r#"{"owner_name": "Jane Doe", "title": "Owner", "source": "LinkedIn", "confidence": 0.9}"#,
        )
        .await;

        let update = finder.enrich(&company("Acme HVAC", None)).await.unwrap();
        assert_eq!(
            update.get(Field::OwnerName).and_then(|v| v.as_text()),
            Some("Jane Doe")
        );
        assert_eq!(
            update.get(Field::OwnerSource).and_then(|v| v.as_text()),
            Some("Owner search: LinkedIn")
        );
    }

    #[tokio::test]
    async fn low_confidence_is_discarded() {
        let server = MockServer::start().await;
        let finder = finder(&server, r#"{"owner_name": "Jane Doe", "confidence": 0.5}"#).await;
        assert!(finder.enrich(&company("Acme HVAC", None)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn known_owner_is_not_searched() {
        let server = MockServer::start().await;
        let finder = finder(&server, "{}").await;
        let record = company("Acme HVAC", None).with(Field::OwnerName, "John Roe");
        assert!(finder.enrich(&record).await.unwrap().is_empty());
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[test]
    fn evidence_is_capped() {
        let hits: Vec<SearchHit> = (0..100)
            .map(|i| SearchHit {
                title: format!("Result {i}"),
                snippet: "x".repeat(100),
                ..SearchHit::default()
            })
            .collect();
        assert_eq!(evidence(&hits).chars().count(), MAX_EVIDENCE_CHARS);
    }
}
