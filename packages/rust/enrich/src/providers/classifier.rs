use async_trait::async_trait;
use dealscout_shared::{CompanyRecord, CompanyUpdate, Field, Result};
use serde_json::Value;
use tracing::{debug, info};

use crate::ai::{AiClient, bool_field, number_field, text_field};
use crate::module::EnrichmentModule;

/// Descriptions shorter than this are not worth a model call.
const MIN_DESCRIPTION_CHARS: usize = 20;
/// Website text sent to the model, in characters.
const PROMPT_TEXT_CHARS: usize = 3500;

/// Asks the model to classify the business from its scraped website text.
pub struct AiClassifier {
    ai: Option<AiClient>,
}

impl AiClassifier {
    pub fn new(ai: Option<AiClient>) -> Self {
        Self { ai }
    }
}

#[async_trait]
impl EnrichmentModule for AiClassifier {
    fn name(&self) -> &str {
        "ai_classifier"
    }

    async fn enrich(&self, record: &CompanyRecord) -> Result<CompanyUpdate> {
        let Some(ai) = &self.ai else {
            return Ok(CompanyUpdate::new());
        };
        let description = record.text(Field::Description).unwrap_or_default();
        if description.chars().count() < MIN_DESCRIPTION_CHARS {
            debug!(company = %record.display_name(), "no description to classify");
            return Ok(CompanyUpdate::new());
        }

        let excerpt: String = description.chars().take(PROMPT_TEXT_CHARS).collect();
        let reply = ai.complete_json(&classification_prompt(&excerpt)).await?;
        let update = classification_update(&reply);

        info!(
            company = %record.display_name(),
            industry = ?update.get(Field::IndustryTag).and_then(|v| v.as_text()),
            fields = update.len(),
            "classified"
        );
        Ok(update)
    }
}

fn classification_prompt(website_text: &str) -> String {
    format!(
        r#"Act as a private equity analyst. Analyze this company website text:
"{website_text}"

Extract these data points:
1. Legal name: look for "Copyright (c) [Legal Name]" or terms-of-service text.
2. Industry tag: a specific classification (e.g. "Commercial HVAC").
3. NAICS code: the most accurate 6-digit NAICS code (2022 standard) and its description.
4. Customer type: "B2B", "B2C", or "Both".
5. Revenue model: "Recurring", "Project", or "Retail".
6. Family owned: boolean.
7. Franchise: boolean.
8. Owner name: names near "Founder", "President", "CEO", "Owner".
9. Tech stack: list of software found.
10. Confidence: 0.0 to 1.0.

Return only a JSON object:
{{
  "legal_name": string or null,
  "industry_tag": string,
  "naics_code": string,
  "naics_description": string,
  "customer_type": string,
  "revenue_model": string,
  "is_family_owned": boolean,
  "is_franchise": boolean,
  "owner_name": string or null,
  "website_tech_stack": [string],
  "confidence": number,
  "evidence": string
}}"#
    )
}

/// Map the model's JSON onto record fields. Keys the model left out or set
/// to null produce no update.
fn classification_update(reply: &Value) -> CompanyUpdate {
    let mut update = CompanyUpdate::new();

    for (key, field) in [
        ("legal_name", Field::LegalName),
        ("industry_tag", Field::IndustryTag),
        ("naics_code", Field::NaicsCode),
        ("naics_description", Field::NaicsDescription),
        ("customer_type", Field::CustomerType),
        ("revenue_model", Field::RevenueModel),
        ("owner_name", Field::OwnerName),
        ("evidence", Field::AiEvidence),
    ] {
        update.set_opt(field, text_field(reply, key));
    }

    update.set_opt(Field::IsFamilyOwned, bool_field(reply, "is_family_owned"));
    update.set_opt(Field::IsFranchise, bool_field(reply, "is_franchise"));
    update.set_opt(
        Field::AiConfidence,
        number_field(reply, "confidence").map(|c| c.clamp(0.0, 1.0)),
    );

    if let Some(Value::Array(stack)) = reply.get("website_tech_stack") {
        let names: Vec<&str> = stack.iter().filter_map(Value::as_str).collect();
        if !names.is_empty() {
            update.set_opt(Field::WebsiteTechStack, serde_json::to_string(&names).ok());
        }
    }

    update
}
