use async_trait::async_trait;
use dealscout_shared::{CompanyRecord, CompanyUpdate, Field, Result};

use crate::module::EnrichmentModule;

/// First match wins, so more specific phrases come first.
const KEYWORD_MAP: &[(&str, &str)] = &[
    ("industrial cleaning", "Industrial Cleaning"),
    ("pressure wash", "Industrial Cleaning"),
    ("janitorial", "Janitorial Services"),
    ("floor coating", "Flooring"),
    ("pest control", "Pest Control"),
    ("landscap", "Landscaping"),
    ("concrete", "Concrete Services"),
    ("excavation", "Excavation"),
];

/// Keyword-based industry tag from the description and name.
pub struct IndustryTagger;

#[async_trait]
impl EnrichmentModule for IndustryTagger {
    fn name(&self) -> &str {
        "industry"
    }

    async fn enrich(&self, record: &CompanyRecord) -> Result<CompanyUpdate> {
        let mut update = CompanyUpdate::new();
        if record.has(Field::IndustryTag) {
            return Ok(update);
        }

        let text = [record.text(Field::Description), record.text(Field::Name)]
            .into_iter()
            .flatten()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        if let Some((_, label)) = KEYWORD_MAP.iter().find(|(kw, _)| text.contains(kw)) {
            update.set(Field::IndustryTag, *label);
        }
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::company;

    #[tokio::test]
    async fn tags_from_description() {
        let record = company("Green Thumb", None).with(
            Field::Description,
            "Full-service LANDSCAPING and\n  hardscape design for offices.",
        );
        let update = IndustryTagger.enrich(&record).await.unwrap();
        assert_eq!(
            update.get(Field::IndustryTag).and_then(|v| v.as_text()),
            Some("Landscaping")
        );
    }

    #[tokio::test]
    async fn phrase_split_across_whitespace_still_matches() {
        let record = company("Bay Area Pest\n\nControl", None);
        let update = IndustryTagger.enrich(&record).await.unwrap();
        assert_eq!(
            update.get(Field::IndustryTag).and_then(|v| v.as_text()),
            Some("Pest Control")
        );
    }

    #[tokio::test]
    async fn keeps_existing_tag() {
        let record = company("Janitorial Pros", None).with(Field::IndustryTag, "Commercial HVAC");
        assert!(IndustryTagger.enrich(&record).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_keyword_no_update() {
        let record = company("Acme Widgets", None);
        assert!(IndustryTagger.enrich(&record).await.unwrap().is_empty());
    }
}
