use async_trait::async_trait;
use dealscout_shared::{CompanyRecord, CompanyUpdate, Field, Result};
use tracing::{debug, info};

use crate::module::EnrichmentModule;
use crate::search::SearchClient;

const MAX_RESULTS: u32 = 3;

/// Finds the company's LinkedIn page (or, failing that, a person profile) via web search.
pub struct LinkedInFinder {
    search: Option<SearchClient>,
}

impl LinkedInFinder {
    pub fn new(search: Option<SearchClient>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl EnrichmentModule for LinkedInFinder {
    fn name(&self) -> &str {
        "linkedin_finder"
    }

    async fn enrich(&self, record: &CompanyRecord) -> Result<CompanyUpdate> {
        let mut update = CompanyUpdate::new();
        if record.has(Field::LinkedinCompanyUrl) {
            return Ok(update);
        }
        let (Some(search), Some(name)) = (&self.search, record.text(Field::Name)) else {
            return Ok(update);
        };

        let location = [record.text(Field::City), record.text(Field::State)]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let query = format!(r#"site:linkedin.com "{name}" {location}"#);
        info!(company = name, "searching LinkedIn");

        let hits = search.search(query.trim(), MAX_RESULTS).await?;
        for hit in hits {
            debug!(link = %hit.link, "linkedin search hit");
            if hit.link.contains("linkedin.com/company/") {
                update.set(Field::LinkedinCompanyUrl, hit.link);
                break;
            }
            if hit.link.contains("linkedin.com/in/") && !update.contains(Field::OwnerLinkedinUrl) {
                update.set(Field::OwnerLinkedinUrl, hit.link);
            }
        }
        Ok(update)
    }
}
