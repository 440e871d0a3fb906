use std::sync::LazyLock;

use async_trait::async_trait;
use dealscout_shared::{CompanyRecord, CompanyUpdate, Field, Result};
use regex::Regex;
use tracing::{debug, info};

use crate::http::{PageFetcher, candidate_pages};
use crate::module::EnrichmentModule;

const CONTACT_PAGES: &[&str] = &["contact", "about"];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("valid regex")
});

/// Substrings that mark template, tracking or asset addresses.
const JUNK: &[&str] = &[
    "sentry.io",
    "wix.com",
    "squarespace.com",
    "wordpress.com",
    "example.com",
    "domain.com",
    ".png",
    ".jpg",
    ".jpeg",
];

const GENERIC_MAILBOXES: &[&str] = &[
    "info", "contact", "sales", "support", "admin", "office", "hello",
];

/// Scans the home, contact and about pages for the best founder email.
pub struct EmailFinder {
    fetcher: PageFetcher,
}

impl EmailFinder {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl EnrichmentModule for EmailFinder {
    fn name(&self) -> &str {
        "email_finder"
    }

    async fn enrich(&self, record: &CompanyRecord) -> Result<CompanyUpdate> {
        let mut update = CompanyUpdate::new();
        if record.has(Field::FounderEmail) {
            return Ok(update);
        }
        let Some(url) = record.text(Field::Url) else {
            return Ok(update);
        };

        let mut found: Vec<String> = Vec::new();
        for page in candidate_pages(url, CONTACT_PAGES) {
            match self.fetcher.get_text(&page).await {
                Ok(Some(body)) => {
                    for email in extract_emails(&body) {
                        if !found.contains(&email) {
                            found.push(email);
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => debug!(%page, error = %e, "contact page fetch failed"),
            }
        }

        if let Some(best) = pick_best(&found, record.text(Field::OwnerName)) {
            info!(company = %record.display_name(), email = %best, "email found");
            update.set(Field::FounderEmail, best);
        }
        Ok(update)
    }
}

fn extract_emails(body: &str) -> Vec<String> {
    EMAIL_RE
        .find_iter(body)
        .map(|m| m.as_str().to_lowercase())
        .filter(|e| !JUNK.iter().any(|j| e.contains(j)))
        .collect()
}

/// Owner first-name match, else the first personal mailbox, else the first address.
fn pick_best(emails: &[String], owner_name: Option<&str>) -> Option<String> {
    let first_name = owner_name
        .and_then(|n| n.split_whitespace().next())
        .map(str::to_lowercase);

    if let Some(first) = first_name {
        if let Some(hit) = emails.iter().find(|e| e.contains(&first)) {
            return Some(hit.clone());
        }
    }

    emails
        .iter()
        .find(|e| {
            let mailbox = e.split('@').next().unwrap_or_default();
            !GENERIC_MAILBOXES.contains(&mailbox)
        })
        .or_else(|| emails.first())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{company, module_config};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn emails(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn extracts_and_filters_junk() {
        let body = r#"Write to Info@Acme.com or logo@2x.png, errors go to abc@sentry.io.
            Jane: jane.doe@acme.com"#;
        assert_eq!(
            extract_emails(body),
            vec!["info@acme.com", "jane.doe@acme.com"]
        );
    }

    #[test]
    fn prefers_owner_then_personal_then_any() {
        let found = emails(&["info@acme.com", "mike@acme.com", "jane@acme.com"]);
        assert_eq!(
            pick_best(&found, Some("Jane Doe")).as_deref(),
            Some("jane@acme.com")
        );
        assert_eq!(pick_best(&found, None).as_deref(), Some("mike@acme.com"));

        let generic = emails(&["info@acme.com", "sales@acme.com"]);
        assert_eq!(pick_best(&generic, Some("Zed")).as_deref(), Some("info@acme.com"));
        assert_eq!(pick_best(&[], None), None);
    }

    #[tokio::test]
    async fn scans_contact_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>office@acme.com</p>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/contact"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<a href="mailto:jane@acme.com">Jane</a>"#),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let finder = EmailFinder::new(PageFetcher::new(&module_config()).unwrap());
        let record = company("Acme", Some(&server.uri())).with(Field::OwnerName, "Jane Doe");
        let update = finder.enrich(&record).await.unwrap();
        assert_eq!(
            update.get(Field::FounderEmail).and_then(|v| v.as_text()),
            Some("jane@acme.com")
        );
    }

    #[tokio::test]
    async fn existing_email_is_kept() {
        let finder = EmailFinder::new(PageFetcher::new(&module_config()).unwrap());
        let record = company("Acme", Some("http://127.0.0.1:9"))
            .with(Field::FounderEmail, "owner@acme.com");
        assert!(finder.enrich(&record).await.unwrap().is_empty());
    }
}
