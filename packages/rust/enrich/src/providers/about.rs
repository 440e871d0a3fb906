use std::collections::BTreeMap;

use async_trait::async_trait;
use dealscout_shared::{CompanyRecord, CompanyUpdate, Field, Result};
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::http::{PageFetcher, candidate_pages, visible_text};
use crate::module::EnrichmentModule;

const ABOUT_PAGES: &[&str] = &["about", "about-us", "our-story", "contact"];

/// Longest description kept, in characters.
const MAX_DESCRIPTION_CHARS: usize = 5000;

/// Text length after which we stop visiting further pages (given enough links).
const ENOUGH_TEXT: usize = 500;

/// Scrapes the home and about pages for a description and social profile links.
pub struct AboutScraper {
    fetcher: PageFetcher,
}

impl AboutScraper {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl EnrichmentModule for AboutScraper {
    fn name(&self) -> &str {
        "about"
    }

    async fn enrich(&self, record: &CompanyRecord) -> Result<CompanyUpdate> {
        let mut update = CompanyUpdate::new();
        let Some(url) = record.text(Field::Url) else {
            return Ok(update);
        };
        let Ok(base) = Url::parse(url) else {
            debug!(%url, "website is not an absolute URL");
            return Ok(update);
        };

        let mut best_text = String::new();
        let mut socials: BTreeMap<Field, String> = BTreeMap::new();

        for page in candidate_pages(url, ABOUT_PAGES) {
            let body = match self.fetcher.get_text(&page).await {
                Ok(Some(body)) => body,
                Ok(None) => continue,
                Err(e) => {
                    debug!(%page, error = %e, "about page fetch failed");
                    continue;
                }
            };

            let (text, links) = analyze_page(&body, &base);
            socials.extend(links);
            if text.len() > best_text.len() {
                best_text = text;
            }

            if best_text.len() > ENOUGH_TEXT && socials.len() > 1 {
                break;
            }
        }

        if !best_text.is_empty() {
            let description: String = best_text.chars().take(MAX_DESCRIPTION_CHARS).collect();
            update.set(Field::Description, description);
        }
        for (field, link) in socials {
            update.set(field, link);
        }
        Ok(update)
    }
}

/// Visible text and social links of one page.
fn analyze_page(body: &str, base: &Url) -> (String, Vec<(Field, String)>) {
    let doc = Html::parse_document(body);
    (visible_text(&doc), social_links(&doc, base))
}

fn social_links(doc: &Html, base: &Url) -> Vec<(Field, String)> {
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    doc.select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .filter_map(|link| classify_social(&link).map(|field| (field, link.to_string())))
        .collect()
}

/// Which social-profile field a link belongs to, if any.
fn classify_social(link: &Url) -> Option<Field> {
    let host = link.host_str()?.to_lowercase();
    let path = link.path().to_lowercase();

    if on_domain(&host, "linkedin.com") {
        if path.starts_with("/company") {
            Some(Field::LinkedinCompanyUrl)
        } else if path.starts_with("/in/") {
            Some(Field::OwnerLinkedinUrl)
        } else {
            None
        }
    } else if on_domain(&host, "facebook.com") {
        (!path.contains("sharer")).then_some(Field::FacebookUrl)
    } else if on_domain(&host, "instagram.com") {
        Some(Field::InstagramUrl)
    } else if on_domain(&host, "twitter.com") || on_domain(&host, "x.com") {
        Some(Field::TwitterUrl)
    } else if on_domain(&host, "youtube.com") || on_domain(&host, "youtu.be") {
        Some(Field::YoutubeUrl)
    } else {
        None
    }
}

fn on_domain(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
