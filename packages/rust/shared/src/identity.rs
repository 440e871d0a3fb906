//! Deterministic company identity.
//!
//! The same real-world company must map to the same [`CompanyId`] on every
//! discovery run so that re-discovery upserts instead of duplicating.
//! Website-keyed ids live in the URL namespace and name/address-keyed ids in
//! the DNS namespace, so the two paths can never collide with each other.

use url::Url;
use uuid::Uuid;

use crate::types::CompanyId;

/// Namespace for ids derived from a website domain.
const DOMAIN_NAMESPACE: Uuid = Uuid::NAMESPACE_URL;

/// Namespace for ids derived from `name|address`.
const NAME_ADDRESS_NAMESPACE: Uuid = Uuid::NAMESPACE_DNS;

/// Resolve the stable identifier for a discovered company.
///
/// Uses the normalized website domain when one can be parsed, otherwise
/// `lowercase(name) | lowercase(address)`.
pub fn resolve_identity(website: Option<&str>, name: &str, address: Option<&str>) -> CompanyId {
    if let Some(domain) = website.and_then(normalize_domain) {
        return CompanyId(Uuid::new_v5(&DOMAIN_NAMESPACE, domain.as_bytes()));
    }

    let key = format!(
        "{}|{}",
        name.to_lowercase(),
        address.unwrap_or_default().to_lowercase()
    );
    CompanyId(Uuid::new_v5(&NAME_ADDRESS_NAMESPACE, key.as_bytes()))
}

/// Normalize a website to its bare host: no scheme, no leading `www.`, lowercase.
///
/// Scheme-less input (`example.com`) is treated as `https://`. Returns `None`
/// when nothing host-like can be parsed.
pub fn normalize_domain(website: &str) -> Option<String> {
    let trimmed = website.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("https://{trimmed}"))
    }
    .ok()?;

    let host = parsed.host_str()?.trim_end_matches('.').to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}
