//! US street-address parsing for Places `formattedAddress` strings.
//!
//! Handles the common `street, city, ST 12345[, USA]` shape. Anything with
//! fewer than three comma-separated parts is left unparsed.

/// Location components pulled out of a formatted address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAddress {
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

/// Trailing components that name the country rather than a city or state.
const COUNTRY_SUFFIXES: &[&str] = &["usa", "us", "united states"];

/// Split `"123 Main St, Austin, TX 78701, USA"` into city, state, zip and country.
pub fn parse_address(address: &str) -> ParsedAddress {
    let mut parts: Vec<&str> = address
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if parts
        .last()
        .is_some_and(|last| COUNTRY_SUFFIXES.contains(&last.to_lowercase().as_str()))
    {
        parts.pop();
    }

    if parts.len() < 3 {
        return ParsedAddress::default();
    }

    let city = parts[parts.len() - 2];
    let mut state_zip = parts[parts.len() - 1].split_whitespace();

    ParsedAddress {
        city: Some(city.to_string()),
        state: state_zip.next().map(str::to_string),
        zip: state_zip.next().map(str::to_string),
        country: Some("USA".to_string()),
    }
}
