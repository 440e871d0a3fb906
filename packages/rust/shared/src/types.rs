//! Core domain types for DealScout company records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// CompanyId
// ---------------------------------------------------------------------------

/// A content-derived UUID v5 identifying one real-world company.
///
/// Built by [`crate::resolve_identity`]; never generated randomly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub Uuid);

impl std::fmt::Display for CompanyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CompanyId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// EnrichmentStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a record through the enrichment pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    /// Discovered, never enriched.
    #[default]
    Pending,
    /// Enriched at least once but no module contributed; retried next pass.
    Partial,
    /// At least one module contributed during a pass.
    Complete,
}

impl EnrichmentStatus {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Complete => "complete",
        }
    }

    /// Whether the batch driver should pick this record up.
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Pending | Self::Partial)
    }
}

impl std::fmt::Display for EnrichmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EnrichmentStatus {
    type Err = crate::DealScoutError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "partial" => Ok(Self::Partial),
            "complete" => Ok(Self::Complete),
            other => Err(crate::DealScoutError::validation(format!(
                "unknown enrichment status '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Field / FieldValue
// ---------------------------------------------------------------------------

/// Storage type of a [`Field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Real,
    Bool,
}

macro_rules! fields {
    ($($variant:ident => $column:literal : $kind:ident),+ $(,)?) => {
        /// A named company attribute. Each variant maps to exactly one column.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum Field {
            $($variant),+
        }

        impl Field {
            /// Every attribute, in column order.
            pub const ALL: &'static [Field] = &[$(Field::$variant),+];

            /// Column name in the `companies` table.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $column),+
                }
            }

            /// Value type stored in the column.
            pub fn kind(&self) -> FieldKind {
                match self {
                    $(Self::$variant => FieldKind::$kind),+
                }
            }
        }

        impl std::str::FromStr for Field {
            type Err = crate::DealScoutError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($column => Ok(Self::$variant),)+
                    other => Err(crate::DealScoutError::validation(format!(
                        "unknown company field '{other}'"
                    ))),
                }
            }
        }
    };
}

fields! {
    Name => "name": Text,
    Url => "url": Text,
    Phone => "phone": Text,
    Address => "address": Text,
    City => "city": Text,
    State => "state": Text,
    Zip => "zip": Text,
    Country => "country": Text,
    GoogleRating => "google_rating": Real,
    GoogleReviews => "google_reviews": Integer,
    Description => "description": Text,
    IndustryTag => "industry_tag": Text,
    CustomerType => "customer_type": Text,
    RevenueModel => "revenue_model": Text,
    LegalName => "legal_name": Text,
    NaicsCode => "naics_code": Text,
    NaicsDescription => "naics_description": Text,
    IsFamilyOwned => "is_family_owned": Bool,
    IsFranchise => "is_franchise": Bool,
    IsEcommerce => "is_ecommerce": Bool,
    OwnerName => "owner_name": Text,
    OwnerSource => "owner_source": Text,
    FounderEmail => "founder_email": Text,
    LinkedinCompanyUrl => "linkedin_company_url": Text,
    OwnerLinkedinUrl => "owner_linkedin_url": Text,
    FacebookUrl => "facebook_url": Text,
    InstagramUrl => "instagram_url": Text,
    TwitterUrl => "twitter_url": Text,
    YoutubeUrl => "youtube_url": Text,
    WebsiteTechStack => "website_tech_stack": Text,
    AiConfidence => "ai_confidence": Real,
    AiEvidence => "ai_evidence": Text,
    RecentNews => "recent_news": Text,
    RiskFlags => "risk_flags": Text,
    RevenueEstimate => "revenue_estimate": Integer,
    EmployeeCount => "employee_count": Integer,
    Source => "source": Text,
    WebTrafficEstimate => "web_traffic_estimate": Integer,
    BuyabilityScore => "buyability_score": Integer,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A present attribute value. There is deliberately no null variant:
/// an update can set or overwrite a field, never clear it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view; reals are truncated.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Real(r) => Some(*r as i64),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(r) => Some(*r),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Truthiness used for flags: `Bool(true)` or a non-zero integer.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Integer(i) => Some(*i != 0),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u8> for FieldValue {
    fn from(value: u8) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

// ---------------------------------------------------------------------------
// CompanyUpdate
// ---------------------------------------------------------------------------

/// A partial update proposed by one enrichment module (or accumulated over a chain).
///
/// An empty update means "no opinion". Keys that are absent are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyUpdate(BTreeMap<Field, FieldValue>);

impl CompanyUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field`, replacing any earlier value in this update.
    pub fn set(&mut self, field: Field, value: impl Into<FieldValue>) -> &mut Self {
        self.0.insert(field, value.into());
        self
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    /// Set `field` only when a value is present.
    pub fn set_opt<V: Into<FieldValue>>(&mut self, field: Field, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.set(field, value);
        }
        self
    }

    /// Set a text field only when the trimmed text is non-empty.
    pub fn set_text(&mut self, field: Field, value: Option<&str>) -> &mut Self {
        if let Some(text) = value.map(str::trim).filter(|t| !t.is_empty()) {
            self.set(field, text);
        }
        self
    }

    /// Layer `other` on top of this update; `other` wins on conflicts.
    pub fn merge(&mut self, other: CompanyUpdate) {
        self.0.extend(other.0);
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.0.get(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Field, &FieldValue)> {
        self.0.iter()
    }

    /// Field names touched by this update, for logging.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.0.keys().map(Field::as_str).collect()
    }
}

impl IntoIterator for CompanyUpdate {
    type Item = (Field, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<Field, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(Field, FieldValue)> for CompanyUpdate {
    fn from_iter<I: IntoIterator<Item = (Field, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// CompanyRecord
// ---------------------------------------------------------------------------

/// One company as stored in the `companies` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub id: CompanyId,
    pub status: EnrichmentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_enriched_at: Option<DateTime<Utc>>,
    pub attributes: BTreeMap<Field, FieldValue>,
}

impl CompanyRecord {
    /// A fresh `pending` record with no attributes.
    pub fn new(id: CompanyId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: EnrichmentStatus::Pending,
            created_at,
            last_enriched_at: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Return a new record with `update` layered on top.
    ///
    /// Only the keys present in `update` change; everything else is carried over.
    pub fn apply(&self, update: &CompanyUpdate) -> CompanyRecord {
        let mut next = self.clone();
        for (field, value) in update.iter() {
            next.attributes.insert(*field, value.clone());
        }
        next
    }

    /// Builder-style attribute setter, mostly for tests and discovery.
    pub fn with(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.attributes.insert(field, value.into());
        self
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.attributes.get(&field)
    }

    /// Text value, treating blank strings as absent.
    pub fn text(&self, field: Field) -> Option<&str> {
        self.get(field)
            .and_then(FieldValue::as_text)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn integer(&self, field: Field) -> Option<i64> {
        self.get(field).and_then(FieldValue::as_integer)
    }

    pub fn real(&self, field: Field) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_real)
    }

    /// Flag value; a missing flag reads as `false`.
    pub fn flag(&self, field: Field) -> bool {
        self.get(field).and_then(FieldValue::as_bool).unwrap_or(false)
    }

    pub fn has(&self, field: Field) -> bool {
        match self.get(field) {
            Some(FieldValue::Text(s)) => !s.trim().is_empty(),
            Some(_) => true,
            None => false,
        }
    }

    /// Display name, falling back to the id.
    pub fn display_name(&self) -> String {
        self.text(Field::Name)
            .map(String::from)
            .unwrap_or_else(|| self.id.to_string())
    }
}
