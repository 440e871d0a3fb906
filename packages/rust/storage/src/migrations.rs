//! SQL migration definitions for the DealScout database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: companies",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per discovered company, keyed by its content-derived UUID v5
CREATE TABLE IF NOT EXISTS companies (
    id                   TEXT PRIMARY KEY,
    name                 TEXT,
    url                  TEXT,
    phone                TEXT,
    address              TEXT,
    city                 TEXT,
    state                TEXT,
    zip                  TEXT,
    country              TEXT,
    google_rating        REAL,
    google_reviews       INTEGER,
    description          TEXT,
    industry_tag         TEXT,
    customer_type        TEXT,
    revenue_model        TEXT,
    legal_name           TEXT,
    naics_code           TEXT,
    naics_description    TEXT,
    is_family_owned      INTEGER,
    is_franchise         INTEGER,
    is_ecommerce         INTEGER,
    owner_name           TEXT,
    owner_source         TEXT,
    founder_email        TEXT,
    linkedin_company_url TEXT,
    owner_linkedin_url   TEXT,
    facebook_url         TEXT,
    instagram_url        TEXT,
    twitter_url          TEXT,
    youtube_url          TEXT,
    website_tech_stack   TEXT,
    ai_confidence        REAL,
    ai_evidence          TEXT,
    recent_news          TEXT,
    risk_flags           TEXT,
    revenue_estimate     INTEGER,
    employee_count       INTEGER,
    source               TEXT,
    web_traffic_estimate INTEGER,
    buyability_score     INTEGER,
    enrichment_status    TEXT DEFAULT 'pending',
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL,
    last_enriched_at     TEXT
);

CREATE INDEX IF NOT EXISTS idx_companies_status_created
    ON companies(enrichment_status, created_at);
CREATE INDEX IF NOT EXISTS idx_companies_score ON companies(buyability_score);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
