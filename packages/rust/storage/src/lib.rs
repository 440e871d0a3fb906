//! Turso Embedded / libSQL storage layer for company records.
//!
//! The [`Storage`] struct wraps a libSQL database holding the `companies`
//! table. Every write is a single statement and commits on its own, so a crash
//! mid-batch never loses records that were already persisted.
//!
//! Column names are only ever taken from [`Field::as_str`]; nothing
//! user-supplied is interpolated into SQL.

mod migrations;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use dealscout_shared::{
    CompanyId, CompanyRecord, CompanyUpdate, DealScoutError, EnrichmentStatus, Field, FieldKind,
    FieldValue, Result,
};
use libsql::params::Params;
use libsql::{Connection, Database, Value, params};

/// Columns that discovery may fill. Existing non-null values win over new ones.
const FILL_BLANK_COLUMNS: &[Field] = &[
    Field::Name,
    Field::Url,
    Field::Phone,
    Field::Address,
    Field::City,
    Field::State,
    Field::Zip,
    Field::Country,
];

/// Columns where the freshest discovery value wins.
const REFRESH_COLUMNS: &[Field] = &[Field::GoogleRating, Field::GoogleReviews];

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

/// Keyset position inside the newest-first enrichment ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    created_at: String,
    id: String,
}

impl PageCursor {
    /// Cursor positioned just after `record`.
    pub fn after(record: &CompanyRecord) -> Self {
        Self {
            created_at: format_timestamp(&record.created_at),
            id: record.id.to_string(),
        }
    }
}

/// Outcome of a discovery upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Number of records per enrichment status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: u64,
    pub partial: u64,
    pub complete: u64,
}

impl StatusCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.partial + self.complete
    }
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DealScoutError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DealScoutError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DealScoutError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode (status and listing commands).
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DealScoutError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DealScoutError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        DealScoutError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(DealScoutError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Discovery writes
    // -----------------------------------------------------------------------

    /// Insert a discovered company, or merge it into the existing row with the same id.
    ///
    /// On conflict, contact and address columns only fill blanks; Google
    /// rating and review count take the newest non-null value. Enrichment
    /// status, enrichment output, and `created_at` are never touched.
    pub async fn upsert_discovered(&self, company: &CompanyRecord) -> Result<UpsertOutcome> {
        self.check_writable()?;
        let existed = self.company_exists(&company.id).await?;

        let now = format_timestamp(&Utc::now());
        let mut columns = vec!["id", "enrichment_status", "created_at", "updated_at"];
        let mut values = vec![
            Value::Text(company.id.to_string()),
            Value::Text(EnrichmentStatus::Pending.as_str().into()),
            Value::Text(format_timestamp(&company.created_at)),
            Value::Text(now),
        ];
        for (field, value) in &company.attributes {
            columns.push(field.as_str());
            values.push(to_sql_value(value));
        }

        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let mut merges = vec!["updated_at = excluded.updated_at".to_string()];
        merges.extend(FILL_BLANK_COLUMNS.iter().map(|f| {
            let c = f.as_str();
            format!("{c} = COALESCE(companies.{c}, excluded.{c})")
        }));
        merges.extend(REFRESH_COLUMNS.iter().map(|f| {
            let c = f.as_str();
            format!("{c} = COALESCE(excluded.{c}, companies.{c})")
        }));

        let sql = format!(
            "INSERT INTO companies ({}) VALUES ({})
             ON CONFLICT(id) DO UPDATE SET {}",
            columns.join(", "),
            placeholders.join(", "),
            merges.join(", "),
        );

        self.conn
            .execute(&sql, Params::Positional(values))
            .await
            .map_err(|e| DealScoutError::Storage(e.to_string()))?;

        Ok(if existed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }

    // -----------------------------------------------------------------------
    // Enrichment reads / writes
    // -----------------------------------------------------------------------

    /// Fetch up to `limit` records awaiting enrichment, newest first.
    ///
    /// `pending`, `partial`, and NULL statuses are eligible. Pass the cursor
    /// of the last record of the previous page to continue the same pass.
    pub async fn fetch_enrichment_page(
        &self,
        limit: u32,
        cursor: Option<&PageCursor>,
    ) -> Result<Vec<CompanyRecord>> {
        let eligible = "(enrichment_status IS NULL OR enrichment_status IN ('pending', 'partial'))";
        let mut rows = match cursor {
            None => {
                let sql = format!(
                    "SELECT {} FROM companies WHERE {eligible}
                     ORDER BY created_at DESC, id DESC LIMIT ?1",
                    select_columns()
                );
                self.conn.query(&sql, params![i64::from(limit)]).await
            }
            Some(c) => {
                let sql = format!(
                    "SELECT {} FROM companies WHERE {eligible}
                       AND (created_at < ?1 OR (created_at = ?1 AND id < ?2))
                     ORDER BY created_at DESC, id DESC LIMIT ?3",
                    select_columns()
                );
                self.conn
                    .query(&sql, params![c.created_at.as_str(), c.id.as_str(), i64::from(limit)])
                    .await
            }
        }
        .map_err(|e| DealScoutError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DealScoutError::Storage(e.to_string()))?
        {
            results.push(row_to_company(&row)?);
        }
        Ok(results)
    }

    /// Persist a non-empty enrichment result and mark the record `complete`.
    ///
    /// Fields, status, and `last_enriched_at` change in one statement.
    pub async fn commit_enrichment(
        &self,
        id: &CompanyId,
        update: &CompanyUpdate,
        enriched_at: DateTime<Utc>,
    ) -> Result<()> {
        self.check_writable()?;
        if update.is_empty() {
            return Err(DealScoutError::validation(
                "refusing to mark a record complete without any update",
            ));
        }

        let mut sets = Vec::with_capacity(update.len() + 3);
        let mut values = Vec::with_capacity(update.len() + 4);
        for (field, value) in update.iter() {
            values.push(to_sql_value(value));
            sets.push(format!("{} = ?{}", field.as_str(), values.len()));
        }

        let stamp = format_timestamp(&enriched_at);
        values.push(Value::Text(EnrichmentStatus::Complete.as_str().into()));
        sets.push(format!("enrichment_status = ?{}", values.len()));
        values.push(Value::Text(stamp.clone()));
        sets.push(format!("last_enriched_at = ?{}", values.len()));
        values.push(Value::Text(stamp));
        sets.push(format!("updated_at = ?{}", values.len()));
        values.push(Value::Text(id.to_string()));
        let id_param = values.len();

        let sql = format!(
            "UPDATE companies SET {} WHERE id = ?{id_param}",
            sets.join(", ")
        );

        let affected = self
            .conn
            .execute(&sql, Params::Positional(values))
            .await
            .map_err(|e| DealScoutError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(DealScoutError::Storage(format!("company {id} not found")));
        }
        Ok(())
    }

    /// Mark a record `partial`: processed, nothing learned, retry next pass.
    pub async fn mark_partial(&self, id: &CompanyId) -> Result<()> {
        self.check_writable()?;
        let now = format_timestamp(&Utc::now());
        self.conn
            .execute(
                "UPDATE companies SET enrichment_status = ?1, updated_at = ?2 WHERE id = ?3",
                params![
                    EnrichmentStatus::Partial.as_str(),
                    now.as_str(),
                    id.to_string()
                ],
            )
            .await
            .map_err(|e| DealScoutError::Storage(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Scoring
    // -----------------------------------------------------------------------

    /// Store the buyability score for a company.
    pub async fn set_score(&self, id: &CompanyId, score: u8) -> Result<()> {
        self.check_writable()?;
        let now = format_timestamp(&Utc::now());
        self.conn
            .execute(
                "UPDATE companies SET buyability_score = ?1, updated_at = ?2 WHERE id = ?3",
                params![i64::from(score), now.as_str(), id.to_string()],
            )
            .await
            .map_err(|e| DealScoutError::Storage(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Get a company by id.
    pub async fn get_company(&self, id: &CompanyId) -> Result<Option<CompanyRecord>> {
        let sql = format!("SELECT {} FROM companies WHERE id = ?1", select_columns());
        let mut rows = self
            .conn
            .query(&sql, params![id.to_string()])
            .await
            .map_err(|e| DealScoutError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_company(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DealScoutError::Storage(e.to_string())),
        }
    }

    /// List companies, best score first, then newest. `None` lists everything.
    pub async fn list_companies(&self, limit: Option<u32>) -> Result<Vec<CompanyRecord>> {
        let base = format!(
            "SELECT {} FROM companies
             ORDER BY buyability_score IS NULL, buyability_score DESC, created_at DESC, id DESC",
            select_columns()
        );
        let mut rows = match limit {
            Some(n) => self.conn.query(&format!("{base} LIMIT ?1"), params![i64::from(n)]).await,
            None => self.conn.query(&base, params![]).await,
        }
        .map_err(|e| DealScoutError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DealScoutError::Storage(e.to_string()))?
        {
            results.push(row_to_company(&row)?);
        }
        Ok(results)
    }

    /// Count records per enrichment status (NULL counts as pending).
    pub async fn status_counts(&self) -> Result<StatusCounts> {
        let mut rows = self
            .conn
            .query(
                "SELECT COALESCE(enrichment_status, 'pending'), COUNT(*)
                 FROM companies GROUP BY 1",
                params![],
            )
            .await
            .map_err(|e| DealScoutError::Storage(e.to_string()))?;

        let mut counts = StatusCounts::default();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DealScoutError::Storage(e.to_string()))?
        {
            let status: String = row
                .get(0)
                .map_err(|e| DealScoutError::Storage(e.to_string()))?;
            let n: i64 = row
                .get(1)
                .map_err(|e| DealScoutError::Storage(e.to_string()))?;
            match status.parse::<EnrichmentStatus>() {
                Ok(EnrichmentStatus::Pending) => counts.pending += n as u64,
                Ok(EnrichmentStatus::Partial) => counts.partial += n as u64,
                Ok(EnrichmentStatus::Complete) => counts.complete += n as u64,
                Err(_) => tracing::warn!(%status, "ignoring unknown enrichment status"),
            }
        }
        Ok(counts)
    }

    async fn company_exists(&self, id: &CompanyId) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM companies WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| DealScoutError::Storage(e.to_string()))?;
        match rows.next().await {
            Ok(row) => Ok(row.is_some()),
            Err(e) => Err(DealScoutError::Storage(e.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Number of bookkeeping columns selected before the attribute columns.
const META_COLUMNS: usize = 4;

/// `id, enrichment_status, created_at, last_enriched_at, <every field>`.
fn select_columns() -> String {
    let mut cols = vec!["id", "enrichment_status", "created_at", "last_enriched_at"];
    cols.extend(Field::ALL.iter().map(Field::as_str));
    cols.join(", ")
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DealScoutError::Storage(format!("invalid date '{s}': {e}")))
}

fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Bool(b) => Value::Integer(i64::from(*b)),
        FieldValue::Integer(i) => Value::Integer(*i),
        FieldValue::Real(r) => Value::Real(*r),
        FieldValue::Text(s) => Value::Text(s.clone()),
    }
}

fn from_sql_value(kind: FieldKind, value: Value) -> Option<FieldValue> {
    match (kind, value) {
        (_, Value::Null) => None,
        (FieldKind::Bool, Value::Integer(i)) => Some(FieldValue::Bool(i != 0)),
        (FieldKind::Real, Value::Integer(i)) => Some(FieldValue::Real(i as f64)),
        (FieldKind::Integer, Value::Real(r)) => Some(FieldValue::Integer(r as i64)),
        (_, Value::Integer(i)) => Some(FieldValue::Integer(i)),
        (_, Value::Real(r)) => Some(FieldValue::Real(r)),
        (_, Value::Text(s)) => Some(FieldValue::Text(s)),
        (_, Value::Blob(_)) => None,
    }
}

/// Convert a database row (selected with [`select_columns`]) to a [`CompanyRecord`].
fn row_to_company(row: &libsql::Row) -> Result<CompanyRecord> {
    let id: String = row
        .get(0)
        .map_err(|e| DealScoutError::Storage(e.to_string()))?;
    let id: CompanyId = id
        .parse()
        .map_err(|e| DealScoutError::Storage(format!("invalid company id '{id}': {e}")))?;

    let status = match row.get::<String>(1) {
        Ok(s) => s.parse()?,
        Err(_) => EnrichmentStatus::Pending,
    };

    let created_at: String = row
        .get(2)
        .map_err(|e| DealScoutError::Storage(e.to_string()))?;
    let last_enriched_at = match row.get::<String>(3) {
        Ok(s) => Some(parse_timestamp(&s)?),
        Err(_) => None,
    };

    let mut record = CompanyRecord::new(id, parse_timestamp(&created_at)?);
    record.status = status;
    record.last_enriched_at = last_enriched_at;

    for (offset, field) in Field::ALL.iter().enumerate() {
        let value = row
            .get_value((META_COLUMNS + offset) as i32)
            .map_err(|e| DealScoutError::Storage(e.to_string()))?;
        if let Some(value) = from_sql_value(field.kind(), value) {
            record.attributes.insert(*field, value);
        }
    }

    Ok(record)
}
