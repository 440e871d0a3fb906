//! Batch enrichment driver.
//!
//! Pulls eligible records page by page (newest first), applies the module
//! chain to each, and commits every record on its own. The stop flag is
//! polled before each page and before each record.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dealscout_enrich::EnrichmentModule;
use dealscout_shared::Result;
use dealscout_storage::{PageCursor, Storage};
use tracing::{debug, info, instrument};

use crate::chain::apply_chain;
use crate::pipeline::ProgressReporter;
use crate::run_state::RunState;

/// Default number of records fetched per page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Default upper bound on one module invocation.
pub const DEFAULT_MODULE_TIMEOUT: Duration = Duration::from_secs(120);

/// Counters for one batch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    pub pages: usize,
    pub processed: usize,
    pub completed: usize,
    pub partial: usize,
    pub module_failures: usize,
    pub stopped: bool,
}

/// One enrichment pass over every eligible record.
pub struct EnrichmentJob<'a> {
    storage: &'a Storage,
    modules: Vec<Box<dyn EnrichmentModule>>,
    run_state: Arc<RunState>,
    page_size: u32,
    module_timeout: Duration,
}

impl<'a> EnrichmentJob<'a> {
    pub fn new(
        storage: &'a Storage,
        modules: Vec<Box<dyn EnrichmentModule>>,
        run_state: Arc<RunState>,
    ) -> Self {
        Self {
            storage,
            modules,
            run_state,
            page_size: DEFAULT_PAGE_SIZE,
            module_timeout: DEFAULT_MODULE_TIMEOUT,
        }
    }

    /// Records per page; zero is bumped to one.
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn module_timeout(mut self, timeout: Duration) -> Self {
        self.module_timeout = timeout;
        self
    }

    /// Run the pass until no eligible record remains or a stop is requested.
    ///
    /// When a stop lands mid-chain, the fields gathered so far are committed
    /// for that record and the pass ends there. Storage errors abort the job;
    /// the run state is cleared either way.
    #[instrument(skip_all, fields(page_size = self.page_size, modules = self.modules.len()))]
    pub async fn run(&self, progress: &dyn ProgressReporter) -> Result<EnrichmentSummary> {
        let _guard = self.run_state.begin("Enrichment");
        let mut summary = EnrichmentSummary::default();
        let mut cursor: Option<PageCursor> = None;

        info!("enrichment pass started");

        'pages: loop {
            if self.run_state.should_stop() {
                summary.stopped = true;
                break;
            }

            let page = self
                .storage
                .fetch_enrichment_page(self.page_size, cursor.as_ref())
                .await?;
            if page.is_empty() {
                break;
            }
            summary.pages += 1;
            debug!(page = summary.pages, records = page.len(), "fetched page");

            for record in &page {
                if self.run_state.should_stop() {
                    summary.stopped = true;
                    break 'pages;
                }

                let outcome =
                    apply_chain(record, &self.modules, &self.run_state, self.module_timeout).await;
                summary.module_failures += outcome.failed;

                if outcome.update.is_empty() {
                    self.storage.mark_partial(&record.id).await?;
                    summary.partial += 1;
                } else {
                    self.storage
                        .commit_enrichment(&record.id, &outcome.update, Utc::now())
                        .await?;
                    summary.completed += 1;
                }
                summary.processed += 1;
                progress.enriched(&record.display_name(), summary.processed);

                if outcome.interrupted {
                    debug!(id = %record.id, "chain interrupted, kept what it gathered");
                    summary.stopped = true;
                    break 'pages;
                }
            }

            if page.len() < self.page_size as usize {
                break;
            }
            cursor = page.last().map(PageCursor::after);
        }

        if summary.stopped {
            info!(processed = summary.processed, "enrichment stopped on request");
        } else {
            info!(
                processed = summary.processed,
                completed = summary.completed,
                partial = summary.partial,
                module_failures = summary.module_failures,
                "enrichment pass finished"
            );
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use crate::testing::{
        FailingModule, StaticModule, StopAfterModule, StopOnCallModule, modules, record,
        temp_db_path, temp_storage,
    };
    use chrono::Duration as ChronoDuration;
    use dealscout_shared::{CompanyRecord, EnrichmentStatus, Field};

    /// Insert `count` records with strictly increasing `created_at`.
    async fn seed(storage: &Storage, count: usize) -> Vec<CompanyRecord> {
        let base = Utc::now() - ChronoDuration::hours(1);
        let mut records = Vec::new();
        for i in 0..count {
            let mut company = record(&format!("Company {i}"));
            company.created_at = base + ChronoDuration::seconds(i as i64);
            storage.upsert_discovered(&company).await.unwrap();
            records.push(company);
        }
        records
    }

    async fn status_of(storage: &Storage, company: &CompanyRecord) -> EnrichmentStatus {
        storage
            .get_company(&company.id)
            .await
            .unwrap()
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn contributing_chain_completes_records() {
        let storage = temp_storage().await;
        let seeded = seed(&storage, 3).await;
        let job = EnrichmentJob::new(
            &storage,
            modules![
                StaticModule::new("tagger", Field::IndustryTag, "Plumbing"),
                FailingModule("broken"),
            ],
            RunState::shared(),
        );

        let summary = job.run(&SilentProgress).await.unwrap();
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.module_failures, 3);
        assert!(!summary.stopped);

        for company in &seeded {
            let stored = storage.get_company(&company.id).await.unwrap().unwrap();
            assert_eq!(stored.status, EnrichmentStatus::Complete);
            assert_eq!(stored.text(Field::IndustryTag), Some("Plumbing"));
            assert!(stored.last_enriched_at.is_some());
        }
    }

    #[tokio::test]
    async fn empty_chain_marks_partial() {
        let storage = temp_storage().await;
        let seeded = seed(&storage, 2).await;
        let job = EnrichmentJob::new(
            &storage,
            modules![StaticModule::empty("quiet"), FailingModule("broken")],
            RunState::shared(),
        );

        let summary = job.run(&SilentProgress).await.unwrap();
        assert_eq!(summary.partial, 2);
        assert_eq!(summary.completed, 0);
        for company in &seeded {
            assert_eq!(status_of(&storage, company).await, EnrichmentStatus::Partial);
        }
    }

    #[tokio::test]
    async fn partial_records_are_visited_once_per_pass() {
        let storage = temp_storage().await;
        seed(&storage, 5).await;
        let job = EnrichmentJob::new(&storage, modules![StaticModule::empty("quiet")], RunState::shared())
            .page_size(2);

        let summary = job.run(&SilentProgress).await.unwrap();
        assert_eq!(summary.processed, 5);
        assert_eq!(summary.pages, 3);

        // Partial records stay eligible for the next pass.
        let again = job.run(&SilentProgress).await.unwrap();
        assert_eq!(again.processed, 5);
    }

    #[tokio::test]
    async fn existing_fields_survive_enrichment() {
        let storage = temp_storage().await;
        let company = record("Acme").with(Field::OwnerName, "Jane Doe");
        storage.upsert_discovered(&company).await.unwrap();

        let job = EnrichmentJob::new(
            &storage,
            modules![StaticModule::new("tagger", Field::IndustryTag, "HVAC")],
            RunState::shared(),
        );
        job.run(&SilentProgress).await.unwrap();

        let stored = storage.get_company(&company.id).await.unwrap().unwrap();
        assert_eq!(stored.text(Field::OwnerName), Some("Jane Doe"));
        assert_eq!(stored.text(Field::IndustryTag), Some("HVAC"));
    }

    #[tokio::test]
    async fn stop_mid_batch_keeps_committed_records() {
        let storage = temp_storage().await;
        let seeded = seed(&storage, 3).await;
        let state = RunState::shared();

        // Newest first: the first record processed is the last seeded one.
        let job = EnrichmentJob::new(
            &storage,
            modules![
                StaticModule::new("tagger", Field::IndustryTag, "Roofing"),
                StopAfterModule::new("stopper", Arc::clone(&state), Field::IsFamilyOwned),
            ],
            Arc::clone(&state),
        );

        let summary = job.run(&SilentProgress).await.unwrap();
        assert!(summary.stopped);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(state.current(), "idle");
        assert!(!state.should_stop());

        let first = storage.get_company(&seeded[2].id).await.unwrap().unwrap();
        assert_eq!(first.status, EnrichmentStatus::Complete);
        assert_eq!(first.text(Field::IndustryTag), Some("Roofing"));
        assert!(first.flag(Field::IsFamilyOwned));

        for untouched in &seeded[..2] {
            assert_eq!(status_of(&storage, untouched).await, EnrichmentStatus::Pending);
        }
    }

    #[tokio::test]
    async fn interrupted_chain_commits_what_it_gathered() {
        let storage = temp_storage().await;
        let seeded = seed(&storage, 3).await;
        let state = RunState::shared();

        let job = EnrichmentJob::new(
            &storage,
            modules![
                StaticModule::new("tagger", Field::IndustryTag, "Landscaping"),
                StopAfterModule::new("stopper", Arc::clone(&state), Field::IsFamilyOwned),
                StaticModule::new("never", Field::CustomerType, "B2B"),
            ],
            Arc::clone(&state),
        );

        let summary = job.run(&SilentProgress).await.unwrap();
        assert!(summary.stopped);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.completed, 1);

        let newest = storage.get_company(&seeded[2].id).await.unwrap().unwrap();
        assert_eq!(newest.status, EnrichmentStatus::Complete);
        assert_eq!(newest.text(Field::IndustryTag), Some("Landscaping"));
        assert!(newest.flag(Field::IsFamilyOwned));
        assert_eq!(newest.text(Field::CustomerType), None);

        for untouched in &seeded[..2] {
            assert_eq!(status_of(&storage, untouched).await, EnrichmentStatus::Pending);
        }
    }

    #[tokio::test]
    async fn stop_at_page_boundary_skips_the_next_page() {
        let storage = temp_storage().await;
        let seeded = seed(&storage, 5).await;
        let state = RunState::shared();

        // The second call finishes the first page, then asks to stop.
        let job = EnrichmentJob::new(
            &storage,
            modules![StopOnCallModule::new("counter", Arc::clone(&state), 2)],
            Arc::clone(&state),
        )
        .page_size(2);

        let summary = job.run(&SilentProgress).await.unwrap();
        assert!(summary.stopped);
        assert_eq!(summary.pages, 1);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.completed, 2);
        assert_eq!(state.current(), "idle");

        for done in &seeded[3..] {
            assert_eq!(status_of(&storage, done).await, EnrichmentStatus::Complete);
        }
        for untouched in &seeded[..3] {
            assert_eq!(status_of(&storage, untouched).await, EnrichmentStatus::Pending);
        }
    }

    #[tokio::test]
    async fn storage_error_aborts_and_clears_run_state() {
        let path = temp_db_path();
        {
            let storage = Storage::open(&path).await.unwrap();
            seed(&storage, 2).await;
        }
        let storage = Storage::open_readonly(&path).await.unwrap();
        let state = RunState::shared();

        let job = EnrichmentJob::new(
            &storage,
            modules![StaticModule::empty("quiet")],
            Arc::clone(&state),
        );
        let err = job.run(&SilentProgress).await.unwrap_err();
        assert!(err.to_string().contains("read-only"));
        assert_eq!(state.current(), "idle");
        assert!(!state.should_stop());
    }

    #[tokio::test]
    async fn empty_store_is_a_no_op() {
        let storage = temp_storage().await;
        let job = EnrichmentJob::new(&storage, modules![StaticModule::empty("quiet")], RunState::shared());
        let summary = job.run(&SilentProgress).await.unwrap();
        assert_eq!(summary, EnrichmentSummary::default());
    }
}
