//! Discovery job: run every configured places query and upsert the results.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dealscout_discovery::PlacesClient;
use dealscout_shared::{DiscoveryQuery, Result};
use dealscout_storage::{Storage, UpsertOutcome};
use tracing::{debug, error, info, instrument};

use crate::pipeline::ProgressReporter;
use crate::run_state::RunState;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    pub queries: usize,
    pub pages: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Queries abandoned because the places API failed.
    pub failed_queries: usize,
    pub stopped: bool,
}

pub struct DiscoveryJob<'a> {
    storage: &'a Storage,
    client: PlacesClient,
    queries: Vec<DiscoveryQuery>,
    page_delay: Duration,
    run_state: Arc<RunState>,
}

impl<'a> DiscoveryJob<'a> {
    pub fn new(
        storage: &'a Storage,
        client: PlacesClient,
        queries: Vec<DiscoveryQuery>,
        run_state: Arc<RunState>,
    ) -> Self {
        Self {
            storage,
            client,
            queries,
            page_delay: Duration::from_secs(2),
            run_state,
        }
    }

    /// Pause between result pages of one query.
    pub fn page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Run every query in order.
    ///
    /// A failing query is logged and skipped. Storage errors abort the job.
    #[instrument(skip_all, fields(queries = self.queries.len()))]
    pub async fn run(&self, progress: &dyn ProgressReporter) -> Result<DiscoverySummary> {
        let _guard = self.run_state.begin("Discovery");
        let mut summary = DiscoverySummary::default();

        'queries: for query in &self.queries {
            summary.queries += 1;
            info!(query = %query.text_query, limit = query.limit, "running discovery query");

            let limit = query.limit as usize;
            let mut taken = 0usize;
            let mut page_token: Option<String> = None;

            while taken < limit {
                if self.run_state.should_stop() {
                    summary.stopped = true;
                    break 'queries;
                }
                if page_token.is_some() && !self.page_delay.is_zero() {
                    tokio::time::sleep(self.page_delay).await;
                }

                let page = match self
                    .client
                    .search_text(
                        &query.text_query,
                        Some(query.region_code.as_str()),
                        page_token.as_deref(),
                    )
                    .await
                {
                    Ok(page) => page,
                    Err(e) => {
                        error!(query = %query.text_query, error = %e, "discovery query failed");
                        summary.failed_queries += 1;
                        continue 'queries;
                    }
                };
                summary.pages += 1;

                let now = Utc::now();
                for place in page.places.iter().take(limit - taken) {
                    let company = place.to_company(now);
                    match self.storage.upsert_discovered(&company).await? {
                        UpsertOutcome::Inserted => summary.inserted += 1,
                        UpsertOutcome::Updated => summary.updated += 1,
                    }
                    taken += 1;
                    progress.discovered(&company.display_name(), summary.inserted + summary.updated);
                }

                match page.next_page_token {
                    Some(token) if !page.places.is_empty() => page_token = Some(token),
                    _ => break,
                }
            }
            debug!(query = %query.text_query, taken, "query finished");
        }

        info!(
            inserted = summary.inserted,
            updated = summary.updated,
            failed_queries = summary.failed_queries,
            stopped = summary.stopped,
            "discovery finished"
        );
        Ok(summary)
    }
}
