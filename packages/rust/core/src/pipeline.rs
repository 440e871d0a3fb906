//! End-to-end jobs: discover → enrich → score.
//!
//! Each phase builds its clients from [`AppConfig`] and runs under the shared
//! [`RunState`]. [`run_full`] chains the three and stops early when a phase
//! was asked to stop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dealscout_discovery::PlacesClient;
use dealscout_enrich::build_modules;
use dealscout_shared::{AppConfig, Result, require_api_key};
use dealscout_storage::Storage;
use tracing::{info, instrument};

use crate::batch::{EnrichmentJob, EnrichmentSummary};
use crate::discovery::{DiscoveryJob, DiscoverySummary};
use crate::run_state::RunState;
use crate::scoring::{ScoringSummary, score_all};

/// Result of [`run_full`]. Phases skipped after a stop are `None`.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub discovery: DiscoverySummary,
    pub enrichment: Option<EnrichmentSummary>,
    pub scoring: Option<ScoringSummary>,
    pub elapsed: Duration,
}

impl PipelineReport {
    pub fn stopped(&self) -> bool {
        self.discovery.stopped
            || self.enrichment.as_ref().is_some_and(|e| e.stopped)
            || self.scoring.as_ref().is_some_and(|s| s.stopped)
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each discovered company is upserted.
    fn discovered(&self, name: &str, count: usize);
    /// Called after each record is committed or marked partial.
    fn enriched(&self, name: &str, count: usize);
    /// Called after each score is persisted.
    fn scored(&self, current: usize, total: usize);
    /// Called when [`run_full`] completes.
    fn done(&self, report: &PipelineReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn discovered(&self, _name: &str, _count: usize) {}
    fn enriched(&self, _name: &str, _count: usize) {}
    fn scored(&self, _current: usize, _total: usize) {}
    fn done(&self, _report: &PipelineReport) {}
}

/// Run every configured discovery query.
///
/// With no queries configured this is a no-op; otherwise the places API key
/// must be set.
#[instrument(skip_all)]
pub async fn run_discovery(
    config: &AppConfig,
    storage: &Storage,
    run_state: &Arc<RunState>,
    progress: &dyn ProgressReporter,
) -> Result<DiscoverySummary> {
    progress.phase("Discovering companies");
    if config.discovery.queries.is_empty() {
        info!("no discovery queries configured, skipping discovery");
        return Ok(DiscoverySummary::default());
    }

    let key = require_api_key(&config.discovery.api_key_env, "Places")?;
    let client = PlacesClient::new(&key, &config.discovery)?;
    DiscoveryJob::new(
        storage,
        client,
        config.discovery.queries.clone(),
        Arc::clone(run_state),
    )
    .page_delay(Duration::from_millis(config.discovery.page_delay_ms))
    .run(progress)
    .await
}

/// Run one enrichment pass. `batch_size` overrides `defaults.batch_size`.
#[instrument(skip_all)]
pub async fn run_enrichment(
    config: &AppConfig,
    storage: &Storage,
    run_state: &Arc<RunState>,
    batch_size: Option<u32>,
    progress: &dyn ProgressReporter,
) -> Result<EnrichmentSummary> {
    progress.phase("Enriching companies");
    let modules = build_modules(config)?;
    EnrichmentJob::new(storage, modules, Arc::clone(run_state))
        .page_size(batch_size.unwrap_or(config.defaults.batch_size))
        .module_timeout(Duration::from_secs(
            config.enrichment.module_timeout_seconds,
        ))
        .run(progress)
        .await
}

/// Score every stored company.
#[instrument(skip_all)]
pub async fn run_scoring(
    storage: &Storage,
    run_state: &Arc<RunState>,
    progress: &dyn ProgressReporter,
) -> Result<ScoringSummary> {
    progress.phase("Scoring companies");
    score_all(storage, run_state, progress).await
}

/// Discover, enrich, then score.
///
/// The whole run holds one outer job, so a stop requested between phases
/// stays pending and skips the phases that have not started.
#[instrument(skip_all)]
pub async fn run_full(
    config: &AppConfig,
    storage: &Storage,
    run_state: &Arc<RunState>,
    progress: &dyn ProgressReporter,
) -> Result<PipelineReport> {
    let _guard = run_state.begin("Pipeline");
    let start = Instant::now();
    let mut report = PipelineReport {
        discovery: run_discovery(config, storage, run_state, progress).await?,
        ..PipelineReport::default()
    };

    if !report.discovery.stopped && !run_state.should_stop() {
        let enrichment = run_enrichment(config, storage, run_state, None, progress).await?;
        let stopped = enrichment.stopped;
        report.enrichment = Some(enrichment);
        if !stopped && !run_state.should_stop() {
            report.scoring = Some(run_scoring(storage, run_state, progress).await?);
        }
    }

    report.elapsed = start.elapsed();
    info!(
        elapsed_ms = report.elapsed.as_millis() as u64,
        stopped = report.stopped(),
        "pipeline finished"
    );
    progress.done(&report);
    Ok(report)
}
