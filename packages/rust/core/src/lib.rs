//! Core pipeline orchestration for DealScout.
//!
//! This crate ties discovery, the enrichment chain, storage and scoring together
//! into the jobs the CLI runs (`discover`, `enrich`, `score`, `run`), and owns
//! the process-wide [`RunState`] those jobs report into.

pub mod batch;
pub mod chain;
pub mod discovery;
pub mod pipeline;
pub mod run_state;
pub mod scoring;

pub use batch::{EnrichmentJob, EnrichmentSummary};
pub use chain::{ChainOutcome, apply_chain};
pub use discovery::{DiscoveryJob, DiscoverySummary};
pub use pipeline::{PipelineReport, ProgressReporter, SilentProgress};
pub use run_state::{IDLE, RunGuard, RunState};
pub use scoring::{ScoreCard, ScoreSignal, ScoringSummary, score, score_all, score_card};
