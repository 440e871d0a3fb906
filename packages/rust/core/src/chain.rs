//! Runs the ordered module chain against one record.

use std::time::Duration;

use dealscout_enrich::EnrichmentModule;
use dealscout_shared::{CompanyRecord, CompanyUpdate};
use tracing::{debug, warn};

use crate::run_state::RunState;

/// Result of one pass of the chain over a record.
#[derive(Debug, Clone, Default)]
pub struct ChainOutcome {
    /// Merged updates of every module that contributed, in chain order.
    pub update: CompanyUpdate,
    /// Modules that returned a non-empty update.
    pub contributed: usize,
    /// Modules that returned an empty update.
    pub empty: usize,
    /// Modules that errored or ran out of time.
    pub failed: usize,
    /// The chain halted early because a stop was requested.
    pub interrupted: bool,
}

/// Apply `modules` in order to `record`.
///
/// Each module sees the record as updated by the modules before it. A module
/// that fails or exceeds `module_timeout` is logged and skipped; its
/// contribution is discarded and the chain carries on. A stop request is
/// honored before each module and yields whatever has accumulated so far.
pub async fn apply_chain(
    record: &CompanyRecord,
    modules: &[Box<dyn EnrichmentModule>],
    run_state: &RunState,
    module_timeout: Duration,
) -> ChainOutcome {
    let mut outcome = ChainOutcome::default();
    let mut working = record.clone();

    for module in modules {
        if run_state.should_stop() {
            debug!(id = %record.id, module = module.name(), "stop requested, halting chain");
            outcome.interrupted = true;
            break;
        }

        match tokio::time::timeout(module_timeout, module.enrich(&working)).await {
            Ok(Ok(update)) if update.is_empty() => {
                outcome.empty += 1;
            }
            Ok(Ok(update)) => {
                debug!(
                    id = %record.id,
                    module = module.name(),
                    fields = ?update.field_names(),
                    "module contributed"
                );
                working = working.apply(&update);
                outcome.update.merge(update);
                outcome.contributed += 1;
            }
            Ok(Err(e)) => {
                warn!(id = %record.id, module = module.name(), error = %e, "module failed");
                outcome.failed += 1;
            }
            Err(_) => {
                warn!(
                    id = %record.id,
                    module = module.name(),
                    timeout_secs = module_timeout.as_secs(),
                    "module timed out"
                );
                outcome.failed += 1;
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        FailingModule, ReadsFieldModule, SlowModule, StaticModule, StopAfterModule, modules,
        record,
    };
    use dealscout_shared::{Field, FieldValue};
    use std::sync::Arc;

    const BUDGET: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn failing_module_is_isolated() {
        let modules = modules![
            StaticModule::new("first", Field::IndustryTag, "Commercial HVAC"),
            FailingModule("second"),
            StaticModule::new("third", Field::IsFamilyOwned, true),
        ];
        let state = RunState::new();
        let outcome = apply_chain(&record("Acme"), &modules, &state, BUDGET).await;

        assert_eq!(outcome.contributed, 2);
        assert_eq!(outcome.failed, 1);
        assert!(!outcome.interrupted);
        assert_eq!(
            outcome.update.get(Field::IndustryTag),
            Some(&FieldValue::from("Commercial HVAC"))
        );
        assert_eq!(
            outcome.update.get(Field::IsFamilyOwned),
            Some(&FieldValue::Bool(true))
        );
    }

    #[tokio::test]
    async fn later_modules_see_earlier_updates() {
        let modules = modules![
            StaticModule::new("writer", Field::Description, "fresh text"),
            ReadsFieldModule {
                name: "reader",
                source: Field::Description,
                target: Field::AiEvidence,
            },
        ];
        let state = RunState::new();
        let outcome = apply_chain(&record("Acme"), &modules, &state, BUDGET).await;
        assert_eq!(
            outcome.update.get(Field::AiEvidence).and_then(|v| v.as_text()),
            Some("fresh text")
        );
    }

    #[tokio::test]
    async fn empty_updates_never_clear_fields() {
        let modules = modules![
            StaticModule::empty("quiet"),
            StaticModule::new("tagger", Field::IndustryTag, "Plumbing"),
        ];
        let state = RunState::new();
        let input = record("Acme").with(Field::OwnerName, "Jane Doe");
        let outcome = apply_chain(&input, &modules, &state, BUDGET).await;

        assert_eq!(outcome.empty, 1);
        assert!(!outcome.update.contains(Field::OwnerName));
        let applied = input.apply(&outcome.update);
        assert_eq!(applied.text(Field::OwnerName), Some("Jane Doe"));
        assert_eq!(applied.text(Field::IndustryTag), Some("Plumbing"));
    }

    #[tokio::test]
    async fn timeout_counts_as_failure() {
        let modules = modules![
            SlowModule("sleepy", Duration::from_secs(30)),
            StaticModule::new("after", Field::IsFranchise, false),
        ];
        let state = RunState::new();
        let outcome =
            apply_chain(&record("Acme"), &modules, &state, Duration::from_millis(20)).await;
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.contributed, 1);
    }

    #[tokio::test]
    async fn stop_request_halts_between_modules() {
        let state = Arc::new(RunState::new());
        let _guard = state.begin("Enrichment");
        let modules = modules![
            StopAfterModule::new("stopper", Arc::clone(&state), Field::IndustryTag),
            StaticModule::new("never", Field::IsFamilyOwned, true),
        ];
        let outcome = apply_chain(&record("Acme"), &modules, &state, BUDGET).await;

        assert!(outcome.interrupted);
        assert_eq!(outcome.contributed, 1);
        assert!(!outcome.update.contains(Field::IsFamilyOwned));
    }
}
