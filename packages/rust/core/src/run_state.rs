//! Process-wide run state: which job is active and whether it was asked to stop.
//!
//! The state is advisory. It does not stop two jobs from running at once (the
//! last `start` wins); it only lets a control surface such as the CLI's Ctrl-C
//! handler ask the active job to wind down at its next checkpoint.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

/// Phase label reported when no job is active.
pub const IDLE: &str = "idle";

/// Active job name plus a cooperative stop flag.
#[derive(Debug, Default)]
pub struct RunState {
    phase: Mutex<Option<String>>,
    stop_requested: AtomicBool,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle, the form jobs and signal handlers hold.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn phase(&self) -> MutexGuard<'_, Option<String>> {
        self.phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mark `job_name` as running and discard any stale stop request.
    pub fn start(&self, job_name: &str) {
        let mut phase = self.phase();
        self.stop_requested.store(false, Ordering::SeqCst);
        *phase = Some(job_name.to_string());
        debug!(job = job_name, "run state: started");
    }

    /// Enter `job_name` and return a guard that undoes it when dropped.
    ///
    /// From idle this is [`start`](Self::start). Inside another job (a pipeline
    /// phase) the outer job's pending stop is kept and the guard restores the
    /// outer name on drop.
    pub fn begin(self: &Arc<Self>, job_name: &str) -> RunGuard {
        let mut phase = self.phase();
        let previous = phase.replace(job_name.to_string());
        if previous.is_none() {
            self.stop_requested.store(false, Ordering::SeqCst);
        }
        debug!(job = job_name, outer = previous.as_deref(), "run state: started");
        drop(phase);
        RunGuard {
            state: Arc::clone(self),
            previous,
        }
    }

    /// Ask the active job to stop. Ignored (returns `false`) when idle.
    pub fn request_stop(&self) -> bool {
        let phase = self.phase();
        match phase.as_deref() {
            Some(job) => {
                self.stop_requested.store(true, Ordering::SeqCst);
                info!(job, "stop requested");
                true
            }
            None => false,
        }
    }

    /// Cheap poll used between records and modules.
    pub fn should_stop(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Return to idle and clear the stop flag.
    pub fn clear(&self) {
        let mut phase = self.phase();
        *phase = None;
        self.stop_requested.store(false, Ordering::SeqCst);
    }

    /// `"idle"` or the active job name.
    pub fn current(&self) -> String {
        (*self.phase()).clone().unwrap_or_else(|| IDLE.to_string())
    }

    pub fn is_running(&self) -> bool {
        self.phase().is_some()
    }
}

/// Leaves the job on drop, whether it finished, failed, or stopped.
///
/// The outermost guard returns the state to idle and clears the stop flag.
#[must_use = "dropping the guard immediately marks the job as finished"]
pub struct RunGuard {
    state: Arc<RunState>,
    previous: Option<String>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(outer) => {
                debug!(job = %outer, "run state: back to outer job");
                *self.state.phase() = Some(outer);
            }
            None => {
                self.state.clear();
                debug!("run state: idle");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle() {
        let state = RunState::shared();
        assert_eq!(state.current(), "idle");
        assert!(!state.is_running());

        {
            let _guard = state.begin("Enrichment");
            assert_eq!(state.current(), "Enrichment");
            assert!(!state.should_stop());
            assert!(state.request_stop());
            assert!(state.should_stop());
        }

        assert_eq!(state.current(), "idle");
        assert!(!state.should_stop());
    }

    #[test]
    fn stop_is_ignored_when_idle() {
        let state = RunState::new();
        assert!(!state.request_stop());
        assert!(!state.should_stop());
    }

    #[test]
    fn start_discards_stale_stop() {
        let state = RunState::new();
        state.start("Discovery");
        state.request_stop();
        state.start("Scoring");
        assert!(!state.should_stop());
        assert_eq!(state.current(), "Scoring");
    }

    #[test]
    fn guard_clears_on_early_return() {
        fn failing_job(state: &Arc<RunState>) -> Result<(), &'static str> {
            let _guard = state.begin("Discovery");
            Err("boom")
        }

        let state = RunState::shared();
        assert!(failing_job(&state).is_err());
        assert_eq!(state.current(), "idle");
    }

    #[test]
    fn last_writer_wins() {
        let state = RunState::new();
        state.start("Discovery");
        state.start("Enrichment");
        assert_eq!(state.current(), "Enrichment");
        state.clear();
        assert_eq!(state.current(), "idle");
    }

    #[test]
    fn nested_guard_keeps_outer_job_and_stop() {
        let state = RunState::shared();
        let outer = state.begin("Pipeline");
        {
            let _inner = state.begin("Enrichment");
            assert_eq!(state.current(), "Enrichment");
            assert!(state.request_stop());
        }
        assert_eq!(state.current(), "Pipeline");
        assert!(state.should_stop());

        // A stop requested between phases is seen by the next one.
        {
            let _inner = state.begin("Scoring");
            assert!(state.should_stop());
        }
        drop(outer);
        assert_eq!(state.current(), "idle");
        assert!(!state.should_stop());
    }
}
