//! Process-wide indexing state
//!
//! The orchestrator owns exactly one `IndexingState`. It gates pipeline
//! invocation: a run can only start from `Idle`, and a stop only applies to
//! `Running`.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handles of an in-flight indexing run
#[derive(Debug)]
pub struct RunHandle {
    /// Monotonic run number, used to ignore completions of stale runs
    pub run_id: u64,

    /// Cancels every crawl, heartbeat and persistence task of the run
    pub cancel: CancellationToken,

    /// Task that joins all site subtrees and clears the running state
    pub supervisor: JoinHandle<()>,
}

/// Whether the indexing pipeline is idle or running
#[derive(Debug, Default)]
pub enum IndexingState {
    #[default]
    Idle,
    Running(RunHandle),
}

impl IndexingState {
    /// Returns true while a run is in flight
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running(_))
    }

    /// Returns the id of the in-flight run, if any
    pub fn run_id(&self) -> Option<u64> {
        match self {
            Self::Idle => None,
            Self::Running(handle) => Some(handle.run_id),
        }
    }

    /// Takes the running handle out, leaving the state idle
    pub fn take_run(&mut self) -> Option<RunHandle> {
        match std::mem::take(self) {
            Self::Idle => None,
            Self::Running(handle) => Some(handle),
        }
    }

    /// Clears the state if `run_id` is still the in-flight run
    ///
    /// Returns true if the state was cleared.
    pub fn finish(&mut self, run_id: u64) -> bool {
        if self.run_id() == Some(run_id) {
            *self = Self::Idle;
            true
        } else {
            false
        }
    }
}
