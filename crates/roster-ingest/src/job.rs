//! Single-flight run tracking
//!
//! [`JobTracker`] holds the process-wide run state. A run begins with
//! [`JobTracker::try_start`], which either hands out the only [`RunGuard`] or
//! reports that a run is already active. Counters change only through the
//! guard, and the guard always leaves the tracker in a terminal state: if it
//! is dropped without [`RunGuard::complete`] or [`RunGuard::fail`], the run is
//! marked failed.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::warn;

/// Outcome of the most recent run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Idle => "Idle",
            JobStatus::Running => "Running",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub running: bool,
    pub last_status: JobStatus,
    pub processed_count: u64,
    pub error_count: u64,
}

/// A run is already in progress; nothing was changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("an ingest run is already in progress")]
pub struct AlreadyRunning;

/// Process-wide run state
#[derive(Debug, Default)]
pub struct JobTracker {
    state: Mutex<StatusSnapshot>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the run slot, resetting counters for the new run
    pub fn try_start(self: &Arc<Self>) -> Result<RunGuard, AlreadyRunning> {
        let mut state = self.lock();
        if state.running {
            return Err(AlreadyRunning);
        }

        *state = StatusSnapshot {
            running: true,
            last_status: JobStatus::Running,
            processed_count: 0,
            error_count: 0,
        };

        Ok(RunGuard {
            tracker: Arc::clone(self),
            finished: false,
        })
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        *self.lock()
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    fn lock(&self) -> MutexGuard<'_, StatusSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive handle on the active run
#[derive(Debug)]
#[must_use = "dropping the guard marks the run failed"]
pub struct RunGuard {
    tracker: Arc<JobTracker>,
    finished: bool,
}

impl RunGuard {
    /// `n` records were committed
    pub fn record_committed(&self, n: u64) {
        self.tracker.lock().processed_count += n;
    }

    /// One line was rejected by the parser
    pub fn record_rejected(&self) {
        self.tracker.lock().error_count += 1;
    }

    /// A batch of `n` records was rolled back
    pub fn record_failed_batch(&self, n: u64) {
        self.tracker.lock().error_count += n;
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.tracker.snapshot()
    }

    pub fn complete(mut self) -> StatusSnapshot {
        self.finish(JobStatus::Completed)
    }

    pub fn fail(mut self) -> StatusSnapshot {
        self.finish(JobStatus::Failed)
    }

    fn finish(&mut self, status: JobStatus) -> StatusSnapshot {
        self.finished = true;
        let mut state = self.tracker.lock();
        state.running = false;
        state.last_status = status;
        *state
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Run ended without being finalized, marking it failed");
            self.finish(JobStatus::Failed);
        }
    }
}
