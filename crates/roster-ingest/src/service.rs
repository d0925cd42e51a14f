//! Trigger surface for ingest runs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::IngestResult;
use crate::job::{AlreadyRunning, JobTracker, StatusSnapshot};
use crate::pipeline::{IngestPipeline, RunReport};
use crate::store::RecordStore;

/// Result of an awaited run request
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Finished(RunReport),
    /// Another run held the slot; nothing was done
    AlreadyRunning,
}

/// Handle to a run started in the background
pub type RunHandle = JoinHandle<IngestResult<RunReport>>;

/// Starts ingest runs against one store, at most one at a time
pub struct IngestService<S> {
    tracker: Arc<JobTracker>,
    pipeline: Arc<IngestPipeline<S>>,
}

impl<S> Clone for IngestService<S> {
    fn clone(&self) -> Self {
        Self {
            tracker: Arc::clone(&self.tracker),
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

impl<S: RecordStore + 'static> IngestService<S> {
    pub fn new(pipeline: IngestPipeline<S>) -> Self {
        Self::with_tracker(pipeline, Arc::new(JobTracker::new()))
    }

    pub fn with_tracker(pipeline: IngestPipeline<S>, tracker: Arc<JobTracker>) -> Self {
        Self {
            tracker,
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn tracker(&self) -> &Arc<JobTracker> {
        &self.tracker
    }

    pub fn pipeline(&self) -> &IngestPipeline<S> {
        &self.pipeline
    }

    pub fn status(&self) -> StatusSnapshot {
        self.tracker.snapshot()
    }

    /// Run to completion on the current task
    pub async fn run_file(&self, path: impl AsRef<Path>) -> IngestResult<RunOutcome> {
        let guard = match self.tracker.try_start() {
            Ok(guard) => guard,
            Err(AlreadyRunning) => {
                warn!(path = %path.as_ref().display(), "Ingest run already in progress");
                return Ok(RunOutcome::AlreadyRunning);
            },
        };

        let report = self.pipeline.run(guard, path.as_ref()).await?;
        Ok(RunOutcome::Finished(report))
    }

    /// Start a run in the background and return immediately.
    ///
    /// The run slot is claimed before spawning, so concurrent triggers can
    /// never both start.
    pub fn trigger(&self, path: PathBuf) -> Result<RunHandle, AlreadyRunning> {
        let guard = self.tracker.try_start()?;
        let pipeline = Arc::clone(&self.pipeline);

        info!(path = %path.display(), "Ingest run triggered");

        Ok(tokio::spawn(async move {
            let result = pipeline.run(guard, &path).await;
            if let Err(e) = &result {
                error!(error = %e, "Ingest run failed");
            }
            result
        }))
    }
}
