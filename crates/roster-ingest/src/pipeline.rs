//! Ingest run driver
//!
//! Streams the source file line by line through the parser, the batch
//! accumulator and the loader, reporting every outcome to the run guard.
//! At most one batch of records is held in memory at a time.
//!
//! Failure handling:
//! - a rejected line is logged, counted, and dropped; this includes lines
//!   that are not valid UTF-8
//! - a failed batch is rolled back and all its records are counted as errors
//! - an I/O error on the source stops the run and marks it failed

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::batch::{Batch, BatchAccumulator};
use crate::config::IngestConfig;
use crate::error::{IngestError, IngestResult};
use crate::job::{JobStatus, RunGuard, StatusSnapshot};
use crate::loader::BatchLoader;
use crate::parser::{RecordParser, FIELD_DELIMITER};
use crate::store::RecordStore;

/// Summary of one finished run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub path: PathBuf,
    /// Every line in the file, including skipped ones
    pub lines_read: u64,
    /// Lines without a field delimiter; neither processed nor errors
    pub lines_skipped: u64,
    /// Rejected lines per reason code
    pub rejections: BTreeMap<&'static str, u64>,
    pub batches_committed: u64,
    pub batches_failed: u64,
    pub processed_count: u64,
    pub error_count: u64,
    pub elapsed_ms: u64,
    pub status: JobStatus,
}

impl RunReport {
    fn new(run_id: Uuid, path: &Path) -> Self {
        Self {
            run_id,
            path: path.to_path_buf(),
            lines_read: 0,
            lines_skipped: 0,
            rejections: BTreeMap::new(),
            batches_committed: 0,
            batches_failed: 0,
            processed_count: 0,
            error_count: 0,
            elapsed_ms: 0,
            status: JobStatus::Running,
        }
    }

    fn finish(&mut self, snapshot: StatusSnapshot, started: Instant) {
        self.processed_count = snapshot.processed_count;
        self.error_count = snapshot.error_count;
        self.status = snapshot.last_status;
        self.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    }

    /// Total rejected lines across all reasons
    pub fn rejected(&self) -> u64 {
        self.rejections.values().sum()
    }
}

/// Parser, batching and loader for one store
#[derive(Debug)]
pub struct IngestPipeline<S> {
    parser: RecordParser,
    loader: BatchLoader<S>,
    batch_size: usize,
}

impl<S: RecordStore> IngestPipeline<S> {
    pub fn new(parser: RecordParser, store: S, batch_size: usize) -> Self {
        Self {
            parser,
            loader: BatchLoader::new(store),
            batch_size: batch_size.max(1),
        }
    }

    /// Pipeline using the parser rules and batch size from `config`
    pub fn from_config(config: &IngestConfig, store: S) -> Self {
        Self::new(config.parser(), store, config.batch_size)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn store(&self) -> &S {
        self.loader.store()
    }

    /// Ingest `path` under an already acquired run guard
    pub async fn run(&self, guard: RunGuard, path: &Path) -> IngestResult<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("ingest_run", %run_id, path = %path.display());
        self.execute(run_id, guard, path).instrument(span).await
    }

    async fn execute(&self, run_id: Uuid, guard: RunGuard, path: &Path) -> IngestResult<RunReport> {
        let started = Instant::now();
        let mut report = RunReport::new(run_id, path);

        info!(batch_size = self.batch_size, "Starting ingest run");

        let file = match File::open(path).await {
            Ok(file) => file,
            Err(e) => {
                error!(error = %e, "Failed to open source file");
                guard.fail();
                return Err(IngestError::source_read(path, e));
            },
        };

        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut accumulator = BatchAccumulator::new(self.batch_size);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {},
                Err(e) => {
                    error!(error = %e, line = report.lines_read + 1, "Failed to read source file");
                    guard.fail();
                    return Err(IngestError::source_read(path, e));
                },
            }
            report.lines_read += 1;

            let line = trim_line_ending(&buf);
            if !line.contains(&(FIELD_DELIMITER as u8)) {
                report.lines_skipped += 1;
                continue;
            }

            match self.parser.parse_bytes(line) {
                Ok(record) => {
                    if let Some(batch) = accumulator.push(record) {
                        self.load(batch, &guard, &mut report).await;
                    }
                },
                Err(reason) => {
                    debug!(line = report.lines_read, reason = reason.code(), detail = %reason, "Record rejected");
                    guard.record_rejected();
                    *report.rejections.entry(reason.code()).or_default() += 1;
                },
            }
        }

        if let Some(batch) = accumulator.finish() {
            self.load(batch, &guard, &mut report).await;
        }

        report.finish(guard.complete(), started);

        info!(
            lines = report.lines_read,
            processed = report.processed_count,
            errors = report.error_count,
            batches = report.batches_committed,
            failed_batches = report.batches_failed,
            elapsed_ms = report.elapsed_ms,
            "Ingest run completed"
        );

        Ok(report)
    }

    async fn load(&self, batch: Batch, guard: &RunGuard, report: &mut RunReport) {
        let seq = batch.seq;
        match self.loader.load(batch).await {
            Ok(written) => {
                guard.record_committed(written as u64);
                report.batches_committed += 1;
            },
            Err(e) => {
                error!(batch = seq, size = e.batch_size, error = %e.source, "Batch rolled back");
                guard.record_failed_batch(e.batch_size as u64);
                report.batches_failed += 1;
            },
        }
    }
}

/// Strip a trailing `\n` or `\r\n`
fn trim_line_ending(raw: &[u8]) -> &[u8] {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_line_ending() {
        assert_eq!(trim_line_ending(b"a|b\n"), b"a|b");
        assert_eq!(trim_line_ending(b"a|b\r\n"), b"a|b");
        assert_eq!(trim_line_ending(b"a|b"), b"a|b");
        assert_eq!(trim_line_ending(b"\r\n"), b"");
        assert_eq!(trim_line_ending(b"a\r|b\n"), b"a\r|b");
    }
}
