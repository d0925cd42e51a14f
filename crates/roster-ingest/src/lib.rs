//! Roster Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Loads delimited client files into PostgreSQL in fixed-size transactional
//! batches while tracking a single active run.
//!
//! # Pipeline
//!
//! ```text
//! file ──lines──▶ RecordParser ──ClientRecord──▶ BatchAccumulator ──Batch──▶ BatchLoader ──▶ RecordStore
//!                      │                                                         │
//!                      └──────────── rejected / committed / failed ──────────────┴──▶ RunGuard
//! ```
//!
//! - [`parser`]: line validation, with [`date`] normalization
//! - [`batch`]: batching of validated records
//! - [`loader`] and [`store`]: one transaction per batch
//! - [`job`]: single-flight run guard and status snapshot
//! - [`pipeline`] and [`service`]: the run driver and its trigger surface
//!
//! # Example
//!
//! ```no_run
//! use roster_ingest::{IngestConfig, IngestPipeline, IngestService, MemoryStore, RunOutcome};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = IngestConfig::from_env()?;
//! let store = MemoryStore::new(config.table.clone());
//! let service = IngestService::new(IngestPipeline::from_config(&config, store));
//!
//! if let RunOutcome::Finished(report) = service.run_file(&config.file_path).await? {
//!     println!("processed {} records", report.processed_count);
//! }
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod date;
pub mod db;
pub mod error;
pub mod generator;
pub mod job;
pub mod loader;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod schema;
pub mod service;
pub mod store;

pub use config::IngestConfig;
pub use error::{IngestError, IngestResult};
pub use job::{JobStatus, JobTracker, StatusSnapshot};
pub use parser::{RecordParser, RejectReason};
pub use pipeline::{IngestPipeline, RunReport};
pub use record::ClientRecord;
pub use service::{IngestService, RunOutcome};
pub use store::{MemoryStore, PgRecordStore, RecordStore};

/// Connect to PostgreSQL and build a store for the configured table
pub async fn connect_store(config: &IngestConfig, db: &db::DbConfig) -> IngestResult<PgRecordStore> {
    config
        .validate()
        .map_err(|e| IngestError::Config(e.to_string()))?;
    let pool = db::create_pool(db).await?;
    Ok(PgRecordStore::new(pool, config.table.clone()))
}
