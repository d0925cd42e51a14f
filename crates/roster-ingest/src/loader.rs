//! Transactional batch loader
//!
//! Each batch is written in exactly one transaction: bind, execute, commit.
//! Any failure rolls the whole batch back; nothing is retried.

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::batch::Batch;
use crate::store::{InsertStatement, RecordStore, StoreError, StoreTransaction};

/// A batch that was not persisted
#[derive(Debug, Error)]
#[error("batch of {batch_size} records was rolled back: {source}")]
pub struct LoadError {
    pub batch_size: usize,
    #[source]
    pub source: StoreError,
}

/// Writes batches to a [`RecordStore`]
#[derive(Debug, Clone)]
pub struct BatchLoader<S> {
    store: S,
}

impl<S: RecordStore> BatchLoader<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist `batch` atomically, returning the number of records written
    #[instrument(skip(self, batch), fields(batch = batch.seq, size = batch.len()))]
    pub async fn load(&self, batch: Batch) -> Result<usize, LoadError> {
        let batch_size = batch.len();
        let fail = |source: StoreError| LoadError { batch_size, source };

        let mut tx = self.store.begin().await.map_err(fail)?;

        let outcome = match InsertStatement::bind(self.store.table(), batch.records) {
            Ok(statement) => tx.execute(&statement).await,
            Err(e) => Err(StoreError::from(e)),
        };

        if let Err(source) = outcome {
            warn!(error = %source, "Batch failed, rolling back");
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            return Err(fail(source));
        }

        tx.commit().await.map_err(fail)?;
        debug!("Batch committed");

        Ok(batch_size)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::parser::RecordParser;
    use crate::store::MemoryStore;

    fn batch(seq: u64, ids: std::ops::Range<i64>) -> Batch {
        let parser = RecordParser::new();
        Batch {
            seq,
            records: ids
                .map(|id| {
                    parser
                        .parse_line(&format!("Juan|Pérez|{}|Activo|2023-01-01|true|false", id))
                        .unwrap()
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_load_commits_batch() {
        let store = MemoryStore::new("clients");
        let loader = BatchLoader::new(store.clone());

        assert_eq!(loader.load(batch(1, 0..250)).await.unwrap(), 250);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.rows.len(), 250);
        assert_eq!(snapshot.commits, 1);
        assert_eq!(snapshot.rollbacks, 0);
    }

    #[tokio::test]
    async fn test_execute_failure_rolls_back() {
        let store = MemoryStore::new("clients").failing_statements([1]);
        let loader = BatchLoader::new(store.clone());

        let err = loader.load(batch(1, 0..7)).await.unwrap_err();
        assert_eq!(err.batch_size, 7);
        assert!(matches!(err.source, StoreError::Backend(_)));

        let snapshot = store.snapshot();
        assert!(snapshot.rows.is_empty());
        assert_eq!(snapshot.commits, 0);
        assert_eq!(snapshot.rollbacks, 1);
    }

    #[tokio::test]
    async fn test_commit_failure_persists_nothing() {
        let store = MemoryStore::new("clients").failing_commits([1]);
        let loader = BatchLoader::new(store.clone());

        let err = loader.load(batch(1, 0..9)).await.unwrap_err();
        assert_eq!(err.batch_size, 9);
        assert!(matches!(err.source, StoreError::Backend(_)));

        let snapshot = store.snapshot();
        assert!(snapshot.rows.is_empty());
        assert_eq!(snapshot.commits, 0);
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_affect_next() {
        let store = MemoryStore::new("clients").failing_statements([1]);
        let loader = BatchLoader::new(store.clone());

        assert!(loader.load(batch(1, 0..3)).await.is_err());
        assert_eq!(loader.load(batch(2, 3..5)).await.unwrap(), 2);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.commits, 1);
        assert_eq!(snapshot.rollbacks, 1);
    }
}
