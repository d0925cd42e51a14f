//! In-memory record store
//!
//! Keeps committed rows in process memory. Used by `roster-ingest run
//! --dry-run` and by tests, which can make chosen statements or commits fail
//! or hold transactions open.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;

use super::{InsertStatement, RecordStore, StoreError, StoreTransaction};
use crate::schema::{SqlValue, COLUMN_COUNT};

type Row = [SqlValue; COLUMN_COUNT];

#[derive(Debug, Default)]
struct MemoryState {
    rows: Vec<Row>,
    statements: u64,
    commit_attempts: u64,
    commits: u64,
    rollbacks: u64,
}

/// Rows committed to a [`MemoryStore`] plus transaction counts
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySnapshot {
    pub rows: Vec<Row>,
    pub commits: u64,
    pub rollbacks: u64,
}

/// Transactional store backed by a `Vec`
#[derive(Debug, Clone)]
pub struct MemoryStore {
    table: String,
    state: Arc<Mutex<MemoryState>>,
    failing_statements: Arc<HashSet<u64>>,
    failing_commits: Arc<HashSet<u64>>,
    gate: Option<Arc<Semaphore>>,
    offline: bool,
}

impl MemoryStore {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            state: Arc::default(),
            failing_statements: Arc::default(),
            failing_commits: Arc::default(),
            gate: None,
            offline: false,
        }
    }

    /// Fail the given insert statements (1-based, counted across the store)
    pub fn failing_statements(mut self, statements: impl IntoIterator<Item = u64>) -> Self {
        self.failing_statements = Arc::new(statements.into_iter().collect());
        self
    }

    /// Fail the given commits (1-based, counted across the store); the
    /// transaction's staged rows are discarded
    pub fn failing_commits(mut self, commits: impl IntoIterator<Item = u64>) -> Self {
        self.failing_commits = Arc::new(commits.into_iter().collect());
        self
    }

    /// Make every `begin` wait for a permit from `gate`
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Make `ping` fail, as if the database were down
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        let state = self.lock();
        MemorySnapshot {
            rows: state.rows.clone(),
            commits: state.commits,
            rollbacks: state.rollbacks,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    type Tx = MemoryTransaction;

    fn table(&self) -> &str {
        &self.table
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| StoreError::Backend("store gate closed".to_string()))?
                .forget();
        }

        Ok(MemoryTransaction {
            store: self.clone(),
            staged: Vec::new(),
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.offline {
            return Err(StoreError::Backend("store is offline".to_string()));
        }
        Ok(())
    }
}

/// Rows staged by an open [`MemoryStore`] transaction
#[derive(Debug)]
pub struct MemoryTransaction {
    store: MemoryStore,
    staged: Vec<Row>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn execute(&mut self, statement: &InsertStatement) -> Result<u64, StoreError> {
        let ordinal = {
            let mut state = self.store.lock();
            state.statements += 1;
            state.statements
        };

        if self.store.failing_statements.contains(&ordinal) {
            return Err(StoreError::Backend(format!(
                "statement {} rejected by {}",
                ordinal, statement.table()
            )));
        }

        self.staged.extend(statement.rows().iter().cloned());
        Ok(statement.len() as u64)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let mut state = self.store.lock();
        state.commit_attempts += 1;
        if self.store.failing_commits.contains(&state.commit_attempts) {
            return Err(StoreError::Backend(format!(
                "commit {} rejected by {}",
                state.commit_attempts, self.store.table
            )));
        }
        state.rows.extend(self.staged);
        state.commits += 1;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.store.lock().rollbacks += 1;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::parser::RecordParser;

    fn statement(ids: &[i64]) -> InsertStatement {
        let parser = RecordParser::new();
        let records = ids
            .iter()
            .map(|id| {
                parser
                    .parse_line(&format!("Juan|Pérez|{}|Activo|2023-01-01|true|false", id))
                    .unwrap()
            })
            .collect();
        InsertStatement::bind("clients", records).unwrap()
    }

    #[tokio::test]
    async fn test_commit_publishes_staged_rows() {
        let store = MemoryStore::new("clients");
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.execute(&statement(&[1, 2])).await.unwrap(), 2);
        assert!(store.snapshot().rows.is_empty());

        tx.commit().await.unwrap();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.commits, 1);
        assert_eq!(snapshot.rollbacks, 0);
    }

    #[tokio::test]
    async fn test_rollback_discards_staged_rows() {
        let store = MemoryStore::new("clients");
        let mut tx = store.begin().await.unwrap();
        tx.execute(&statement(&[1])).await.unwrap();
        tx.rollback().await.unwrap();

        let snapshot = store.snapshot();
        assert!(snapshot.rows.is_empty());
        assert_eq!(snapshot.rollbacks, 1);
    }

    #[tokio::test]
    async fn test_failing_statement() {
        let store = MemoryStore::new("clients").failing_statements([2]);

        let mut first = store.begin().await.unwrap();
        assert!(first.execute(&statement(&[1])).await.is_ok());
        first.commit().await.unwrap();

        let mut second = store.begin().await.unwrap();
        let err = second.execute(&statement(&[2])).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn test_failing_commit_discards_staged_rows() {
        let store = MemoryStore::new("clients").failing_commits([1]);

        let mut first = store.begin().await.unwrap();
        first.execute(&statement(&[1, 2])).await.unwrap();
        assert!(matches!(first.commit().await, Err(StoreError::Backend(_))));
        assert!(store.snapshot().rows.is_empty());
        assert_eq!(store.snapshot().commits, 0);

        let mut second = store.begin().await.unwrap();
        second.execute(&statement(&[3])).await.unwrap();
        second.commit().await.unwrap();
        assert_eq!(store.snapshot().rows.len(), 1);
        assert_eq!(store.snapshot().commits, 1);
    }

    #[tokio::test]
    async fn test_offline_ping() {
        assert!(MemoryStore::new("clients").ping().await.is_ok());
        assert!(MemoryStore::new("clients").offline().ping().await.is_err());
    }

    #[tokio::test]
    async fn test_gate_holds_begin() {
        let gate = Arc::new(Semaphore::new(0));
        let store = MemoryStore::new("clients").gated(gate.clone());

        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.begin().await.map(|_| ()) }
        });
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        gate.add_permits(1);
        assert!(pending.await.unwrap().is_ok());
    }
}
