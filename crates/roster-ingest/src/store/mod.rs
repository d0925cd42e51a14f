//! Record store abstraction
//!
//! The loader only sees [`RecordStore`] and [`StoreTransaction`]; concrete
//! backends live in the submodules:
//!
//! - [`postgres::PgRecordStore`]: PostgreSQL through a sqlx pool
//! - [`memory::MemoryStore`]: in-process store for dry runs and tests

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::record::ClientRecord;
use crate::schema::{BindError, SqlValue, CLIENT_COLUMNS, COLUMN_COUNT};

pub use memory::MemoryStore;
pub use postgres::PgRecordStore;

/// PostgreSQL limit on bind parameters in one statement
pub const MAX_BIND_PARAMS: usize = 65_535;

/// Largest batch that fits in a single multi-row insert
pub const MAX_BATCH_SIZE: usize = MAX_BIND_PARAMS / COLUMN_COUNT;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bind error: {0}")]
    Bind(#[from] BindError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store error: {0}")]
    Backend(String),
}

/// A destination for client rows that hands out transactions
#[async_trait]
pub trait RecordStore: Send + Sync {
    type Tx: StoreTransaction;

    /// Target table name
    fn table(&self) -> &str;

    /// Open a new transaction
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Check that the backing database is reachable
    async fn ping(&self) -> Result<(), StoreError>;
}

/// One open transaction. Consumed by exactly one of `commit` or `rollback`.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Execute an insert inside the transaction, returning rows affected
    async fn execute(&mut self, statement: &InsertStatement) -> Result<u64, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// Multi-row insert with every value already checked against its column
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    table: String,
    rows: Vec<[SqlValue; COLUMN_COUNT]>,
}

impl InsertStatement {
    /// Bind records to [`CLIENT_COLUMNS`], failing on the first value a
    /// column would not accept
    pub fn bind(table: &str, records: Vec<ClientRecord>) -> Result<Self, BindError> {
        let rows = records
            .into_iter()
            .map(|record| {
                let values = record.into_sql_values();
                for (column, value) in CLIENT_COLUMNS.iter().zip(values.iter()) {
                    column.check(value)?;
                }
                Ok(values)
            })
            .collect::<Result<Vec<_>, BindError>>()?;

        Ok(Self {
            table: table.to_string(),
            rows,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn rows(&self) -> &[[SqlValue; COLUMN_COUNT]] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `INSERT INTO <table> (<columns>) ` prefix shared by every backend
    pub fn insert_prefix(&self) -> String {
        let columns: Vec<&str> = CLIENT_COLUMNS.iter().map(|c| c.name).collect();
        format!("INSERT INTO {} ({}) ", self.table, columns.join(", "))
    }

    /// Statement text with numbered placeholders, for logs and tests
    pub fn to_sql(&self) -> String {
        let tuples: Vec<String> = (0..self.rows.len())
            .map(|row| {
                let params: Vec<String> = (1..=COLUMN_COUNT)
                    .map(|col| format!("${}", row * COLUMN_COUNT + col))
                    .collect();
                format!("({})", params.join(", "))
            })
            .collect();
        format!("{}VALUES {}", self.insert_prefix(), tuples.join(", "))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::parser::RecordParser;

    fn records(lines: &[&str]) -> Vec<ClientRecord> {
        let parser = RecordParser::new();
        lines.iter().map(|l| parser.parse_line(l).unwrap()).collect()
    }

    #[test]
    fn test_bind_keeps_record_order() {
        let statement = InsertStatement::bind(
            "clients",
            records(&[
                "Juan|Pérez|1|Activo|2023-01-01|true|false",
                "Ana|Gómez|2|Inactivo|0000-00-00|false|",
            ]),
        )
        .unwrap();

        assert_eq!(statement.len(), 2);
        assert_eq!(statement.rows()[0][1], SqlValue::BigInt(1));
        assert_eq!(statement.rows()[1][1], SqlValue::BigInt(2));
        assert_eq!(statement.rows()[1][3], SqlValue::Date(None));
        assert_eq!(statement.rows()[1][5], SqlValue::Bool(None));
    }

    #[test]
    fn test_to_sql_numbers_placeholders() {
        let statement = InsertStatement::bind(
            "clients",
            records(&[
                "Juan|Pérez|1|Activo|2023-01-01|true|false",
                "Ana|Gómez|2|Inactivo|2023-01-02|false|true",
            ]),
        )
        .unwrap();

        assert_eq!(
            statement.to_sql(),
            "INSERT INTO clients (full_name, national_id, status, enrollment_date, is_pep, is_obligated_subject) \
             VALUES ($1, $2, $3, $4, $5, $6), ($7, $8, $9, $10, $11, $12)"
        );
    }

    #[test]
    fn test_max_batch_size_fits_parameter_limit() {
        assert_eq!(MAX_BATCH_SIZE, 10_922);
        assert!(MAX_BATCH_SIZE * COLUMN_COUNT <= MAX_BIND_PARAMS);
    }
}
