//! PostgreSQL record store

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;

use super::{InsertStatement, RecordStore, StoreError, StoreTransaction};
use crate::schema::SqlValue;

/// Writes client rows into `table` through a pooled connection
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
    table: String,
}

impl PgRecordStore {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    type Tx = PgStoreTransaction;

    fn table(&self) -> &str {
        &self.table
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgStoreTransaction { tx })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Open PostgreSQL transaction
pub struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn execute(&mut self, statement: &InsertStatement) -> Result<u64, StoreError> {
        if statement.is_empty() {
            return Ok(0);
        }

        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(statement.insert_prefix());

        query_builder.push_values(statement.rows(), |mut b, row| {
            for value in row {
                match value {
                    SqlValue::Text(s) => b.push_bind(s.clone()),
                    SqlValue::BigInt(n) => b.push_bind(*n),
                    SqlValue::Date(d) => b.push_bind(*d),
                    SqlValue::Bool(flag) => b.push_bind(*flag),
                };
            }
        });

        let result = query_builder.build().execute(&mut *self.tx).await?;
        debug!(table = statement.table(), rows = result.rows_affected(), "Executed insert");

        Ok(result.rows_affected())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::parser::RecordParser;

    async fn connect() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        PgPool::connect(&url).await.unwrap()
    }

    async fn scratch_table(pool: &PgPool, name: &str) {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", name))
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(&crate::schema::create_table_sql(name))
            .execute(pool)
            .await
            .unwrap();
    }

    async fn count(pool: &PgPool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_commit_persists_rows() {
        let pool = connect().await;
        scratch_table(&pool, "clients_store_commit").await;
        let store = PgRecordStore::new(pool.clone(), "clients_store_commit");

        let parser = RecordParser::new();
        let records = vec![
            parser.parse_line("Juan|Pérez|1|Activo|2023-01-01|true|false").unwrap(),
            parser.parse_line("Ana|Gómez|2|Inactivo|0000-00-00|false|").unwrap(),
        ];
        let statement = InsertStatement::bind(store.table(), records).unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.execute(&statement).await.unwrap(), 2);
        tx.commit().await.unwrap();

        assert_eq!(count(&pool, "clients_store_commit").await, 2);
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_rollback_discards_rows() {
        let pool = connect().await;
        scratch_table(&pool, "clients_store_rollback").await;
        let store = PgRecordStore::new(pool.clone(), "clients_store_rollback");

        let parser = RecordParser::new();
        let records = vec![parser.parse_line("Juan|Pérez|1|Activo|2023-01-01|true|false").unwrap()];
        let statement = InsertStatement::bind(store.table(), records).unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.execute(&statement).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(count(&pool, "clients_store_rollback").await, 0);
    }
}
