//! Persisted client table layout
//!
//! One ordered descriptor drives both field validation (length limits) and
//! parameter binding (column types), so the two can never drift apart.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Maximum full name length, in characters
pub const FULL_NAME_MAX_CHARS: usize = 100;

/// Maximum status length, in characters
pub const STATUS_MAX_CHARS: usize = 10;

/// Storage type of a persisted column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SqlType {
    /// Unicode string bounded to `n` characters
    UnicodeText(usize),
    /// String bounded to `n` characters
    Text(usize),
    BigInt,
    Date,
    Boolean,
}

impl SqlType {
    /// PostgreSQL spelling, used by the reference DDL and debug output
    pub fn pg_name(&self) -> String {
        match self {
            SqlType::UnicodeText(n) | SqlType::Text(n) => format!("VARCHAR({})", n),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Boolean => "BOOLEAN".to_string(),
        }
    }
}

/// One persisted column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub nullable: bool,
}

impl Column {
    const fn new(name: &'static str, sql_type: SqlType, nullable: bool) -> Self {
        Self {
            name,
            sql_type,
            nullable,
        }
    }

    /// Check that `value` can be bound to this column as-is
    pub fn check(&self, value: &SqlValue) -> Result<(), BindError> {
        let mismatch = |expected: &str| BindError::TypeMismatch {
            column: self.name,
            expected: expected.to_string(),
        };

        if value.is_null() {
            return if self.nullable {
                Ok(())
            } else {
                Err(BindError::NullInNonNullable { column: self.name })
            };
        }

        match (self.sql_type, value) {
            (SqlType::UnicodeText(max) | SqlType::Text(max), SqlValue::Text(s)) => {
                let len = s.chars().count();
                if len > max {
                    Err(BindError::TooLong {
                        column: self.name,
                        max,
                        actual: len,
                    })
                } else {
                    Ok(())
                }
            },
            (SqlType::UnicodeText(_) | SqlType::Text(_), _) => Err(mismatch("text")),
            (SqlType::BigInt, SqlValue::BigInt(_)) => Ok(()),
            (SqlType::BigInt, _) => Err(mismatch("bigint")),
            (SqlType::Date, SqlValue::Date(_)) => Ok(()),
            (SqlType::Date, _) => Err(mismatch("date")),
            (SqlType::Boolean, SqlValue::Bool(_)) => Ok(()),
            (SqlType::Boolean, _) => Err(mismatch("boolean")),
        }
    }
}

/// Number of persisted columns per client row
pub const COLUMN_COUNT: usize = 6;

/// Columns of the client table, in insert order
pub const CLIENT_COLUMNS: [Column; COLUMN_COUNT] = [
    Column::new("full_name", SqlType::UnicodeText(FULL_NAME_MAX_CHARS), false),
    Column::new("national_id", SqlType::BigInt, false),
    Column::new("status", SqlType::Text(STATUS_MAX_CHARS), false),
    Column::new("enrollment_date", SqlType::Date, true),
    Column::new("is_pep", SqlType::Boolean, false),
    Column::new("is_obligated_subject", SqlType::Boolean, true),
];

/// Typed parameter value ready for binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    BigInt(i64),
    Date(Option<NaiveDate>),
    Bool(Option<bool>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Date(None) | SqlValue::Bool(None))
    }
}

/// A value could not be bound to its column
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("column {column}: value has {actual} characters, limit is {max}")]
    TooLong {
        column: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("column {column} is not nullable")]
    NullInNonNullable { column: &'static str },

    #[error("column {column}: expected {expected} value")]
    TypeMismatch {
        column: &'static str,
        expected: String,
    },
}

/// `CREATE TABLE` statement matching [`CLIENT_COLUMNS`]
///
/// Not executed by the ingest pipeline; kept so `schema/clients.sql` can be
/// checked against the descriptor.
pub fn create_table_sql(table: &str) -> String {
    let columns: Vec<String> = CLIENT_COLUMNS
        .iter()
        .map(|c| {
            format!(
                "    {} {}{}",
                c.name,
                c.sql_type.pg_name(),
                if c.nullable { "" } else { " NOT NULL" }
            )
        })
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    id BIGSERIAL PRIMARY KEY,\n{}\n);\n",
        table,
        columns.join(",\n")
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_column_order_matches_insert_layout() {
        let names: Vec<_> = CLIENT_COLUMNS.iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec![
                "full_name",
                "national_id",
                "status",
                "enrollment_date",
                "is_pep",
                "is_obligated_subject"
            ]
        );
    }

    #[test]
    fn test_text_length_is_checked_in_characters() {
        let column = CLIENT_COLUMNS[0];
        let hundred = "é".repeat(100);
        assert!(column.check(&SqlValue::Text(hundred)).is_ok());

        let err = column.check(&SqlValue::Text("é".repeat(101))).unwrap_err();
        assert_eq!(
            err,
            BindError::TooLong {
                column: "full_name",
                max: 100,
                actual: 101
            }
        );
    }

    #[test]
    fn test_nullability() {
        assert!(CLIENT_COLUMNS[3].check(&SqlValue::Date(None)).is_ok());
        assert!(CLIENT_COLUMNS[5].check(&SqlValue::Bool(None)).is_ok());
        assert_eq!(
            CLIENT_COLUMNS[4].check(&SqlValue::Bool(None)),
            Err(BindError::NullInNonNullable { column: "is_pep" })
        );
    }

    #[test]
    fn test_type_mismatch() {
        let err = CLIENT_COLUMNS[1]
            .check(&SqlValue::Text("123".to_string()))
            .unwrap_err();
        assert!(matches!(err, BindError::TypeMismatch { column: "national_id", .. }));
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql("clients");
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS clients ("));
        assert!(sql.contains("full_name VARCHAR(100) NOT NULL"));
        assert!(sql.contains("status VARCHAR(10) NOT NULL"));
        assert!(sql.contains("enrollment_date DATE,"));
        assert!(sql.contains("is_obligated_subject BOOLEAN\n"));
    }

    #[test]
    fn test_reference_ddl_matches_descriptor() {
        let ddl = include_str!("../../../schema/clients.sql");
        assert!(ddl.contains(&create_table_sql("clients")));
    }
}
