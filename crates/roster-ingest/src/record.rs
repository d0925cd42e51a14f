//! Validated client record

use chrono::NaiveDate;
use serde::Serialize;

use crate::schema::{SqlValue, COLUMN_COUNT};

/// A client line that passed every field check.
///
/// Only [`RecordParser`](crate::parser::RecordParser) builds these, so holding a
/// `ClientRecord` means all column constraints already hold. Fields are
/// read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    full_name: String,
    national_id: i64,
    status: String,
    enrollment_date: Option<NaiveDate>,
    is_pep: bool,
    is_obligated_subject: Option<bool>,
}

impl ClientRecord {
    pub(crate) fn new(
        full_name: String,
        national_id: i64,
        status: String,
        enrollment_date: Option<NaiveDate>,
        is_pep: bool,
        is_obligated_subject: Option<bool>,
    ) -> Self {
        Self {
            full_name,
            national_id,
            status,
            enrollment_date,
            is_pep,
            is_obligated_subject,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn national_id(&self) -> i64 {
        self.national_id
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn enrollment_date(&self) -> Option<NaiveDate> {
        self.enrollment_date
    }

    pub fn is_pep(&self) -> bool {
        self.is_pep
    }

    pub fn is_obligated_subject(&self) -> Option<bool> {
        self.is_obligated_subject
    }

    /// Parameter values in [`CLIENT_COLUMNS`](crate::schema::CLIENT_COLUMNS) order
    pub fn into_sql_values(self) -> [SqlValue; COLUMN_COUNT] {
        [
            SqlValue::Text(self.full_name),
            SqlValue::BigInt(self.national_id),
            SqlValue::Text(self.status),
            SqlValue::Date(self.enrollment_date),
            SqlValue::Bool(Some(self.is_pep)),
            SqlValue::Bool(self.is_obligated_subject),
        ]
    }
}
