//! Client line parser
//!
//! Turns one `|`-delimited line into a [`ClientRecord`] or a [`RejectReason`].
//!
//! # Line Format
//! ```text
//! FirstName|LastName|NationalId|Status|EnrollmentDate|IsPEP|IsObligatedSubject
//! Juan|Pérez|12345678|Activo|2023-01-01|true|false
//! ```
//!
//! Flags never cause a rejection: unknown PEP text reads as `false`, unknown
//! obligated-subject text reads as null.

use serde::Serialize;
use thiserror::Error;

use crate::date::{DateNormalizer, UnparseableDate};
use crate::record::ClientRecord;
use crate::schema::{FULL_NAME_MAX_CHARS, STATUS_MAX_CHARS};

/// Field delimiter of the input file
pub const FIELD_DELIMITER: char = '|';

/// Number of fields on a well-formed line
pub const FIELD_COUNT: usize = 7;

/// Why a candidate line did not become a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Error, Serialize)]
pub enum RejectReason {
    #[error("expected 7 fields, found {found}")]
    FieldCountMismatch { found: usize },

    #[error("full name is empty")]
    EmptyName,

    #[error("full name has {chars} characters, limit is 100")]
    NameTooLong { chars: usize },

    #[error("status has {chars} characters, limit is 10")]
    StatusTooLong { chars: usize },

    #[error("national id is not a 64-bit integer")]
    InvalidId,

    #[error("enrollment date is not recognized")]
    DateParseError,

    #[error("line is not valid UTF-8")]
    InvalidEncoding,
}

impl RejectReason {
    /// Stable reason code, without the per-line detail
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::FieldCountMismatch { .. } => "FieldCountMismatch",
            RejectReason::EmptyName => "EmptyName",
            RejectReason::NameTooLong { .. } => "NameTooLong",
            RejectReason::StatusTooLong { .. } => "StatusTooLong",
            RejectReason::InvalidId => "InvalidId",
            RejectReason::DateParseError => "DateParseError",
            RejectReason::InvalidEncoding => "InvalidEncoding",
        }
    }
}

/// Parser for client lines
#[derive(Debug, Clone, Default)]
pub struct RecordParser {
    dates: DateNormalizer,
    unparseable_date: UnparseableDate,
}

impl RecordParser {
    /// Parser with the default date rules (1900..=2100, reject unparseable)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dates(dates: DateNormalizer, unparseable_date: UnparseableDate) -> Self {
        Self {
            dates,
            unparseable_date,
        }
    }

    /// Validate one undecoded line, rejecting it if it is not UTF-8
    pub fn parse_bytes(&self, raw: &[u8]) -> Result<ClientRecord, RejectReason> {
        let line = std::str::from_utf8(raw).map_err(|_| RejectReason::InvalidEncoding)?;
        self.parse_line(line)
    }

    /// Validate one line
    pub fn parse_line(&self, line: &str) -> Result<ClientRecord, RejectReason> {
        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        let [first, last, id, status, date, pep, obligated] = fields[..] else {
            return Err(RejectReason::FieldCountMismatch {
                found: fields.len(),
            });
        };

        let full_name = format!("{} {}", first.trim(), last.trim()).trim().to_string();
        let name_chars = full_name.chars().count();
        if name_chars == 0 {
            return Err(RejectReason::EmptyName);
        }
        if name_chars > FULL_NAME_MAX_CHARS {
            return Err(RejectReason::NameTooLong { chars: name_chars });
        }

        let status = status.trim();
        let status_chars = status.chars().count();
        if status_chars > STATUS_MAX_CHARS {
            return Err(RejectReason::StatusTooLong {
                chars: status_chars,
            });
        }

        let national_id: i64 = id.trim().parse().map_err(|_| RejectReason::InvalidId)?;

        let enrollment_date = match self.dates.normalize(date) {
            Ok(date) => date,
            Err(_) if self.unparseable_date == UnparseableDate::StoreNull => None,
            Err(_) => return Err(RejectReason::DateParseError),
        };

        Ok(ClientRecord::new(
            full_name,
            national_id,
            status.to_string(),
            enrollment_date,
            parse_pep_flag(pep),
            parse_tri_state_flag(obligated),
        ))
    }
}

/// Only a case-insensitive `true` is true
pub fn parse_pep_flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}

/// `true` / `false` case-insensitively, anything else is unknown
pub fn parse_tri_state_flag(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
