//! Ingest configuration
//!
//! Read from the environment (a `.env` file is honored by the binaries):
//!
//! | Variable | Default |
//! |---|---|
//! | `INGEST_FILE_PATH` | `./data/clients.dat` |
//! | `INGEST_BATCH_SIZE` | `250` |
//! | `INGEST_TABLE` | `clients` |
//! | `INGEST_UNPARSEABLE_DATE` | `reject` (or `null`) |
//! | `INGEST_DATE_YEAR_CHECK` | `true` |
//! | `INGEST_DATE_YEAR_MIN` | `1900` |
//! | `INGEST_DATE_YEAR_MAX` | `2100` |

use roster_common::RosterError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::batch::DEFAULT_BATCH_SIZE;
use crate::date::{DateNormalizer, UnparseableDate, DEFAULT_MAX_YEAR, DEFAULT_MIN_YEAR};
use crate::parser::RecordParser;
use crate::store::MAX_BATCH_SIZE;

/// Default input file
pub const DEFAULT_FILE_PATH: &str = "./data/clients.dat";

/// Default destination table
pub const DEFAULT_TABLE: &str = "clients";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    pub file_path: PathBuf,
    pub batch_size: usize,
    pub table: String,
    pub unparseable_date: UnparseableDate,
    pub year_check: bool,
    pub min_year: i32,
    pub max_year: i32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from(DEFAULT_FILE_PATH),
            batch_size: DEFAULT_BATCH_SIZE,
            table: DEFAULT_TABLE.to_string(),
            unparseable_date: UnparseableDate::default(),
            year_check: true,
            min_year: DEFAULT_MIN_YEAR,
            max_year: DEFAULT_MAX_YEAR,
        }
    }
}

impl IngestConfig {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let config = Self {
            file_path: std::env::var("INGEST_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.file_path),
            batch_size: env_or("INGEST_BATCH_SIZE", defaults.batch_size, "a positive integer")?,
            table: std::env::var("INGEST_TABLE").unwrap_or(defaults.table),
            unparseable_date: env_or(
                "INGEST_UNPARSEABLE_DATE",
                defaults.unparseable_date,
                "'reject' or 'null'",
            )?,
            year_check: env_or("INGEST_DATE_YEAR_CHECK", defaults.year_check, "true or false")?,
            min_year: env_or("INGEST_DATE_YEAR_MIN", defaults.min_year, "a year")?,
            max_year: env_or("INGEST_DATE_YEAR_MAX", defaults.max_year, "a year")?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("Batch size must be greater than 0");
        }

        if self.batch_size > MAX_BATCH_SIZE {
            anyhow::bail!(
                "Batch size {} exceeds {} (PostgreSQL allows 65535 parameters per statement)",
                self.batch_size,
                MAX_BATCH_SIZE
            );
        }

        if !is_plain_identifier(&self.table) {
            anyhow::bail!(
                "Table name {:?} must be a plain identifier (letters, digits, underscores)",
                self.table
            );
        }

        if self.year_check && self.min_year > self.max_year {
            anyhow::bail!(
                "Minimum year ({}) cannot be greater than maximum year ({})",
                self.min_year,
                self.max_year
            );
        }

        Ok(())
    }

    pub fn date_normalizer(&self) -> DateNormalizer {
        if self.year_check {
            DateNormalizer::with_year_range(self.min_year..=self.max_year)
        } else {
            DateNormalizer::without_year_check()
        }
    }

    pub fn parser(&self) -> RecordParser {
        RecordParser::with_dates(self.date_normalizer(), self.unparseable_date)
    }
}

/// Parse `var` when set, `default` when unset, error when set but invalid
fn env_or<T: FromStr>(var: &str, default: T, expected: &str) -> Result<T, RosterError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| RosterError::invalid_env(var, &value, expected)),
        Err(_) => Ok(default),
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
