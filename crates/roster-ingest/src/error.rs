//! Run-level errors

use std::path::PathBuf;
use thiserror::Error;

use crate::db::DbError;

/// Errors that stop a run or prevent it from starting
#[derive(Debug, Error)]
pub enum IngestError {
    /// The source file could not be opened or read; the run is marked failed
    #[error("failed to read {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl IngestError {
    pub fn source_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SourceRead {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
