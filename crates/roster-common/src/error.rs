//! Error types shared across the Roster crates

use thiserror::Error;

/// Result type alias for Roster operations
pub type Result<T> = std::result::Result<T, RosterError>;

/// Errors that are not specific to one component
#[derive(Error, Debug)]
pub enum RosterError {
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RosterError {
    /// Configuration error naming the offending environment variable
    pub fn invalid_env(var: &str, value: &str, expected: &str) -> Self {
        Self::Config(format!("{}={:?} is invalid, expected {}", var, value, expected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_env_message() {
        let err = RosterError::invalid_env("INGEST_BATCH_SIZE", "abc", "a positive integer");
        assert_eq!(
            err.to_string(),
            "Configuration error: INGEST_BATCH_SIZE=\"abc\" is invalid, expected a positive integer"
        );
    }
}
