//! CLI-facing error type. Every fallible path in `main` collapses into one
//! of these variants, which maps to the process exit code the pipeline
//! contract promises: 0 success, 1 configuration error, 2 fatal runtime
//! error, 3 user cancellation.

use thiserror::Error;

use ingest_core::{ConfigError, IngestError};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Fatal(IngestError),

    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 1,
            CliError::Fatal(_) | CliError::Other(_) => 2,
            CliError::Cancelled => 3,
        }
    }
}

impl From<IngestError> for CliError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Cancelled => CliError::Cancelled,
            other => CliError::Fatal(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_exits_one() {
        let err = CliError::Config(ConfigError::Missing("database_url".into()));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn cancelled_exits_three() {
        assert_eq!(CliError::Cancelled.exit_code(), 3);
    }

    #[test]
    fn ingest_cancelled_maps_to_cli_cancelled() {
        let cli_err: CliError = IngestError::Cancelled.into();
        assert!(matches!(cli_err, CliError::Cancelled));
        assert_eq!(cli_err.exit_code(), 3);
    }

    #[test]
    fn other_ingest_error_is_fatal() {
        let cli_err: CliError = IngestError::Enumeration { message: "boom".into() }.into();
        assert_eq!(cli_err.exit_code(), 2);
    }
}
