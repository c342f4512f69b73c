//! CLI Error Types

use thiserror::Error;

use explorer_db::LedgerError;
use explorer_ipfs::OracleError;
use explorer_sync::{MintError, SyncError};

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Not found: {id}")]
    NotFound { id: String },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Mint error: {0}")]
    Mint(#[from] MintError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub fn config(message: impl Into<String>) -> Self {
        CliError::Config {
            message: message.into(),
        }
    }

    pub fn invalid_arg(message: impl Into<String>) -> Self {
        CliError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        CliError::NotFound { id: id.into() }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => 1,
            CliError::InvalidArgument { .. } => 2,
            CliError::NotFound { .. } => 3,
            CliError::Ledger(_) => 10,
            CliError::Oracle(_) => 11,
            CliError::Sync(_) => 12,
            CliError::Mint(_) => 13,
            CliError::Io(_) => 20,
            CliError::Json(_) => 21,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::config("bad path").exit_code(), 1);
        assert_eq!(CliError::invalid_arg("level without number").exit_code(), 2);

        let err = CliError::not_found("QmMissing");
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("QmMissing"));

        let err: CliError = LedgerError::Storage("disk full".to_string()).into();
        assert_eq!(err.exit_code(), 10);
    }
}
