//! Oracle Error Types

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Node unreachable or process could not be started
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    /// Provider lookup failed or reported an error
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// Hashing failed
    #[error("Hash failed: {0}")]
    Hash(String),

    /// Response could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type OracleResult<T> = Result<T, OracleError>;
