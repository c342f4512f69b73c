//! Sync and mint error types

use thiserror::Error;

use explorer_core::{MintPosition, TokenId};
use explorer_db::LedgerError;
use explorer_ipfs::OracleError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Oracle or network failure; nothing was written
    #[error("Lookup failed for {token_id}: {source}")]
    Lookup {
        token_id: TokenId,
        #[source]
        source: OracleError,
    },

    /// No provider reported the token this cycle
    #[error("No peers found for {0}")]
    NoPeersFound(TokenId),

    /// Ledger read or atomic commit failed; the attempt was rolled back
    #[error("Persistence failed for {token_id}: {source}")]
    Persistence {
        token_id: TokenId,
        #[source]
        source: LedgerError,
    },
}

impl SyncError {
    pub fn token_id(&self) -> &str {
        match self {
            Self::Lookup { token_id, .. }
            | Self::NoPeersFound(token_id)
            | Self::Persistence { token_id, .. } => token_id,
        }
    }

    /// Whether this outcome counts against a cycle
    ///
    /// An empty provider set is an expected outcome, not a fault.
    pub fn is_fault(&self) -> bool {
        !matches!(self, Self::NoPeersFound(_))
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum MintError {
    #[error("Failed to hash seed for slot {position}: {source}")]
    Hash {
        position: MintPosition,
        #[source]
        source: OracleError,
    },

    #[error("Supply source failed: {0}")]
    Supply(String),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] LedgerError),
}

pub type MintResult<T> = Result<T, MintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_classification() {
        assert!(!SyncError::NoPeersFound("QmX".into()).is_fault());

        let err = SyncError::Lookup {
            token_id: "QmX".into(),
            source: OracleError::Lookup("routing: not found".into()),
        };
        assert!(err.is_fault());
        assert_eq!(err.token_id(), "QmX");
        assert_eq!(
            err.to_string(),
            "Lookup failed for QmX: Lookup failed: routing: not found"
        );
    }
}
