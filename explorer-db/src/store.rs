//! Ledger store contract
//!
//! The engines depend only on these operations: atomic multi-row commits,
//! point lookups, existence checks, ordered keyset pages and peer
//! containment queries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use explorer_core::{MintPosition, OwnershipRecord, OwnershipTransition, Token, TokenId, TransactionRecord};

use crate::error::LedgerResult;

/// Which population a scheduled cycle walks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanScope {
    /// Tokens that already have an ownership record
    Owned,
    /// Every minted token
    All,
    /// Minted tokens without an ownership record
    Unowned,
}

impl Default for ScanScope {
    fn default() -> Self {
        Self::Owned
    }
}

impl ScanScope {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "owned" => Some(Self::Owned),
            "all" => Some(Self::All),
            "unowned" | "missing" => Some(Self::Unowned),
            _ => None,
        }
    }
}

/// Row counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub tokens: u64,
    pub owned_tokens: u64,
    pub transactions: u64,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    // ==================== Tokens ====================

    /// Highest minted slot for a token type
    async fn latest_minted(&self, token_type: &str) -> LedgerResult<Option<MintPosition>>;

    /// Insert a batch of freshly minted tokens
    ///
    /// All-or-nothing: a duplicate `token_id` or slot anywhere in the batch
    /// rejects the whole batch with `AlreadyExists`.
    async fn insert_tokens(&self, tokens: &[Token]) -> LedgerResult<usize>;

    async fn get_token(&self, token_id: &str) -> LedgerResult<Option<Token>>;

    async fn token_exists(&self, token_id: &str) -> LedgerResult<bool>;

    /// Token ids ordered ascending, strictly after `after`
    async fn token_page(&self, after: Option<&str>, limit: usize) -> LedgerResult<Vec<TokenId>>;

    /// Ids of minted tokens never observed on the network, ordered
    /// ascending, strictly after `after`
    async fn tokens_missing_ownership(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> LedgerResult<Vec<TokenId>>;

    // ==================== Ownership ====================

    async fn get_ownership(&self, token_id: &str) -> LedgerResult<Option<OwnershipRecord>>;

    /// Commit an ownership transition
    ///
    /// Upserts the owners row and appends one transaction row in a single
    /// atomic unit. Fails with `NotFound` for an unknown token and with
    /// `Conflict` if the recorded holders no longer match
    /// `transition.prior`. On any failure nothing is written.
    async fn record_transition(
        &self,
        transition: &OwnershipTransition,
    ) -> LedgerResult<TransactionRecord>;

    /// Owned token ids ordered ascending, strictly after `after`
    async fn owned_token_page(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> LedgerResult<Vec<TokenId>>;

    /// Ownership rows whose holder set contains `peer_id`
    async fn owned_by_peer(&self, peer_id: &str) -> LedgerResult<Vec<OwnershipRecord>>;

    /// Ownership rows, most recently updated first
    async fn recent_ownership(&self, offset: usize, limit: usize)
        -> LedgerResult<Vec<OwnershipRecord>>;

    async fn ownership_count(&self) -> LedgerResult<u64> {
        Ok(self.stats().await?.owned_tokens)
    }

    // ==================== Transactions ====================

    /// History of a token ordered by epoch, then `tx_id`
    async fn transactions_for_token(&self, token_id: &str) -> LedgerResult<Vec<TransactionRecord>>;

    // ==================== Maintenance ====================

    async fn stats(&self) -> LedgerResult<LedgerStats>;

    /// Persist buffered writes
    async fn flush(&self) -> LedgerResult<()> {
        Ok(())
    }

    /// One page of the population selected by `scope`
    async fn scan_page(
        &self,
        scope: ScanScope,
        after: Option<&str>,
        limit: usize,
    ) -> LedgerResult<Vec<TokenId>> {
        match scope {
            ScanScope::Owned => self.owned_token_page(after, limit).await,
            ScanScope::All => self.token_page(after, limit).await,
            ScanScope::Unowned => self.tokens_missing_ownership(after, limit).await,
        }
    }
}
