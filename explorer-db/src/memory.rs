//! In-memory ledger
//!
//! Used by tests and development runs. All tables sit behind one lock so a
//! transition or a mint batch is applied atomically.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use explorer_core::{
    MintPosition, OwnershipRecord, OwnershipTransition, Token, TokenId, TransactionRecord,
};

use crate::error::{LedgerError, LedgerResult};
use crate::store::{LedgerStats, LedgerStore};

#[derive(Debug, Default)]
struct LedgerState {
    tokens: BTreeMap<TokenId, Token>,
    // (token_type, slot) -> token_id
    positions: BTreeMap<(String, MintPosition), TokenId>,
    owners: BTreeMap<TokenId, OwnershipRecord>,
    transactions: BTreeMap<u64, TransactionRecord>,
    history: BTreeMap<TokenId, Vec<u64>>,
    last_tx_id: u64,
}

/// Thread-safe in-memory ledger
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    state: Arc<RwLock<LedgerState>>,
    fail_commits: Arc<AtomicBool>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail before touching any table
    ///
    /// Lets tests exercise the rollback path of the engines.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    fn check_commit(&self) -> LedgerResult<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(LedgerError::Storage("commit rejected".to_string()));
        }
        Ok(())
    }
}

fn page<'a, I>(keys: I, after: Option<&str>, limit: usize) -> Vec<TokenId>
where
    I: Iterator<Item = &'a TokenId>,
{
    keys.filter(|id| after.map_or(true, |a| id.as_str() > a))
        .take(limit)
        .cloned()
        .collect()
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    // ==================== Tokens ====================

    async fn latest_minted(&self, token_type: &str) -> LedgerResult<Option<MintPosition>> {
        let state = self.state.read().await;
        Ok(state
            .positions
            .keys()
            .filter(|(kind, _)| kind == token_type)
            .map(|(_, pos)| *pos)
            .next_back())
    }

    async fn insert_tokens(&self, tokens: &[Token]) -> LedgerResult<usize> {
        self.check_commit()?;
        let mut state = self.state.write().await;

        let mut ids = std::collections::BTreeSet::new();
        let mut slots = std::collections::BTreeSet::new();
        for token in tokens {
            let slot = (token.token_type.clone(), token.position());
            if state.tokens.contains_key(&token.token_id) || !ids.insert(token.token_id.clone()) {
                return Err(LedgerError::AlreadyExists(format!("token {}", token.token_id)));
            }
            if state.positions.contains_key(&slot) || !slots.insert(slot) {
                return Err(LedgerError::AlreadyExists(format!(
                    "slot {} of {}",
                    token.position(),
                    token.token_type
                )));
            }
        }

        for token in tokens {
            state
                .positions
                .insert((token.token_type.clone(), token.position()), token.token_id.clone());
            state.tokens.insert(token.token_id.clone(), token.clone());
        }

        Ok(tokens.len())
    }

    async fn get_token(&self, token_id: &str) -> LedgerResult<Option<Token>> {
        Ok(self.state.read().await.tokens.get(token_id).cloned())
    }

    async fn token_exists(&self, token_id: &str) -> LedgerResult<bool> {
        Ok(self.state.read().await.tokens.contains_key(token_id))
    }

    async fn token_page(&self, after: Option<&str>, limit: usize) -> LedgerResult<Vec<TokenId>> {
        let state = self.state.read().await;
        Ok(page(state.tokens.keys(), after, limit))
    }

    async fn tokens_missing_ownership(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> LedgerResult<Vec<TokenId>> {
        let state = self.state.read().await;
        let unowned = state.tokens.keys().filter(|id| !state.owners.contains_key(*id));
        Ok(page(unowned, after, limit))
    }

    // ==================== Ownership ====================

    async fn get_ownership(&self, token_id: &str) -> LedgerResult<Option<OwnershipRecord>> {
        Ok(self.state.read().await.owners.get(token_id).cloned())
    }

    async fn record_transition(
        &self,
        transition: &OwnershipTransition,
    ) -> LedgerResult<TransactionRecord> {
        let mut state = self.state.write().await;

        if !state.tokens.contains_key(&transition.token_id) {
            return Err(LedgerError::NotFound(format!("token {}", transition.token_id)));
        }
        if !transition.prior_matches(state.owners.get(&transition.token_id)) {
            return Err(LedgerError::Conflict(transition.token_id.clone()));
        }
        self.check_commit()?;

        let tx_id = state.last_tx_id + 1;
        let transaction = transition.to_transaction(tx_id);

        state.last_tx_id = tx_id;
        state
            .owners
            .insert(transition.token_id.clone(), transition.to_record());
        state.transactions.insert(tx_id, transaction.clone());
        state
            .history
            .entry(transition.token_id.clone())
            .or_default()
            .push(tx_id);

        Ok(transaction)
    }

    async fn owned_token_page(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> LedgerResult<Vec<TokenId>> {
        let state = self.state.read().await;
        Ok(page(state.owners.keys(), after, limit))
    }

    async fn owned_by_peer(&self, peer_id: &str) -> LedgerResult<Vec<OwnershipRecord>> {
        let state = self.state.read().await;
        Ok(state
            .owners
            .values()
            .filter(|record| record.peer_set.contains(peer_id))
            .cloned()
            .collect())
    }

    async fn recent_ownership(
        &self,
        offset: usize,
        limit: usize,
    ) -> LedgerResult<Vec<OwnershipRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<OwnershipRecord> = state.owners.values().cloned().collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records.into_iter().skip(offset).take(limit).collect())
    }

    // ==================== Transactions ====================

    async fn transactions_for_token(&self, token_id: &str) -> LedgerResult<Vec<TransactionRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<TransactionRecord> = state
            .history
            .get(token_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.transactions.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        records.sort_by_key(|tx| (tx.epoch, tx.tx_id));
        Ok(records)
    }

    // ==================== Maintenance ====================

    async fn stats(&self) -> LedgerResult<LedgerStats> {
        let state = self.state.read().await;
        Ok(LedgerStats {
            tokens: state.tokens.len() as u64,
            owned_tokens: state.owners.len() as u64,
            transactions: state.transactions.len() as u64,
        })
    }
}
