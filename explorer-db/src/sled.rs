//! Sled-backed ledger
//!
//! Each table is a sled tree. Multi-table writes run inside a sled
//! transaction over the affected trees, so a mint batch or an ownership
//! transition is committed as one unit.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;
use std::ops::Bound;
use std::path::Path;
use tracing::debug;

use explorer_core::{
    MintPosition, OwnershipRecord, OwnershipTransition, Token, TokenId, TransactionRecord,
};

use crate::error::{LedgerError, LedgerResult};
use crate::store::{LedgerStats, LedgerStore};

const TOKENS_TREE: &str = "tokens";
const TOKEN_POSITIONS_TREE: &str = "token_positions";
const OWNERS_TREE: &str = "owners";
const TRANSACTIONS_TREE: &str = "transactions";
const TOKEN_HISTORY_TREE: &str = "token_history";

const KEY_SEPARATOR: u8 = 0x00;

#[derive(Debug, Clone)]
pub struct SledLedger {
    db: sled::Db,
    tokens: sled::Tree,
    token_positions: sled::Tree,
    owners: sled::Tree,
    transactions: sled::Tree,
    token_history: sled::Tree,
}

impl SledLedger {
    /// Open or create the ledger at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        let db = sled::open(path)
            .map_err(|e| LedgerError::Storage(format!("Failed to open sled db: {}", e)))?;
        Self::from_db(db)
    }

    /// Throwaway ledger that is removed when dropped
    pub fn temporary() -> LedgerResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| LedgerError::Storage(format!("Failed to open temporary db: {}", e)))?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> LedgerResult<Self> {
        let open = |name: &str| {
            db.open_tree(name)
                .map_err(|e| LedgerError::Storage(format!("Failed to open {} tree: {}", name, e)))
        };

        Ok(Self {
            tokens: open(TOKENS_TREE)?,
            token_positions: open(TOKEN_POSITIONS_TREE)?,
            owners: open(OWNERS_TREE)?,
            transactions: open(TRANSACTIONS_TREE)?,
            token_history: open(TOKEN_HISTORY_TREE)?,
            db,
        })
    }

    // ==================== Helpers ====================

    fn serialize<T: Serialize>(value: &T) -> LedgerResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> LedgerResult<T> {
        serde_json::from_slice(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    fn key_to_token_id(key: &[u8]) -> LedgerResult<TokenId> {
        String::from_utf8(key.to_vec())
            .map_err(|e| LedgerError::Serialization(format!("Invalid token key: {}", e)))
    }

    /// `token_type 0x00 level(be) number(be)`, ordered by slot within a type
    fn position_key(token_type: &str, position: MintPosition) -> Vec<u8> {
        let mut key = Vec::with_capacity(token_type.len() + 13);
        key.extend_from_slice(token_type.as_bytes());
        key.push(KEY_SEPARATOR);
        key.extend_from_slice(&position.level.to_be_bytes());
        key.extend_from_slice(&position.number.to_be_bytes());
        key
    }

    fn position_from_key(key: &[u8]) -> LedgerResult<MintPosition> {
        let slot = key
            .len()
            .checked_sub(12)
            .map(|start| &key[start..])
            .ok_or_else(|| LedgerError::Serialization("Truncated position key".to_string()))?;
        let mut level = [0u8; 4];
        let mut number = [0u8; 8];
        level.copy_from_slice(&slot[..4]);
        number.copy_from_slice(&slot[4..]);
        Ok(MintPosition::new(u32::from_be_bytes(level), u64::from_be_bytes(number)))
    }

    /// `token_id 0x00 tx_id(be)`
    fn history_key(token_id: &str, tx_id: u64) -> Vec<u8> {
        let mut key = Self::history_prefix(token_id);
        key.extend_from_slice(&tx_id.to_be_bytes());
        key
    }

    fn history_prefix(token_id: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(token_id.len() + 9);
        key.extend_from_slice(token_id.as_bytes());
        key.push(KEY_SEPARATOR);
        key
    }

    fn map_tx_error(e: TransactionError<LedgerError>) -> LedgerError {
        match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => {
                LedgerError::Storage(format!("Transaction failed: {}", e))
            }
        }
    }

    fn keyset_page(
        tree: &sled::Tree,
        after: Option<&str>,
        limit: usize,
    ) -> LedgerResult<Vec<TokenId>> {
        let iter = match after {
            Some(after) => tree.range::<&[u8], _>((Bound::Excluded(after.as_bytes()), Bound::Unbounded)),
            None => tree.iter(),
        };

        iter.keys()
            .take(limit)
            .map(|key| {
                let key = key.map_err(|e| LedgerError::Storage(format!("Failed to iterate: {}", e)))?;
                Self::key_to_token_id(&key)
            })
            .collect()
    }

    fn all_owners(&self) -> LedgerResult<Vec<OwnershipRecord>> {
        let mut records = Vec::new();
        for item in self.owners.iter() {
            let (_, value) = item
                .map_err(|e| LedgerError::Storage(format!("Failed to iterate owners: {}", e)))?;
            records.push(Self::deserialize(&value)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl LedgerStore for SledLedger {
    // ==================== Tokens ====================

    async fn latest_minted(&self, token_type: &str) -> LedgerResult<Option<MintPosition>> {
        let mut prefix = token_type.as_bytes().to_vec();
        prefix.push(KEY_SEPARATOR);

        match self.token_positions.scan_prefix(&prefix).next_back() {
            Some(item) => {
                let (key, _) = item.map_err(|e| {
                    LedgerError::Storage(format!("Failed to read token positions: {}", e))
                })?;
                Ok(Some(Self::position_from_key(&key)?))
            }
            None => Ok(None),
        }
    }

    async fn insert_tokens(&self, tokens: &[Token]) -> LedgerResult<usize> {
        let mut rows = Vec::with_capacity(tokens.len());
        for token in tokens {
            rows.push((
                token.token_id.clone(),
                Self::serialize(token)?,
                Self::position_key(&token.token_type, token.position()),
                format!("slot {} of {}", token.position(), token.token_type),
            ));
        }

        (&self.tokens, &self.token_positions)
            .transaction(|(tokens, positions)| {
                for (token_id, value, position_key, slot) in &rows {
                    if tokens.get(token_id.as_bytes())?.is_some() {
                        return Err(ConflictableTransactionError::Abort(
                            LedgerError::AlreadyExists(format!("token {}", token_id)),
                        ));
                    }
                    if positions.get(position_key.as_slice())?.is_some() {
                        return Err(ConflictableTransactionError::Abort(
                            LedgerError::AlreadyExists(slot.clone()),
                        ));
                    }
                    tokens.insert(token_id.as_bytes(), value.as_slice())?;
                    positions.insert(position_key.as_slice(), token_id.as_bytes())?;
                }
                Ok(())
            })
            .map_err(Self::map_tx_error)?;

        debug!(count = rows.len(), "Tokens inserted");
        Ok(rows.len())
    }

    async fn get_token(&self, token_id: &str) -> LedgerResult<Option<Token>> {
        match self
            .tokens
            .get(token_id.as_bytes())
            .map_err(|e| LedgerError::Storage(format!("Failed to get token: {}", e)))?
        {
            Some(bytes) => Ok(Some(Self::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn token_exists(&self, token_id: &str) -> LedgerResult<bool> {
        self.tokens
            .contains_key(token_id.as_bytes())
            .map_err(|e| LedgerError::Storage(format!("Failed to check token: {}", e)))
    }

    async fn token_page(&self, after: Option<&str>, limit: usize) -> LedgerResult<Vec<TokenId>> {
        Self::keyset_page(&self.tokens, after, limit)
    }

    async fn tokens_missing_ownership(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> LedgerResult<Vec<TokenId>> {
        let iter = match after {
            Some(after) => self
                .tokens
                .range::<&[u8], _>((Bound::Excluded(after.as_bytes()), Bound::Unbounded)),
            None => self.tokens.iter(),
        };

        let mut missing = Vec::new();
        for key in iter.keys() {
            if missing.len() >= limit {
                break;
            }
            let key = key.map_err(|e| LedgerError::Storage(format!("Failed to iterate tokens: {}", e)))?;
            let owned = self
                .owners
                .contains_key(&key)
                .map_err(|e| LedgerError::Storage(format!("Failed to check owner: {}", e)))?;
            if !owned {
                missing.push(Self::key_to_token_id(&key)?);
            }
        }
        Ok(missing)
    }

    // ==================== Ownership ====================

    async fn get_ownership(&self, token_id: &str) -> LedgerResult<Option<OwnershipRecord>> {
        match self
            .owners
            .get(token_id.as_bytes())
            .map_err(|e| LedgerError::Storage(format!("Failed to get owner: {}", e)))?
        {
            Some(bytes) => Ok(Some(Self::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn record_transition(
        &self,
        transition: &OwnershipTransition,
    ) -> LedgerResult<TransactionRecord> {
        let tx_id = self
            .db
            .generate_id()
            .map_err(|e| LedgerError::Storage(format!("Failed to allocate tx id: {}", e)))?
            + 1;
        let transaction = transition.to_transaction(tx_id);

        let token_key = transition.token_id.as_bytes();
        let owner_value = Self::serialize(&transition.to_record())?;
        let tx_value = Self::serialize(&transaction)?;
        let history_key = Self::history_key(&transition.token_id, tx_id);
        let empty: &[u8] = &[];

        (&self.tokens, &self.owners, &self.transactions, &self.token_history)
            .transaction(|(tokens, owners, transactions, history)| {
                if tokens.get(token_key)?.is_none() {
                    return Err(ConflictableTransactionError::Abort(LedgerError::NotFound(
                        format!("token {}", transition.token_id),
                    )));
                }

                let current: Option<OwnershipRecord> = match owners.get(token_key)? {
                    Some(bytes) => {
                        Some(Self::deserialize(&bytes).map_err(ConflictableTransactionError::Abort)?)
                    }
                    None => None,
                };
                if !transition.prior_matches(current.as_ref()) {
                    return Err(ConflictableTransactionError::Abort(LedgerError::Conflict(
                        transition.token_id.clone(),
                    )));
                }

                owners.insert(token_key, owner_value.as_slice())?;
                transactions.insert(&tx_id.to_be_bytes()[..], tx_value.as_slice())?;
                history.insert(history_key.as_slice(), empty)?;
                Ok(())
            })
            .map_err(Self::map_tx_error)?;

        Ok(transaction)
    }

    async fn owned_token_page(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> LedgerResult<Vec<TokenId>> {
        Self::keyset_page(&self.owners, after, limit)
    }

    async fn owned_by_peer(&self, peer_id: &str) -> LedgerResult<Vec<OwnershipRecord>> {
        Ok(self
            .all_owners()?
            .into_iter()
            .filter(|record| record.peer_set.contains(peer_id))
            .collect())
    }

    async fn recent_ownership(
        &self,
        offset: usize,
        limit: usize,
    ) -> LedgerResult<Vec<OwnershipRecord>> {
        let mut records = self.all_owners()?;
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records.into_iter().skip(offset).take(limit).collect())
    }

    // ==================== Transactions ====================

    async fn transactions_for_token(&self, token_id: &str) -> LedgerResult<Vec<TransactionRecord>> {
        let mut records = Vec::new();
        for item in self.token_history.scan_prefix(Self::history_prefix(token_id)) {
            let (key, _) = item
                .map_err(|e| LedgerError::Storage(format!("Failed to iterate history: {}", e)))?;
            let tx_key = &key[key.len().saturating_sub(8)..];
            let value = self
                .transactions
                .get(tx_key)
                .map_err(|e| LedgerError::Storage(format!("Failed to get transaction: {}", e)))?
                .ok_or_else(|| {
                    LedgerError::NotFound(format!("transaction referenced by {}", token_id))
                })?;
            records.push(Self::deserialize::<TransactionRecord>(&value)?);
        }
        records.sort_by_key(|tx| (tx.epoch, tx.tx_id));
        Ok(records)
    }

    // ==================== Maintenance ====================

    async fn stats(&self) -> LedgerResult<LedgerStats> {
        Ok(LedgerStats {
            tokens: self.tokens.len() as u64,
            owned_tokens: self.owners.len() as u64,
            transactions: self.transactions.len() as u64,
        })
    }

    async fn flush(&self) -> LedgerResult<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| LedgerError::Storage(format!("Failed to flush db: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use explorer_core::PeerSet;
    use tempfile::tempdir;

    fn transition(token_id: &str, peers: &[&str], epoch: u32, prior: Option<&[&str]>) -> OwnershipTransition {
        OwnershipTransition {
            token_id: token_id.to_string(),
            peer_set: PeerSet::from_peers(peers.iter().copied()),
            epoch,
            quorum_set: PeerSet::new(),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            prior: prior.map(|p| PeerSet::from_peers(p.iter().copied())),
        }
    }

    #[tokio::test]
    async fn test_latest_minted_orders_by_slot() {
        let ledger = SledLedger::temporary().unwrap();
        assert_eq!(ledger.latest_minted("RBT").await.unwrap(), None);

        let tokens = vec![
            Token::minted("QmZ", MintPosition::new(0, 2)),
            Token::minted("QmA", MintPosition::new(1, 1)),
            Token::minted("QmM", MintPosition::new(0, 300)),
        ];
        ledger.insert_tokens(&tokens).await.unwrap();

        assert_eq!(
            ledger.latest_minted("RBT").await.unwrap(),
            Some(MintPosition::new(1, 1))
        );
    }

    #[tokio::test]
    async fn test_insert_tokens_rolls_back_batch() {
        let ledger = SledLedger::temporary().unwrap();
        ledger
            .insert_tokens(&[Token::minted("QmA", MintPosition::new(0, 1))])
            .await
            .unwrap();

        let batch = vec![
            Token::minted("QmB", MintPosition::new(0, 2)),
            Token::minted("QmC", MintPosition::new(0, 1)),
        ];
        let err = ledger.insert_tokens(&batch).await.unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyExists(_)));
        assert!(!ledger.token_exists("QmB").await.unwrap());
        assert_eq!(ledger.stats().await.unwrap().tokens, 1);
    }

    #[tokio::test]
    async fn test_transition_persists_across_reopen() {
        let dir = tempdir().unwrap();

        {
            let ledger = SledLedger::open(dir.path()).unwrap();
            ledger
                .insert_tokens(&[Token::minted("QmX", MintPosition::origin())])
                .await
                .unwrap();
            ledger
                .record_transition(&transition("QmX", &["peerA"], 3, None))
                .await
                .unwrap();
            ledger
                .record_transition(&transition("QmX", &["peerB"], 5, Some(&["peerA"])))
                .await
                .unwrap();
            ledger.flush().await.unwrap();
        }

        let ledger = SledLedger::open(dir.path()).unwrap();
        let owner = ledger.get_ownership("QmX").await.unwrap().unwrap();
        assert_eq!(owner.peer_set, PeerSet::from_peers(["peerB"]));
        assert_eq!(owner.epoch, 5);

        let history = ledger.transactions_for_token("QmX").await.unwrap();
        assert_eq!(history.iter().map(|tx| tx.epoch).collect::<Vec<_>>(), vec![3, 5]);
        assert!(history[0].tx_id < history[1].tx_id);
    }

    #[tokio::test]
    async fn test_transition_rejects_stale_prior() {
        let ledger = SledLedger::temporary().unwrap();
        ledger
            .insert_tokens(&[Token::minted("QmX", MintPosition::origin())])
            .await
            .unwrap();
        ledger
            .record_transition(&transition("QmX", &["peerA"], 1, None))
            .await
            .unwrap();

        let err = ledger
            .record_transition(&transition("QmX", &["peerB"], 1, Some(&["peerC"])))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::Conflict("QmX".to_string()));

        let err = ledger
            .record_transition(&transition("QmGone", &["peerB"], 1, None))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
        assert_eq!(ledger.stats().await.unwrap().transactions, 1);
    }

    #[tokio::test]
    async fn test_keyset_pages() {
        let ledger = SledLedger::temporary().unwrap();
        let tokens: Vec<Token> = (1..=4)
            .map(|n| Token::minted(format!("Qm{}", n), MintPosition::new(0, n)))
            .collect();
        ledger.insert_tokens(&tokens).await.unwrap();
        ledger
            .record_transition(&transition("Qm3", &["peerA"], 1, None))
            .await
            .unwrap();

        assert_eq!(ledger.token_page(None, 3).await.unwrap(), vec!["Qm1", "Qm2", "Qm3"]);
        assert_eq!(ledger.token_page(Some("Qm3"), 3).await.unwrap(), vec!["Qm4"]);
        assert_eq!(ledger.owned_token_page(None, 10).await.unwrap(), vec!["Qm3"]);
        assert_eq!(
            ledger.tokens_missing_ownership(None, 10).await.unwrap(),
            vec!["Qm1", "Qm2", "Qm4"]
        );
        assert_eq!(
            ledger.tokens_missing_ownership(Some("Qm1"), 2).await.unwrap(),
            vec!["Qm2", "Qm4"]
        );
        assert_eq!(
            ledger.tokens_missing_ownership(Some("Qm2"), 10).await.unwrap(),
            vec!["Qm4"]
        );
        assert_eq!(ledger.owned_by_peer("peerA").await.unwrap().len(), 1);
    }
}
