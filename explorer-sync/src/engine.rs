//! Ownership Sync Engine
//!
//! Reconciles one token's recorded holders with what the DHT reports:
//!
//! 1. derive the current week epoch from the clock
//! 2. look up providers of the token id (the holder set)
//! 3. stop with `NoPeersFound` if nobody provides it
//! 4. hash `"{token_id}-{epoch}"` and look up its providers (the quorum set)
//! 5. tokens the ledger has never minted yield a diagnostic report only
//! 6. otherwise compare with the recorded holders and, when they differ,
//!    commit the new ownership row and one transaction row atomically
//!
//! Step 6's read-compare-write runs under the token's lock, and the store
//! re-checks the prior holders inside its commit.

use serde::Serialize;
use tracing::{debug, info, warn};

use explorer_core::{
    epoch_at, epoch_key, OwnershipTransition, PeerSet, PinnerReport, TransactionRecord,
    TransitionKind,
};
use explorer_ipfs::OracleResult;

use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};

/// Result of a successful sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// A transition was committed
    Recorded {
        kind: TransitionKind,
        transaction: TransactionRecord,
    },
    /// The holder set matches the ledger
    Unchanged,
    /// The network knows a token the ledger has not minted
    Unrecognized(PinnerReport),
}

impl SyncOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded { .. })
    }
}

#[derive(Clone)]
pub struct OwnershipSync {
    ctx: SyncContext,
}

impl OwnershipSync {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    /// Providers of the epoch-keyed address
    async fn epoch_quorum(&self, token_id: &str, epoch: u32) -> OracleResult<PeerSet> {
        let key = epoch_key(token_id, epoch);
        let epoch_cid = self.ctx.oracle.hash_str(&key).await?;
        self.ctx.oracle.find_providers(&epoch_cid).await
    }

    pub async fn sync_token(&self, token_id: &str) -> SyncResult<SyncOutcome> {
        let now = self.ctx.clock.now();
        let epoch = epoch_at(now);

        let current_pinner = self
            .ctx
            .oracle
            .find_providers(token_id)
            .await
            .map_err(|source| SyncError::Lookup {
                token_id: token_id.to_string(),
                source,
            })?;

        if current_pinner.is_empty() {
            debug!(token_id = %token_id, "No providers found");
            return Err(SyncError::NoPeersFound(token_id.to_string()));
        }

        let quorum = self.epoch_quorum(token_id, epoch).await;

        let known = self
            .ctx
            .store
            .token_exists(token_id)
            .await
            .map_err(|source| SyncError::Persistence {
                token_id: token_id.to_string(),
                source,
            })?;

        if !known {
            let report = match quorum {
                Ok(quorum_set) => PinnerReport {
                    current_pinner,
                    current_epoch_pinner: quorum_set,
                    epoch,
                    epoch_lookup_error: None,
                },
                Err(e) => PinnerReport {
                    current_pinner,
                    current_epoch_pinner: PeerSet::new(),
                    epoch,
                    epoch_lookup_error: Some(e.to_string()),
                },
            };
            info!(
                token_id = %token_id,
                peers = %report.current_pinner,
                "Token is pinned but not minted in the ledger"
            );
            return Ok(SyncOutcome::Unrecognized(report));
        }

        let quorum_set = quorum.map_err(|source| {
            warn!(token_id = %token_id, epoch = epoch, error = %source, "Epoch quorum lookup failed");
            SyncError::Lookup {
                token_id: token_id.to_string(),
                source,
            }
        })?;

        let _guard = self.ctx.locks.lock(token_id).await;

        let current = self
            .ctx
            .store
            .get_ownership(token_id)
            .await
            .map_err(|source| SyncError::Persistence {
                token_id: token_id.to_string(),
                source,
            })?;

        if let Some(record) = &current {
            if record.peer_set.same_members(&current_pinner) {
                debug!(token_id = %token_id, peers = %current_pinner, "Holders unchanged");
                return Ok(SyncOutcome::Unchanged);
            }
        }

        let transition = OwnershipTransition {
            token_id: token_id.to_string(),
            peer_set: current_pinner,
            epoch,
            quorum_set,
            timestamp: now,
            prior: current.map(|record| record.peer_set),
        };
        let kind = transition.kind();

        let transaction = self
            .ctx
            .store
            .record_transition(&transition)
            .await
            .map_err(|source| SyncError::Persistence {
                token_id: token_id.to_string(),
                source,
            })?;

        info!(
            token_id = %token_id,
            tx_id = transaction.tx_id,
            epoch = epoch,
            peers = %transaction.peer_set,
            kind = ?kind,
            "Ownership transition recorded"
        );

        Ok(SyncOutcome::Recorded { kind, transaction })
    }
}
