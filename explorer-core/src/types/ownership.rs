//! Ownership types
//!
//! `OwnershipRecord` is the mutable per-token projection; `TransactionRecord`
//! is the append-only history. Both are produced from one
//! `OwnershipTransition` so their payloads cannot drift apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::peer_set::PeerSet;
use super::token::TokenId;

/// Latest known holders of a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipRecord {
    pub token_id: TokenId,
    /// Providers of the token's own address
    pub peer_set: PeerSet,
    /// Epoch in which the transition was observed
    pub epoch: u32,
    /// Providers of the epoch-keyed address
    pub quorum_set: PeerSet,
    pub timestamp: DateTime<Utc>,
}

/// One row of the append-only ownership history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Monotonic identifier assigned by the store
    pub tx_id: u64,
    pub token_id: TokenId,
    pub peer_set: PeerSet,
    pub epoch: u32,
    pub quorum_set: PeerSet,
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    /// Check that an ownership row carries exactly this transaction's payload
    pub fn matches(&self, record: &OwnershipRecord) -> bool {
        self.token_id == record.token_id
            && self.peer_set.as_slice() == record.peer_set.as_slice()
            && self.epoch == record.epoch
            && self.quorum_set.as_slice() == record.quorum_set.as_slice()
            && self.timestamp == record.timestamp
    }
}

/// Kind of ownership transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// First observed pin of the token
    NewOwner,
    /// The holder set differs from the recorded one
    OwnerChanged,
}

/// A detected change to be committed atomically
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipTransition {
    pub token_id: TokenId,
    pub peer_set: PeerSet,
    pub epoch: u32,
    pub quorum_set: PeerSet,
    pub timestamp: DateTime<Utc>,
    /// Holder set the transition was computed against (`None` for a new owner)
    ///
    /// Stores reject the commit if the current row no longer matches.
    pub prior: Option<PeerSet>,
}

impl OwnershipTransition {
    pub fn kind(&self) -> TransitionKind {
        match self.prior {
            None => TransitionKind::NewOwner,
            Some(_) => TransitionKind::OwnerChanged,
        }
    }

    /// Check the compare-and-set precondition against the current row
    pub fn prior_matches(&self, current: Option<&OwnershipRecord>) -> bool {
        match (&self.prior, current) {
            (None, None) => true,
            (Some(prior), Some(record)) => prior.same_members(&record.peer_set),
            _ => false,
        }
    }

    /// The ownership row this transition produces
    pub fn to_record(&self) -> OwnershipRecord {
        OwnershipRecord {
            token_id: self.token_id.clone(),
            peer_set: self.peer_set.clone(),
            epoch: self.epoch,
            quorum_set: self.quorum_set.clone(),
            timestamp: self.timestamp,
        }
    }

    /// The history row this transition produces
    pub fn to_transaction(&self, tx_id: u64) -> TransactionRecord {
        TransactionRecord {
            tx_id,
            token_id: self.token_id.clone(),
            peer_set: self.peer_set.clone(),
            epoch: self.epoch,
            quorum_set: self.quorum_set.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// Diagnostic lookup result for a token the ledger does not know
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnerReport {
    pub current_pinner: PeerSet,
    pub current_epoch_pinner: PeerSet,
    pub epoch: u32,
    /// Set when the epoch-keyed lookup failed
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub epoch_lookup_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn transition(prior: Option<PeerSet>) -> OwnershipTransition {
        OwnershipTransition {
            token_id: "QmX".to_string(),
            peer_set: PeerSet::from_peers(["peerA", "peerB"]),
            epoch: 5,
            quorum_set: PeerSet::from_peers(["peerC"]),
            timestamp: Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
            prior,
        }
    }

    #[test]
    fn test_record_and_transaction_share_payload() {
        let t = transition(None);
        let record = t.to_record();
        let tx = t.to_transaction(7);
        assert_eq!(tx.tx_id, 7);
        assert!(tx.matches(&record));
    }

    #[test]
    fn test_kind() {
        assert_eq!(transition(None).kind(), TransitionKind::NewOwner);
        assert_eq!(
            transition(Some(PeerSet::from_peers(["peerZ"]))).kind(),
            TransitionKind::OwnerChanged
        );
    }

    #[test]
    fn test_prior_matches() {
        let fresh = transition(None);
        assert!(fresh.prior_matches(None));

        let existing = OwnershipRecord {
            peer_set: PeerSet::from_peers(["peerZ", "peerY"]),
            ..fresh.to_record()
        };
        assert!(!fresh.prior_matches(Some(&existing)));

        let changed = transition(Some(PeerSet::from_peers(["peerY", "peerZ"])));
        assert!(changed.prior_matches(Some(&existing)));
        assert!(!changed.prior_matches(None));
    }

    #[test]
    fn test_pinner_report_json_shape() {
        let report = PinnerReport {
            current_pinner: PeerSet::from_peers(["a"]),
            current_epoch_pinner: PeerSet::new(),
            epoch: 3,
            epoch_lookup_error: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["currentPinner"][0], "a");
        assert!(json["currentEpochPinner"].as_array().unwrap().is_empty());
        assert!(json.get("epochLookupError").is_none());
    }
}
