//! Peer sets
//!
//! A peer set is semantically a set but is stored as an ordered list so the
//! order reported by the DHT survives a round trip through the ledger.
//! Duplicates are dropped on construction (first occurrence wins), which
//! makes length equal to the number of distinct members.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Set of peer identifiers with insertion order preserved
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct PeerSet(Vec<String>);

impl PeerSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build a set from peer ids, dropping blanks and duplicates
    pub fn from_peers<I, S>(peers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for peer in peers {
            let peer: String = peer.into();
            let peer = peer.trim();
            if peer.is_empty() {
                continue;
            }
            if seen.insert(peer.to_string()) {
                ordered.push(peer.to_string());
            }
        }
        Self(ordered)
    }

    /// Add a peer, returning false if it was already present
    pub fn insert(&mut self, peer: impl Into<String>) -> bool {
        let peer = peer.into();
        if peer.is_empty() || self.contains(&peer) {
            return false;
        }
        self.0.push(peer);
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, peer: &str) -> bool {
        self.0.iter().any(|p| p == peer)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    /// Set equality: same cardinality and same members, order ignored
    pub fn same_members(&self, other: &PeerSet) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let members: HashSet<&str> = other.iter().collect();
        self.iter().all(|peer| members.contains(peer))
    }
}

impl PartialEq for PeerSet {
    fn eq(&self, other: &Self) -> bool {
        self.same_members(other)
    }
}

impl Eq for PeerSet {}

impl From<Vec<String>> for PeerSet {
    fn from(peers: Vec<String>) -> Self {
        Self::from_peers(peers)
    }
}

impl From<PeerSet> for Vec<String> {
    fn from(set: PeerSet) -> Self {
        set.0
    }
}

impl<S: Into<String>> FromIterator<S> for PeerSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_peers(iter)
    }
}

impl fmt::Display for PeerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}
