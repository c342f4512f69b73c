//! Mock oracle
//!
//! In-process stand-in for a node, used by tests and development runs.
//! Hashes are stable SHA-256 digests rendered as `Qm`-prefixed ids, and
//! provider answers are scripted per content id.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use explorer_core::PeerSet;

use crate::error::{OracleError, OracleResult};
use crate::oracle::ContentOracle;

#[derive(Debug, Default)]
pub struct MockOracle {
    providers: Arc<RwLock<HashMap<String, PeerSet>>>,
    failing: Arc<RwLock<HashMap<String, String>>>,
    panicking: Arc<RwLock<HashSet<String>>>,
    fail_hashes: AtomicBool,
    latency: RwLock<Option<Duration>>,
    lookups: AtomicU64,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content id the mock assigns to `data`
    pub fn content_id(data: &[u8]) -> String {
        let digest = Sha256::digest(data);
        format!("Qm{}", hex::encode(&digest[..22]))
    }

    /// Script the providers reported for `cid`
    pub async fn set_providers<I, S>(&self, cid: &str, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing.write().await.remove(cid);
        self.providers
            .write()
            .await
            .insert(cid.to_string(), PeerSet::from_peers(peers));
    }

    /// Make lookups of `cid` fail with `message`
    pub async fn fail_lookup(&self, cid: &str, message: &str) {
        self.failing
            .write()
            .await
            .insert(cid.to_string(), message.to_string());
    }

    /// Make lookups of `cid` panic
    pub async fn panic_on(&self, cid: &str) {
        self.panicking.write().await.insert(cid.to_string());
    }

    pub fn fail_hashes(&self, fail: bool) {
        self.fail_hashes.store(fail, Ordering::SeqCst);
    }

    /// Delay every lookup
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = Some(latency);
    }

    /// Number of provider lookups served
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentOracle for MockOracle {
    async fn hash(&self, data: &[u8]) -> OracleResult<String> {
        if self.fail_hashes.load(Ordering::SeqCst) {
            return Err(OracleError::Hash("mock hashing disabled".to_string()));
        }
        Ok(Self::content_id(data))
    }

    async fn find_providers(&self, cid: &str) -> OracleResult<PeerSet> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.panicking.read().await.contains(cid) {
            panic!("mock oracle panic for {}", cid);
        }
        if let Some(message) = self.failing.read().await.get(cid) {
            return Err(OracleError::Lookup(message.clone()));
        }

        Ok(self
            .providers
            .read()
            .await
            .get(cid)
            .cloned()
            .unwrap_or_default())
    }
}
