//! Content-address oracle trait

use async_trait::async_trait;
use std::sync::Arc;

use explorer_core::PeerSet;

use crate::command::CommandOracle;
use crate::config::{IpfsConfig, OracleKind};
use crate::error::OracleResult;
use crate::http::HttpOracle;

/// Deterministic hashing and DHT provider lookup
#[async_trait]
pub trait ContentOracle: Send + Sync {
    /// Content ID of `data`
    ///
    /// Hash only. The content is never pinned or announced.
    async fn hash(&self, data: &[u8]) -> OracleResult<String>;

    /// Peers currently providing `cid`
    ///
    /// An empty set is a valid answer, not an error.
    async fn find_providers(&self, cid: &str) -> OracleResult<PeerSet>;

    /// Convenience for hashing a text seed
    async fn hash_str(&self, data: &str) -> OracleResult<String> {
        self.hash(data.as_bytes()).await
    }
}

/// Build the adapter selected by `config.kind`
pub fn connect(config: &IpfsConfig) -> OracleResult<Arc<dyn ContentOracle>> {
    Ok(match config.kind {
        OracleKind::Http => Arc::new(HttpOracle::new(config.clone())?),
        OracleKind::Command => Arc::new(CommandOracle::new(config.clone())),
    })
}
