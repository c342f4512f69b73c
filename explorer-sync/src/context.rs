//! Shared handles
//!
//! Built once at process start and handed to every engine and scheduler.

use std::sync::Arc;

use explorer_core::{Clock, SystemClock};
use explorer_db::LedgerStore;
use explorer_ipfs::ContentOracle;

use crate::locks::TokenLocks;

#[derive(Clone)]
pub struct SyncContext {
    pub store: Arc<dyn LedgerStore>,
    pub oracle: Arc<dyn ContentOracle>,
    pub clock: Arc<dyn Clock>,
    pub locks: TokenLocks,
}

impl SyncContext {
    pub fn new(store: Arc<dyn LedgerStore>, oracle: Arc<dyn ContentOracle>) -> Self {
        Self {
            store,
            oracle,
            clock: Arc::new(SystemClock),
            locks: TokenLocks::new(),
        }
    }

    /// Replace the wall clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Flush the store before the process exits
    pub async fn shutdown(&self) {
        if let Err(e) = self.store.flush().await {
            tracing::error!(error = %e, "Failed to flush ledger on shutdown");
        }
    }
}
