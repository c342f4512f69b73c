//! Per-token serialization
//!
//! Two syncs of the same token must not interleave their read-compare-write
//! steps. `TokenLocks` hands out one async mutex per token id; idle entries
//! are pruned whenever a new lock is taken.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use explorer_core::TokenId;

#[derive(Debug, Clone, Default)]
pub struct TokenLocks {
    slots: Arc<Mutex<HashMap<TokenId, Arc<AsyncMutex<()>>>>>,
}

/// Held for the duration of one token's critical section
#[derive(Debug)]
pub struct TokenGuard {
    _guard: OwnedMutexGuard<()>,
}

impl TokenLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<TokenId, Arc<AsyncMutex<()>>>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Wait for exclusive access to `token_id`
    pub async fn lock(&self, token_id: &str) -> TokenGuard {
        let slot = {
            let mut slots = self.slots();
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(token_id.to_string()).or_default().clone()
        };

        TokenGuard {
            _guard: slot.lock_owned().await,
        }
    }

    /// Tokens currently locked or awaited
    pub fn active(&self) -> usize {
        self.slots()
            .values()
            .filter(|slot| Arc::strong_count(slot) > 1)
            .count()
    }
}
