//! Bounded batch dispatch
//!
//! Runs the sync engine over a token population. Tokens are read in keyset
//! pages ordered by id; each token is synced on its own task once a permit
//! from the shared semaphore is available. A cycle returns only after every
//! dispatched task has finished.
//!
//! A panic inside a worker is caught at the task boundary and counted as an
//! error; it never reaches sibling workers or the caller.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use explorer_core::{TokenId, DEFAULT_CONCURRENCY, DEFAULT_PAGE_SIZE};
use explorer_db::ScanScope;

use crate::engine::{OwnershipSync, SyncOutcome};
use crate::error::SyncResult;

/// Running totals for one cycle
#[derive(Debug, Default)]
pub struct CycleCounters {
    dispatched: AtomicU64,
    processed: AtomicU64,
    recorded: AtomicU64,
    unchanged: AtomicU64,
    unrecognized: AtomicU64,
    no_peers: AtomicU64,
    errored: AtomicU64,
}

impl CycleCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record(&self, token_id: &str, result: &SyncResult<SyncOutcome>) {
        Self::bump(&self.processed);
        match result {
            Ok(SyncOutcome::Recorded { .. }) => Self::bump(&self.recorded),
            Ok(SyncOutcome::Unchanged) => Self::bump(&self.unchanged),
            Ok(SyncOutcome::Unrecognized(_)) => Self::bump(&self.unrecognized),
            Err(e) if !e.is_fault() => Self::bump(&self.no_peers),
            Err(e) => {
                warn!(token_id = %token_id, error = %e, "Pin check failed");
                Self::bump(&self.errored);
            }
        }
    }

    fn snapshot(&self, duration: Duration) -> CycleStats {
        CycleStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            recorded: self.recorded.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            unrecognized: self.unrecognized.load(Ordering::Relaxed),
            no_peers: self.no_peers.load(Ordering::Relaxed),
            errored: self.errored.load(Ordering::Relaxed),
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Totals reported at the end of a cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStats {
    pub dispatched: u64,
    /// Workers that ran to completion, whatever their outcome
    pub processed: u64,
    pub recorded: u64,
    pub unchanged: u64,
    pub unrecognized: u64,
    pub no_peers: u64,
    /// Lookup and persistence failures, page-read failures and worker panics
    pub errored: u64,
    pub duration_ms: u64,
}

impl CycleStats {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Tokens read per page
    pub page_size: usize,
    /// Maximum concurrent syncs
    pub concurrency: usize,
    pub scope: ScanScope,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            scope: ScanScope::Owned,
        }
    }
}

pub struct BatchRunner {
    sync: Arc<OwnershipSync>,
    config: BatchConfig,
    permits: Arc<Semaphore>,
}

impl BatchRunner {
    pub fn new(sync: Arc<OwnershipSync>, config: BatchConfig) -> Self {
        let concurrency = config.concurrency.max(1);
        Self {
            sync,
            config,
            permits: Arc::new(Semaphore::new(concurrency)),
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn sync(&self) -> &Arc<OwnershipSync> {
        &self.sync
    }

    /// Free admission slots
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a slot and spawn the sync of one token
    ///
    /// Returns false without spawning if no slot can be had or a shutdown
    /// arrived while waiting for one.
    async fn dispatch(
        &self,
        workers: &mut JoinSet<()>,
        counters: &Arc<CycleCounters>,
        token_id: TokenId,
        stopping: &impl Fn() -> bool,
    ) -> bool {
        let permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return false,
        };
        if stopping() {
            return false;
        }

        CycleCounters::bump(&counters.dispatched);
        let sync = self.sync.clone();
        let counters = counters.clone();
        workers.spawn(async move {
            let _permit = permit;
            let result = sync.sync_token(&token_id).await;
            counters.record(&token_id, &result);
        });
        true
    }

    fn reap(result: Result<(), JoinError>, counters: &CycleCounters) {
        if let Err(e) = result {
            if e.is_panic() {
                error!(error = %e, "Pin check worker panicked");
            } else {
                warn!(error = %e, "Pin check worker cancelled");
            }
            CycleCounters::bump(&counters.errored);
        }
    }

    /// Drop finished tasks until at most `keep` remain tracked
    async fn drain_to(workers: &mut JoinSet<()>, counters: &CycleCounters, keep: usize) {
        while workers.len() > keep {
            match workers.join_next().await {
                Some(result) => Self::reap(result, counters),
                None => break,
            }
        }
    }

    /// Sync every token of the configured scope
    ///
    /// Stops dispatching when `shutdown` flips to true; tasks already
    /// dispatched still run to completion.
    pub async fn run_cycle(&self, shutdown: Option<&watch::Receiver<bool>>) -> CycleStats {
        info!(scope = ?self.config.scope, "Pin check cycle started");
        let stats = self.run_scope(self.config.scope, shutdown).await;
        info!(
            processed = stats.processed,
            recorded = stats.recorded,
            errored = stats.errored,
            duration_ms = stats.duration_ms,
            "Pin check cycle completed"
        );
        stats
    }

    /// Sync minted tokens that have no ownership record yet
    ///
    /// Pages through the unowned population with the same bounds and
    /// shutdown behaviour as [`run_cycle`](Self::run_cycle).
    pub async fn reconcile_missing(&self, shutdown: Option<&watch::Receiver<bool>>) -> CycleStats {
        info!("Reconciling tokens without owners");
        let stats = self.run_scope(ScanScope::Unowned, shutdown).await;
        info!(
            processed = stats.processed,
            recorded = stats.recorded,
            no_peers = stats.no_peers,
            errored = stats.errored,
            duration_ms = stats.duration_ms,
            "Missing-owner reconciliation completed"
        );
        stats
    }

    async fn run_scope(
        &self,
        scope: ScanScope,
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> CycleStats {
        let started = Instant::now();
        let counters = Arc::new(CycleCounters::default());
        let mut workers = JoinSet::new();
        let page_size = self.config.page_size.max(1);
        let stopping = || shutdown.map_or(false, |rx| *rx.borrow());

        let mut after: Option<TokenId> = None;
        'pages: loop {
            if stopping() {
                break;
            }

            let page = match self
                .sync
                .context()
                .store
                .scan_page(scope, after.as_deref(), page_size)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    error!(scope = ?scope, after = ?after, error = %e, "Failed to read token page");
                    CycleCounters::bump(&counters.errored);
                    break;
                }
            };

            let fetched = page.len();
            if fetched == 0 {
                break;
            }
            after = page.last().cloned();
            debug!(count = fetched, after = ?after, "Token page read");

            for token_id in page {
                if stopping() || !self.dispatch(&mut workers, &counters, token_id, &stopping).await {
                    break 'pages;
                }
            }

            // finished tasks only; in-flight ones are bounded by the permits
            Self::drain_to(&mut workers, &counters, self.config.concurrency).await;

            if fetched < page_size {
                break;
            }
        }

        Self::drain_to(&mut workers, &counters, 0).await;
        counters.snapshot(started.elapsed())
    }
}
