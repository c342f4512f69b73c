//! Daily pin check
//!
//! One cycle runs immediately on start. After a cycle the scheduler sleeps
//! out the rest of the interval, then waits for the next tick of a ticker
//! whose period is the interval shifted by a random jitter drawn once per
//! start. Independent deployments therefore do not probe the DHT in step.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::info;

use explorer_core::{DEFAULT_CHECK_INTERVAL_SECS, DEFAULT_CHECK_JITTER_SECS};

use super::shutdown_requested;
use crate::batch::{BatchRunner, CycleStats};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinCheckConfig {
    /// Nominal time between cycle starts
    pub interval: Duration,
    /// Maximum shift applied to the ticker period, either direction
    pub jitter: Duration,
}

impl Default for PinCheckConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            jitter: Duration::from_secs(DEFAULT_CHECK_JITTER_SECS),
        }
    }
}

impl PinCheckConfig {
    /// Period for this start: `interval` plus a uniform offset in `[-jitter, +jitter)`
    pub fn jittered_period(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as i64;
        let interval_ms = self.interval.as_millis() as i64;
        let offset = if jitter_ms > 0 {
            rand::thread_rng().gen_range(-jitter_ms..jitter_ms)
        } else {
            0
        };
        Duration::from_millis((interval_ms + offset).max(1) as u64)
    }
}

pub struct PinCheckScheduler {
    runner: Arc<BatchRunner>,
    config: PinCheckConfig,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    last_cycle: Arc<RwLock<Option<CycleStats>>>,
    cycles: Arc<AtomicU64>,
}

impl PinCheckScheduler {
    pub fn new(runner: Arc<BatchRunner>, config: PinCheckConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            runner,
            config,
            shutdown_tx,
            shutdown_rx,
            last_cycle: Arc::new(RwLock::new(None)),
            cycles: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start the scheduler in a background task
    pub fn start(self) -> PinCheckHandle {
        let period = self.config.jittered_period();
        let shutdown_tx = self.shutdown_tx.clone();
        let last_cycle = self.last_cycle.clone();
        let cycles = self.cycles.clone();

        let task_handle = tokio::spawn(async move {
            self.run_loop(period).await;
        });

        PinCheckHandle {
            shutdown_tx,
            task_handle,
            last_cycle,
            cycles,
            period,
        }
    }

    async fn run_loop(self, period: Duration) {
        let mut shutdown_rx = self.shutdown_rx.clone();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.config.interval.as_secs(),
            period_secs = period.as_secs(),
            "Daily pin check scheduler started"
        );

        loop {
            let stats = self.runner.run_cycle(Some(&shutdown_rx)).await;
            let elapsed = stats.duration();
            *self.last_cycle.write().await = Some(stats);
            self.cycles.fetch_add(1, Ordering::SeqCst);

            if *shutdown_rx.borrow() {
                break;
            }

            if let Some(remaining) = self.config.interval.checked_sub(elapsed) {
                tokio::select! {
                    _ = sleep(remaining) => {}
                    _ = shutdown_requested(&mut shutdown_rx) => break,
                }
            }

            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_requested(&mut shutdown_rx) => break,
            }
        }

        info!("Daily pin check scheduler shutting down");
    }
}

/// Handle for controlling the daily scheduler
pub struct PinCheckHandle {
    shutdown_tx: watch::Sender<bool>,
    task_handle: tokio::task::JoinHandle<()>,
    last_cycle: Arc<RwLock<Option<CycleStats>>>,
    cycles: Arc<AtomicU64>,
    period: Duration,
}

impl PinCheckHandle {
    /// Stop issuing cycles and wait for in-flight work to drain
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task_handle.await;
        info!("Daily pin check scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.task_handle.is_finished()
    }

    /// Ticker period drawn for this start
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    pub async fn last_cycle(&self) -> Option<CycleStats> {
        self.last_cycle.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchConfig;
    use crate::context::SyncContext;
    use crate::engine::OwnershipSync;
    use explorer_core::{MintPosition, Token};
    use explorer_db::{LedgerStore, MemoryLedger, ScanScope};
    use explorer_ipfs::MockOracle;

    #[test]
    fn test_jitter_bounds() {
        let config = PinCheckConfig::default();
        for _ in 0..200 {
            let period = config.jittered_period();
            assert!(period >= Duration::from_secs(23 * 3600));
            assert!(period < Duration::from_secs(25 * 3600));
        }

        let fixed = PinCheckConfig {
            interval: Duration::from_secs(60),
            jitter: Duration::ZERO,
        };
        assert_eq!(fixed.jittered_period(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycles_repeat_until_stopped() {
        let ledger = Arc::new(MemoryLedger::new());
        let oracle = Arc::new(MockOracle::new());
        ledger
            .insert_tokens(&[Token::minted("QmX", MintPosition::origin())])
            .await
            .unwrap();
        oracle.set_providers("QmX", ["peerA"]).await;

        let sync = Arc::new(OwnershipSync::new(SyncContext::new(ledger.clone(), oracle.clone())));
        let runner = Arc::new(BatchRunner::new(
            sync,
            BatchConfig {
                scope: ScanScope::All,
                ..Default::default()
            },
        ));
        let handle = PinCheckScheduler::new(
            runner,
            PinCheckConfig {
                interval: Duration::from_secs(10),
                jitter: Duration::ZERO,
            },
        )
        .start();

        sleep(Duration::from_secs(1)).await;
        assert_eq!(handle.cycles_completed(), 1);
        assert_eq!(handle.last_cycle().await.unwrap().recorded, 1);

        oracle.set_providers("QmX", ["peerB"]).await;
        sleep(Duration::from_secs(10)).await;
        assert_eq!(handle.cycles_completed(), 2);
        assert_eq!(handle.last_cycle().await.unwrap().recorded, 1);
        assert_eq!(ledger.transactions_for_token("QmX").await.unwrap().len(), 2);

        assert!(handle.is_running());
        handle.stop().await;
    }
}
