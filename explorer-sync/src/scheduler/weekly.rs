//! Weekly minting and catch-up
//!
//! Each pass mints up to the supply's high-water mark, then syncs every
//! minted token that has no ownership record yet. The first pass runs on
//! start. A stop request ends the catch-up after in-flight syncs finish.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use explorer_core::DEFAULT_MINT_INTERVAL_SECS;

use super::shutdown_requested;
use crate::batch::{BatchRunner, CycleStats};
use crate::mint::{MintReport, TokenMinter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintSchedulerConfig {
    pub interval: Duration,
}

impl Default for MintSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_MINT_INTERVAL_SECS),
        }
    }
}

/// Outcome of one weekly pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub mint: Option<MintReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint_error: Option<String>,
    pub reconcile: CycleStats,
}

pub struct MintScheduler {
    minter: Arc<TokenMinter>,
    runner: Arc<BatchRunner>,
    config: MintSchedulerConfig,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    last_pass: Arc<RwLock<Option<WeeklyReport>>>,
    passes: Arc<AtomicU64>,
}

impl MintScheduler {
    pub fn new(
        minter: Arc<TokenMinter>,
        runner: Arc<BatchRunner>,
        config: MintSchedulerConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            minter,
            runner,
            config,
            shutdown_tx,
            shutdown_rx,
            last_pass: Arc::new(RwLock::new(None)),
            passes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Mint, then reconcile tokens without owners
    ///
    /// A minting failure is logged and does not skip the reconciliation.
    pub async fn run_pass(
        minter: &TokenMinter,
        runner: &BatchRunner,
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> WeeklyReport {
        let mut report = WeeklyReport::default();

        match minter.mint_pending().await {
            Ok(mint) => report.mint = Some(mint),
            Err(e) => {
                error!(error = %e, "Weekly mint failed");
                report.mint_error = Some(e.to_string());
            }
        }

        report.reconcile = runner.reconcile_missing(shutdown).await;
        report
    }

    pub fn start(self) -> MintSchedulerHandle {
        let shutdown_tx = self.shutdown_tx.clone();
        let last_pass = self.last_pass.clone();
        let passes = self.passes.clone();

        let task_handle = tokio::spawn(async move {
            self.run_loop().await;
        });

        MintSchedulerHandle {
            shutdown_tx,
            task_handle,
            last_pass,
            passes,
        }
    }

    async fn run_loop(self) {
        let mut shutdown_rx = self.shutdown_rx.clone();
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.config.interval.as_secs(),
            "Weekly mint scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    info!("Weekly sync started");
                    let report = Self::run_pass(&self.minter, &self.runner, Some(&shutdown_rx)).await;
                    *self.last_pass.write().await = Some(report);
                    self.passes.fetch_add(1, Ordering::SeqCst);
                }
                _ = shutdown_requested(&mut shutdown_rx) => {
                    info!("Weekly mint scheduler shutting down");
                    break;
                }
            }
        }
    }
}

/// Handle for controlling the weekly scheduler
pub struct MintSchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    task_handle: tokio::task::JoinHandle<()>,
    last_pass: Arc<RwLock<Option<WeeklyReport>>>,
    passes: Arc<AtomicU64>,
}

impl MintSchedulerHandle {
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task_handle.await;
        info!("Weekly mint scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.task_handle.is_finished()
    }

    pub fn passes_completed(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    pub async fn last_pass(&self) -> Option<WeeklyReport> {
        self.last_pass.read().await.clone()
    }
}
