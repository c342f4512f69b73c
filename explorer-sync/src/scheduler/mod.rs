//! Background schedulers
//!
//! - [`PinCheckScheduler`]: daily pin check over the ledger, jittered
//! - [`MintScheduler`]: weekly minting followed by the missing-owner pass
//!
//! Each runs on its own task with a `watch` shutdown channel and is
//! controlled through the handle returned by `start`.

mod daily;
mod weekly;

pub use daily::{PinCheckConfig, PinCheckHandle, PinCheckScheduler};
pub use weekly::{MintScheduler, MintSchedulerConfig, MintSchedulerHandle, WeeklyReport};

use tokio::sync::watch;

/// Resolve once the shutdown flag is raised or its sender is gone
pub(crate) async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
