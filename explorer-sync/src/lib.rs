//! Explorer Sync - Ownership Engines
//!
//! Keeps the ownership ledger in line with the DHT:
//! - [`OwnershipSync`]: reconcile one token against its providers
//! - [`TokenMinter`]: mint token ids along the level schedule
//! - [`BatchRunner`]: bounded, fault-isolated fan-out of syncs
//! - [`PinCheckScheduler`] / [`MintScheduler`]: daily and weekly background tasks
//!
//! All components share one [`SyncContext`] built at process start.

pub mod batch;
pub mod context;
pub mod engine;
pub mod error;
pub mod locks;
pub mod mint;
pub mod scheduler;

pub use batch::{BatchConfig, BatchRunner, CycleStats};
pub use context::SyncContext;
pub use engine::{OwnershipSync, SyncOutcome};
pub use error::{MintError, MintResult, SyncError, SyncResult};
pub use locks::{TokenGuard, TokenLocks};
pub use mint::{MintReport, StaticSupply, SupplySource, TokenMinter};
pub use scheduler::{
    MintScheduler, MintSchedulerConfig, MintSchedulerHandle, PinCheckConfig, PinCheckHandle,
    PinCheckScheduler, WeeklyReport,
};
