//! Explorer Constants
//!
//! Centralized defaults shared by the engines, the store and the CLI.

// ============================================================================
// Tokens
// ============================================================================

/// Type tag carried by every minted token
pub const TOKEN_TYPE_RBT: &str = "RBT";

/// Value assigned to freshly minted tokens
pub const MINTED_TOKEN_VALUE: i64 = 1;

// ============================================================================
// Epochs
// ============================================================================

/// Hours in one epoch window
pub const EPOCH_WINDOW_HOURS: i64 = 24 * 7;

// ============================================================================
// Scheduling Defaults
// ============================================================================

/// Interval between ownership check cycles (24 hours)
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Maximum jitter applied to the check interval, in either direction (1 hour)
pub const DEFAULT_CHECK_JITTER_SECS: u64 = 60 * 60;

/// Interval between mint + reconcile passes (one week)
pub const DEFAULT_MINT_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Rows read from the ledger per page during a cycle
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Concurrent sync invocations admitted at once
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default supply high-water mark (level)
pub const DEFAULT_SUPPLY_LEVEL: u32 = 1;

/// Default supply high-water mark (number within level)
pub const DEFAULT_SUPPLY_NUMBER: u64 = 10;
