//! Explorer CLI
//!
//! Builds the shared sync context once and either runs both schedulers
//! until interrupted or performs a single maintenance action.
//!
//! ```text
//! explorer run                         # daily pin check + weekly mint pass
//! explorer sync <token_id>             # one token, now
//! explorer check [--all]               # one pin check cycle
//! explorer mint [--level L --number N] # mint up to a slot
//! explorer reconcile                   # sync tokens without an owner
//! explorer history <token_id>
//! explorer owners --peer <peer_id>
//! explorer status
//! ```
//!
//! Configuration comes from `EXPLORER_*` variables (a `.env` file is read
//! first); global flags override them.

pub mod commands;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod output;

pub use commands::{Cli, Commands};
pub use config::ExplorerConfig;
pub use error::{CliError, CliResult};
