//! Explorer Core - Token Ownership Ledger Domain
//!
//! This crate provides the core types and pure logic shared by every layer
//! of the token ownership explorer:
//! - Token, ownership and transaction records
//! - Peer sets with order-independent equality
//! - Week epochs counted from the reference date
//! - The static level schedule that drives minting
//! - A clock abstraction so time-dependent code is testable
//!
//! Nothing in this crate performs I/O. Storage lives in `explorer-db`,
//! content addressing in `explorer-ipfs`, and the engines in
//! `explorer-sync`.

pub mod clock;
pub mod constants;
pub mod epoch;
pub mod error;
pub mod logging;
pub mod schedule;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use constants::*;
pub use epoch::{epoch_at, epoch_key, epoch_reference, mint_seed};
pub use error::{CoreError, CoreResult};
pub use logging::{LogFormat, LogLevel};
pub use schedule::TokenSchedule;
pub use types::*;
