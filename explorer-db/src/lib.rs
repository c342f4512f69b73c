//! Explorer Database Layer
//!
//! Storage for the three ledger tables:
//!
//! | Table        | Key              | Mutability                    |
//! |--------------|------------------|-------------------------------|
//! | tokens       | `token_id`       | insert-only (minting)         |
//! | owners       | `token_id`       | upserted on each transition   |
//! | transactions | `tx_id`          | append-only                   |
//!
//! Every store implements [`LedgerStore`]. An ownership transition is one
//! atomic unit: the owners row and the new transaction row are committed
//! together or not at all. A mint batch is likewise all-or-nothing.
//!
//! Two engines are provided:
//! - [`MemoryLedger`] for tests and development
//! - [`SledLedger`] for persistent deployments
//!
//! # Usage
//!
//! ```rust,no_run
//! use explorer_db::{LedgerStore, SledLedger};
//!
//! async fn example() {
//!     let ledger = SledLedger::open("./explorer_data").unwrap();
//!     let stats = ledger.stats().await.unwrap();
//!     println!("{} tokens, {} owned", stats.tokens, stats.owned_tokens);
//! }
//! ```

pub mod error;
pub mod memory;
pub mod sled;
pub mod store;

pub use error::{LedgerError, LedgerResult};
pub use memory::MemoryLedger;
pub use self::sled::SledLedger;
pub use store::{LedgerStats, LedgerStore, ScanScope};
