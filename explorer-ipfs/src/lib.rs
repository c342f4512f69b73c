//! Explorer IPFS - Content-Address Oracle
//!
//! Two operations are needed from the content-addressing network:
//! - `hash`: the content id of a byte string, computed without pinning or
//!   announcing anything
//! - `find_providers`: the peers the DHT currently lists as providers
//!
//! Both sit behind the [`ContentOracle`] trait. Adapters:
//! - [`HttpOracle`]: node RPC API over HTTP
//! - [`CommandOracle`]: node binary as a subprocess
//! - [`MockOracle`]: scripted in-process oracle for tests

pub mod command;
pub mod config;
pub mod error;
pub mod http;
pub mod mock;
pub mod oracle;

pub use command::CommandOracle;
pub use config::{IpfsConfig, OracleKind};
pub use error::{OracleError, OracleResult};
pub use http::HttpOracle;
pub use mock::MockOracle;
pub use oracle::{connect, ContentOracle};
