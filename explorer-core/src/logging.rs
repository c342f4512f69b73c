//! Logging Standards and Conventions
//!
//! All crates log through `tracing` with structured fields (`token_id`,
//! `epoch`, `peers`, `count`, `duration_ms`, `error`). This module holds the
//! level/format enums the CLI uses to configure the subscriber.
//!
//! # Log Levels
//!
//! | Level | Usage | Examples |
//! |-------|-------|----------|
//! | ERROR | Storage failures, worker panics | Commit rejected, task panicked |
//! | WARN  | Recoverable issues, skipped work | DHT lookup failed, page read failed |
//! | INFO  | Significant state changes | Ownership transition, cycle complete |
//! | DEBUG | Per-token flow | Lookup results, unchanged holders |
//! | TRACE | Raw oracle output | Routing events |
//!
//! # Examples
//!
//! ```ignore
//! use tracing::info;
//!
//! info!(
//!     token_id = %token_id,
//!     epoch = epoch,
//!     peers = %peer_set,
//!     "Ownership transition recorded"
//! );
//! ```

use serde::{Deserialize, Serialize};

/// Log level enumeration matching tracing levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty-printed for development
    Pretty,
    /// Compact single-line
    Compact,
    /// JSON for production
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Compact
    }
}
