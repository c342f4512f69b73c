//! Process configuration
//!
//! Every setting has a default, can be set through an `EXPLORER_*`
//! environment variable, and a few can be overridden again by flags.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use explorer_core::{
    LogFormat, LogLevel, MintPosition, DEFAULT_SUPPLY_LEVEL, DEFAULT_SUPPLY_NUMBER,
};
use explorer_db::ScanScope;
use explorer_ipfs::IpfsConfig;
use explorer_sync::{BatchConfig, MintSchedulerConfig, PinCheckConfig};

use crate::error::{CliError, CliResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Directory holding the sled ledger
    pub db_path: PathBuf,
    pub ipfs: IpfsConfig,
    pub batch: BatchConfig,
    pub pin_check: PinCheckConfig,
    pub mint: MintSchedulerConfig,
    /// Highest slot the weekly pass may mint
    pub supply: MintPosition,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/explorer"),
            ipfs: IpfsConfig::default(),
            batch: BatchConfig::default(),
            pin_check: PinCheckConfig::default(),
            mint: MintSchedulerConfig::default(),
            supply: MintPosition::new(DEFAULT_SUPPLY_LEVEL, DEFAULT_SUPPLY_NUMBER),
            log_level: LogLevel::Info,
            log_format: LogFormat::Compact,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl ExplorerConfig {
    /// Local development: short cycles, full scans, verbose output
    pub fn development() -> Self {
        Self {
            db_path: PathBuf::from("./data/explorer-dev"),
            batch: BatchConfig {
                page_size: 100,
                concurrency: 4,
                scope: ScanScope::All,
            },
            pin_check: PinCheckConfig {
                interval: Duration::from_secs(300),
                jitter: Duration::from_secs(30),
            },
            mint: MintSchedulerConfig {
                interval: Duration::from_secs(3600),
            },
            log_level: LogLevel::Debug,
            log_format: LogFormat::Pretty,
            ..Default::default()
        }
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            db_path: env::var("EXPLORER_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            ipfs: IpfsConfig::from_env(),
            batch: BatchConfig {
                page_size: env_parse("EXPLORER_PAGE_SIZE").unwrap_or(defaults.batch.page_size),
                concurrency: env_parse("EXPLORER_CONCURRENCY")
                    .unwrap_or(defaults.batch.concurrency),
                scope: env::var("EXPLORER_SCAN_SCOPE")
                    .ok()
                    .and_then(|s| ScanScope::parse(&s))
                    .unwrap_or(defaults.batch.scope),
            },
            pin_check: PinCheckConfig {
                interval: env_parse("EXPLORER_CHECK_INTERVAL_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.pin_check.interval),
                jitter: env_parse("EXPLORER_CHECK_JITTER_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.pin_check.jitter),
            },
            mint: MintSchedulerConfig {
                interval: env_parse("EXPLORER_MINT_INTERVAL_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.mint.interval),
            },
            supply: MintPosition::new(
                env_parse("EXPLORER_SUPPLY_LEVEL").unwrap_or(defaults.supply.level),
                env_parse("EXPLORER_SUPPLY_NUMBER").unwrap_or(defaults.supply.number),
            ),
            log_level: env::var("EXPLORER_LOG_LEVEL")
                .ok()
                .and_then(|s| LogLevel::parse(&s))
                .unwrap_or(defaults.log_level),
            log_format: env::var("EXPLORER_LOG_FORMAT")
                .ok()
                .and_then(|s| LogFormat::parse(&s))
                .unwrap_or(defaults.log_format),
        }
    }

    /// Reject settings the engines cannot run with
    pub fn validate(&self) -> CliResult<()> {
        if self.batch.page_size == 0 {
            return Err(CliError::config("page size must be at least 1"));
        }
        if self.batch.concurrency == 0 {
            return Err(CliError::config("concurrency must be at least 1"));
        }
        if self.pin_check.interval.is_zero() || self.mint.interval.is_zero() {
            return Err(CliError::config("scheduler intervals must be non-zero"));
        }
        if self.pin_check.jitter >= self.pin_check.interval {
            return Err(CliError::config("check jitter must be shorter than the interval"));
        }
        if self.supply.number == 0 {
            return Err(CliError::config("supply number starts at 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExplorerConfig::default();
        assert_eq!(config.batch.page_size, 1000);
        assert_eq!(config.batch.concurrency, 10);
        assert_eq!(config.batch.scope, ScanScope::Owned);
        assert_eq!(config.pin_check.interval, Duration::from_secs(86_400));
        assert_eq!(config.pin_check.jitter, Duration::from_secs(3_600));
        assert_eq!(config.mint.interval, Duration::from_secs(604_800));
        assert_eq!(config.supply, MintPosition::new(1, 10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_development_preset() {
        let config = ExplorerConfig::development();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.batch.scope, ScanScope::All);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = ExplorerConfig::default();
        config.batch.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = ExplorerConfig::default();
        config.pin_check.jitter = config.pin_check.interval;
        assert!(config.validate().is_err());

        let mut config = ExplorerConfig::default();
        config.supply = MintPosition::new(3, 0);
        assert!(config.validate().is_err());
    }

    // the only test in this crate that touches the process environment
    #[test]
    fn test_from_env() {
        env::set_var("EXPLORER_DB_PATH", "/tmp/explorer-test");
        env::set_var("EXPLORER_CONCURRENCY", "3");
        env::set_var("EXPLORER_SCAN_SCOPE", "all");
        env::set_var("EXPLORER_CHECK_JITTER_SECS", "60");
        env::set_var("EXPLORER_SUPPLY_LEVEL", "4");
        env::set_var("EXPLORER_PAGE_SIZE", "not-a-number");
        env::set_var("EXPLORER_LOG_FORMAT", "json");

        let config = ExplorerConfig::from_env();
        assert_eq!(config.db_path, PathBuf::from("/tmp/explorer-test"));
        assert_eq!(config.batch.concurrency, 3);
        assert_eq!(config.batch.scope, ScanScope::All);
        assert_eq!(config.pin_check.jitter, Duration::from_secs(60));
        assert_eq!(config.supply, MintPosition::new(4, 10));
        assert_eq!(config.batch.page_size, 1000);
        assert_eq!(config.log_format, LogFormat::Json);

        for key in [
            "EXPLORER_DB_PATH",
            "EXPLORER_CONCURRENCY",
            "EXPLORER_SCAN_SCOPE",
            "EXPLORER_CHECK_JITTER_SECS",
            "EXPLORER_SUPPLY_LEVEL",
            "EXPLORER_PAGE_SIZE",
            "EXPLORER_LOG_FORMAT",
        ] {
            env::remove_var(key);
        }
    }
}
