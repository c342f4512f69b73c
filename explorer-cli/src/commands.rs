//! Command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use explorer_core::{LogFormat, LogLevel};

use crate::config::ExplorerConfig;
use crate::error::{CliError, CliResult};

/// Token ownership explorer
#[derive(Parser, Debug)]
#[command(name = "explorer")]
#[command(version)]
#[command(about = "Keeps the token ownership ledger in sync with the DHT")]
pub struct Cli {
    /// Ledger directory (overrides EXPLORER_DB_PATH)
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Kubo RPC endpoint (overrides EXPLORER_IPFS_API)
    #[arg(long)]
    pub ipfs_api: Option<String>,

    /// Log level: error, warn, info, debug, trace
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format: pretty, compact, json
    #[arg(long)]
    pub log_format: Option<String>,

    /// Start from the development preset instead of the production defaults
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the daily pin check and the weekly mint pass until Ctrl-C
    Run,

    /// Sync one token against the DHT now
    Sync {
        /// Token id (content address)
        token_id: String,
    },

    /// Run one pin check cycle and print its counters
    Check {
        /// Scan every minted token, not only tokens with an owner
        #[arg(long)]
        all: bool,
    },

    /// Mint token ids up to a slot (defaults to the configured supply)
    Mint {
        #[arg(long, requires = "number")]
        level: Option<u32>,
        #[arg(long, requires = "level")]
        number: Option<u64>,
    },

    /// Sync every minted token that has no ownership record yet
    Reconcile,

    /// Ownership history of a token
    History {
        token_id: String,
    },

    /// Tokens whose current holder set contains a peer
    Owners {
        #[arg(long)]
        peer: String,
    },

    /// Ledger counts and effective configuration
    Status,
}

impl Cli {
    /// Environment configuration with this invocation's flags applied
    pub fn resolve_config(&self) -> CliResult<ExplorerConfig> {
        let mut config = if self.dev {
            ExplorerConfig::development()
        } else {
            ExplorerConfig::from_env()
        };

        if let Some(path) = &self.db_path {
            config.db_path = path.clone();
        }
        if let Some(api) = &self.ipfs_api {
            config.ipfs.api_endpoint = api.trim_end_matches('/').to_string();
        }
        if let Some(level) = &self.log_level {
            config.log_level = LogLevel::parse(level)
                .ok_or_else(|| CliError::invalid_arg(format!("unknown log level '{}'", level)))?;
        }
        if let Some(format) = &self.log_format {
            config.log_format = LogFormat::parse(format)
                .ok_or_else(|| CliError::invalid_arg(format!("unknown log format '{}'", format)))?;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from(["explorer", "sync", "QmToken"]).unwrap();
        assert!(matches!(cli.command, Commands::Sync { ref token_id } if token_id == "QmToken"));

        let cli = Cli::try_parse_from(["explorer", "mint", "--level", "2", "--number", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Mint {
                level: Some(2),
                number: Some(5)
            }
        ));

        let cli = Cli::try_parse_from(["explorer", "owners", "--peer", "peerA"]).unwrap();
        assert!(matches!(cli.command, Commands::Owners { ref peer } if peer == "peerA"));
    }

    #[test]
    fn test_mint_needs_both_coordinates() {
        assert!(Cli::try_parse_from(["explorer", "mint", "--level", "2"]).is_err());
        assert!(Cli::try_parse_from(["explorer", "mint"]).is_ok());
    }

    #[test]
    fn test_flag_overrides() {
        let cli = Cli::try_parse_from([
            "explorer",
            "--dev",
            "--db-path",
            "/var/lib/explorer",
            "--log-format",
            "json",
            "status",
        ])
        .unwrap();
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/explorer"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_level, LogLevel::Debug);

        let cli = Cli::try_parse_from(["explorer", "--dev", "--log-level", "loud", "status"]).unwrap();
        assert!(cli.resolve_config().is_err());
    }
}
