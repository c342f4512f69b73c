//! Oracle configuration

use serde::{Deserialize, Serialize};
use std::env;

/// Which adapter talks to the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleKind {
    /// Kubo RPC API over HTTP
    Http,
    /// `ipfs` binary as a subprocess
    Command,
}

impl OracleKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "http" | "api" => Some(Self::Http),
            "command" | "cli" | "binary" => Some(Self::Command),
            _ => None,
        }
    }
}

impl Default for OracleKind {
    fn default() -> Self {
        Self::Http
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpfsConfig {
    pub kind: OracleKind,
    /// RPC API endpoint
    pub api_endpoint: String,
    /// Node binary for the command adapter
    pub binary: String,
    /// Repository path exported as `IPFS_PATH` to the binary
    pub repo_path: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Provider cap passed to the routing query (0 = node default)
    pub num_providers: u32,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            kind: OracleKind::Http,
            api_endpoint: "http://127.0.0.1:5001".to_string(),
            binary: "ipfs".to_string(),
            repo_path: None,
            timeout_secs: 120,
            num_providers: 0,
        }
    }
}

impl IpfsConfig {
    /// Remote RPC endpoint
    pub fn remote(api_endpoint: &str) -> Self {
        Self {
            api_endpoint: api_endpoint.trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    /// Local binary with an explicit repository
    pub fn command(binary: &str, repo_path: Option<&str>) -> Self {
        Self {
            kind: OracleKind::Command,
            binary: binary.to_string(),
            repo_path: repo_path.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            kind: env::var("EXPLORER_ORACLE")
                .ok()
                .and_then(|s| OracleKind::from_str(&s))
                .unwrap_or(defaults.kind),
            api_endpoint: env::var("EXPLORER_IPFS_API")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_endpoint),
            binary: env::var("EXPLORER_IPFS_BIN").unwrap_or(defaults.binary),
            repo_path: env::var("EXPLORER_IPFS_PATH")
                .ok()
                .or_else(|| env::var("IPFS_PATH").ok()),
            timeout_secs: env::var("EXPLORER_IPFS_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            num_providers: env::var("EXPLORER_NUM_PROVIDERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.num_providers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_kind_parse() {
        assert_eq!(OracleKind::from_str("HTTP"), Some(OracleKind::Http));
        assert_eq!(OracleKind::from_str("cli"), Some(OracleKind::Command));
        assert_eq!(OracleKind::from_str("grpc"), None);
    }

    #[test]
    fn test_config_presets() {
        let config = IpfsConfig::remote("http://ipfs.example.com:5001/");
        assert_eq!(config.api_endpoint, "http://ipfs.example.com:5001");
        assert_eq!(config.kind, OracleKind::Http);

        let config = IpfsConfig::command("/usr/local/bin/ipfs", Some("/data/ipfs"));
        assert_eq!(config.kind, OracleKind::Command);
        assert_eq!(config.repo_path.as_deref(), Some("/data/ipfs"));
    }
}
