//! Subprocess adapter
//!
//! Drives the node binary directly (`ipfs dht findprovs`, `ipfs add
//! --only-hash`) with `IPFS_PATH` pointing at the configured repository.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use explorer_core::PeerSet;

use crate::config::IpfsConfig;
use crate::error::{OracleError, OracleResult};
use crate::oracle::ContentOracle;

pub struct CommandOracle {
    config: IpfsConfig,
}

impl CommandOracle {
    pub fn new(config: IpfsConfig) -> Self {
        Self { config }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(repo) = &self.config.repo_path {
            cmd.env("IPFS_PATH", repo);
        }
        cmd
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

/// Collect peer ids from `dht findprovs` output
///
/// Any line mentioning `Error` fails the lookup. Lines starting with `Qm`
/// are content ids echoed by the node, not peers.
pub fn parse_findprovs_output(output: &str) -> OracleResult<PeerSet> {
    let mut peers = PeerSet::new();
    for line in output.lines().map(str::trim) {
        if line.contains("Error") {
            return Err(OracleError::Lookup(line.to_string()));
        }
        if line.is_empty() || line.starts_with("Qm") {
            continue;
        }
        peers.insert(line);
    }
    Ok(peers)
}

#[async_trait]
impl ContentOracle for CommandOracle {
    async fn hash(&self, data: &[u8]) -> OracleResult<String> {
        let mut child = self
            .command(&["add", "--only-hash", "-Q", "--pin=false"])
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| OracleError::Unavailable(format!("Failed to start {}: {}", self.config.binary, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(data)
                .await
                .map_err(|e| OracleError::Hash(format!("Failed to write seed: {}", e)))?;
        }

        let output = tokio::time::timeout(self.timeout(), child.wait_with_output())
            .await
            .map_err(|_| OracleError::Hash("ipfs add timed out".to_string()))?
            .map_err(|e| OracleError::Hash(format!("ipfs add failed: {}", e)))?;

        if !output.status.success() {
            return Err(OracleError::Hash(format!(
                "ipfs add exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let cid = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if cid.is_empty() {
            return Err(OracleError::InvalidResponse("ipfs add printed no hash".to_string()));
        }
        Ok(cid)
    }

    async fn find_providers(&self, cid: &str) -> OracleResult<PeerSet> {
        let mut cmd = self.command(&["dht", "findprovs", cid]);
        let output = tokio::time::timeout(self.timeout(), cmd.output())
            .await
            .map_err(|_| OracleError::Lookup(format!("findprovs {} timed out", cid)))?
            .map_err(|e| OracleError::Unavailable(format!("Failed to start {}: {}", self.config.binary, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let peers = parse_findprovs_output(&stdout)?;
        parse_findprovs_output(&stderr)?;

        if !output.status.success() {
            warn!(cid = %cid, status = %output.status, "findprovs exited abnormally");
            return Err(OracleError::Lookup(format!(
                "findprovs exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        debug!(cid = %cid, providers = peers.len(), "Provider lookup complete");
        Ok(peers)
    }
}
