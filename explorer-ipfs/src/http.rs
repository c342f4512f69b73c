//! Kubo RPC adapter
//!
//! Talks to the node's HTTP API:
//! - `POST /api/v0/add?only-hash=true&pin=false` for hashing
//! - `POST /api/v0/routing/findprovs` for provider lookup
//!
//! The lookup answers with newline-delimited routing events. Provider
//! events carry the peers in `Responses[].ID`; an error object anywhere in
//! the stream fails the lookup.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, trace};

use explorer_core::PeerSet;

use crate::config::IpfsConfig;
use crate::error::{OracleError, OracleResult};
use crate::oracle::ContentOracle;

/// Routing event type for a provider record
const PROVIDER_EVENT: u64 = 4;

#[derive(Debug, Clone, Deserialize)]
struct IpfsAddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

pub struct HttpOracle {
    config: IpfsConfig,
    client: reqwest::Client,
}

impl HttpOracle {
    pub fn new(config: IpfsConfig) -> OracleResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OracleError::Configuration(format!("HTTP client error: {}", e)))?;

        info!(endpoint = %config.api_endpoint, "IPFS RPC oracle configured");

        Ok(Self { config, client })
    }

    fn findprovs_url(&self, cid: &str) -> String {
        let mut url = format!(
            "{}/api/v0/routing/findprovs?arg={}",
            self.config.api_endpoint, cid
        );
        if self.config.num_providers > 0 {
            url.push_str(&format!("&num-providers={}", self.config.num_providers));
        }
        url
    }
}

/// Collect providers from a findprovs response body
pub fn parse_findprovs(body: &str) -> OracleResult<PeerSet> {
    let mut peers = PeerSet::new();

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let event: Value = serde_json::from_str(line)
            .map_err(|e| OracleError::InvalidResponse(format!("Bad routing event: {}", e)))?;

        if event.get("Type").and_then(Value::as_str) == Some("error") {
            let message = event
                .get("Message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(OracleError::Lookup(message.to_string()));
        }

        if event.get("Type").and_then(Value::as_u64) != Some(PROVIDER_EVENT) {
            trace!(event = %line, "Skipping routing event");
            continue;
        }

        let responses = event
            .get("Responses")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for response in responses {
            if let Some(id) = response.get("ID").and_then(Value::as_str) {
                peers.insert(id.trim());
            }
        }
    }

    Ok(peers)
}

#[async_trait]
impl ContentOracle for HttpOracle {
    async fn hash(&self, data: &[u8]) -> OracleResult<String> {
        let url = format!(
            "{}/api/v0/add?only-hash=true&pin=false&quieter=true",
            self.config.api_endpoint
        );

        let part = reqwest::multipart::Part::bytes(data.to_vec()).file_name("data");
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| OracleError::Unavailable(format!("IPFS add failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Hash(format!("IPFS add failed: {} - {}", status, body)));
        }

        let added = response
            .json::<IpfsAddResponse>()
            .await
            .map_err(|e| OracleError::InvalidResponse(format!("Failed to parse IPFS response: {}", e)))?;

        Ok(added.hash)
    }

    async fn find_providers(&self, cid: &str) -> OracleResult<PeerSet> {
        let response = self
            .client
            .post(self.findprovs_url(cid))
            .send()
            .await
            .map_err(|e| OracleError::Lookup(format!("IPFS findprovs failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Lookup(format!(
                "IPFS findprovs failed: {} - {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| OracleError::Lookup(format!("Failed to read findprovs body: {}", e)))?;

        let peers = parse_findprovs(&body)?;
        debug!(cid = %cid, providers = peers.len(), "Provider lookup complete");
        Ok(peers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FINDPROVS_BODY: &str = r#"{"Extra":"","ID":"","Responses":null,"Type":0}
{"Extra":"","ID":"12D3KooWQuery","Responses":null,"Type":6}
{"Extra":"","ID":"","Responses":[{"Addrs":["/ip4/10.0.0.1/tcp/4001"],"ID":"12D3KooWPeerA"}],"Type":4}
{"Extra":"","ID":"","Responses":[{"Addrs":[],"ID":"12D3KooWPeerB"},{"Addrs":[],"ID":"12D3KooWPeerA"}],"Type":4}
"#;

    #[test]
    fn test_parse_provider_events() {
        let peers = parse_findprovs(FINDPROVS_BODY).unwrap();
        assert_eq!(
            peers,
            PeerSet::from_peers(["12D3KooWPeerB", "12D3KooWPeerA"])
        );
        assert_eq!(peers.len(), 2);
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(parse_findprovs("").unwrap().is_empty());
        assert!(parse_findprovs("{\"Type\":0,\"Responses\":null}\n")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_parse_error_object() {
        let body = "{\"Message\":\"routing: not found\",\"Code\":0,\"Type\":\"error\"}\n";
        assert_eq!(
            parse_findprovs(body),
            Err(OracleError::Lookup("routing: not found".to_string()))
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_findprovs("not json"),
            Err(OracleError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_findprovs_url() {
        let mut config = IpfsConfig::remote("http://node:5001");
        let oracle = HttpOracle::new(config.clone()).unwrap();
        assert_eq!(
            oracle.findprovs_url("QmX"),
            "http://node:5001/api/v0/routing/findprovs?arg=QmX"
        );

        config.num_providers = 20;
        let oracle = HttpOracle::new(config).unwrap();
        assert!(oracle.findprovs_url("QmX").ends_with("&num-providers=20"));
    }
}
