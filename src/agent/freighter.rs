//! Freighter Bridge Adapter
//!
//! Talks to the Freighter extension through its local HTTP bridge. Every
//! bridge response carries an optional `error` field that must be checked
//! explicitly; a 200 status alone does not mean the call succeeded.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::agent::{AgentError, NetworkDetails, SigningAgent};
use async_trait::async_trait;

/// Default local bridge endpoint
pub const DEFAULT_BRIDGE_URL: &str = "http://127.0.0.1:8317";

/// Freighter extension adapter over the local HTTP bridge
#[derive(Clone)]
pub struct FreighterBridge {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectedResponse {
    #[serde(default)]
    is_connected: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressResponse {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkDetailsResponse {
    #[serde(default)]
    network: Option<String>,
    #[serde(default)]
    network_passphrase: Option<String>,
    #[serde(default)]
    network_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignResponse {
    #[serde(default)]
    signed_tx_xdr: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl FreighterBridge {
    /// Create an adapter against a specific bridge URL
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create an adapter against the default local bridge
    pub fn localhost() -> Self {
        Self::new(DEFAULT_BRIDGE_URL)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Reject responses that carry an embedded error field
    fn check_error(error: Option<String>) -> Result<(), AgentError> {
        match error {
            Some(msg) if !msg.is_empty() => Err(AgentError::Rejected(msg)),
            _ => Ok(()),
        }
    }

    async fn probe_health(&self) -> bool {
        match self.client.get(self.url("health")).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn probe_manifest(&self) -> bool {
        match self.client.get(self.url("manifest")).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl SigningAgent for FreighterBridge {
    async fn detect(&self) -> bool {
        // Layered detection: no single signal is reliable, so each probe
        // tolerates failure and falls through to the next.
        match self.connected().await {
            Ok(_) => {
                debug!("bridge liveness call answered");
                return true;
            }
            Err(e) => debug!("liveness probe failed: {}", e),
        }

        match self.request_connection().await {
            // Even a refusal proves the agent is present.
            Ok(_) | Err(AgentError::Rejected(_)) => {
                debug!("access probe answered");
                return true;
            }
            Err(e) => debug!("access probe failed: {}", e),
        }

        if self.probe_health().await {
            debug!("bridge health endpoint answered");
            return true;
        }

        if self.probe_manifest().await {
            debug!("bridge manifest endpoint answered");
            return true;
        }

        debug!("signing agent not detected");
        false
    }

    async fn request_connection(&self) -> Result<String, AgentError> {
        let resp = self
            .client
            .post(self.url("request-access"))
            .send()
            .await?;

        let body: AddressResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::Protocol(e.to_string()))?;
        Self::check_error(body.error)?;

        match body.address {
            Some(addr) if !addr.is_empty() => Ok(addr),
            _ => Err(AgentError::Protocol("access granted without an address".to_string())),
        }
    }

    async fn connected(&self) -> Result<bool, AgentError> {
        let resp = self.client.get(self.url("connected")).send().await?;

        let body: ConnectedResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::Protocol(e.to_string()))?;
        Self::check_error(body.error)?;

        Ok(body.is_connected.unwrap_or(false))
    }

    async fn address(&self) -> Result<Option<String>, AgentError> {
        let resp = self.client.get(self.url("address")).send().await?;

        let body: AddressResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::Protocol(e.to_string()))?;
        Self::check_error(body.error)?;

        Ok(body.address.filter(|a| !a.is_empty()))
    }

    async fn network_details(&self) -> Result<NetworkDetails, AgentError> {
        let resp = self
            .client
            .get(self.url("network-details"))
            .send()
            .await?;

        let body: NetworkDetailsResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::Protocol(e.to_string()))?;
        Self::check_error(body.error)?;

        let network = body
            .network
            .ok_or_else(|| AgentError::Protocol("network details without a network field".to_string()))?;

        Ok(NetworkDetails {
            network,
            network_passphrase: body.network_passphrase,
            network_url: body.network_url,
        })
    }

    async fn sign(&self, envelope_xdr: &str, network: &str) -> Result<String, AgentError> {
        // Signing waits on a human decision; no client-side timeout here.
        let resp = self
            .client
            .post(self.url("sign-transaction"))
            .json(&serde_json::json!({
                "transactionXdr": envelope_xdr,
                "network": network,
            }))
            .send()
            .await?;

        let body: SignResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::Protocol(e.to_string()))?;
        Self::check_error(body.error)?;

        body.signed_tx_xdr
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AgentError::Protocol("signing returned no envelope".to_string()))
    }
}

impl std::fmt::Debug for FreighterBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreighterBridge")
            .field("base_url", &self.base_url)
            .finish()
    }
}
