//! Signing Agent Adapters
//!
//! This module provides a stable interface over the external signing agent
//! (a user-controlled wallet extension holding the private keys). All
//! implementations normalize the agent's heterogeneous failure shapes
//! (thrown faults, `{error}` result fields, missing payloads) into one
//! outcome type, so downstream logic never special-cases provider quirks.

pub mod freighter;
pub mod local;

pub use freighter::FreighterBridge;
pub use local::LocalAgent;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Network details as reported by the signing agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDetails {
    /// Provider network identifier (e.g. `TESTNET`, `PUBLIC`)
    pub network: String,
    /// Network passphrase, when the agent reports one
    #[serde(default)]
    pub network_passphrase: Option<String>,
    /// Horizon URL the agent is configured with, when reported
    #[serde(default)]
    pub network_url: Option<String>,
}

/// Errors normalized at the adapter boundary
#[derive(Debug, Clone, thiserror::Error)]
pub enum AgentError {
    /// The agent could not be reached at all
    #[error("signing agent unavailable: {0}")]
    Unavailable(String),

    /// The agent answered, but refused the request
    #[error("rejected by the signing agent: {0}")]
    Rejected(String),

    /// The agent answered with a payload we could not interpret
    #[error("malformed agent response: {0}")]
    Protocol(String),

    /// Transport-level failure talking to the agent
    #[error("agent transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            AgentError::Unavailable(err.to_string())
        } else {
            AgentError::Transport(err.to_string())
        }
    }
}

/// Stable interface over an external signing agent.
///
/// Absence of an `Err` from the underlying provider does not imply success;
/// implementations must check result payloads for embedded error fields
/// before returning `Ok`.
#[async_trait]
pub trait SigningAgent: Send + Sync {
    /// Probe whether the agent is present in the host environment.
    ///
    /// Extension presence cannot be detected by a single reliable signal,
    /// so implementations layer several independent probes and tolerate any
    /// individual probe failing.
    async fn detect(&self) -> bool;

    /// Trigger the agent's own permission prompt and return the granted
    /// account address.
    async fn request_connection(&self) -> Result<String, AgentError>;

    /// Live connection status as the agent reports it
    async fn connected(&self) -> Result<bool, AgentError>;

    /// Currently active account address, if any
    async fn address(&self) -> Result<Option<String>, AgentError>;

    /// Active network details
    async fn network_details(&self) -> Result<NetworkDetails, AgentError>;

    /// Request a signature over a base64 transaction envelope.
    ///
    /// This is user-interactive: it may block indefinitely while the user
    /// considers the prompt, and it must never be retried automatically.
    /// Returns the signed envelope, base64-encoded.
    async fn sign(&self, envelope_xdr: &str, network: &str) -> Result<String, AgentError>;
}
