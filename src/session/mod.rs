//! Wallet Session Management
//!
//! This module owns the connection lifecycle to the external signing agent:
//! the session state machine, the read-only snapshot handed to callers, and
//! the background watcher that keeps address/network state current when the
//! user acts directly inside the wallet.

pub mod store;
pub mod watcher;

pub use store::WalletSession;
pub use watcher::{ChangeSource, PollingChanges, WalletChange, DEFAULT_POLL_INTERVAL};

use serde::{Deserialize, Serialize};

/// Horizon endpoint for the test network
pub const HORIZON_TESTNET_URL: &str = "https://horizon-testnet.stellar.org";
/// Horizon endpoint for the public network
pub const HORIZON_MAINNET_URL: &str = "https://horizon.stellar.org";

/// Network passphrase for the test network
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";
/// Network passphrase for the public network
pub const MAINNET_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";

/// Target ledger network
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    /// Map a provider-reported network identifier into the session domain.
    ///
    /// Only `PUBLIC` maps to mainnet; `TESTNET`, `FUTURENET`, `STANDALONE`
    /// and any unrecognized identifier default to testnet.
    pub fn from_provider(id: &str) -> Self {
        match id {
            "PUBLIC" => Network::Mainnet,
            _ => Network::Testnet,
        }
    }

    /// Identifier understood by the signing agent
    pub fn provider_tag(&self) -> &'static str {
        match self {
            Network::Testnet => "TESTNET",
            Network::Mainnet => "PUBLIC",
        }
    }

    /// Network passphrase used for transaction signature payloads
    pub fn passphrase(&self) -> &'static str {
        match self {
            Network::Testnet => TESTNET_PASSPHRASE,
            Network::Mainnet => MAINNET_PASSPHRASE,
        }
    }

    /// Horizon base URL for this network
    pub fn horizon_url(&self) -> &'static str {
        match self {
            Network::Testnet => HORIZON_TESTNET_URL,
            Network::Mainnet => HORIZON_MAINNET_URL,
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Testnet => write!(f, "testnet"),
            Network::Mainnet => write!(f, "mainnet"),
        }
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            _ => Err(format!("Unknown network: {}", s)),
        }
    }
}

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
        }
    }
}

/// Read-only view of the session state
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    /// Connection lifecycle state
    pub status: ConnectionStatus,
    /// Active account address; present iff connected
    pub address: Option<String>,
    /// Active network
    pub network: Network,
    /// Display-only cached balance, refreshed on demand
    pub balance: String,
    /// Last error message, retained until cleared or superseded
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    /// Whether the session is fully connected
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_network_mapping() {
        assert_eq!(Network::from_provider("PUBLIC"), Network::Mainnet);
        assert_eq!(Network::from_provider("TESTNET"), Network::Testnet);
        assert_eq!(Network::from_provider("FUTURENET"), Network::Testnet);
        assert_eq!(Network::from_provider("STANDALONE"), Network::Testnet);
    }

    #[test]
    fn test_unknown_identifier_defaults_to_testnet() {
        assert_eq!(Network::from_provider("LOCALNET"), Network::Testnet);
        assert_eq!(Network::from_provider(""), Network::Testnet);
    }

    #[test]
    fn test_provider_tag_roundtrip() {
        assert_eq!(Network::from_provider(Network::Mainnet.provider_tag()), Network::Mainnet);
        assert_eq!(Network::from_provider(Network::Testnet.provider_tag()), Network::Testnet);
    }

    #[test]
    fn test_network_from_str() {
        assert_eq!("mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("Testnet".parse::<Network>().unwrap(), Network::Testnet);
        assert!("futurenet".parse::<Network>().is_err());
    }
}
