//! Change Watcher
//!
//! Detects address or network changes the user makes directly inside the
//! signing agent (not initiated from this application), so the session can
//! reconcile without a UI action.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::agent::SigningAgent;
use crate::session::Network;

/// Default polling cadence for wallet change detection
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// A state observation from the signing agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletChange {
    /// Active address; `None` means the agent reports no usable account
    pub address: Option<String>,
    /// Mapped network; `None` when the network could not be determined
    pub network: Option<Network>,
}

/// Source of wallet change observations.
///
/// The session store only depends on this trait, so a push-capable agent
/// can replace polling without touching it.
#[async_trait]
pub trait ChangeSource: Send {
    /// Wait for and return the next observation; `None` ends the stream
    async fn next(&mut self) -> Option<WalletChange>;
}

/// Fixed-interval polling change source
pub struct PollingChanges {
    agent: Arc<dyn SigningAgent>,
    ticker: Interval,
}

impl PollingChanges {
    /// Poll at the default cadence
    pub fn new(agent: Arc<dyn SigningAgent>) -> Self {
        Self::with_interval(agent, DEFAULT_POLL_INTERVAL)
    }

    /// Poll at a specific cadence
    pub fn with_interval(agent: Arc<dyn SigningAgent>, period: Duration) -> Self {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { agent, ticker }
    }
}

#[async_trait]
impl ChangeSource for PollingChanges {
    async fn next(&mut self) -> Option<WalletChange> {
        self.ticker.tick().await;

        // A failed address query reads as "no usable account"; the session
        // reconciles it the same way as an explicit clear in the agent.
        let address = match self.agent.address().await {
            Ok(addr) => addr.filter(|a| !a.is_empty()),
            Err(_) => None,
        };
        let network = match self.agent.network_details().await {
            Ok(details) => Some(Network::from_provider(&details.network)),
            Err(_) => None,
        };
        Some(WalletChange { address, network })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{LocalAgent, SigningAgent};

    #[tokio::test]
    async fn test_polling_reports_active_address_and_network() {
        let agent = Arc::new(LocalAgent::generate().with_network(Network::Mainnet));
        agent.request_connection().await.unwrap();

        let mut source = PollingChanges::with_interval(agent.clone(), Duration::from_millis(1));
        let change = source.next().await.unwrap();

        assert_eq!(change.address.as_deref(), Some(agent.account()));
        assert_eq!(change.network, Some(Network::Mainnet));
    }

    #[tokio::test]
    async fn test_unreachable_agent_reads_as_no_account() {
        let agent = Arc::new(LocalAgent::generate().unavailable());
        let mut source = PollingChanges::with_interval(agent, Duration::from_millis(1));
        let change = source.next().await.unwrap();

        assert_eq!(change.address, None);
        assert_eq!(change.network, None);
    }
}
