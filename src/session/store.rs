//! Wallet Session Store
//!
//! State machine owning the connection lifecycle to the signing agent.
//! The session is explicitly constructed and dependency-injected: exactly
//! one wallet connection exists per application instance, but tests can
//! instantiate independent sessions. Cloning shares the underlying state.
//!
//! Connection attempts carry a monotonically increasing generation token;
//! a `disconnect()` (or a newer `connect()`) bumps it, and any resolution or
//! watcher tick holding a stale generation is discarded without touching
//! state. This closes the race between an in-flight connect and a
//! disconnect.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::agent::{AgentError, SigningAgent};
use crate::error::WalletError;
use crate::ledger::HorizonClient;
use crate::session::watcher::{ChangeSource, PollingChanges, DEFAULT_POLL_INTERVAL};
use crate::session::{ConnectionStatus, Network, SessionSnapshot};

/// Wallet session store
#[derive(Clone)]
pub struct WalletSession {
    agent: Arc<dyn SigningAgent>,
    inner: Arc<RwLock<SessionInner>>,
    generation: Arc<AtomicU64>,
    poll_interval: Duration,
}

struct SessionInner {
    status: ConnectionStatus,
    address: Option<String>,
    network: Network,
    balance: String,
    last_error: Option<String>,
    watcher: Option<WatcherHandle>,
}

impl Default for SessionInner {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            address: None,
            network: Network::Testnet,
            balance: "0".to_string(),
            last_error: None,
            watcher: None,
        }
    }
}

struct WatcherHandle {
    task: JoinHandle<()>,
}

impl WatcherHandle {
    fn stop(self) {
        self.task.abort();
    }
}

fn snapshot_of(inner: &SessionInner) -> SessionSnapshot {
    SessionSnapshot {
        status: inner.status,
        address: inner.address.clone(),
        network: inner.network,
        balance: inner.balance.clone(),
        last_error: inner.last_error.clone(),
    }
}

fn reset_disconnected(inner: &mut SessionInner) {
    inner.status = ConnectionStatus::Disconnected;
    inner.address = None;
    inner.balance = "0".to_string();
    inner.last_error = None;
}

impl WalletSession {
    /// Create a session against the given signing agent
    pub fn new(agent: Arc<dyn SigningAgent>) -> Self {
        Self {
            agent,
            inner: Arc::new(RwLock::new(SessionInner::default())),
            generation: Arc::new(AtomicU64::new(0)),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the watcher polling cadence
    pub fn with_poll_interval(mut self, period: Duration) -> Self {
        self.poll_interval = period;
        self
    }

    /// Read-only view of the current session state
    pub async fn snapshot(&self) -> SessionSnapshot {
        snapshot_of(&*self.inner.read().await)
    }

    /// Clear the retained error message
    pub async fn clear_error(&self) {
        self.inner.write().await.last_error = None;
    }

    /// Establish a connection to the signing agent.
    ///
    /// Sequence: availability probe, access request, network-detail fetch,
    /// network mapping. On success the session is Connected with the granted
    /// address and a running change watcher; on failure it is Disconnected
    /// with the error retained. Only one attempt may be in flight; a
    /// concurrent call while Connecting is a caller error.
    pub async fn connect(&self) -> Result<SessionSnapshot, WalletError> {
        let generation = {
            let mut inner = self.inner.write().await;
            if inner.status == ConnectionStatus::Connecting {
                return Err(WalletError::ConnectionInProgress);
            }
            inner.status = ConnectionStatus::Connecting;
            inner.last_error = None;
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        let result = self.establish().await;

        let mut inner = self.inner.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            // Superseded by a disconnect or a newer attempt; this resolution
            // must not touch state.
            debug!("discarding stale connect resolution");
            return Err(WalletError::ConnectionRejected(
                "connection attempt was canceled".to_string(),
            ));
        }

        match result {
            Ok((address, network)) => {
                inner.status = ConnectionStatus::Connected;
                inner.address = Some(address.clone());
                inner.network = network;
                inner.balance = "0".to_string();
                inner.last_error = None;
                if let Some(handle) = inner.watcher.take() {
                    handle.stop();
                }
                inner.watcher = Some(self.spawn_watcher(generation));
                info!(address = %address, network = %network, "wallet connected");
                Ok(snapshot_of(&inner))
            }
            Err(err) => {
                reset_disconnected(&mut inner);
                inner.last_error = Some(err.to_string());
                if let Some(handle) = inner.watcher.take() {
                    handle.stop();
                }
                warn!(error = %err, "wallet connection failed");
                Err(err)
            }
        }
    }

    async fn establish(&self) -> Result<(String, Network), WalletError> {
        if !self.agent.detect().await {
            return Err(WalletError::ExtensionUnavailable);
        }

        let address = self.agent.request_connection().await.map_err(|e| match e {
            AgentError::Unavailable(_) => WalletError::ExtensionUnavailable,
            other => WalletError::ConnectionRejected(other.to_string()),
        })?;

        let details = self
            .agent
            .network_details()
            .await
            .map_err(|e| WalletError::NetworkQueryFailed(e.to_string()))?;

        Ok((address, Network::from_provider(&details.network)))
    }

    /// Disconnect and release the watcher. Idempotent.
    pub async fn disconnect(&self) {
        // Bump the generation first: cancels any in-flight connect and
        // invalidates the running watcher.
        self.generation.fetch_add(1, Ordering::SeqCst);

        let mut inner = self.inner.write().await;
        if let Some(handle) = inner.watcher.take() {
            handle.stop();
        }
        if inner.status != ConnectionStatus::Disconnected {
            info!("wallet disconnected");
        }
        reset_disconnected(&mut inner);
    }

    /// Switch the active network.
    ///
    /// The agent does not support programmatic switching: anything other
    /// than the current network fails with `UnsupportedOperation`. This is
    /// a permanent limitation, not a retryable failure.
    pub async fn switch_network(&self, target: Network) -> Result<(), WalletError> {
        let mut inner = self.inner.write().await;
        if inner.network == target {
            return Ok(());
        }
        let err = WalletError::UnsupportedOperation(format!(
            "switch to {} manually in the wallet",
            target
        ));
        inner.last_error = Some(err.to_string());
        Err(err)
    }

    /// Refresh the cached display balance from the ledger.
    ///
    /// No-op unless connected. The cached value is display-only and never
    /// authoritative.
    pub async fn refresh_balance(&self) -> Result<(), WalletError> {
        let (address, network) = {
            let inner = self.inner.read().await;
            match (inner.status, &inner.address) {
                (ConnectionStatus::Connected, Some(address)) => (address.clone(), inner.network),
                _ => return Ok(()),
            }
        };

        let horizon = HorizonClient::for_network(network);
        match horizon.load_account(&address).await {
            Ok(account) => {
                let mut inner = self.inner.write().await;
                inner.balance = account.native_balance.unwrap_or_else(|| "0".to_string());
                Ok(())
            }
            Err(err) => {
                let mut inner = self.inner.write().await;
                inner.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Reconcile session state against the agent's live status.
    ///
    /// Covers external changes landing between watcher ticks: if the agent
    /// reports disconnected, force a local disconnect; if locally Connected
    /// without an address, re-fetch it or disconnect.
    pub async fn check_connection(&self) {
        match self.agent.connected().await {
            Ok(true) => {}
            Ok(false) | Err(_) => {
                self.disconnect().await;
                return;
            }
        }

        let missing_address = {
            let inner = self.inner.read().await;
            inner.status == ConnectionStatus::Connected && inner.address.is_none()
        };
        if missing_address {
            match self.agent.address().await {
                Ok(Some(address)) => {
                    self.inner.write().await.address = Some(address);
                }
                Ok(None) | Err(_) => self.disconnect().await,
            }
        }
    }

    fn spawn_watcher(&self, generation: u64) -> WatcherHandle {
        let source = PollingChanges::with_interval(self.agent.clone(), self.poll_interval);
        let task = tokio::spawn(watch_loop(
            source,
            self.inner.clone(),
            self.generation.clone(),
            generation,
        ));
        WatcherHandle { task }
    }
}

/// Reconciliation loop driven by a change source.
///
/// A new non-null address updates the session and forces Connected; a null
/// address disconnects; a network change remaps the network only.
async fn watch_loop<S: ChangeSource + 'static>(
    mut source: S,
    inner: Arc<RwLock<SessionInner>>,
    counter: Arc<AtomicU64>,
    generation: u64,
) {
    while let Some(change) = source.next().await {
        if counter.load(Ordering::SeqCst) != generation {
            return;
        }
        let mut state = inner.write().await;
        if counter.load(Ordering::SeqCst) != generation {
            return;
        }

        match change.address {
            Some(address) => {
                if state.address.as_deref() != Some(address.as_str()) {
                    info!(address = %address, "wallet address changed externally");
                    state.address = Some(address);
                    state.status = ConnectionStatus::Connected;
                }
            }
            None => {
                info!("wallet reports no active account, disconnecting");
                reset_disconnected(&mut state);
                if let Some(handle) = state.watcher.take() {
                    handle.stop();
                }
                return;
            }
        }

        if let Some(network) = change.network {
            if network != state.network {
                info!(network = %network, "wallet network changed externally");
                state.network = network;
            }
        }
    }
}
