//! Local Signing Agent
//!
//! In-process ed25519 signer implementing the full agent interface. Used for
//! development and tests: it signs envelopes directly and exposes toggles for
//! availability, signing rejection, and externally-driven address/network
//! changes, so the session machinery can be exercised without a browser
//! extension.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use tokio::sync::RwLock;

use stellar_xdr::curr::{
    DecoratedSignature, Limits, ReadXdr, Signature, SignatureHint, TransactionEnvelope, WriteXdr,
};

use crate::agent::{AgentError, NetworkDetails, SigningAgent};
use crate::session::Network;
use crate::tx::signature_payload_hash;

/// In-process signing agent backed by an ed25519 keypair
pub struct LocalAgent {
    signing_key: SigningKey,
    account: String,
    available: AtomicBool,
    approve_signing: AtomicBool,
    active_address: RwLock<Option<String>>,
    network: RwLock<Network>,
    connect_delay: Duration,
}

impl LocalAgent {
    /// Create an agent with a freshly generated keypair
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Create an agent from raw secret key bytes
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(secret))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let account =
            stellar_strkey::ed25519::PublicKey(signing_key.verifying_key().to_bytes()).to_string();
        Self {
            signing_key,
            account,
            available: AtomicBool::new(true),
            approve_signing: AtomicBool::new(true),
            active_address: RwLock::new(None),
            network: RwLock::new(Network::Testnet),
            connect_delay: Duration::ZERO,
        }
    }

    /// The agent's own account address
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Start on a specific network
    pub fn with_network(mut self, network: Network) -> Self {
        *self.network.get_mut() = network;
        self
    }

    /// Simulate an agent that cannot be detected
    pub fn unavailable(self) -> Self {
        self.available.store(false, Ordering::SeqCst);
        self
    }

    /// Decline every signing prompt
    pub fn rejecting_signatures(self) -> Self {
        self.approve_signing.store(false, Ordering::SeqCst);
        self
    }

    /// Delay access requests, to exercise in-flight connection handling
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Toggle detectability
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Toggle signing approval
    pub fn set_approve_signing(&self, approve: bool) {
        self.approve_signing.store(approve, Ordering::SeqCst);
    }

    /// Simulate the user switching (or clearing) the active account
    pub async fn set_active_address(&self, address: Option<String>) {
        *self.active_address.write().await = address;
    }

    /// Simulate the user switching networks inside the agent
    pub async fn set_network(&self, network: Network) {
        *self.network.write().await = network;
    }

    fn ensure_available(&self) -> Result<(), AgentError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AgentError::Unavailable("no signing agent".to_string()))
        }
    }
}

#[async_trait]
impl SigningAgent for LocalAgent {
    async fn detect(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn request_connection(&self) -> Result<String, AgentError> {
        self.ensure_available()?;
        if self.connect_delay > Duration::ZERO {
            tokio::time::sleep(self.connect_delay).await;
        }
        *self.active_address.write().await = Some(self.account.clone());
        Ok(self.account.clone())
    }

    async fn connected(&self) -> Result<bool, AgentError> {
        self.ensure_available()?;
        Ok(self.active_address.read().await.is_some())
    }

    async fn address(&self) -> Result<Option<String>, AgentError> {
        self.ensure_available()?;
        Ok(self.active_address.read().await.clone())
    }

    async fn network_details(&self) -> Result<NetworkDetails, AgentError> {
        self.ensure_available()?;
        let network = *self.network.read().await;
        Ok(NetworkDetails {
            network: network.provider_tag().to_string(),
            network_passphrase: Some(network.passphrase().to_string()),
            network_url: Some(network.horizon_url().to_string()),
        })
    }

    async fn sign(&self, envelope_xdr: &str, network: &str) -> Result<String, AgentError> {
        self.ensure_available()?;
        if !self.approve_signing.load(Ordering::SeqCst) {
            return Err(AgentError::Rejected("signing request declined".to_string()));
        }

        let envelope = TransactionEnvelope::from_xdr_base64(envelope_xdr, Limits::none())
            .map_err(|e| AgentError::Protocol(format!("malformed envelope: {}", e)))?;
        let mut v1 = match envelope {
            TransactionEnvelope::Tx(v1) => v1,
            _ => return Err(AgentError::Protocol("unsupported envelope type".to_string())),
        };

        let passphrase = Network::from_provider(network).passphrase();
        let hash = signature_payload_hash(&v1.tx, passphrase)
            .map_err(|e| AgentError::Protocol(e.to_string()))?;

        let hint = SignatureHint(
            self.signing_key.verifying_key().to_bytes()[28..]
                .try_into()
                .map_err(|_| AgentError::Protocol("bad key length".to_string()))?,
        );
        let signature = Signature(
            self.signing_key
                .sign(&hash)
                .to_bytes()
                .to_vec()
                .try_into()
                .map_err(|_| AgentError::Protocol("bad signature length".to_string()))?,
        );

        let mut signatures = v1.signatures.to_vec();
        signatures.push(DecoratedSignature { hint, signature });
        v1.signatures = signatures
            .try_into()
            .map_err(|_| AgentError::Protocol("too many signatures".to_string()))?;

        TransactionEnvelope::Tx(v1)
            .to_xdr_base64(Limits::none())
            .map_err(|e| AgentError::Protocol(e.to_string()))
    }
}

impl std::fmt::Debug for LocalAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAgent")
            .field("account", &self.account)
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::args::ScArg;
    use crate::tx::builder::{build_envelope, TxRequest};

    fn unsigned_envelope(agent: &LocalAgent) -> String {
        let contract = stellar_strkey::Contract([1u8; 32]).to_string();
        let request = TxRequest::new(&contract, "initialize", vec![ScArg::U64(1)], 10_000);
        build_envelope(agent.account(), 0, Network::Testnet, 0, &request)
            .unwrap()
            .envelope_xdr
    }

    #[test]
    fn test_account_is_a_strkey_address() {
        let agent = LocalAgent::generate();
        assert!(agent.account().starts_with('G'));
        assert_eq!(agent.account().len(), 56);
    }

    #[tokio::test]
    async fn test_sign_appends_one_decorated_signature() {
        let agent = LocalAgent::generate();
        let signed = agent.sign(&unsigned_envelope(&agent), "TESTNET").await.unwrap();

        let envelope = TransactionEnvelope::from_xdr_base64(&signed, Limits::none()).unwrap();
        match envelope {
            TransactionEnvelope::Tx(v1) => assert_eq!(v1.signatures.len(), 1),
            other => panic!("unexpected envelope: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejecting_agent_declines_signing() {
        let agent = LocalAgent::generate().rejecting_signatures();
        let envelope = unsigned_envelope(&agent);
        let err = agent.sign(&envelope, "TESTNET").await.unwrap_err();
        assert!(matches!(err, AgentError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_unavailable_agent_fails_every_call() {
        let agent = LocalAgent::generate().unavailable();
        assert!(!agent.detect().await);
        assert!(matches!(
            agent.request_connection().await,
            Err(AgentError::Unavailable(_))
        ));
        assert!(matches!(
            agent.network_details().await,
            Err(AgentError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_request_connection_activates_account() {
        let agent = LocalAgent::generate();
        assert_eq!(agent.address().await.unwrap(), None);

        let granted = agent.request_connection().await.unwrap();
        assert_eq!(granted, agent.account());
        assert_eq!(agent.address().await.unwrap().as_deref(), Some(agent.account()));
        assert!(agent.connected().await.unwrap());
    }
}
