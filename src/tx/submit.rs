//! Transaction Submitter
//!
//! Requests a signature from the signing agent, then submits the signed
//! envelope to the ledger. The two failure classes are kept distinct:
//! a signing failure never disconnects the session, and nothing here is
//! retried automatically. A retry is a fresh build+submit initiated by
//! the caller.

use std::sync::Arc;

use stellar_xdr::curr::{Limits, ReadXdr, TransactionEnvelope};
use tracing::{debug, info};

use crate::agent::{AgentError, SigningAgent};
use crate::error::WalletError;
use crate::ledger::{HorizonClient, LedgerResponse};
use crate::session::Network;
use crate::tx::builder::UnsignedTx;
use crate::tx::{signature_payload_hash, TxError, TxStage};

/// Successful submission outcome
#[derive(Debug, Clone)]
pub struct TxSuccess {
    /// Network transaction hash, hex-encoded
    pub hash: String,
    /// Raw ledger response
    pub response: LedgerResponse,
}

/// Signs built transactions through the agent and submits them
#[derive(Clone)]
pub struct Submitter {
    agent: Arc<dyn SigningAgent>,
    horizon: HorizonClient,
}

impl Submitter {
    pub fn new(agent: Arc<dyn SigningAgent>, horizon: HorizonClient) -> Self {
        Self { agent, horizon }
    }

    /// Sign the envelope and submit it to the ledger.
    ///
    /// An expired envelope is rejected up front: it must be rebuilt, never
    /// resubmitted as-is. The signing call is user-interactive and may wait
    /// on the user indefinitely.
    pub async fn sign_and_submit(&self, unsigned: &UnsignedTx) -> Result<TxSuccess, TxError> {
        if chrono::Utc::now().timestamp() >= unsigned.expires_at {
            return Err(TxError::new(
                TxStage::Signing,
                WalletError::InvalidInput("envelope expired; rebuild the transaction".to_string()),
            ));
        }

        let signed = self
            .agent
            .sign(&unsigned.envelope_xdr, unsigned.network.provider_tag())
            .await
            .map_err(|e| {
                TxError::new(
                    TxStage::Signing,
                    match e {
                        AgentError::Unavailable(_) => WalletError::ExtensionUnavailable,
                        AgentError::Rejected(msg) => WalletError::SigningRejected(msg),
                        AgentError::Protocol(msg) | AgentError::Transport(msg) => {
                            WalletError::SigningRejected(msg)
                        }
                    },
                )
            })?;

        let hash = envelope_hash(&signed, unsigned.network)
            .map_err(|e| TxError::new(TxStage::Signing, e))?;
        debug!(hash = %hash, "submitting signed envelope");

        let response = self
            .horizon
            .submit(&signed)
            .await
            .map_err(|e| TxError::new(TxStage::Submission, e))?;

        let hash = if response.hash.is_empty() {
            hash
        } else {
            response.hash.clone()
        };
        info!(hash = %hash, "transaction accepted");
        Ok(TxSuccess { hash, response })
    }
}

/// Transaction hash of a base64 envelope on the given network
pub fn envelope_hash(envelope_xdr: &str, network: Network) -> Result<String, WalletError> {
    let envelope = TransactionEnvelope::from_xdr_base64(envelope_xdr, Limits::none())
        .map_err(|e| WalletError::InvalidInput(format!("malformed envelope: {}", e)))?;
    let tx = match envelope {
        TransactionEnvelope::Tx(v1) => v1.tx,
        _ => {
            return Err(WalletError::InvalidInput(
                "unsupported envelope type".to_string(),
            ))
        }
    };
    Ok(hex::encode(signature_payload_hash(&tx, network.passphrase())?))
}
