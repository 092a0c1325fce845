//! Transaction Building & Submission
//!
//! Constructs unsigned invoke-contract transactions against a freshly
//! loaded source account, requests a signature from the signing agent, and
//! submits the signed envelope to the ledger network. Failures carry the
//! pipeline stage they occurred in, so callers can render different
//! guidance for "you declined" versus "the network rejected this".

pub mod args;
pub mod builder;
pub mod submit;

pub use args::{amount_to_stroops, ScArg, STROOPS_PER_UNIT};
pub use builder::{TxBuilder, TxRequest, UnsignedTx, DEFAULT_TIMEOUT_SECS};
pub use submit::{envelope_hash, Submitter, TxSuccess};

use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    Hash, Limits, Transaction, TransactionSignaturePayload,
    TransactionSignaturePayloadTaggedTransaction, WriteXdr,
};

use crate::error::WalletError;

/// Pipeline stage at which a transaction attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStage {
    /// Building the transaction, including loading the source account
    AccountLoad,
    /// Requesting the user's signature
    Signing,
    /// Submitting the signed envelope to the ledger
    Submission,
}

impl std::fmt::Display for TxStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxStage::AccountLoad => write!(f, "account load"),
            TxStage::Signing => write!(f, "signing"),
            TxStage::Submission => write!(f, "submission"),
        }
    }
}

/// A failed transaction attempt, surfaced per-attempt and never retained
/// across attempts
#[derive(Debug, Clone, thiserror::Error)]
#[error("transaction failed during {stage}: {error}")]
pub struct TxError {
    /// Where in the pipeline the attempt failed
    pub stage: TxStage,
    /// The underlying failure
    pub error: WalletError,
}

impl TxError {
    pub fn new(stage: TxStage, error: WalletError) -> Self {
        Self { stage, error }
    }
}

/// Hash of the transaction's signature payload on the given network.
///
/// This is both what the agent signs and the network transaction id.
pub(crate) fn signature_payload_hash(
    tx: &Transaction,
    passphrase: &str,
) -> Result<[u8; 32], WalletError> {
    let network_id = Hash(Sha256::digest(passphrase.as_bytes()).into());
    let payload = TransactionSignaturePayload {
        network_id,
        tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
    };
    let bytes = payload
        .to_xdr(Limits::none())
        .map_err(|e| WalletError::InvalidInput(format!("envelope encoding failed: {}", e)))?;
    Ok(Sha256::digest(&bytes).into())
}
