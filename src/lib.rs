//! lumenvault - Client core for a vault lending marketplace on Stellar
//!
//! This crate owns the wallet side of the marketplace:
//! - Session management against an external signing agent (connection
//!   lifecycle, network tracking, background change watching)
//! - Building, signing and submitting invoke-contract transactions with
//!   staged failure classification
//! - The thin vault domain the marketplace drives through that core:
//!   initialize/deposit operations, recipient registry seam, and the
//!   disbursement relay fan-out

pub mod agent;
pub mod error;
pub mod ledger;
pub mod sdp;
pub mod session;
pub mod tx;
pub mod vault;

// Re-export the public surface
pub use agent::{AgentError, FreighterBridge, LocalAgent, NetworkDetails, SigningAgent};
pub use error::WalletError;
pub use ledger::{AccountRecord, HorizonClient, LedgerResponse};
pub use session::{ConnectionStatus, Network, SessionSnapshot, WalletSession};
pub use tx::{ScArg, Submitter, TxBuilder, TxError, TxRequest, TxStage, TxSuccess, UnsignedTx};
pub use vault::{InitVaultParams, MemoryVaultStore, Vault, VaultOps, VaultStatus, VaultStore};
