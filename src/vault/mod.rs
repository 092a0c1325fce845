//! Vault Domain
//!
//! Record types for loan vaults and the persistence seam for their
//! disbursement recipient lists. Persistence itself is an external
//! collaborator; this module only defines the interface plus an in-memory
//! implementation used by tests and the CLI.

pub mod ops;

pub use ops::{deposit_request, initialize_request, InitVaultParams, VaultOps};

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::WalletError;

/// Funding lifecycle of a vault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultStatus {
    /// Accepting investor deposits
    Funding,
    /// Fully funded, loan disbursed
    Active,
    /// All installments repaid
    Repaid,
    /// Borrower defaulted
    Defaulted,
}

/// A loan vault record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    /// Opaque record id
    pub id: String,
    /// Display name of the funded project
    pub project_name: String,
    /// On-chain contract address, once the vault is initialized
    pub contract_address: Option<String>,
    /// Funding target
    pub total_raise: Decimal,
    /// Amount raised so far
    pub raised_so_far: Decimal,
    /// Lifecycle status
    pub status: VaultStatus,
    /// Disbursement recipients, ordered, no duplicates
    #[serde(default)]
    pub recipients: Vec<String>,
}

/// Persistence seam for vault records
#[async_trait]
pub trait VaultStore: Send + Sync {
    /// Fetch a vault by id
    async fn get(&self, id: &str) -> Result<Option<Vault>, WalletError>;

    /// List all vaults
    async fn list(&self) -> Result<Vec<Vault>, WalletError>;

    /// Append a recipient to a vault's disbursement list.
    ///
    /// Duplicates are rejected so the ordered-unique invariant of the
    /// collection stays observable.
    async fn add_recipient(&self, vault_id: &str, address: &str) -> Result<(), WalletError>;

    /// Remove a recipient from a vault's disbursement list
    async fn remove_recipient(&self, vault_id: &str, address: &str) -> Result<(), WalletError>;

    /// Current recipient list, in insertion order
    async fn recipients(&self, vault_id: &str) -> Result<Vec<String>, WalletError>;
}

/// In-memory vault store
#[derive(Default)]
pub struct MemoryVaultStore {
    inner: RwLock<HashMap<String, Vault>>,
}

impl MemoryVaultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a vault record
    pub async fn insert(&self, vault: Vault) {
        self.inner.write().await.insert(vault.id.clone(), vault);
    }
}

#[async_trait]
impl VaultStore for MemoryVaultStore {
    async fn get(&self, id: &str) -> Result<Option<Vault>, WalletError> {
        Ok(self.inner.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Vault>, WalletError> {
        let mut vaults: Vec<Vault> = self.inner.read().await.values().cloned().collect();
        vaults.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(vaults)
    }

    async fn add_recipient(&self, vault_id: &str, address: &str) -> Result<(), WalletError> {
        let mut inner = self.inner.write().await;
        let vault = inner
            .get_mut(vault_id)
            .ok_or_else(|| WalletError::InvalidInput(format!("unknown vault: {}", vault_id)))?;
        if vault.recipients.iter().any(|r| r == address) {
            return Err(WalletError::InvalidInput(format!(
                "recipient already present: {}",
                address
            )));
        }
        vault.recipients.push(address.to_string());
        Ok(())
    }

    async fn remove_recipient(&self, vault_id: &str, address: &str) -> Result<(), WalletError> {
        let mut inner = self.inner.write().await;
        let vault = inner
            .get_mut(vault_id)
            .ok_or_else(|| WalletError::InvalidInput(format!("unknown vault: {}", vault_id)))?;
        vault.recipients.retain(|r| r != address);
        Ok(())
    }

    async fn recipients(&self, vault_id: &str) -> Result<Vec<String>, WalletError> {
        let inner = self.inner.read().await;
        let vault = inner
            .get(vault_id)
            .ok_or_else(|| WalletError::InvalidInput(format!("unknown vault: {}", vault_id)))?;
        Ok(vault.recipients.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault(id: &str) -> Vault {
        Vault {
            id: id.to_string(),
            project_name: "Solar Farm".to_string(),
            contract_address: None,
            total_raise: Decimal::from(1_000_000),
            raised_so_far: Decimal::ZERO,
            status: VaultStatus::Funding,
            recipients: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_recipients_keep_insertion_order() {
        let store = MemoryVaultStore::new();
        store.insert(vault("v1")).await;

        store.add_recipient("v1", "GAAA").await.unwrap();
        store.add_recipient("v1", "GBBB").await.unwrap();
        store.add_recipient("v1", "GCCC").await.unwrap();

        assert_eq!(store.recipients("v1").await.unwrap(), vec!["GAAA", "GBBB", "GCCC"]);
    }

    #[tokio::test]
    async fn test_duplicate_recipient_rejected() {
        let store = MemoryVaultStore::new();
        store.insert(vault("v1")).await;

        store.add_recipient("v1", "GAAA").await.unwrap();
        let err = store.add_recipient("v1", "GAAA").await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidInput(_)));
        assert_eq!(store.recipients("v1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_recipient() {
        let store = MemoryVaultStore::new();
        store.insert(vault("v1")).await;

        store.add_recipient("v1", "GAAA").await.unwrap();
        store.add_recipient("v1", "GBBB").await.unwrap();
        store.remove_recipient("v1", "GAAA").await.unwrap();

        assert_eq!(store.recipients("v1").await.unwrap(), vec!["GBBB"]);
    }

    #[tokio::test]
    async fn test_unknown_vault_is_invalid_input() {
        let store = MemoryVaultStore::new();
        assert!(store.recipients("missing").await.is_err());
        assert!(store.add_recipient("missing", "GAAA").await.is_err());
    }
}
