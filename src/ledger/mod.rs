//! Ledger Network Client
//!
//! Horizon-style REST client: loads account state by address and submits
//! signed transaction envelopes. Rejections come back as RFC 7807 problem
//! documents with result codes in `extras`; those are folded into the
//! error message so callers can show what the network actually objected to.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::WalletError;
use crate::session::Network;

/// Horizon REST API client
#[derive(Clone)]
pub struct HorizonClient {
    client: Client,
    base_url: String,
}

/// Source account state loaded from the ledger
#[derive(Debug, Clone)]
pub struct AccountRecord {
    /// Account address
    pub account_id: String,
    /// Current sequence number
    pub sequence: i64,
    /// Native asset balance, when the account holds one
    pub native_balance: Option<String>,
}

/// Ledger response for an accepted transaction
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerResponse {
    /// Transaction hash
    pub hash: String,
    /// Ledger the transaction was included in
    #[serde(default)]
    pub ledger: Option<u64>,
    /// Whether the transaction succeeded
    #[serde(default)]
    pub successful: bool,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    account_id: String,
    sequence: String,
    #[serde(default)]
    balances: Vec<BalanceEntry>,
}

#[derive(Debug, Deserialize)]
struct BalanceEntry {
    balance: String,
    asset_type: String,
}

impl AccountResponse {
    fn into_record(self) -> Result<AccountRecord, WalletError> {
        let sequence = self.sequence.parse::<i64>().map_err(|_| {
            WalletError::AccountLoadFailed(format!("malformed sequence: {}", self.sequence))
        })?;
        let native_balance = self
            .balances
            .iter()
            .find(|b| b.asset_type == "native")
            .map(|b| b.balance.clone());
        Ok(AccountRecord {
            account_id: self.account_id,
            sequence,
            native_balance,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProblemResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    extras: Option<ProblemExtras>,
}

#[derive(Debug, Default, Deserialize)]
struct ProblemExtras {
    #[serde(default)]
    result_codes: Option<ResultCodes>,
}

#[derive(Debug, Default, Deserialize)]
struct ResultCodes {
    #[serde(default)]
    transaction: Option<String>,
    #[serde(default)]
    operations: Option<Vec<String>>,
}

fn rejection_message(problem: &ProblemResponse) -> String {
    let mut message = problem
        .title
        .clone()
        .unwrap_or_else(|| "transaction rejected".to_string());
    if let Some(codes) = problem.extras.as_ref().and_then(|e| e.result_codes.as_ref()) {
        if let Some(tx_code) = &codes.transaction {
            message.push_str(&format!(" [{}]", tx_code));
        }
        match &codes.operations {
            Some(ops) if !ops.is_empty() => {
                message.push_str(&format!(" ({})", ops.join(", ")));
            }
            _ => {}
        }
    } else if let Some(detail) = &problem.detail {
        message.push_str(&format!(": {}", detail));
    }
    message
}

impl HorizonClient {
    /// Create a client against a specific Horizon endpoint
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a testnet client
    pub fn testnet() -> Self {
        Self::new(crate::session::HORIZON_TESTNET_URL)
    }

    /// Create a mainnet client
    pub fn mainnet() -> Self {
        Self::new(crate::session::HORIZON_MAINNET_URL)
    }

    /// Create a client for the given network
    pub fn for_network(network: Network) -> Self {
        Self::new(network.horizon_url())
    }

    /// Load current account state by address
    pub async fn load_account(&self, address: &str) -> Result<AccountRecord, WalletError> {
        let url = format!("{}/accounts/{}", self.base_url, address);
        debug!(url = %url, "loading source account");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletError::AccountLoadFailed(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(WalletError::AccountLoadFailed(format!(
                "account not found: {}",
                address
            )));
        }
        if !resp.status().is_success() {
            return Err(WalletError::AccountLoadFailed(format!(
                "ledger returned status {}",
                resp.status()
            )));
        }

        let body: AccountResponse = resp
            .json()
            .await
            .map_err(|e| WalletError::AccountLoadFailed(e.to_string()))?;
        body.into_record()
    }

    /// Submit a signed base64 envelope to the ledger
    pub async fn submit(&self, envelope_xdr: &str) -> Result<LedgerResponse, WalletError> {
        let url = format!("{}/transactions", self.base_url);

        let resp = self
            .client
            .post(&url)
            .form(&[("tx", envelope_xdr)])
            .send()
            .await
            .map_err(|e| WalletError::SubmissionRejected(e.to_string()))?;

        if resp.status().is_success() {
            resp.json::<LedgerResponse>()
                .await
                .map_err(|e| WalletError::SubmissionRejected(format!("malformed ledger response: {}", e)))
        } else {
            let status = resp.status();
            let problem = resp.json::<ProblemResponse>().await.unwrap_or_default();
            let mut message = rejection_message(&problem);
            if message == "transaction rejected" {
                message.push_str(&format!(" (status {})", status));
            }
            Err(WalletError::SubmissionRejected(message))
        }
    }
}

impl std::fmt::Debug for HorizonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HorizonClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
