//! Vault Contract Operations
//!
//! Builds the two invoke-contract requests the marketplace performs on
//! chain (vault initialization and investor deposit) and wires session,
//! builder, and submitter into one pipeline. The acting address is always
//! the session's connected address.

use std::sync::Arc;

use crate::agent::SigningAgent;
use crate::error::WalletError;
use crate::ledger::HorizonClient;
use crate::session::WalletSession;
use crate::tx::args::{amount_to_stroops, ScArg};
use crate::tx::builder::{TxBuilder, TxRequest};
use crate::tx::submit::{Submitter, TxSuccess};
use crate::tx::{TxError, TxStage};

/// Fee bid for vault initialization
pub const INITIALIZE_FEE_STROOPS: u32 = 10_000;
/// Fee bid for deposits
pub const DEPOSIT_FEE_STROOPS: u32 = 100_000;

/// Parameters for initializing a vault contract
#[derive(Debug, Clone)]
pub struct InitVaultParams {
    /// Borrower account address
    pub borrower: String,
    /// Loan token contract address
    pub token: String,
    /// Vault share token contract address
    pub share_token: String,
    /// Funding cap, decimal string (i128)
    pub cap: String,
    /// Funding window in seconds, decimal string (u64)
    pub funding_duration_secs: String,
    /// Installment due dates, unix timestamps (u64 each)
    pub installment_dates: Vec<String>,
    /// Installment amounts (i128 each)
    pub installment_amounts: Vec<String>,
}

impl InitVaultParams {
    /// Split a comma-separated form field into trimmed entries
    pub fn split_csv(field: &str) -> Vec<String> {
        field
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Build the `initialize` invocation for a vault contract.
///
/// Argument order matches the contract: admin, borrower, token, share
/// token, cap, installment dates, installment amounts, funding duration.
pub fn initialize_request(
    contract_id: &str,
    admin: &str,
    params: &InitVaultParams,
) -> Result<TxRequest, WalletError> {
    let cap = ScArg::i128_from_str(&params.cap)?;
    let funding_duration = ScArg::u64_from_str(&params.funding_duration_secs)?;
    let dates = params
        .installment_dates
        .iter()
        .map(|d| ScArg::u64_from_str(d))
        .collect::<Result<Vec<_>, _>>()?;
    let amounts = params
        .installment_amounts
        .iter()
        .map(|a| ScArg::i128_from_str(a))
        .collect::<Result<Vec<_>, _>>()?;

    if dates.len() != amounts.len() {
        return Err(WalletError::InvalidInput(format!(
            "{} installment dates but {} amounts",
            dates.len(),
            amounts.len()
        )));
    }

    Ok(TxRequest::new(
        contract_id,
        "initialize",
        vec![
            ScArg::address(admin),
            ScArg::address(&params.borrower),
            ScArg::address(&params.token),
            ScArg::address(&params.share_token),
            cap,
            ScArg::vec(dates),
            ScArg::vec(amounts),
            funding_duration,
        ],
        INITIALIZE_FEE_STROOPS,
    ))
}

/// Build the `deposit` invocation for a vault contract.
///
/// The amount is a display string in whole units, converted to stroops
/// exactly.
pub fn deposit_request(
    contract_id: &str,
    investor: &str,
    amount: &str,
) -> Result<TxRequest, WalletError> {
    let stroops = amount_to_stroops(amount)?;
    Ok(TxRequest::new(
        contract_id,
        "deposit",
        vec![ScArg::address(investor), ScArg::I128(stroops)],
        DEPOSIT_FEE_STROOPS,
    ))
}

/// Session-bound pipeline for vault contract operations
#[derive(Clone)]
pub struct VaultOps {
    session: WalletSession,
    builder: TxBuilder,
    submitter: Submitter,
}

impl VaultOps {
    pub fn new(session: WalletSession, agent: Arc<dyn SigningAgent>, horizon: HorizonClient) -> Self {
        let builder = TxBuilder::new(session.clone(), horizon.clone());
        let submitter = Submitter::new(agent, horizon);
        Self {
            session,
            builder,
            submitter,
        }
    }

    async fn connected_address(&self) -> Result<String, TxError> {
        let snapshot = self.session.snapshot().await;
        match (snapshot.is_connected(), snapshot.address) {
            (true, Some(address)) => Ok(address),
            _ => Err(TxError::new(TxStage::AccountLoad, WalletError::NotConnected)),
        }
    }

    /// Initialize a vault contract as the connected admin account
    pub async fn initialize_vault(
        &self,
        contract_id: &str,
        params: &InitVaultParams,
    ) -> Result<TxSuccess, TxError> {
        let admin = self.connected_address().await?;
        let request = initialize_request(contract_id, &admin, params)
            .map_err(|e| TxError::new(TxStage::AccountLoad, e))?;
        let unsigned = self.builder.build(&request).await?;
        self.submitter.sign_and_submit(&unsigned).await
    }

    /// Deposit into a vault contract as the connected investor account
    pub async fn deposit(&self, contract_id: &str, amount: &str) -> Result<TxSuccess, TxError> {
        let investor = self.connected_address().await?;
        let request = deposit_request(contract_id, &investor, amount)
            .map_err(|e| TxError::new(TxStage::AccountLoad, e))?;
        let unsigned = self.builder.build(&request).await?;
        self.submitter.sign_and_submit(&unsigned).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(byte: u8) -> String {
        stellar_strkey::ed25519::PublicKey([byte; 32]).to_string()
    }

    fn contract(byte: u8) -> String {
        stellar_strkey::Contract([byte; 32]).to_string()
    }

    fn params() -> InitVaultParams {
        InitVaultParams {
            borrower: account(1),
            token: contract(2),
            share_token: contract(3),
            cap: "1000000".to_string(),
            funding_duration_secs: "604800".to_string(),
            installment_dates: vec!["1760000000".to_string(), "1762600000".to_string()],
            installment_amounts: vec!["500000".to_string(), "500000".to_string()],
        }
    }

    #[test]
    fn test_initialize_request_shape() {
        let request = initialize_request(&contract(9), &account(7), &params()).unwrap();

        assert_eq!(request.function, "initialize");
        assert_eq!(request.fee_stroops, INITIALIZE_FEE_STROOPS);
        assert_eq!(request.args.len(), 8);
        assert_eq!(request.args[0], ScArg::Address(account(7)));
        assert_eq!(request.args[4], ScArg::I128(1_000_000));
        assert_eq!(request.args[7], ScArg::U64(604_800));
        match &request.args[5] {
            ScArg::Vec(dates) => assert_eq!(dates.len(), 2),
            other => panic!("expected vec of dates, got {:?}", other),
        }
    }

    #[test]
    fn test_initialize_rejects_mismatched_installments() {
        let mut p = params();
        p.installment_amounts.pop();
        let err = initialize_request(&contract(9), &account(7), &p).unwrap_err();
        assert!(matches!(err, WalletError::InvalidInput(_)));
    }

    #[test]
    fn test_initialize_rejects_malformed_cap() {
        let mut p = params();
        p.cap = "1e6".to_string();
        assert!(initialize_request(&contract(9), &account(7), &p).is_err());
    }

    #[test]
    fn test_deposit_request_converts_to_stroops() {
        let request = deposit_request(&contract(9), &account(7), "25").unwrap();

        assert_eq!(request.function, "deposit");
        assert_eq!(request.fee_stroops, DEPOSIT_FEE_STROOPS);
        assert_eq!(request.args.len(), 2);
        assert_eq!(request.args[1], ScArg::I128(250_000_000));
    }

    #[test]
    fn test_deposit_rejects_bad_amount() {
        assert!(deposit_request(&contract(9), &account(7), "0").is_err());
        assert!(deposit_request(&contract(9), &account(7), "12.34567891").is_err());
    }

    #[test]
    fn test_split_csv() {
        assert_eq!(
            InitVaultParams::split_csv(" 100, 200 ,300,"),
            vec!["100", "200", "300"]
        );
    }
}
