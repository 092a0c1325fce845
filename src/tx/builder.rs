//! Transaction Builder
//!
//! Builds unsigned invoke-contract transactions. The source account is
//! always the session's connected address, loaded fresh from the ledger
//! (never a caller-supplied address), so an envelope can not be built
//! against a stale or wrong account.

use stellar_xdr::curr::{
    HostFunction, InvokeContractArgs, InvokeHostFunctionOp, Limits, Memo, MuxedAccount, Operation,
    OperationBody, Preconditions, ScAddress, ScSymbol, ScVal, SequenceNumber, StringM, TimeBounds,
    TimePoint, Transaction, TransactionEnvelope, TransactionExt, TransactionV1Envelope, Uint256,
    VecM, WriteXdr,
};
use tracing::debug;

use crate::error::WalletError;
use crate::ledger::HorizonClient;
use crate::session::{ConnectionStatus, Network, WalletSession};
use crate::tx::args::{to_sc_address, ScArg};
use crate::tx::{TxError, TxStage};

/// Expiry window for an unsigned envelope; after this it must be rebuilt,
/// never resubmitted as-is
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A request to invoke a contract function on the ledger
#[derive(Debug, Clone)]
pub struct TxRequest {
    /// Target contract id (`C...`)
    pub contract_id: String,
    /// Contract function to invoke
    pub function: String,
    /// Ordered, typed invocation arguments
    pub args: Vec<ScArg>,
    /// Fee bid in stroops
    pub fee_stroops: u32,
    /// Expiry bound in seconds
    pub timeout_secs: u64,
}

impl TxRequest {
    /// Create a request with the default expiry window
    pub fn new(contract_id: &str, function: &str, args: Vec<ScArg>, fee_stroops: u32) -> Self {
        Self {
            contract_id: contract_id.to_string(),
            function: function.to_string(),
            args,
            fee_stroops,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Override the expiry window
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// An unsigned transaction envelope
#[derive(Debug, Clone)]
pub struct UnsignedTx {
    /// Base64 XDR envelope, no signatures yet
    pub envelope_xdr: String,
    /// Source account the envelope was built against
    pub source: String,
    /// Network the envelope targets
    pub network: Network,
    /// Unix timestamp after which the envelope is no longer valid
    pub expires_at: i64,
}

/// Builds unsigned transactions against the connected account
#[derive(Clone)]
pub struct TxBuilder {
    session: WalletSession,
    horizon: HorizonClient,
}

impl TxBuilder {
    pub fn new(session: WalletSession, horizon: HorizonClient) -> Self {
        Self { session, horizon }
    }

    /// Build an unsigned envelope for the request.
    ///
    /// Loads the current source account state from the ledger using the
    /// session's connected address.
    pub async fn build(&self, request: &TxRequest) -> Result<UnsignedTx, TxError> {
        let snapshot = self.session.snapshot().await;
        let address = match (snapshot.status, snapshot.address) {
            (ConnectionStatus::Connected, Some(address)) => address,
            _ => return Err(TxError::new(TxStage::AccountLoad, WalletError::NotConnected)),
        };

        let account = self
            .horizon
            .load_account(&address)
            .await
            .map_err(|e| TxError::new(TxStage::AccountLoad, e))?;
        debug!(address = %address, sequence = account.sequence, "source account loaded");

        let now = chrono::Utc::now().timestamp();
        build_envelope(&address, account.sequence, snapshot.network, now, request)
            .map_err(|e| TxError::new(TxStage::AccountLoad, e))
    }
}

/// Envelope construction against known source account state
pub(crate) fn build_envelope(
    source: &str,
    sequence: i64,
    network: Network,
    now_unix: i64,
    request: &TxRequest,
) -> Result<UnsignedTx, WalletError> {
    let source_key = stellar_strkey::ed25519::PublicKey::from_string(source)
        .map_err(|_| WalletError::InvalidInput(format!("invalid source address: {}", source)))?;

    let contract_address = to_sc_address(&request.contract_id)?;
    if !matches!(contract_address, ScAddress::Contract(_)) {
        return Err(WalletError::InvalidInput(format!(
            "not a contract id: {}",
            request.contract_id
        )));
    }

    let function_name: StringM<32> = request
        .function
        .as_str()
        .try_into()
        .map_err(|_| WalletError::InvalidInput(format!("invalid function name: {}", request.function)))?;

    let args = request
        .args
        .iter()
        .map(|a| a.to_scval())
        .collect::<Result<Vec<ScVal>, _>>()?;

    let invoke = InvokeHostFunctionOp {
        host_function: HostFunction::InvokeContract(InvokeContractArgs {
            contract_address,
            function_name: ScSymbol(function_name),
            args: args
                .try_into()
                .map_err(|_| WalletError::InvalidInput("too many arguments".to_string()))?,
        }),
        auth: VecM::default(),
    };

    let operation = Operation {
        source_account: None,
        body: OperationBody::InvokeHostFunction(invoke),
    };

    let expires_at = now_unix + request.timeout_secs as i64;
    let tx = Transaction {
        source_account: MuxedAccount::Ed25519(Uint256(source_key.0)),
        fee: request.fee_stroops,
        seq_num: SequenceNumber(sequence + 1),
        cond: Preconditions::Time(TimeBounds {
            min_time: TimePoint(0),
            max_time: TimePoint(expires_at as u64),
        }),
        memo: Memo::None,
        operations: vec![operation]
            .try_into()
            .map_err(|_| WalletError::InvalidInput("too many operations".to_string()))?,
        ext: TransactionExt::V0,
    };

    let envelope = TransactionEnvelope::Tx(TransactionV1Envelope {
        tx,
        signatures: VecM::default(),
    });
    let envelope_xdr = envelope
        .to_xdr_base64(Limits::none())
        .map_err(|e| WalletError::InvalidInput(format!("envelope encoding failed: {}", e)))?;

    Ok(UnsignedTx {
        envelope_xdr,
        source: source.to_string(),
        network,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_xdr::curr::ReadXdr;

    fn source() -> String {
        stellar_strkey::ed25519::PublicKey([3u8; 32]).to_string()
    }

    fn contract() -> String {
        stellar_strkey::Contract([9u8; 32]).to_string()
    }

    fn decode(unsigned: &UnsignedTx) -> Transaction {
        match TransactionEnvelope::from_xdr_base64(&unsigned.envelope_xdr, Limits::none()).unwrap() {
            TransactionEnvelope::Tx(v1) => v1.tx,
            other => panic!("unexpected envelope: {:?}", other),
        }
    }

    #[test]
    fn test_envelope_roundtrip() {
        let request = TxRequest::new(
            &contract(),
            "deposit",
            vec![
                ScArg::address(source()),
                ScArg::i128_from_str("123456789012345678").unwrap(),
            ],
            100_000,
        );
        let unsigned = build_envelope(&source(), 41, Network::Testnet, 1_700_000_000, &request).unwrap();
        let tx = decode(&unsigned);

        assert_eq!(tx.fee, 100_000);
        assert_eq!(tx.seq_num.0, 42);
        assert_eq!(tx.operations.len(), 1);
        match &tx.cond {
            Preconditions::Time(bounds) => {
                assert_eq!(bounds.min_time.0, 0);
                assert_eq!(bounds.max_time.0, 1_700_000_030);
            }
            other => panic!("unexpected preconditions: {:?}", other),
        }
    }

    #[test]
    fn test_i128_argument_survives_encoding_exactly() {
        let request = TxRequest::new(
            &contract(),
            "deposit",
            vec![ScArg::i128_from_str("123456789012345678").unwrap()],
            100,
        );
        let unsigned = build_envelope(&source(), 0, Network::Testnet, 0, &request).unwrap();
        let tx = decode(&unsigned);

        let invoke = match &tx.operations[0].body {
            OperationBody::InvokeHostFunction(op) => op,
            other => panic!("unexpected operation: {:?}", other),
        };
        let args = match &invoke.host_function {
            HostFunction::InvokeContract(call) => {
                assert_eq!(call.function_name.0.to_utf8_string_lossy(), "deposit");
                &call.args
            }
            other => panic!("unexpected host function: {:?}", other),
        };
        match &args[0] {
            ScVal::I128(parts) => {
                let value = ((parts.hi as i128) << 64) | (parts.lo as i128);
                assert_eq!(value, 123_456_789_012_345_678_i128);
            }
            other => panic!("unexpected arg: {:?}", other),
        }
    }

    #[test]
    fn test_account_address_rejected_as_contract_target() {
        let request = TxRequest::new(&source(), "deposit", vec![], 100);
        let err = build_envelope(&source(), 0, Network::Testnet, 0, &request).unwrap_err();
        assert!(matches!(err, WalletError::InvalidInput(_)));
    }

    #[test]
    fn test_timeout_override() {
        let request = TxRequest::new(&contract(), "initialize", vec![], 10_000).with_timeout(60);
        let unsigned = build_envelope(&source(), 5, Network::Mainnet, 1_000, &request).unwrap();
        assert_eq!(unsigned.expires_at, 1_060);
        assert_eq!(unsigned.network, Network::Mainnet);
    }
}
