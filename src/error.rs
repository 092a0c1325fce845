//! Wallet Error Types
//!
//! Unified error handling for the session store and transaction pipeline.

/// Errors surfaced by session and transaction operations.
///
/// Every failure in the crate is recovered into this type at the session
/// store or submitter boundary; nothing propagates as a panic past those
/// components.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    /// The signing agent extension could not be detected at all.
    #[error("extension not installed")]
    ExtensionUnavailable,

    /// The agent refused or failed the connection/access request.
    #[error("connection rejected: {0}")]
    ConnectionRejected(String),

    /// Fetching network details from the agent failed.
    #[error("network query failed: {0}")]
    NetworkQueryFailed(String),

    /// Loading the source account from the ledger failed.
    #[error("account load failed: {0}")]
    AccountLoadFailed(String),

    /// The user declined the signing prompt, or signing failed.
    #[error("signing rejected: {0}")]
    SigningRejected(String),

    /// The ledger network rejected the submitted transaction.
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    /// Malformed caller input (numeric or address arguments).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The operation is not supported by the agent (permanent, not retryable).
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A connection attempt is already in flight; the store does not queue.
    #[error("a connection attempt is already in flight")]
    ConnectionInProgress,

    /// The operation requires a connected session.
    #[error("wallet is not connected")]
    NotConnected,
}
