//! Disbursement Relay Client
//!
//! Fans out one relay call per recipient and tallies successes and
//! failures. The relay endpoint accepts `{destination, amount}` and
//! answers `{success, txHash}` after a simulated delay; each call stands
//! alone, so one failed payout never aborts the rest.

use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::WalletError;

/// Default endpoint of the mock disbursement relay
pub const DEFAULT_RELAY_URL: &str = "http://localhost:5000";

/// Seam for the disbursement relay
#[async_trait]
pub trait DisbursementRelay: Send + Sync {
    /// Send one payout; returns the relay's transaction hash
    async fn send(&self, destination: &str, amount: &str) -> Result<String, WalletError>;
}

/// HTTP client for the mock relay endpoint
#[derive(Clone)]
pub struct HttpRelay {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct PayoutBody<'a> {
    destination: &'a str,
    amount: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelayResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    tx_hash: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpRelay {
    /// Create a client against a specific relay endpoint
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a client against the default local relay
    pub fn localhost() -> Self {
        Self::new(DEFAULT_RELAY_URL)
    }
}

#[async_trait]
impl DisbursementRelay for HttpRelay {
    async fn send(&self, destination: &str, amount: &str) -> Result<String, WalletError> {
        let resp = self
            .client
            .post(format!("{}/mock-sdp/send", self.base_url))
            .json(&PayoutBody {
                destination,
                amount,
            })
            .send()
            .await
            .map_err(|e| WalletError::SubmissionRejected(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(WalletError::SubmissionRejected(format!(
                "relay returned status {}",
                resp.status()
            )));
        }

        let body: RelayResponse = resp
            .json()
            .await
            .map_err(|e| WalletError::SubmissionRejected(format!("malformed relay response: {}", e)))?;

        if let Some(error) = body.error {
            return Err(WalletError::SubmissionRejected(error));
        }
        if !body.success {
            return Err(WalletError::SubmissionRejected("relay reported failure".to_string()));
        }
        body.tx_hash
            .ok_or_else(|| WalletError::SubmissionRejected("relay returned no tx hash".to_string()))
    }
}

/// Outcome of one payout in a disbursement run
#[derive(Debug, Clone)]
pub struct PayoutResult {
    /// Recipient address
    pub destination: String,
    /// Relay tx hash on success, the failure otherwise
    pub result: Result<String, WalletError>,
}

/// Tally of a disbursement run
#[derive(Debug, Clone)]
pub struct DisbursementReport {
    /// Per-recipient outcomes, in recipient order
    pub results: Vec<PayoutResult>,
}

impl DisbursementReport {
    /// Number of successful payouts
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.result.is_ok()).count()
    }

    /// Number of failed payouts
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Human-readable tally
    pub fn summary(&self) -> String {
        let mut message = format!("{} disbursements were successful.", self.succeeded());
        if self.failed() > 0 {
            message.push_str(&format!(" {} failed.", self.failed()));
        }
        message
    }
}

/// Fan out one relay call per recipient and tally the outcomes
pub async fn disburse_all(
    relay: &dyn DisbursementRelay,
    recipients: &[String],
    amount: &str,
) -> DisbursementReport {
    info!(recipients = recipients.len(), amount = %amount, "starting disbursement run");

    let calls = recipients.iter().map(|destination| async move {
        let result = relay.send(destination, amount).await;
        if let Err(err) = &result {
            warn!(destination = %destination, error = %err, "payout failed");
        }
        PayoutResult {
            destination: destination.clone(),
            result,
        }
    });

    let report = DisbursementReport {
        results: join_all(calls).await,
    };
    info!(succeeded = report.succeeded(), failed = report.failed(), "disbursement run finished");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Relay that fails for a fixed set of destinations
    struct ScriptedRelay {
        failing: HashSet<String>,
    }

    impl ScriptedRelay {
        fn failing_for(destinations: &[&str]) -> Self {
            Self {
                failing: destinations.iter().map(|d| d.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl DisbursementRelay for ScriptedRelay {
        async fn send(&self, destination: &str, _amount: &str) -> Result<String, WalletError> {
            if self.failing.contains(destination) {
                Err(WalletError::SubmissionRejected("relay reported failure".to_string()))
            } else {
                Ok(format!("MOCK_TX_HASH_{}", destination))
            }
        }
    }

    #[tokio::test]
    async fn test_fan_out_tallies_partial_failure() {
        let relay = ScriptedRelay::failing_for(&["GBBB"]);
        let recipients = vec!["GAAA".to_string(), "GBBB".to_string(), "GCCC".to_string()];

        let report = disburse_all(&relay, &recipients, "100").await;

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.summary(), "2 disbursements were successful. 1 failed.");
    }

    #[tokio::test]
    async fn test_all_successful_summary_omits_failures() {
        let relay = ScriptedRelay::failing_for(&[]);
        let recipients = vec!["GAAA".to_string(), "GBBB".to_string()];

        let report = disburse_all(&relay, &recipients, "50").await;

        assert_eq!(report.failed(), 0);
        assert_eq!(report.summary(), "2 disbursements were successful.");
    }

    #[tokio::test]
    async fn test_results_preserve_recipient_order() {
        let relay = ScriptedRelay::failing_for(&["GAAA"]);
        let recipients = vec!["GAAA".to_string(), "GBBB".to_string()];

        let report = disburse_all(&relay, &recipients, "10").await;

        assert_eq!(report.results[0].destination, "GAAA");
        assert!(report.results[0].result.is_err());
        assert_eq!(report.results[1].destination, "GBBB");
        assert_eq!(report.results[1].result.as_deref().unwrap(), "MOCK_TX_HASH_GBBB");
    }

    #[tokio::test]
    async fn test_empty_recipient_list() {
        let relay = ScriptedRelay::failing_for(&[]);
        let report = disburse_all(&relay, &[], "10").await;
        assert_eq!(report.succeeded(), 0);
        assert_eq!(report.summary(), "0 disbursements were successful.");
    }
}
