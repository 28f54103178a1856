//! Execution Gateway
//!
//! Sends one signed transaction without preflight and polls until it is
//! confirmed, fails on chain, or its reference hash expires. No retry here;
//! callers own the retry policy.

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::{signature::Signature, transaction::VersionedTransaction};
use thiserror::Error;

use crate::ports::network::{LatestBlockhash, NetworkClient, NetworkError, SignatureState};

/// Default delay between status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Consecutive poll errors tolerated before giving up
pub const MAX_CONSECUTIVE_POLL_ERRORS: u32 = 10;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Send failed: {0}")]
    Send(NetworkError),
    #[error("Confirmation polling failed for {signature}: {source}")]
    Poll {
        signature: Signature,
        source: NetworkError,
    },
}

/// Settlement result of one submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Confirmed(Signature),
    /// Landed with a program error
    Failed { signature: Signature, reason: String },
    /// Reference hash expired before confirmation
    Expired(Signature),
}

impl SubmitOutcome {
    /// Settlement reference when confirmed
    pub fn confirmed(&self) -> Option<Signature> {
        match self {
            SubmitOutcome::Confirmed(signature) => Some(*signature),
            _ => None,
        }
    }

    pub fn signature(&self) -> Signature {
        match self {
            SubmitOutcome::Confirmed(signature)
            | SubmitOutcome::Expired(signature)
            | SubmitOutcome::Failed { signature, .. } => *signature,
        }
    }
}

impl std::fmt::Display for SubmitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitOutcome::Confirmed(sig) => write!(f, "confirmed {}", sig),
            SubmitOutcome::Failed { signature, reason } => {
                write!(f, "failed {}: {}", signature, reason)
            }
            SubmitOutcome::Expired(sig) => write!(f, "expired {}", sig),
        }
    }
}

#[derive(Clone)]
pub struct ExecutionGateway {
    network: Arc<dyn NetworkClient>,
    poll_interval: Duration,
}

impl ExecutionGateway {
    pub fn new(network: Arc<dyn NetworkClient>) -> Self {
        Self {
            network,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Submit `transaction` and wait until it settles or `reference` expires
    pub async fn submit(
        &self,
        transaction: &VersionedTransaction,
        reference: &LatestBlockhash,
    ) -> Result<SubmitOutcome, GatewayError> {
        let signature = self
            .network
            .send_raw_transaction(transaction)
            .await
            .map_err(GatewayError::Send)?;

        tracing::debug!("Sent {}, polling for confirmation", signature);

        let mut poll_errors = 0u32;
        loop {
            match self.poll_once(&signature, reference).await {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) => poll_errors = 0,
                Err(e) => {
                    poll_errors += 1;
                    tracing::warn!(
                        "Status poll for {} failed ({}/{}): {}",
                        signature,
                        poll_errors,
                        MAX_CONSECUTIVE_POLL_ERRORS,
                        e
                    );
                    if poll_errors >= MAX_CONSECUTIVE_POLL_ERRORS {
                        return Err(GatewayError::Poll { signature, source: e });
                    }
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn poll_once(
        &self,
        signature: &Signature,
        reference: &LatestBlockhash,
    ) -> Result<Option<SubmitOutcome>, NetworkError> {
        match self.network.signature_status(signature).await? {
            Some(SignatureState::Confirmed) => return Ok(Some(SubmitOutcome::Confirmed(*signature))),
            Some(SignatureState::Failed(reason)) => {
                return Ok(Some(SubmitOutcome::Failed {
                    signature: *signature,
                    reason,
                }))
            }
            None => {}
        }

        let height = self.network.block_height().await?;
        if height > reference.last_valid_block_height {
            return Ok(Some(SubmitOutcome::Expired(*signature)));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::{dummy_transaction, MockNetwork};
    use solana_sdk::signature::Keypair;

    async fn submit_with(network: MockNetwork) -> Result<SubmitOutcome, GatewayError> {
        let reference = network.latest_blockhash().await.unwrap();
        let gateway = ExecutionGateway::new(Arc::new(network));
        gateway.submit(&dummy_transaction(&Keypair::new()), &reference).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmed() {
        let outcome = submit_with(MockNetwork::new()).await.unwrap();
        assert!(outcome.confirmed().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_program_error_is_value_not_error() {
        let network =
            MockNetwork::new().with_send_statuses(vec![Some(SignatureState::Failed("0x1".into()))]);
        let outcome = submit_with(network).await.unwrap();

        assert!(matches!(outcome, SubmitOutcome::Failed { ref reason, .. } if reason == "0x1"));
        assert!(outcome.confirmed().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_past_last_valid_height() {
        let network = MockNetwork::new()
            .with_send_statuses(vec![None])
            .with_height_step(100);
        let outcome = submit_with(network).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Expired(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure() {
        let network = MockNetwork::new().with_send_failures(1);
        let result = submit_with(network).await;
        assert!(matches!(result, Err(GatewayError::Send(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_signature_matches_payer_signature() {
        let payer = Keypair::new();
        let tx = dummy_transaction(&payer);
        let network = MockNetwork::new();
        let reference = network.latest_blockhash().await.unwrap();

        let outcome = ExecutionGateway::new(Arc::new(network))
            .submit(&tx, &reference)
            .await
            .unwrap();
        assert_eq!(outcome.signature(), tx.signatures[0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_consecutive_poll_errors() {
        let network = MockNetwork::new().with_status_failures(MAX_CONSECUTIVE_POLL_ERRORS);
        let result = submit_with(network.clone()).await;

        assert!(matches!(
            result,
            Err(GatewayError::Poll { source: NetworkError::Rpc(_), .. })
        ));
        assert_eq!(network.sent_transactions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_errors_below_limit_still_confirm() {
        let network = MockNetwork::new().with_status_failures(MAX_CONSECUTIVE_POLL_ERRORS - 1);

        let outcome = submit_with(network).await.unwrap();

        assert!(outcome.confirmed().is_some());
    }
}
