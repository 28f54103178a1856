//! Block Builder Port
//!
//! Bundle submission plus a push-based result channel. Results are published
//! on a broadcast hub; a coordinator subscribes before it submits and drops
//! the subscription once the bundle is resolved.

use async_trait::async_trait;
use solana_sdk::{pubkey::Pubkey, transaction::VersionedTransaction};
use thiserror::Error;
use tokio::sync::broadcast;

/// Buffered events per subscriber before the slowest one starts lagging
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Error)]
pub enum BlockBuilderError {
    #[error("Failed to fetch tip accounts: {0}")]
    TipAccounts(String),
    #[error("Bundle submission failed: {0}")]
    Submission(String),
    #[error("Invalid bundle: {0}")]
    InvalidBundle(String),
    #[error("Rate limit exceeded")]
    RateLimited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleEventKind {
    Accepted { slot: Option<u64> },
    Rejected { reason: String },
}

/// Result notification for one submitted bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEvent {
    pub bundle_id: String,
    pub kind: BundleEventKind,
}

impl BundleEvent {
    pub fn accepted(bundle_id: impl Into<String>, slot: Option<u64>) -> Self {
        Self {
            bundle_id: bundle_id.into(),
            kind: BundleEventKind::Accepted { slot },
        }
    }

    pub fn rejected(bundle_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            bundle_id: bundle_id.into(),
            kind: BundleEventKind::Rejected { reason: reason.into() },
        }
    }
}

/// Fan-out point for bundle results
#[derive(Debug, Clone)]
pub struct BundleEventHub {
    tx: broadcast::Sender<BundleEvent>,
}

impl BundleEventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Deliver to current subscribers; returns how many received it
    pub fn publish(&self, event: BundleEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> BundleSubscription {
        BundleSubscription { rx: self.tx.subscribe() }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BundleEventHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Live registration for bundle results. Dropping it unregisters.
#[derive(Debug)]
pub struct BundleSubscription {
    rx: broadcast::Receiver<BundleEvent>,
}

impl BundleSubscription {
    /// Next event, or `None` once the hub is gone
    pub async fn recv(&mut self) -> Option<BundleEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Bundle event subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[async_trait]
pub trait BlockBuilder: Send + Sync {
    /// Addresses that accept bundle tips
    async fn tip_accounts(&self) -> Result<Vec<Pubkey>, BlockBuilderError>;

    /// Submit an atomic bundle; returns the builder's bundle id
    async fn submit_bundle(
        &self,
        transactions: &[VersionedTransaction],
    ) -> Result<String, BlockBuilderError>;

    /// Register for result notifications
    fn subscribe(&self) -> BundleSubscription;
}
