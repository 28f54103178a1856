//! Swap Submission
//!
//! Routes one signed swap either through the bundle coordinator (with an
//! optional direct fallback) or straight to the execution gateway.

use std::sync::Arc;

use serde::Deserialize;
use solana_sdk::{signature::Keypair, signature::Signature, transaction::VersionedTransaction};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::blockhash_cache::BlockhashCache;
use super::bundler::BundleCoordinator;
use super::gateway::{ExecutionGateway, GatewayError, SubmitOutcome};
use crate::domain::stats::RunStats;
use crate::ports::network::NetworkError;

/// Submission path for swaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Jito bundle with a tip
    #[default]
    Bundle,
    /// Plain RPC send and confirm
    Legacy,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Bundle => write!(f, "bundle"),
            ExecutionMode::Legacy => write!(f, "legacy"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    #[error("No reference hash available: {0}")]
    NoBlockhash(NetworkError),
    #[error("Bundle not accepted after {attempts} attempts")]
    BundleNotAccepted { attempts: u32 },
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("Transaction not confirmed: {0}")]
    NotConfirmed(SubmitOutcome),
    #[error("Shutdown requested")]
    Cancelled,
}

#[derive(Clone)]
pub struct Submitter {
    bundler: Option<BundleCoordinator>,
    gateway: ExecutionGateway,
    cache: BlockhashCache,
    fallback_to_direct: bool,
    stats: Arc<RunStats>,
}

impl Submitter {
    /// Direct RPC submission only
    pub fn legacy(gateway: ExecutionGateway, cache: BlockhashCache, stats: Arc<RunStats>) -> Self {
        Self {
            bundler: None,
            gateway,
            cache,
            fallback_to_direct: false,
            stats,
        }
    }

    /// Bundle submission, optionally falling back to the gateway
    pub fn bundled(
        bundler: BundleCoordinator,
        gateway: ExecutionGateway,
        cache: BlockhashCache,
        fallback_to_direct: bool,
        stats: Arc<RunStats>,
    ) -> Self {
        Self {
            bundler: Some(bundler),
            gateway,
            cache,
            fallback_to_direct,
            stats,
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        match self.bundler {
            Some(_) => ExecutionMode::Bundle,
            None => ExecutionMode::Legacy,
        }
    }

    pub fn gateway(&self) -> &ExecutionGateway {
        &self.gateway
    }

    /// Settle `transaction`, tipping from `payer` when bundling
    pub async fn submit_swap(
        &self,
        transaction: &VersionedTransaction,
        payer: &Keypair,
        cancel: &CancellationToken,
    ) -> Result<Signature, SubmitError> {
        let Some(bundler) = &self.bundler else {
            return self.submit_direct(transaction).await;
        };

        let report = bundler
            .submit_group(std::slice::from_ref(transaction), payer, 0, cancel)
            .await;

        if report.is_accepted() {
            return Ok(transaction.signatures.first().copied().unwrap_or_default());
        }
        if report.attempts == 0 {
            return Err(SubmitError::Cancelled);
        }
        if !self.fallback_to_direct {
            return Err(SubmitError::BundleNotAccepted {
                attempts: report.attempts,
            });
        }

        // Same signed transaction, so it can land at most once
        tracing::warn!(
            "Bundle not accepted after {} attempts, falling back to direct submission",
            report.attempts
        );
        self.stats.record_fallback();
        self.submit_direct(transaction).await
    }

    /// Send through the gateway and require confirmation
    pub async fn submit_direct(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, SubmitError> {
        let reference = self
            .cache
            .get_or_fetch()
            .await
            .map_err(SubmitError::NoBlockhash)?;

        let outcome = self.gateway.submit(transaction, &reference).await?;
        outcome
            .confirmed()
            .ok_or(SubmitError::NotConfirmed(outcome))
    }
}
