//! Capital Distributor
//!
//! Funds a batch of freshly generated wallets from the operator in a single
//! transaction, then persists the roster. Either every wallet is funded or
//! none is; there is no partial roster.

use std::sync::Arc;

use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    hash::Hash,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    system_instruction,
    transaction::VersionedTransaction,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::blockhash_cache::BlockhashCache;
use super::gateway::{ExecutionGateway, GatewayError};
use crate::domain::retry::{retry, RetryOutcome, RetryPolicy};
use crate::domain::wallet::{lamports_to_sol, sol_to_lamports, WalletRecord};
use crate::ports::network::NetworkError;
use crate::ports::roster::{RosterError, RosterStore};

/// Hard ceiling on managed wallets
pub const MAX_WALLETS: usize = 10;

pub const DEFAULT_DISTRIBUTION_ATTEMPTS: u32 = 4;
pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 100_000;
/// Micro-lamports per compute unit
pub const DEFAULT_COMPUTE_UNIT_PRICE: u64 = 250_000;

#[derive(Debug, Error)]
pub enum DistributionError {
    #[error("No wallets to fund")]
    NoWallets,
    #[error("Failed to build distribution transaction: {0}")]
    Build(String),
    #[error("Reference hash unavailable: {0}")]
    Network(NetworkError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("Distribution transaction not confirmed: {0}")]
    NotConfirmed(String),
    #[error("Distribution failed after {attempts} attempts")]
    Exhausted { attempts: u32 },
    #[error("Distribution cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
    #[error("Wallets funded by {signature} but the roster could not be saved: {source}")]
    Persist {
        signature: Signature,
        source: RosterError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionConfig {
    /// Requested wallets, capped at `MAX_WALLETS`
    pub wallet_count: usize,
    /// Configured SOL per wallet
    pub amount_sol: f64,
    /// SOL kept back for fees
    pub fee_floor_sol: f64,
    /// Largest single buy
    pub buy_upper_sol: f64,
    pub max_attempts: u32,
    pub compute_unit_limit: u32,
    pub compute_unit_price: u64,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            wallet_count: 3,
            amount_sol: 0.02,
            fee_floor_sol: 0.01,
            buy_upper_sol: 0.002,
            max_attempts: DEFAULT_DISTRIBUTION_ATTEMPTS,
            compute_unit_limit: DEFAULT_COMPUTE_UNIT_LIMIT,
            compute_unit_price: DEFAULT_COMPUTE_UNIT_PRICE,
        }
    }
}

impl DistributionConfig {
    pub fn effective_wallet_count(&self) -> usize {
        self.wallet_count.min(MAX_WALLETS)
    }

    /// SOL sent to each wallet: at least the fee floor plus one maximal buy
    pub fn funding_sol(&self) -> f64 {
        self.amount_sol.max(self.fee_floor_sol + self.buy_upper_sol)
    }

    /// Balance recorded for a freshly funded wallet
    pub fn recorded_balance_sol(&self) -> f64 {
        self.funding_sol() - self.fee_floor_sol
    }

    /// SOL missing from `operator_lamports` to give every wallet one minimal
    /// buy plus the fee floor, if any
    pub fn operator_shortfall(&self, operator_lamports: u64, buy_lower_sol: f64) -> Option<f64> {
        let required = (buy_lower_sol + self.fee_floor_sol) * self.effective_wallet_count() as f64;
        let available = lamports_to_sol(operator_lamports);
        (available < required).then(|| required - available)
    }
}

/// Compute budget header followed by one transfer per recipient
pub fn build_distribution_transaction(
    operator: &Keypair,
    recipients: &[Pubkey],
    lamports_each: u64,
    config: &DistributionConfig,
    blockhash: Hash,
) -> Result<VersionedTransaction, DistributionError> {
    let mut instructions = Vec::with_capacity(recipients.len() + 2);
    instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(config.compute_unit_limit));
    instructions.push(ComputeBudgetInstruction::set_compute_unit_price(config.compute_unit_price));
    instructions.extend(
        recipients
            .iter()
            .map(|to| system_instruction::transfer(&operator.pubkey(), to, lamports_each)),
    );

    let message = v0::Message::try_compile(&operator.pubkey(), &instructions, &[], blockhash)
        .map_err(|e| DistributionError::Build(e.to_string()))?;
    VersionedTransaction::try_new(VersionedMessage::V0(message), &[operator])
        .map_err(|e| DistributionError::Build(e.to_string()))
}

pub struct CapitalDistributor {
    gateway: ExecutionGateway,
    cache: BlockhashCache,
    roster: Arc<dyn RosterStore>,
    config: DistributionConfig,
}

impl CapitalDistributor {
    pub fn new(
        gateway: ExecutionGateway,
        cache: BlockhashCache,
        roster: Arc<dyn RosterStore>,
        config: DistributionConfig,
    ) -> Self {
        Self {
            gateway,
            cache,
            roster,
            config,
        }
    }

    pub fn config(&self) -> &DistributionConfig {
        &self.config
    }

    /// Generate, fund and persist the wallet roster
    pub async fn distribute(
        &self,
        operator: &Keypair,
        cancel: &CancellationToken,
    ) -> Result<Vec<WalletRecord>, DistributionError> {
        let count = self.config.effective_wallet_count();
        if count == 0 {
            return Err(DistributionError::NoWallets);
        }
        if self.config.wallet_count > MAX_WALLETS {
            tracing::warn!(
                "Requested {} wallets, capped at {}",
                self.config.wallet_count,
                MAX_WALLETS
            );
        }

        let wallets: Vec<Keypair> = (0..count).map(|_| Keypair::new()).collect();
        let recipients: Vec<Pubkey> = wallets.iter().map(|k| k.pubkey()).collect();
        let funding = self.config.funding_sol();
        let lamports = sol_to_lamports(funding);

        tracing::info!(
            "Distributing {:.6} SOL to each of {} wallets from {}",
            funding,
            count,
            operator.pubkey()
        );

        let policy = RetryPolicy::immediate(self.config.max_attempts);
        let recipients = recipients.as_slice();
        let outcome = retry(&policy, cancel, "Capital distribution", move |_| {
            self.attempt(operator, recipients, lamports)
        })
        .await;

        let signature = match outcome {
            RetryOutcome::Success { value, attempts } => {
                tracing::info!("Distribution confirmed on attempt {}: {}", attempts, value);
                value
            }
            RetryOutcome::Exhausted { attempts } => {
                return Err(DistributionError::Exhausted { attempts })
            }
            RetryOutcome::Cancelled { attempts } => {
                return Err(DistributionError::Cancelled { attempts })
            }
        };

        let balance = self.config.recorded_balance_sol();
        let records: Vec<WalletRecord> = wallets
            .iter()
            .map(|k| WalletRecord::new(k, balance))
            .collect();

        self.roster
            .write_all(&records)
            .await
            .map_err(|source| DistributionError::Persist { signature, source })?;

        for record in &records {
            tracing::info!("Funded wallet {}", record.public_address);
        }
        Ok(records)
    }

    async fn attempt(
        &self,
        operator: &Keypair,
        recipients: &[Pubkey],
        lamports: u64,
    ) -> Result<Signature, DistributionError> {
        // Fresh reference hash for every attempt
        let reference = self
            .cache
            .fetch_fresh()
            .await
            .map_err(DistributionError::Network)?;

        let tx = build_distribution_transaction(
            operator,
            recipients,
            lamports,
            &self.config,
            reference.hash,
        )?;

        let outcome = self.gateway.submit(&tx, &reference).await?;
        outcome
            .confirmed()
            .ok_or_else(|| DistributionError::NotConfirmed(outcome.to_string()))
    }
}
