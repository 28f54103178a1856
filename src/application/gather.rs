//! Gather
//!
//! Sweeps every roster wallet back to the operator: sells any remaining
//! token balance, closes the token account to reclaim its rent, and sends
//! the remaining SOL home. Wallets are handled one at a time and a failure
//! on one never stops the sweep.

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    system_instruction,
    transaction::VersionedTransaction,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::submitter::{SubmitError, Submitter};
use crate::domain::retry::sleep_or_cancel;
use crate::domain::wallet::{associated_token_address, WalletError, WalletRecord, WalletUpdate};
use crate::ports::network::{NetworkClient, NetworkError};
use crate::ports::roster::{RosterError, RosterStore};
use crate::ports::swap::{MarketInfo, SwapBuildError, SwapBuilder};

/// Lamports left behind to pay the sweep fee
pub const DEFAULT_SWEEP_RESERVE_LAMPORTS: u64 = 5_000;

#[derive(Debug, Error)]
pub enum GatherError {
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Build(#[from] SwapBuildError),
    #[error("No sell transaction for remaining tokens")]
    NoSellRoute,
    #[error("Sell failed: {0}")]
    Sell(SubmitError),
    #[error("Sweep failed: {0}")]
    Sweep(SubmitError),
    #[error("Failed to build sweep transaction: {0}")]
    TxBuild(String),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error("Shutdown requested")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatherConfig {
    pub mint: Pubkey,
    pub market: Option<MarketInfo>,
    pub sweep_reserve_lamports: u64,
    /// Wait between the sell and the sweep
    pub settle_delay: Duration,
}

/// What happened to one wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatherResult {
    pub address: String,
    pub sold: Option<Signature>,
    pub swept: Option<Signature>,
    pub swept_lamports: u64,
}

pub struct Gatherer {
    network: Arc<dyn NetworkClient>,
    swap: Arc<dyn SwapBuilder>,
    submitter: Submitter,
    roster: Arc<dyn RosterStore>,
    config: GatherConfig,
}

impl Gatherer {
    pub fn new(
        network: Arc<dyn NetworkClient>,
        swap: Arc<dyn SwapBuilder>,
        submitter: Submitter,
        roster: Arc<dyn RosterStore>,
        config: GatherConfig,
    ) -> Self {
        Self {
            network,
            swap,
            submitter,
            roster,
            config,
        }
    }

    /// Sweep every roster wallet to `operator`; returns the wallets that succeeded
    pub async fn gather(
        &self,
        operator: &Pubkey,
        cancel: &CancellationToken,
    ) -> Result<Vec<GatherResult>, RosterError> {
        let records = self.roster.read_all().await?;
        if records.is_empty() {
            tracing::info!("No wallets to gather");
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(records.len());
        for record in &records {
            if cancel.is_cancelled() {
                tracing::info!("Gather interrupted");
                break;
            }

            match self.gather_wallet(record, operator, cancel).await {
                Ok(result) => {
                    tracing::info!(
                        "Gathered {} lamports from {}",
                        result.swept_lamports,
                        result.address
                    );
                    results.push(result);
                }
                Err(e) => tracing::error!("Failed to gather wallet {}: {}", record.public_address, e),
            }
        }

        tracing::info!("Gathered {}/{} wallets", results.len(), records.len());
        Ok(results)
    }

    async fn gather_wallet(
        &self,
        record: &WalletRecord,
        operator: &Pubkey,
        cancel: &CancellationToken,
    ) -> Result<GatherResult, GatherError> {
        let wallet = record.keypair()?;
        let owner = wallet.pubkey();
        let mint = self.config.mint;

        let tokens = self.network.token_balance(&owner, &mint).await?;
        let mut sold = None;

        if let Some(amount) = tokens.filter(|amount| *amount > 0) {
            tracing::info!("Selling {} tokens from {}", amount, record.public_address);
            let tx = self
                .swap
                .build_sell(&wallet, &mint, amount, self.config.market)
                .await?
                .ok_or(GatherError::NoSellRoute)?;

            let signature = self
                .submitter
                .submit_swap(&tx, &wallet, cancel)
                .await
                .map_err(GatherError::Sell)?;
            sold = Some(signature);

            if !sleep_or_cancel(self.config.settle_delay, cancel).await {
                return Err(GatherError::Cancelled);
            }
        }

        let balance = self.network.balance(&owner).await?;
        let swept_lamports = balance.saturating_sub(self.config.sweep_reserve_lamports);

        let mut instructions = Vec::with_capacity(2);
        if tokens.is_some() {
            instructions.push(close_token_account(&owner, &mint, operator)?);
        }
        if swept_lamports > 0 {
            instructions.push(system_instruction::transfer(&owner, operator, swept_lamports));
        }

        let mut swept = None;
        if !instructions.is_empty() {
            let reference = self.network.latest_blockhash().await?;
            let tx = sweep_transaction(&wallet, &instructions, reference.hash)?;

            // Confirm against the hash the sweep was signed with
            let outcome = self
                .submitter
                .gateway()
                .submit(&tx, &reference)
                .await
                .map_err(|e| GatherError::Sweep(SubmitError::Gateway(e)))?;
            let signature = outcome
                .confirmed()
                .ok_or(GatherError::Sweep(SubmitError::NotConfirmed(outcome)))?;
            swept = Some(signature);
        }

        self.roster
            .upsert(&WalletUpdate::new(&record.public_address).with_balance(0.0))
            .await?;

        Ok(GatherResult {
            address: record.public_address.clone(),
            sold,
            swept,
            swept_lamports,
        })
    }
}

/// Signed sweep of `instructions` paid by `wallet`
fn sweep_transaction(
    wallet: &Keypair,
    instructions: &[Instruction],
    blockhash: Hash,
) -> Result<VersionedTransaction, GatherError> {
    let message = v0::Message::try_compile(&wallet.pubkey(), instructions, &[], blockhash)
        .map_err(|e| GatherError::TxBuild(e.to_string()))?;
    VersionedTransaction::try_new(VersionedMessage::V0(message), &[wallet])
        .map_err(|e| GatherError::TxBuild(e.to_string()))
}

/// Close `owner`'s token account for `mint`, sending its rent to `destination`
fn close_token_account(
    owner: &Pubkey,
    mint: &Pubkey,
    destination: &Pubkey,
) -> Result<Instruction, GatherError> {
    let account = associated_token_address(owner, mint);
    spl_token::instruction::close_account(&spl_token::id(), &account, destination, owner, &[])
        .map_err(|e| GatherError::TxBuild(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::blockhash_cache::{BlockhashCache, DEFAULT_REFRESH_INTERVAL};
    use crate::application::gateway::ExecutionGateway;
    use crate::domain::stats::RunStats;
    use crate::ports::mocks::{MemoryRoster, MockNetwork, ScriptedSwapBuilder, SwapSide};

    fn gatherer(network: &MockNetwork, swap: &ScriptedSwapBuilder, roster: &MemoryRoster, mint: Pubkey) -> Gatherer {
        let network: Arc<MockNetwork> = Arc::new(network.clone());
        let submitter = Submitter::legacy(
            ExecutionGateway::new(network.clone()),
            BlockhashCache::new(network.clone(), DEFAULT_REFRESH_INTERVAL),
            Arc::new(RunStats::new()),
        );
        Gatherer::new(
            network,
            Arc::new(swap.clone()),
            submitter,
            Arc::new(roster.clone()),
            GatherConfig {
                mint,
                market: None,
                sweep_reserve_lamports: DEFAULT_SWEEP_RESERVE_LAMPORTS,
                settle_delay: Duration::from_millis(1_000),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_sells_closes_and_sweeps() {
        let wallet = Keypair::new();
        let operator = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let network = MockNetwork::new()
            .with_balance(wallet.pubkey(), 20_000_000)
            .with_token_balance(wallet.pubkey(), mint, 777);
        let roster = MemoryRoster::new().with_records(vec![WalletRecord::new(&wallet, 0.02)]);
        let swap = ScriptedSwapBuilder::new();

        let results = gatherer(&network, &swap, &roster, mint)
            .gather(&operator, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].sold.is_some());
        assert_eq!(results[0].swept_lamports, 20_000_000 - DEFAULT_SWEEP_RESERVE_LAMPORTS);
        assert_eq!(swap.calls_for(SwapSide::Sell)[0].amount, 777);

        // Sell, then close + transfer in one transaction
        let sent = network.sent_transactions();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].message.instructions().len(), 2);
        assert!(sent[1].message.static_account_keys().contains(&operator));

        assert_eq!(roster.records()[0].sol_balance, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_token_account_only_sweeps_sol() {
        let wallet = Keypair::new();
        let mint = Pubkey::new_unique();
        let network = MockNetwork::new().with_balance(wallet.pubkey(), 1_000_000);
        let roster = MemoryRoster::new().with_records(vec![WalletRecord::new(&wallet, 0.001)]);
        let swap = ScriptedSwapBuilder::new();

        let results = gatherer(&network, &swap, &roster, mint)
            .gather(&Pubkey::new_unique(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(results[0].sold.is_none());
        assert!(swap.calls().is_empty());
        let sent = network.sent_transactions();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message.instructions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_wallet_does_not_stop_sweep() {
        let broken = Keypair::new();
        let healthy = Keypair::new();
        let mint = Pubkey::new_unique();
        let network = MockNetwork::new()
            .with_balance(healthy.pubkey(), 1_000_000)
            .with_token_balance(broken.pubkey(), mint, 10);
        let roster = MemoryRoster::new().with_records(vec![
            WalletRecord::new(&broken, 0.01),
            WalletRecord::new(&healthy, 0.01),
        ]);
        // The broken wallet has tokens but no sell route
        let swap = ScriptedSwapBuilder::new().with_sell_script(vec![false]);

        let results = gatherer(&network, &swap, &roster, mint)
            .gather(&Pubkey::new_unique(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].address, healthy.pubkey().to_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_roster() {
        let network = MockNetwork::new();
        let swap = ScriptedSwapBuilder::new();
        let roster = MemoryRoster::new();

        let results = gatherer(&network, &swap, &roster, Pubkey::new_unique())
            .gather(&Pubkey::new_unique(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(results.is_empty());
        assert!(network.sent_transactions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_confirms_against_its_own_reference() {
        let wallet = Keypair::new();
        let network = MockNetwork::new().with_balance(wallet.pubkey(), 1_000_000);
        let roster = MemoryRoster::new().with_records(vec![WalletRecord::new(&wallet, 0.001)]);

        let results = gatherer(&network, &ScriptedSwapBuilder::new(), &roster, Pubkey::new_unique())
            .gather(&Pubkey::new_unique(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(results[0].swept.is_some());
        // The hash the sweep was signed with is the only one fetched
        assert_eq!(network.blockhash_calls(), 1);
    }
}
