//! Trading Loop
//!
//! One task per funded wallet. Each task repeats buy, settle, sell, idle
//! until a fatal condition for that wallet, a cycle limit, or shutdown.
//! Roster updates happen only after a settled action.

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::submitter::{SubmitError, Submitter};
use crate::domain::cycle::{BuyAmountPolicy, CyclePhase, Pacing};
use crate::domain::retry::{retry, sleep_or_cancel, RetryOutcome, RetryPolicy};
use crate::domain::stats::RunStats;
use crate::domain::wallet::{explorer_ref, lamports_to_sol, sol_to_lamports, WalletRecord, WalletUpdate};
use crate::ports::network::{NetworkClient, NetworkError};
use crate::ports::notify::{notify_detached, NotificationSink};
use crate::ports::roster::RosterStore;
use crate::ports::swap::{MarketInfo, SwapBuildError, SwapBuilder};

/// Retries after the first attempt for each buy or sell
pub const DEFAULT_ACTION_RETRIES: u32 = 10;
pub const DEFAULT_ACTION_BACKOFF: Duration = Duration::from_millis(1_000);

#[derive(Debug, Clone, PartialEq)]
pub struct TradingConfig {
    pub mint: Pubkey,
    /// Resolved market for direct routing
    pub market: Option<MarketInfo>,
    pub buy_policy: BuyAmountPolicy,
    /// A wallet below this balance stops trading
    pub fee_floor_sol: f64,
    pub low_balance_alert_sol: Option<f64>,
    pub retry: RetryPolicy,
    pub pacing: Pacing,
    /// Wallets trading concurrently; scales the idle delay
    pub active_wallets: usize,
    pub max_cycles: Option<u64>,
}

impl TradingConfig {
    pub fn new(mint: Pubkey) -> Self {
        Self {
            mint,
            market: None,
            buy_policy: BuyAmountPolicy::Random {
                lower: 0.001,
                upper: 0.002,
            },
            fee_floor_sol: 0.01,
            low_balance_alert_sol: None,
            retry: RetryPolicy::with_retries(DEFAULT_ACTION_RETRIES, DEFAULT_ACTION_BACKOFF),
            pacing: Pacing {
                interval_min_ms: 2_000,
                interval_max_ms: 4_000,
                cycle_delay_ms: 1_000,
                settle_delay_ms: 1_000,
            },
            active_wallets: 1,
            max_cycles: None,
        }
    }

    fn limit_reached(&self, cycles: u64) -> bool {
        self.max_cycles.is_some_and(|max| cycles >= max)
    }
}

/// Why a wallet's loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum WalletExit {
    BalanceBelowFloor { balance_sol: f64 },
    BalanceUnavailable { attempts: u32 },
    BuyExhausted { attempts: u32 },
    SellExhausted { attempts: u32 },
    InvalidKey(String),
    CycleLimit,
    Cancelled,
}

impl WalletExit {
    /// The wallet stopped on its own failure rather than by request
    pub fn is_fatal(&self) -> bool {
        !matches!(self, WalletExit::CycleLimit | WalletExit::Cancelled)
    }
}

impl std::fmt::Display for WalletExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletExit::BalanceBelowFloor { balance_sol } => {
                write!(f, "balance {:.6} SOL below fee floor", balance_sol)
            }
            WalletExit::BalanceUnavailable { attempts } => {
                write!(f, "balance query failed after {} attempts", attempts)
            }
            WalletExit::BuyExhausted { attempts } => write!(f, "buy failed after {} attempts", attempts),
            WalletExit::SellExhausted { attempts } => {
                write!(f, "sell failed after {} attempts", attempts)
            }
            WalletExit::InvalidKey(e) => write!(f, "invalid key: {}", e),
            WalletExit::CycleLimit => write!(f, "cycle limit reached"),
            WalletExit::Cancelled => write!(f, "shutdown requested"),
        }
    }
}

/// Final state of one wallet task
#[derive(Debug, Clone, PartialEq)]
pub struct WalletSummary {
    pub address: String,
    pub cycles: u64,
    /// Phase the loop was in when it stopped
    pub phase: CyclePhase,
    pub exit: WalletExit,
}

#[derive(Debug, Error)]
enum ActionError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Build(#[from] SwapBuildError),
    #[error("swap builder returned no transaction")]
    NoTransaction,
    #[error("no token balance to sell")]
    NoTokens,
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

#[derive(Clone)]
pub struct TradingLoop {
    swap: Arc<dyn SwapBuilder>,
    network: Arc<dyn NetworkClient>,
    submitter: Submitter,
    roster: Arc<dyn RosterStore>,
    notifier: Arc<dyn NotificationSink>,
    stats: Arc<RunStats>,
    config: TradingConfig,
}

impl TradingLoop {
    pub fn new(
        swap: Arc<dyn SwapBuilder>,
        network: Arc<dyn NetworkClient>,
        submitter: Submitter,
        roster: Arc<dyn RosterStore>,
        notifier: Arc<dyn NotificationSink>,
        stats: Arc<RunStats>,
        config: TradingConfig,
    ) -> Self {
        Self {
            swap,
            network,
            submitter,
            roster,
            notifier,
            stats,
            config,
        }
    }

    pub fn config(&self) -> &TradingConfig {
        &self.config
    }

    /// Run the buy/sell cycle for one wallet until it stops
    pub async fn run_wallet(
        &self,
        index: usize,
        record: WalletRecord,
        cancel: CancellationToken,
    ) -> WalletSummary {
        let address = record.public_address.clone();
        let wallet = match record.keypair() {
            Ok(wallet) => wallet,
            Err(e) => {
                return self.finish(address, 0, CyclePhase::Idle, WalletExit::InvalidKey(e.to_string()))
            }
        };

        if !sleep_or_cancel(self.config.pacing.start_stagger(index), &cancel).await {
            return self.finish(address, 0, CyclePhase::Idle, WalletExit::Cancelled);
        }
        tracing::info!("Wallet {} ({}) trading", index, address);

        let mut cycles = 0u64;
        let mut phase = CyclePhase::Idle;

        while !self.config.limit_reached(cycles) {
            phase = phase.advance();
            if let Err(exit) = self.buy_phase(&wallet, &address, &cancel).await {
                return self.finish(address, cycles, phase, exit);
            }

            phase = phase.advance();
            if !sleep_or_cancel(self.config.pacing.settle_delay(), &cancel).await {
                return self.finish(address, cycles, phase, WalletExit::Cancelled);
            }

            phase = phase.advance();
            if let Err(exit) = self.sell_phase(&wallet, &address, &cancel).await {
                return self.finish(address, cycles, phase, exit);
            }

            phase = phase.advance();
            cycles += 1;
            if self.config.limit_reached(cycles) {
                break;
            }

            let idle = {
                let mut rng = rand::thread_rng();
                self.config.pacing.idle_delay(self.config.active_wallets, &mut rng)
            };
            if !sleep_or_cancel(idle, &cancel).await {
                return self.finish(address, cycles, phase, WalletExit::Cancelled);
            }
        }

        self.finish(address, cycles, phase, WalletExit::CycleLimit)
    }

    async fn buy_phase(
        &self,
        wallet: &Keypair,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<(), WalletExit> {
        let amount_sol = {
            let mut rng = rand::thread_rng();
            self.config.buy_policy.sample(&mut rng)
        };

        let balance_sol = self.current_balance(wallet, address, cancel).await?;

        if let Some(threshold) = self.config.low_balance_alert_sol {
            if balance_sol < threshold {
                notify_detached(
                    &self.notifier,
                    format!(
                        "⚠️ <b>WARNING</b>\nWallet: <code>{}</code>\nBalance: {:.3} SOL is below threshold {} SOL. Please top up.",
                        address, balance_sol, threshold
                    ),
                );
            }
        }

        if balance_sol < self.config.fee_floor_sol {
            return Err(WalletExit::BalanceBelowFloor { balance_sol });
        }

        let lamports = sol_to_lamports(amount_sol);
        let context = format!("Buy {:.6} SOL for {}", amount_sol, address);
        let outcome = retry(&self.config.retry, cancel, &context, move |_| {
            self.buy(wallet, lamports, cancel)
        })
        .await;

        let signature = match outcome {
            RetryOutcome::Success { value, .. } => value,
            RetryOutcome::Exhausted { attempts } => return Err(WalletExit::BuyExhausted { attempts }),
            RetryOutcome::Cancelled { .. } => return Err(WalletExit::Cancelled),
        };

        let update = WalletUpdate::new(address)
            .with_balance(balance_sol - amount_sol)
            .with_buy(explorer_ref(&signature));
        self.persist(&update).await;

        let buys = self.stats.record_buy();
        tracing::info!("Bought {:.6} SOL from {} ({}), total buys: {}", amount_sol, address, signature, buys);
        Ok(())
    }

    async fn sell_phase(
        &self,
        wallet: &Keypair,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<(), WalletExit> {
        let context = format!("Sell for {}", address);
        let outcome = retry(&self.config.retry, cancel, &context, move |_| {
            self.sell(wallet, cancel)
        })
        .await;

        let signature = match outcome {
            RetryOutcome::Success { value, .. } => value,
            RetryOutcome::Exhausted { attempts } => {
                return Err(WalletExit::SellExhausted { attempts })
            }
            RetryOutcome::Cancelled { .. } => return Err(WalletExit::Cancelled),
        };

        let mut update = WalletUpdate::new(address).with_sell(explorer_ref(&signature));
        match self.network.balance(&wallet.pubkey()).await {
            Ok(lamports) => update = update.with_balance(lamports_to_sol(lamports)),
            Err(e) => tracing::warn!("Balance refresh after sell failed for {}: {}", address, e),
        }
        self.persist(&update).await;

        let sells = self.stats.record_sell();
        tracing::info!("Sold from {} ({}), total sells: {}", address, signature, sells);
        Ok(())
    }

    async fn current_balance(
        &self,
        wallet: &Keypair,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<f64, WalletExit> {
        let pubkey = wallet.pubkey();
        let network = &self.network;
        let context = format!("Balance query for {}", address);
        let outcome = retry(&self.config.retry, cancel, &context, move |_| {
            let pubkey = pubkey;
            async move { network.balance(&pubkey).await }
        })
        .await;

        match outcome {
            RetryOutcome::Success { value, .. } => Ok(lamports_to_sol(value)),
            RetryOutcome::Exhausted { attempts } => Err(WalletExit::BalanceUnavailable { attempts }),
            RetryOutcome::Cancelled { .. } => Err(WalletExit::Cancelled),
        }
    }

    async fn buy(
        &self,
        wallet: &Keypair,
        lamports: u64,
        cancel: &CancellationToken,
    ) -> Result<Signature, ActionError> {
        let tx = self
            .swap
            .build_buy(wallet, &self.config.mint, lamports, self.config.market)
            .await?
            .ok_or(ActionError::NoTransaction)?;

        Ok(self.submitter.submit_swap(&tx, wallet, cancel).await?)
    }

    async fn sell(&self, wallet: &Keypair, cancel: &CancellationToken) -> Result<Signature, ActionError> {
        // Sell what actually settled, not what was spent
        let amount = self
            .network
            .token_balance(&wallet.pubkey(), &self.config.mint)
            .await?
            .filter(|amount| *amount > 0)
            .ok_or(ActionError::NoTokens)?;

        let tx = self
            .swap
            .build_sell(wallet, &self.config.mint, amount, self.config.market)
            .await?
            .ok_or(ActionError::NoTransaction)?;

        Ok(self.submitter.submit_swap(&tx, wallet, cancel).await?)
    }

    async fn persist(&self, update: &WalletUpdate) {
        if let Err(e) = self.roster.upsert(update).await {
            tracing::warn!("Roster update for {} failed: {}", update.public_address, e);
        }
    }

    fn finish(&self, address: String, cycles: u64, phase: CyclePhase, exit: WalletExit) -> WalletSummary {
        if exit.is_fatal() {
            tracing::error!(
                "Wallet {} stopped in phase {} after {} cycles: {}",
                address,
                phase,
                cycles,
                exit
            );
            self.stats.record_failed_wallet();
            notify_detached(
                &self.notifier,
                format!("<b>Wallet stopped</b>\n<code>{}</code>\n{}", address, exit),
            );
            return WalletSummary {
                address,
                cycles,
                phase: phase.fail(),
                exit,
            };
        }

        tracing::info!("Wallet {} finished after {} cycles: {}", address, cycles, exit);
        WalletSummary {
            address,
            cycles,
            phase,
            exit,
        }
    }
}
