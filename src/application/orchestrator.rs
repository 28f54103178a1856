//! Swarm Orchestrator
//!
//! Wires the components for one run: starts the blockhash refresher,
//! resolves the market, distributes capital on first run (or imports the
//! roster), then runs one trading task per wallet until they all stop.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use solana_sdk::signature::{Keypair, Signer};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::blockhash_cache::BlockhashCache;
use super::bundler::{BundleConfig, BundleCoordinator};
use super::distributor::{CapitalDistributor, DistributionConfig, DistributionError};
use super::gateway::ExecutionGateway;
use super::submitter::{ExecutionMode, Submitter};
use super::trading_loop::{TradingConfig, TradingLoop, WalletSummary};
use crate::domain::stats::{RunStats, StatsSnapshot};
use crate::domain::wallet::lamports_to_sol;
use crate::ports::block_builder::BlockBuilder;
use crate::ports::network::NetworkClient;
use crate::ports::notify::{notify_detached, NotificationSink};
use crate::ports::roster::{RosterError, RosterStore};
use crate::ports::swap::{MarketInfo, MarketResolver, SwapBuildError, SwapBuilder};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("No market found for {0}")]
    MarketUnresolved(String),
    #[error("Market lookup failed: {0}")]
    Market(#[from] SwapBuildError),
    #[error("Direct routing requires a market resolver")]
    MissingResolver,
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Distribution(#[from] DistributionError),
}

/// How swaps are priced and routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Routing {
    /// Jupiter quote and swap
    #[default]
    Aggregator,
    /// Raydium pool resolved at startup
    Direct,
}

impl std::fmt::Display for Routing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Routing::Aggregator => write!(f, "aggregator"),
            Routing::Direct => write!(f, "direct"),
        }
    }
}

/// Everything tunable about one run
#[derive(Debug, Clone, PartialEq)]
pub struct SwarmSettings {
    pub routing: Routing,
    pub mode: ExecutionMode,
    pub fallback_to_direct: bool,
    pub blockhash_refresh: Duration,
    pub confirm_poll: Duration,
    pub distribution: DistributionConfig,
    pub trading: TradingConfig,
    pub bundle: BundleConfig,
}

/// External collaborators for one run
#[derive(Clone)]
pub struct SwarmDeps {
    pub network: Arc<dyn NetworkClient>,
    pub block_builder: Arc<dyn BlockBuilder>,
    pub swap: Arc<dyn SwapBuilder>,
    pub resolver: Option<Arc<dyn MarketResolver>>,
    pub roster: Arc<dyn RosterStore>,
    pub notifier: Arc<dyn NotificationSink>,
}

/// What a finished run looked like
#[derive(Debug, Clone)]
pub struct RunReport {
    pub distributed: bool,
    pub wallets: Vec<WalletSummary>,
    pub stats: StatsSnapshot,
}

pub struct SwarmOrchestrator {
    settings: SwarmSettings,
    deps: SwarmDeps,
    operator: Arc<Keypair>,
    stats: Arc<RunStats>,
    cancel: CancellationToken,
}

impl SwarmOrchestrator {
    pub fn new(settings: SwarmSettings, deps: SwarmDeps, operator: Arc<Keypair>) -> Self {
        Self {
            settings,
            deps,
            operator,
            stats: Arc::new(RunStats::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Token observed by every task of this run
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Request a cooperative shutdown
    pub fn stop(&self) {
        self.cancel.cancel();
        tracing::info!("Stop signal sent to orchestrator");
    }

    /// Run until every wallet task has stopped
    pub async fn run(&self) -> Result<RunReport, OrchestratorError> {
        let operator = self.operator.pubkey();
        tracing::info!(
            "Starting swarm - operator: {}, mint: {}, routing: {} ({}), mode: {}",
            operator,
            self.settings.trading.mint,
            self.settings.routing,
            self.deps.swap.route_name(),
            self.settings.mode
        );

        let cache = BlockhashCache::new(self.deps.network.clone(), self.settings.blockhash_refresh);
        let refresher_cancel = self.cancel.child_token();
        let refresher = cache.spawn(refresher_cancel.clone());

        let result = self.run_with_cache(&cache).await;

        refresher_cancel.cancel();
        if let Err(e) = refresher.await {
            tracing::warn!("Blockhash refresher ended abnormally: {}", e);
        }

        tracing::info!("Swarm stopped: {}", self.stats.snapshot());
        result
    }

    async fn run_with_cache(&self, cache: &BlockhashCache) -> Result<RunReport, OrchestratorError> {
        let operator = self.operator.pubkey();
        let operator_balance = match self.deps.network.balance(&operator).await {
            Ok(lamports) => {
                let sol = lamports_to_sol(lamports);
                tracing::info!("Operator balance: {:.6} SOL", sol);
                notify_detached(
                    &self.deps.notifier,
                    format!(
                        "🚀 <b>Volume swarm started</b>\nOperator: <code>{}</code>\nBalance: {:.3} SOL",
                        operator, sol
                    ),
                );
                Some(lamports)
            }
            Err(e) => {
                tracing::warn!("Operator balance unavailable: {}", e);
                None
            }
        };

        let market = self.resolve_market().await?;

        let gateway = ExecutionGateway::new(self.deps.network.clone())
            .with_poll_interval(self.settings.confirm_poll);
        let submitter = self.submitter(gateway.clone(), cache.clone());

        let existing = self.deps.roster.read_all().await?;
        let distributed = existing.is_empty();
        let records = if distributed {
            let distributor = CapitalDistributor::new(
                gateway,
                cache.clone(),
                self.deps.roster.clone(),
                self.settings.distribution.clone(),
            );

            if let Some(balance) = operator_balance {
                if let Some(short) = distributor
                    .config()
                    .operator_shortfall(balance, self.settings.trading.buy_policy.lower_bound())
                {
                    tracing::error!(
                        "Operator balance is {:.6} SOL short of funding every wallet",
                        short
                    );
                }
            }

            distributor.distribute(&self.operator, &self.cancel).await?
        } else {
            tracing::info!("Importing {} existing wallets", existing.len());
            existing
        };

        let trading_config = TradingConfig {
            market,
            active_wallets: records.len(),
            ..self.settings.trading.clone()
        };
        let trading = TradingLoop::new(
            self.deps.swap.clone(),
            self.deps.network.clone(),
            submitter,
            self.deps.roster.clone(),
            self.deps.notifier.clone(),
            self.stats.clone(),
            trading_config,
        );

        let mut tasks = JoinSet::new();
        for (index, record) in records.into_iter().enumerate() {
            let trading = trading.clone();
            let cancel = self.cancel.clone();
            tasks.spawn(async move { trading.run_wallet(index, record, cancel).await });
        }

        let mut wallets = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(summary) => wallets.push(summary),
                Err(e) => tracing::error!("Wallet task aborted: {}", e),
            }
        }

        Ok(RunReport {
            distributed,
            wallets,
            stats: self.stats.snapshot(),
        })
    }

    async fn resolve_market(&self) -> Result<Option<MarketInfo>, OrchestratorError> {
        if self.settings.routing == Routing::Aggregator {
            return Ok(None);
        }

        let resolver = self
            .deps
            .resolver
            .as_ref()
            .ok_or(OrchestratorError::MissingResolver)?;
        let mint = self.settings.trading.mint;

        match resolver.resolve(&mint).await? {
            Some(market) => {
                tracing::info!("Using pool {} for {}", market.pool_id, mint);
                Ok(Some(market))
            }
            None => Err(OrchestratorError::MarketUnresolved(mint.to_string())),
        }
    }

    fn submitter(&self, gateway: ExecutionGateway, cache: BlockhashCache) -> Submitter {
        match self.settings.mode {
            ExecutionMode::Legacy => Submitter::legacy(gateway, cache, self.stats.clone()),
            ExecutionMode::Bundle => {
                let bundler = BundleCoordinator::new(
                    self.deps.block_builder.clone(),
                    cache.clone(),
                    self.settings.bundle.clone(),
                    self.stats.clone(),
                );
                Submitter::bundled(
                    bundler,
                    gateway,
                    cache,
                    self.settings.fallback_to_direct,
                    self.stats.clone(),
                )
            }
        }
    }
}
