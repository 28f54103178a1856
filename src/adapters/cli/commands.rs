//! CLI Command Handlers
//!
//! Parses arguments, loads configuration, wires adapters to the
//! application layer and runs one of `run`, `status` or `gather`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use solana_sdk::signature::{Keypair, Signer};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::adapters::jito::JitoBundleClient;
use crate::adapters::jupiter::{JupiterClient, JupiterSwapBuilder};
use crate::adapters::raydium::{RaydiumClient, RaydiumSwapBuilder};
use crate::adapters::solana::{SolanaClient, WalletManager};
use crate::adapters::storage::JsonRosterStore;
use crate::adapters::telegram::TelegramSink;
use crate::application::{
    collect_status, BlockhashCache, BundleCoordinator, ExecutionGateway, ExecutionMode, Gatherer,
    Routing, Submitter, SwarmDeps, SwarmOrchestrator,
};
use crate::config::{load_config, Config};
use crate::domain::stats::RunStats;
use crate::domain::wallet::lamports_to_sol;
use crate::ports::block_builder::BlockBuilder;
use crate::ports::network::NetworkClient;
use crate::ports::notify::{NoopSink, NotificationSink};
use crate::ports::roster::RosterStore;
use crate::ports::swap::{MarketInfo, MarketResolver, SwapBuilder};

const DEFAULT_CONFIG: &str = "config/volume.toml";

/// Multi-wallet volume swarm for a single Solana market
#[derive(Parser, Debug)]
#[command(
    name = "volume-swarm",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Multi-wallet buy/sell volume swarm for a single Solana market"
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Distribute capital (first run) and start every wallet's trading loop
    Run(RunCmd),

    /// Show the roster with live balances
    Status(StatusCmd),

    /// Sell leftovers and sweep every wallet back to the operator
    Gather(GatherCmd),
}

#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

#[derive(Parser, Debug)]
pub struct StatusCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

#[derive(Parser, Debug)]
pub struct GatherCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

impl Command {
    fn config_path(&self) -> &PathBuf {
        match self {
            Command::Run(cmd) => &cmd.config,
            Command::Status(cmd) => &cmd.config,
            Command::Gather(cmd) => &cmd.config,
        }
    }
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    let path = app.command.config_path();
    let config = load_config(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    init_logging(app.verbose, app.debug, config.logging.level.as_deref())?;
    tracing::debug!("Config: {}", path.display());

    match app.command {
        Command::Run(_) => run_command(config).await,
        Command::Status(_) => status_command(config).await,
        Command::Gather(_) => gather_command(config).await,
    }
}

/// Level precedence: --debug, --verbose, RUST_LOG, config file, warn
fn init_logging(verbose: bool, debug: bool, configured: Option<&str>) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(configured.unwrap_or("warn")))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

/// PRIVATE_KEY (base58) first, then the configured keypair file
fn load_operator(config: &Config) -> Result<Keypair> {
    if let Ok(encoded) = std::env::var("PRIVATE_KEY") {
        if !encoded.trim().is_empty() {
            let wallet = WalletManager::from_base58(&encoded).context("PRIVATE_KEY is not a valid key")?;
            return Ok(wallet.into_keypair());
        }
    }

    let Some(path) = config.solana.expanded_keypair_path() else {
        bail!("No operator key: set PRIVATE_KEY or [solana] keypair_path");
    };
    let wallet = WalletManager::from_file(&path)
        .with_context(|| format!("Failed to load operator keypair from {}", path))?;
    Ok(wallet.into_keypair())
}

fn network(config: &Config) -> Arc<dyn NetworkClient> {
    Arc::new(SolanaClient::new(config.solana.get_rpc_url()))
}

fn roster(config: &Config) -> Arc<dyn RosterStore> {
    Arc::new(JsonRosterStore::new(&config.storage.roster_path))
}

fn notifier(config: &Config) -> Result<Arc<dyn NotificationSink>> {
    match config.alerts.telegram_credentials() {
        Some((token, chat)) => Ok(Arc::new(
            TelegramSink::new(token, chat).context("Failed to create Telegram client")?,
        )),
        None => Ok(Arc::new(NoopSink)),
    }
}

/// Swap builder for the configured routing, plus the resolver direct routing needs
fn swap_stack(config: &Config) -> Result<(Arc<dyn SwapBuilder>, Option<Arc<dyn MarketResolver>>)> {
    match config.market.routing {
        Routing::Aggregator => {
            let client = JupiterClient::with_config(config.jupiter_config())
                .context("Failed to create Jupiter client")?;
            Ok((Arc::new(JupiterSwapBuilder::new(client)), None))
        }
        Routing::Direct => {
            let client = RaydiumClient::new(config.raydium_config())
                .context("Failed to create Raydium client")?;
            let resolver: Arc<dyn MarketResolver> = Arc::new(client.clone());
            Ok((Arc::new(RaydiumSwapBuilder::new(client)), Some(resolver)))
        }
    }
}

fn jito(config: &Config) -> Result<JitoBundleClient> {
    JitoBundleClient::with_config(config.jito_config()).context("Failed to create Jito client")
}

/// Cancel `token` on Ctrl+C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Shutdown signal received, finishing in-flight work");
            token.cancel();
        }
    });
}

async fn run_command(config: Config) -> Result<()> {
    let operator = load_operator(&config)?;
    let settings = config.swarm_settings()?;
    let (swap, resolver) = swap_stack(&config)?;
    let jito = jito(&config)?;

    let deps = SwarmDeps {
        network: network(&config),
        block_builder: Arc::new(jito.clone()),
        swap,
        resolver,
        roster: roster(&config),
        notifier: notifier(&config)?,
    };

    let orchestrator = SwarmOrchestrator::new(settings, deps, Arc::new(operator));
    cancel_on_ctrl_c(orchestrator.cancel_token());

    let watcher_cancel = CancellationToken::new();
    let watcher = (config.execution.mode == ExecutionMode::Bundle)
        .then(|| jito.spawn_watcher(watcher_cancel.clone()));

    let result = orchestrator.run().await;

    watcher_cancel.cancel();
    if let Some(watcher) = watcher {
        watcher.await.ok();
    }

    let report = result.context("Swarm run failed")?;
    println!(
        "Run finished: {} wallets{}",
        report.wallets.len(),
        if report.distributed { " (freshly distributed)" } else { "" }
    );
    for wallet in &report.wallets {
        println!(
            "  {}  cycles: {:>4}  exit: {}",
            wallet.address, wallet.cycles, wallet.exit
        );
    }
    println!("  {}", report.stats);
    Ok(())
}

async fn status_command(config: Config) -> Result<()> {
    let roster = roster(&config);
    let network = network(&config);

    let statuses = collect_status(&roster, &network)
        .await
        .context("Failed to read roster")?;

    if statuses.is_empty() {
        println!("Roster {} is empty", config.storage.roster_path);
        return Ok(());
    }

    println!("{} wallets in {}", statuses.len(), config.storage.roster_path);
    for status in &statuses {
        let live = status
            .live_balance_sol
            .map(|sol| format!("{:.6}", sol))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "  {}  stored: {:.6} SOL  live: {} SOL",
            status.record.public_address, status.record.sol_balance, live
        );
        if let Some(buy) = &status.record.last_buy_ref {
            println!("    last buy:  {}", buy);
        }
        if let Some(sell) = &status.record.last_sell_ref {
            println!("    last sell: {}", sell);
        }
    }
    Ok(())
}

async fn resolve_market(
    config: &Config,
    resolver: Option<&Arc<dyn MarketResolver>>,
) -> Result<Option<MarketInfo>> {
    let Some(resolver) = resolver else {
        return Ok(None);
    };
    let mint = config.mint()?;
    match resolver.resolve(&mint).await.context("Market lookup failed")? {
        Some(market) => Ok(Some(market)),
        None => bail!("No market found for {}", mint),
    }
}

async fn gather_command(config: Config) -> Result<()> {
    let operator = load_operator(&config)?;
    let network = network(&config);
    let (swap, resolver) = swap_stack(&config)?;
    let market = resolve_market(&config, resolver.as_ref()).await?;
    let settings = config.swarm_settings()?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let cache = BlockhashCache::new(network.clone(), settings.blockhash_refresh);
    let refresher = cache.spawn(cancel.child_token());
    let gateway = ExecutionGateway::new(network.clone()).with_poll_interval(settings.confirm_poll);
    let stats = Arc::new(RunStats::new());

    let watcher_cancel = cancel.child_token();
    let (submitter, watcher) = match settings.mode {
        ExecutionMode::Legacy => (Submitter::legacy(gateway, cache.clone(), stats), None),
        ExecutionMode::Bundle => {
            let jito = jito(&config)?;
            let watcher = jito.spawn_watcher(watcher_cancel.clone());
            let builder: Arc<dyn BlockBuilder> = Arc::new(jito);
            let bundler = BundleCoordinator::new(builder, cache.clone(), settings.bundle.clone(), stats.clone());
            let submitter = Submitter::bundled(
                bundler,
                gateway,
                cache.clone(),
                settings.fallback_to_direct,
                stats,
            );
            (submitter, Some(watcher))
        }
    };

    let gatherer = Gatherer::new(
        network.clone(),
        swap,
        submitter,
        roster(&config),
        config.gather_config(market)?,
    );
    let result = gatherer.gather(&operator.pubkey(), &cancel).await;

    watcher_cancel.cancel();
    if let Some(watcher) = watcher {
        watcher.await.ok();
    }
    cancel.cancel();
    refresher.await.ok();

    let results = result.context("Failed to read roster")?;
    let total: u64 = results.iter().map(|r| r.swept_lamports).sum();
    println!(
        "Gathered {} wallets, {:.6} SOL returned to {}",
        results.len(),
        lamports_to_sol(total),
        operator.pubkey()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        CliApp::command().debug_assert();
    }

    #[test]
    fn test_default_config_path() {
        let app = CliApp::try_parse_from(["volume-swarm", "run"]).unwrap();
        assert_eq!(app.command.config_path(), &PathBuf::from(DEFAULT_CONFIG));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let app = CliApp::try_parse_from(["volume-swarm", "gather", "-c", "x.toml", "--debug"]).unwrap();
        assert!(app.debug);
        assert!(matches!(app.command, Command::Gather(_)));
        assert_eq!(app.command.config_path(), &PathBuf::from("x.toml"));
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(CliApp::try_parse_from(["volume-swarm", "swap"]).is_err());
    }
}
