//! Application Layer - the swarm's use cases
//!
//! - `blockhash_cache`: background-refreshed reference hash
//! - `gateway`: single transaction send and confirm
//! - `bundler`: grouped tip-paying bundle submission
//! - `submitter`: bundle or direct routing for one swap
//! - `distributor`: first-run capital distribution
//! - `trading_loop`: per-wallet buy/sell cycle
//! - `orchestrator`: one full run
//! - `gather` / `status`: operator maintenance commands

pub mod blockhash_cache;
pub mod bundler;
pub mod distributor;
pub mod gateway;
pub mod gather;
pub mod orchestrator;
pub mod status;
pub mod submitter;
pub mod trading_loop;

pub use blockhash_cache::BlockhashCache;
pub use bundler::{BundleConfig, BundleCoordinator, BundleError};
pub use distributor::{CapitalDistributor, DistributionConfig, DistributionError, MAX_WALLETS};
pub use gateway::{ExecutionGateway, GatewayError, SubmitOutcome};
pub use gather::{GatherConfig, GatherError, GatherResult, Gatherer, DEFAULT_SWEEP_RESERVE_LAMPORTS};
pub use orchestrator::{
    OrchestratorError, Routing, RunReport, SwarmDeps, SwarmOrchestrator, SwarmSettings,
};
pub use status::{collect_status, WalletStatus};
pub use submitter::{ExecutionMode, SubmitError, Submitter};
pub use trading_loop::{TradingConfig, TradingLoop, WalletExit, WalletSummary};
