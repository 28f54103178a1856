//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Solana: RPC client and operator key loading
//! - Jito: bundle submission and result watcher
//! - Jupiter: aggregator swap builder
//! - Raydium: direct-market resolver and swap builder
//! - Storage: JSON roster file
//! - Telegram: operator notifications
//! - CLI: Command-line interface handlers

pub mod cli;
pub mod jito;
pub mod jupiter;
pub mod raydium;
pub mod solana;
pub mod storage;
pub mod telegram;

pub use cli::CliApp;
pub use jito::JitoBundleClient;
pub use jupiter::{JupiterClient, JupiterSwapBuilder};
pub use raydium::{RaydiumClient, RaydiumSwapBuilder};
pub use solana::{SolanaClient, WalletManager};
pub use storage::JsonRosterStore;
pub use telegram::TelegramSink;
