//! Volume Swarm Library
//!
//! Runs a fleet of funded wallets that repeatedly buy and sell one Solana
//! token, submitting swaps as tip-paying Jito bundles.
//!
//! # Modules
//!
//! - `domain`: wallet records, cycle pacing, retry and bundle grouping policies
//! - `ports`: trait abstractions for the network, block builder, swaps, roster and alerts
//! - `adapters`: Solana RPC, Jito, Jupiter, Raydium, JSON roster, Telegram, CLI
//! - `config`: Configuration loading and validation
//! - `application`: blockhash cache, gateway, bundler, distributor, trading loop, orchestrator

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
