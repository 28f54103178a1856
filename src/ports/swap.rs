//! Swap Ports
//!
//! Builders produce a ready-to-submit swap transaction signed by the trading
//! wallet. `Ok(None)` means the builder declined (no route, route outside the
//! resolved market, multi-transaction answer); callers treat it like a failure.

use async_trait::async_trait;
use solana_sdk::{pubkey::Pubkey, signature::Keypair, transaction::VersionedTransaction};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SwapBuildError {
    #[error("Swap API request failed: {0}")]
    Api(String),
    #[error("Failed to decode swap transaction: {0}")]
    Decode(String),
    #[error("Failed to sign swap transaction: {0}")]
    Signing(String),
    #[error("Market lookup failed: {0}")]
    Market(String),
}

/// Direct-market coordinates resolved once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketInfo {
    pub pool_id: Pubkey,
    /// Vault holding the traded token
    pub base_vault: Pubkey,
    /// Vault holding wrapped SOL
    pub quote_vault: Pubkey,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SwapBuilder: Send + Sync {
    /// Spend `lamports` of SOL on `mint`
    async fn build_buy(
        &self,
        wallet: &Keypair,
        mint: &Pubkey,
        lamports: u64,
        market: Option<MarketInfo>,
    ) -> Result<Option<VersionedTransaction>, SwapBuildError>;

    /// Sell `token_amount` raw units of `mint` for SOL
    async fn build_sell(
        &self,
        wallet: &Keypair,
        mint: &Pubkey,
        token_amount: u64,
        market: Option<MarketInfo>,
    ) -> Result<Option<VersionedTransaction>, SwapBuildError>;

    /// Short label for logs
    fn route_name(&self) -> &'static str;
}

#[async_trait]
pub trait MarketResolver: Send + Sync {
    /// Highest-liquidity SOL market for `mint`, if any
    async fn resolve(&self, mint: &Pubkey) -> Result<Option<MarketInfo>, SwapBuildError>;
}
