//! Direct-market swap builder
//!
//! Asks the Raydium trade API for a swap and only accepts single-transaction
//! answers whose route goes through the resolved pool.

use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::VersionedTransaction,
};

use super::client::RaydiumClient;
use super::types::{ComputedSwap, SwapTransactionRequest};
use crate::adapters::solana::sign_base64_transaction;
use crate::domain::wallet::associated_token_address;
use crate::ports::swap::{MarketInfo, SwapBuildError, SwapBuilder};

pub struct RaydiumSwapBuilder {
    client: RaydiumClient,
}

/// True when `market` is unset or the route touches its pool
pub fn route_uses_market(computed: &ComputedSwap, market: Option<&MarketInfo>) -> bool {
    match market {
        None => true,
        Some(market) => {
            let pool = market.pool_id.to_string();
            computed.route_plan.iter().any(|hop| hop.pool_id == pool)
        }
    }
}

impl RaydiumSwapBuilder {
    pub fn new(client: RaydiumClient) -> Self {
        Self { client }
    }

    async fn build(
        &self,
        wallet: &Keypair,
        input_mint: &Pubkey,
        output_mint: &Pubkey,
        amount: u64,
        market: Option<MarketInfo>,
        selling: bool,
    ) -> Result<Option<VersionedTransaction>, SwapBuildError> {
        let Some((raw, computed)) = self.client.compute_swap(input_mint, output_mint, amount).await?
        else {
            return Ok(None);
        };

        if !route_uses_market(&computed, market.as_ref()) {
            tracing::warn!("Raydium route skips the resolved pool, declining");
            return Ok(None);
        }

        let owner = wallet.pubkey();
        let request = SwapTransactionRequest {
            compute_unit_price_micro_lamports: self
                .client
                .config()
                .compute_unit_price_micro_lamports
                .to_string(),
            swap_response: raw,
            tx_version: "V0",
            wallet: owner.to_string(),
            wrap_sol: !selling,
            unwrap_sol: selling,
            input_account: selling.then(|| associated_token_address(&owner, input_mint).to_string()),
        };

        let mut transactions = self.client.swap_transactions(&request).await?;
        if transactions.len() != 1 {
            tracing::warn!(
                "Raydium returned {} transactions for one swap, declining",
                transactions.len()
            );
            return Ok(None);
        }

        let encoded = transactions.remove(0);
        sign_base64_transaction(&encoded, wallet).map(Some)
    }
}

#[async_trait]
impl SwapBuilder for RaydiumSwapBuilder {
    async fn build_buy(
        &self,
        wallet: &Keypair,
        mint: &Pubkey,
        lamports: u64,
        market: Option<MarketInfo>,
    ) -> Result<Option<VersionedTransaction>, SwapBuildError> {
        self.build(wallet, &spl_token::native_mint::ID, mint, lamports, market, false)
            .await
    }

    async fn build_sell(
        &self,
        wallet: &Keypair,
        mint: &Pubkey,
        token_amount: u64,
        market: Option<MarketInfo>,
    ) -> Result<Option<VersionedTransaction>, SwapBuildError> {
        self.build(wallet, mint, &spl_token::native_mint::ID, token_amount, market, true)
            .await
    }

    fn route_name(&self) -> &'static str {
        "raydium"
    }
}
