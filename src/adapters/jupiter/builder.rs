//! Aggregator swap builder
//!
//! Buys spend SOL on the traded mint, sells swap a raw token amount back
//! to SOL. Jupiter wraps and unwraps SOL itself.

use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::VersionedTransaction,
};

use super::client::JupiterClient;
use super::error::JupiterError;
use super::quote::QuoteRequest;
use super::swap::SwapRequest;
use crate::adapters::solana::sign_base64_transaction;
use crate::ports::swap::{MarketInfo, SwapBuildError, SwapBuilder};

pub struct JupiterSwapBuilder {
    client: JupiterClient,
}

impl JupiterSwapBuilder {
    pub fn new(client: JupiterClient) -> Self {
        Self { client }
    }

    async fn build(
        &self,
        wallet: &Keypair,
        input_mint: &Pubkey,
        output_mint: &Pubkey,
        amount: u64,
    ) -> Result<Option<VersionedTransaction>, SwapBuildError> {
        let config = self.client.config();
        let request = QuoteRequest::new(
            input_mint.to_string(),
            output_mint.to_string(),
            amount,
            config.slippage_bps,
        );

        let quote = match self.client.get_quote(&request).await {
            Ok(quote) => quote,
            Err(JupiterError::NoRoute) => {
                tracing::warn!("No Jupiter route for {} -> {}", input_mint, output_mint);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(
            "Jupiter quote {} -> {} via {:?}",
            amount,
            quote.response.out_amount,
            quote.response.route_labels()
        );

        let swap = SwapRequest::new(wallet.pubkey().to_string(), quote.raw)
            .with_priority_fee(config.priority_fee_lamports);
        let response = self.client.get_swap_transaction(&swap).await?;

        sign_base64_transaction(&response.swap_transaction, wallet).map(Some)
    }
}

#[async_trait]
impl SwapBuilder for JupiterSwapBuilder {
    async fn build_buy(
        &self,
        wallet: &Keypair,
        mint: &Pubkey,
        lamports: u64,
        _market: Option<MarketInfo>,
    ) -> Result<Option<VersionedTransaction>, SwapBuildError> {
        self.build(wallet, &spl_token::native_mint::ID, mint, lamports).await
    }

    async fn build_sell(
        &self,
        wallet: &Keypair,
        mint: &Pubkey,
        token_amount: u64,
        _market: Option<MarketInfo>,
    ) -> Result<Option<VersionedTransaction>, SwapBuildError> {
        self.build(wallet, mint, &spl_token::native_mint::ID, token_amount).await
    }

    fn route_name(&self) -> &'static str {
        "jupiter"
    }
}
