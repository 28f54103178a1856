//! Raydium HTTP client and market resolver
//!
//! Pool lookup via API v3 and swap transactions via the trade API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use solana_sdk::pubkey::Pubkey;

use super::types::{
    ApiResponse, ComputedSwap, EncodedTransaction, PoolKeys, PoolPage, SwapTransactionRequest,
};
use crate::ports::swap::{MarketInfo, MarketResolver, SwapBuildError};

#[derive(Debug, Clone)]
pub struct RaydiumConfig {
    /// API v3 base (pool lookup)
    pub api_base_url: String,
    /// Trade API base (compute + transaction)
    pub trade_api_url: String,
    pub timeout: Duration,
    pub slippage_bps: u16,
    pub compute_unit_price_micro_lamports: u64,
}

impl Default for RaydiumConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api-v3.raydium.io".to_string(),
            trade_api_url: "https://transaction-v1.raydium.io".to_string(),
            timeout: Duration::from_secs(30),
            slippage_bps: 500,
            compute_unit_price_micro_lamports: 100_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RaydiumClient {
    config: RaydiumConfig,
    http: Client,
}

/// Pick the vault that holds `mint` as the base side
pub fn market_from_keys(keys: &PoolKeys, mint: &Pubkey) -> Result<MarketInfo, SwapBuildError> {
    let parse = |s: &str| {
        s.parse::<Pubkey>()
            .map_err(|_| SwapBuildError::Market(format!("Invalid address {}", s)))
    };
    let pool_id = parse(&keys.id)?;
    let vault_a = parse(&keys.vault.a)?;
    let vault_b = parse(&keys.vault.b)?;
    let mint = mint.to_string();

    let (base_vault, quote_vault) = if keys.mint_a.address == mint {
        (vault_a, vault_b)
    } else if keys.mint_b.address == mint {
        (vault_b, vault_a)
    } else {
        return Err(SwapBuildError::Market(format!(
            "Pool {} does not trade {}",
            keys.id, mint
        )));
    };

    Ok(MarketInfo {
        pool_id,
        base_vault,
        quote_vault,
    })
}

impl RaydiumClient {
    pub fn new(config: RaydiumConfig) -> Result<Self, SwapBuildError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SwapBuildError::Api(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &RaydiumConfig {
        &self.config
    }

    async fn read<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, SwapBuildError> {
        let response = request
            .send()
            .await
            .map_err(|e| SwapBuildError::Api(e.to_string()))?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SwapBuildError::Api("Rate limit exceeded".into()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SwapBuildError::Api(format!("API error {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| SwapBuildError::Api(format!("Failed to parse response: {}", e)))
    }

    /// Raw JSON of a priced swap plus its parsed route
    pub async fn compute_swap(
        &self,
        input_mint: &Pubkey,
        output_mint: &Pubkey,
        amount: u64,
    ) -> Result<Option<(serde_json::Value, ComputedSwap)>, SwapBuildError> {
        let url = format!("{}/compute/swap-base-in", self.config.trade_api_url);
        let input = input_mint.to_string();
        let output = output_mint.to_string();
        let amount = amount.to_string();
        let slippage = self.config.slippage_bps.to_string();

        let raw: serde_json::Value = self
            .read(self.http.get(&url).query(&[
                ("inputMint", input.as_str()),
                ("outputMint", output.as_str()),
                ("amount", amount.as_str()),
                ("slippageBps", slippage.as_str()),
                ("txVersion", "V0"),
            ]))
            .await?;

        if raw.get("success").and_then(|v| v.as_bool()) != Some(true) {
            tracing::warn!("Raydium found no route {} -> {}: {}", input, output, raw["msg"]);
            return Ok(None);
        }

        let computed: ComputedSwap = serde_json::from_value(raw["data"].clone())
            .map_err(|e| SwapBuildError::Decode(e.to_string()))?;
        Ok(Some((raw, computed)))
    }

    pub async fn swap_transactions(
        &self,
        request: &SwapTransactionRequest,
    ) -> Result<Vec<String>, SwapBuildError> {
        let url = format!("{}/transaction/swap-base-in", self.config.trade_api_url);
        let response: ApiResponse<Vec<EncodedTransaction>> =
            self.read(self.http.post(&url).json(request)).await?;

        if !response.success {
            return Err(SwapBuildError::Api(
                response.msg.unwrap_or_else(|| "swap transaction request failed".into()),
            ));
        }
        Ok(response
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|tx| tx.transaction)
            .collect())
    }
}

#[async_trait]
impl MarketResolver for RaydiumClient {
    async fn resolve(&self, mint: &Pubkey) -> Result<Option<MarketInfo>, SwapBuildError> {
        let url = format!("{}/pools/info/mint", self.config.api_base_url);
        let mint_str = mint.to_string();
        let wsol = spl_token::native_mint::ID.to_string();

        let page: ApiResponse<PoolPage> = self
            .read(self.http.get(&url).query(&[
                ("mint1", mint_str.as_str()),
                ("mint2", wsol.as_str()),
                ("poolType", "standard"),
                ("poolSortField", "liquidity"),
                ("sortType", "desc"),
                ("pageSize", "1"),
                ("page", "1"),
            ]))
            .await?;

        let Some(pool) = page.data.and_then(|page| page.data.into_iter().next()) else {
            tracing::warn!("No Raydium standard pool for {}", mint);
            return Ok(None);
        };
        tracing::info!("Raydium pool {} (tvl {:.2})", pool.id, pool.tvl);

        let url = format!("{}/pools/key/ids", self.config.api_base_url);
        let keys: ApiResponse<Vec<PoolKeys>> = self
            .read(self.http.get(&url).query(&[("ids", pool.id.as_str())]))
            .await?;

        let keys = keys
            .data
            .and_then(|keys| keys.into_iter().next())
            .ok_or_else(|| SwapBuildError::Market(format!("No keys for pool {}", pool.id)))?;

        market_from_keys(&keys, mint).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::types::{MintRef, VaultPair};

    fn keys(mint_a: &Pubkey, mint_b: &Pubkey, vault_a: &Pubkey, vault_b: &Pubkey) -> PoolKeys {
        PoolKeys {
            id: Pubkey::new_unique().to_string(),
            mint_a: MintRef { address: mint_a.to_string() },
            mint_b: MintRef { address: mint_b.to_string() },
            vault: VaultPair {
                a: vault_a.to_string(),
                b: vault_b.to_string(),
            },
        }
    }

    #[test]
    fn test_base_vault_follows_traded_mint() {
        let mint = Pubkey::new_unique();
        let wsol = spl_token::native_mint::ID;
        let (va, vb) = (Pubkey::new_unique(), Pubkey::new_unique());

        let market = market_from_keys(&keys(&wsol, &mint, &va, &vb), &mint).unwrap();
        assert_eq!(market.base_vault, vb);
        assert_eq!(market.quote_vault, va);

        let market = market_from_keys(&keys(&mint, &wsol, &va, &vb), &mint).unwrap();
        assert_eq!(market.base_vault, va);
    }

    #[test]
    fn test_pool_without_mint_is_error() {
        let k = keys(
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
        );
        assert!(matches!(
            market_from_keys(&k, &Pubkey::new_unique()),
            Err(SwapBuildError::Market(_))
        ));
    }
}
