//! Jupiter API Client
//!
//! HTTP client for the Jupiter swap API: quote, then build a swap
//! transaction for the quoted route.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use super::error::JupiterError;
use super::quote::{QuoteRequest, QuoteResponse};
use super::swap::{SwapRequest, SwapResponse};

/// Jupiter API client configuration
#[derive(Debug, Clone)]
pub struct JupiterConfig {
    pub api_base_url: String,
    /// Optional API key for higher rate limits
    pub api_key: Option<String>,
    pub timeout: Duration,
    /// Attempts per HTTP call on 429/5xx
    pub max_retries: u32,
    pub slippage_bps: u16,
    /// Flat priority fee passed to the swap endpoint
    pub priority_fee_lamports: Option<u64>,
}

impl Default for JupiterConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.jup.ag/swap/v1".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            slippage_bps: 500,
            priority_fee_lamports: None,
        }
    }
}

/// A quote plus the exact JSON the swap endpoint expects back
#[derive(Debug, Clone)]
pub struct Quote {
    pub response: QuoteResponse,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct JupiterClient {
    config: JupiterConfig,
    http: Client,
}

impl JupiterClient {
    pub fn new() -> Result<Self, JupiterError> {
        Self::with_config(JupiterConfig::default())
    }

    pub fn with_config(config: JupiterConfig) -> Result<Self, JupiterError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| JupiterError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &JupiterConfig {
        &self.config
    }

    /// Get a quote for a token swap
    pub async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote, JupiterError> {
        let url = format!("{}/quote", self.config.api_base_url);

        let amount = request.amount.to_string();
        let slippage = request.slippage_bps.to_string();
        let mut req = self.http.get(&url).query(&[
            ("inputMint", request.input_mint.as_str()),
            ("outputMint", request.output_mint.as_str()),
            ("amount", amount.as_str()),
            ("slippageBps", slippage.as_str()),
        ]);
        if let Some(api_key) = &self.config.api_key {
            req = req.header("x-api-key", api_key);
        }

        let raw: serde_json::Value = self.send(req).await?;
        if raw.get("error").is_some() {
            return Err(JupiterError::NoRoute);
        }
        let response: QuoteResponse =
            serde_json::from_value(raw.clone()).map_err(|e| JupiterError::Parse(e.to_string()))?;

        Ok(Quote { response, raw })
    }

    /// Build the swap transaction for a quote
    pub async fn get_swap_transaction(
        &self,
        request: &SwapRequest,
    ) -> Result<SwapResponse, JupiterError> {
        let url = format!("{}/swap", self.config.api_base_url);

        let mut req = self.http.post(&url).json(request);
        if let Some(api_key) = &self.config.api_key {
            req = req.header("x-api-key", api_key);
        }

        self.send(req).await
    }

    /// Send with retry on rate limiting and server errors
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, JupiterError> {
        let mut last_error = JupiterError::Http("Max retries exceeded".into());

        for attempt in 0..self.config.max_retries.max(1) {
            let req = request
                .try_clone()
                .ok_or_else(|| JupiterError::Http("Failed to clone request".into()))?;

            let response = match req.send().await {
                Ok(response) => response,
                Err(e) => {
                    last_error = JupiterError::Http(e.to_string());
                    tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1))).await;
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let backoff = Duration::from_secs(2u64.pow(attempt + 1));
                tracing::warn!(
                    "Rate limited (429), backing off for {:?} (attempt {}/{})",
                    backoff,
                    attempt + 1,
                    self.config.max_retries
                );
                last_error = JupiterError::RateLimited;
                tokio::time::sleep(backoff).await;
                continue;
            }
            if status.is_server_error() {
                last_error = JupiterError::Api {
                    status: status.as_u16(),
                    body: String::new(),
                };
                tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1))).await;
                continue;
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                if body.contains("COULD_NOT_FIND_ANY_ROUTE") || body.contains("No routes found") {
                    return Err(JupiterError::NoRoute);
                }
                return Err(JupiterError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            return response
                .json()
                .await
                .map_err(|e| JupiterError::Parse(e.to_string()));
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jupiter_config_default() {
        let config = JupiterConfig::default();
        assert_eq!(config.api_base_url, "https://api.jup.ag/swap/v1");
        assert!(config.api_key.is_none());
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_jupiter_client_creation() {
        assert!(JupiterClient::new().is_ok());
    }
}
