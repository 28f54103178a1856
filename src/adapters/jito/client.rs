//! Jito Block Engine Client
//!
//! JSON-RPC client for bundle submission. Submitted bundle ids are tracked
//! and resolved by the status watcher, which publishes results on the hub.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::de::DeserializeOwned;
use solana_sdk::{pubkey::Pubkey, transaction::VersionedTransaction};
use tokio::time::Instant;

use super::config::{default_tip_accounts, JitoConfig};
use super::error::JitoError;
use super::types::{
    InflightBundleEntry, InflightBundleStatuses, JsonRpcRequest, JsonRpcResponse,
    MAX_BUNDLE_TRANSACTIONS,
};
use crate::ports::block_builder::{
    BlockBuilder, BlockBuilderError, BundleEventHub, BundleSubscription,
};

/// Jito Block Engine client
#[derive(Clone)]
pub struct JitoBundleClient {
    pub(super) config: JitoConfig,
    http_client: Client,
    pub(super) hub: BundleEventHub,
    /// Bundle id → submission time
    pub(super) tracked: Arc<Mutex<HashMap<String, Instant>>>,
}

impl JitoBundleClient {
    /// Create a new Jito client with default mainnet config
    pub fn new() -> Result<Self, JitoError> {
        Self::with_config(JitoConfig::default())
    }

    pub fn with_config(config: JitoConfig) -> Result<Self, JitoError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| JitoError::HttpError(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
            hub: BundleEventHub::new(),
            tracked: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn config(&self) -> &JitoConfig {
        &self.config
    }

    async fn call<T: DeserializeOwned>(&self, request: &JsonRpcRequest) -> Result<T, JitoError> {
        let mut builder = self
            .http_client
            .post(self.config.bundles_url())
            .header("Content-Type", "application/json")
            .json(request);

        if let Some(token) = &self.config.api_token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let response = builder.send().await?;
        let status = response.status();

        if status.as_u16() == 429 {
            return Err(JitoError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JitoError::HttpError(format!("HTTP {}: {}", status, body)));
        }

        let parsed: JsonRpcResponse<T> = response.json().await?;
        if let Some(error) = parsed.error {
            return Err(JitoError::ApiError {
                code: error.code,
                message: error.message,
            });
        }

        parsed.result.ok_or_else(|| JitoError::ApiError {
            code: -1,
            message: format!("No result for {}", request.method),
        })
    }

    /// Tip accounts advertised by the block engine
    pub async fn get_tip_accounts(&self) -> Result<Vec<Pubkey>, JitoError> {
        let accounts: Vec<String> = self.call(&JsonRpcRequest::get_tip_accounts()).await?;
        accounts
            .iter()
            .map(|a| {
                a.parse()
                    .map_err(|_| JitoError::SerializationError(format!("Invalid tip account {}", a)))
            })
            .collect()
    }

    /// Submit already-encoded transactions; returns the bundle id
    pub async fn send_bundle(&self, encoded: Vec<String>) -> Result<String, JitoError> {
        if encoded.is_empty() {
            return Err(JitoError::InvalidBundle("Bundle cannot be empty".to_string()));
        }
        if encoded.len() > MAX_BUNDLE_TRANSACTIONS {
            return Err(JitoError::InvalidBundle(format!(
                "Bundle cannot exceed {} transactions, got {}",
                MAX_BUNDLE_TRANSACTIONS,
                encoded.len()
            )));
        }

        let bundle_id: String = self.call(&JsonRpcRequest::send_bundle(encoded)).await?;
        tracing::info!("Bundle submitted: {}", bundle_id);
        Ok(bundle_id)
    }

    pub async fn get_inflight_statuses(
        &self,
        bundle_ids: Vec<String>,
    ) -> Result<Vec<InflightBundleEntry>, JitoError> {
        let statuses: InflightBundleStatuses = self
            .call(&JsonRpcRequest::get_inflight_bundle_statuses(bundle_ids))
            .await?;
        Ok(statuses.value)
    }

    pub(super) fn track(&self, bundle_id: &str) {
        if let Ok(mut tracked) = self.tracked.lock() {
            tracked.insert(bundle_id.to_string(), Instant::now());
        }
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn poll_interval(&self) -> Duration {
        self.config.status_poll_interval
    }
}

/// Wire encoding for `sendBundle`
pub fn encode_transaction(tx: &VersionedTransaction) -> Result<String, JitoError> {
    let bytes =
        bincode::serialize(tx).map_err(|e| JitoError::InvalidTransaction(e.to_string()))?;
    Ok(BASE64.encode(bytes))
}

#[async_trait]
impl BlockBuilder for JitoBundleClient {
    async fn tip_accounts(&self) -> Result<Vec<Pubkey>, BlockBuilderError> {
        match self.get_tip_accounts().await {
            Ok(accounts) if !accounts.is_empty() => Ok(accounts),
            Ok(_) => {
                tracing::warn!("Block engine returned no tip accounts, using static list");
                Ok(default_tip_accounts())
            }
            Err(e) => {
                tracing::warn!("getTipAccounts failed ({}), using static list", e);
                Ok(default_tip_accounts())
            }
        }
    }

    async fn submit_bundle(
        &self,
        transactions: &[VersionedTransaction],
    ) -> Result<String, BlockBuilderError> {
        let encoded = transactions
            .iter()
            .map(encode_transaction)
            .collect::<Result<Vec<_>, _>>()?;

        let bundle_id = self.send_bundle(encoded).await?;
        self.track(&bundle_id);
        Ok(bundle_id)
    }

    fn subscribe(&self) -> BundleSubscription {
        self.hub.subscribe()
    }
}
