//! Jito Configuration
//!
//! Block Engine endpoints, the static tip account list, and client settings.

use std::time::Duration;

use solana_sdk::pubkey::Pubkey;

/// Jito Block Engine endpoints
pub mod endpoints {
    /// Default mainnet endpoint (New York); other regions go in `[bundle] block_engine_url`
    pub const MAINNET_DEFAULT: &str = "https://ny.mainnet.block-engine.jito.wtf";
}

/// Jito tip accounts for validator tips
pub mod tip_accounts {
    use solana_sdk::pubkey::Pubkey;

    /// Official Jito tip accounts, used when the block engine cannot be asked
    pub const TIP_ACCOUNTS: &[&str] = &[
        "96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5",
        "HFqU5x63VTqvQss8hp11i4bVmkdzGZBJLYQ6QwBvp8dx",
        "Cw8CFyM9FkoMi7K7Crf6HNQqf4uEMzpKw6QNghXLvLkY",
        "ADaUMid9yfUytqMBgopwjb2DTLSokTSzL1zt6iGPaS49",
        "DfXygSm4jCyNCybVYYK6DwvWqjKee8pbDmJGcLWNDXjh",
        "ADuUkR4vqLUMWXxW9gh6D6L8pMSawimctcNZ5pGwDcEt",
        "DttWaMuVvTiduZRnguLF7jNxTgiMBZ1hyAumKUiL2KRL",
        "3AVi9Tg9Uo68tJfuvoKvqKNWKkC5wPdSSdeBnizKZ6jT",
    ];

    pub fn fallback() -> Vec<Pubkey> {
        TIP_ACCOUNTS.iter().filter_map(|a| a.parse().ok()).collect()
    }
}

/// Jito Block Engine configuration
#[derive(Debug, Clone)]
pub struct JitoConfig {
    /// Block Engine endpoint URL
    pub block_engine_url: String,
    /// HTTP request timeout
    pub timeout: Duration,
    /// Optional API token for authenticated requests
    pub api_token: Option<String>,
    /// How often in-flight bundles are polled
    pub status_poll_interval: Duration,
    /// Stop tracking a bundle after this long
    pub tracking_ttl: Duration,
}

impl Default for JitoConfig {
    fn default() -> Self {
        Self {
            block_engine_url: endpoints::MAINNET_DEFAULT.to_string(),
            timeout: Duration::from_secs(10),
            api_token: None,
            status_poll_interval: Duration::from_millis(1_000),
            tracking_ttl: Duration::from_secs(60),
        }
    }
}

impl JitoConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.block_engine_url = url.into();
        self
    }

    /// Set API token
    pub fn with_api_token(mut self, token: String) -> Self {
        self.api_token = Some(token);
        self
    }

    pub fn with_status_poll_interval(mut self, interval: Duration) -> Self {
        self.status_poll_interval = interval;
        self
    }

    /// JSON-RPC endpoint for bundle methods
    pub fn bundles_url(&self) -> String {
        format!("{}/api/v1/bundles", self.block_engine_url.trim_end_matches('/'))
    }
}

/// Parsed fallback list, never empty
pub fn default_tip_accounts() -> Vec<Pubkey> {
    tip_accounts::fallback()
}
