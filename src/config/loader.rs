//! Configuration Loader
//!
//! Loads and validates the swarm configuration from a TOML file. Secrets
//! (operator key, API tokens, Telegram credentials) come from the
//! environment and override anything in the file.

use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::adapters::jito::{endpoints, JitoConfig};
use crate::adapters::jupiter::JupiterConfig;
use crate::adapters::raydium::RaydiumConfig;
use crate::application::{
    BundleConfig, DistributionConfig, ExecutionMode, GatherConfig, Routing, SwarmSettings,
    TradingConfig, DEFAULT_SWEEP_RESERVE_LAMPORTS, MAX_WALLETS,
};
use crate::domain::bundle::MAX_BUNDLE_SIZE;
use crate::domain::cycle::{BuyAmountPolicy, Pacing};
use crate::domain::retry::RetryPolicy;
use crate::ports::swap::MarketInfo;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub solana: SolanaSection,
    pub market: MarketSection,
    #[serde(default)]
    pub distribution: DistributionSection,
    #[serde(default)]
    pub trading: TradingSection,
    #[serde(default)]
    pub execution: ExecutionSection,
    #[serde(default)]
    pub bundle: BundleSection,
    #[serde(default)]
    pub blockhash: BlockhashSection,
    #[serde(default)]
    pub jupiter: JupiterSection,
    #[serde(default)]
    pub raydium: RaydiumSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub alerts: AlertsSection,
}

/// Solana RPC configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolanaSection {
    pub rpc_url: String,
    /// Operator keypair file, used when PRIVATE_KEY is unset
    pub keypair_path: Option<String>,
}

impl Default for SolanaSection {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            keypair_path: None,
        }
    }
}

impl SolanaSection {
    /// RPC URL, SOLANA_RPC_URL wins over the file
    pub fn get_rpc_url(&self) -> String {
        std::env::var("SOLANA_RPC_URL")
            .ok()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.rpc_url.clone())
    }

    /// Keypair path with `~` expanded
    pub fn expanded_keypair_path(&self) -> Option<String> {
        self.keypair_path
            .as_ref()
            .map(|path| shellexpand::tilde(path).to_string())
    }
}

/// The traded token and how it is routed
#[derive(Debug, Clone, Deserialize)]
pub struct MarketSection {
    pub mint: String,
    #[serde(default)]
    pub routing: Routing,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DistributionSection {
    pub wallet_count: usize,
    /// SOL sent to each fresh wallet
    pub amount_sol: f64,
    pub max_attempts: u32,
    pub compute_unit_limit: u32,
    pub compute_unit_price_micro_lamports: u64,
    /// Lamports left in a wallet to pay for the gather sweep
    pub sweep_reserve_lamports: u64,
}

impl Default for DistributionSection {
    fn default() -> Self {
        let defaults = DistributionConfig::default();
        Self {
            wallet_count: defaults.wallet_count,
            amount_sol: defaults.amount_sol,
            max_attempts: defaults.max_attempts,
            compute_unit_limit: defaults.compute_unit_limit,
            compute_unit_price_micro_lamports: defaults.compute_unit_price,
            sweep_reserve_lamports: DEFAULT_SWEEP_RESERVE_LAMPORTS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TradingSection {
    /// When set, every buy spends exactly this much
    pub fixed_buy_sol: Option<f64>,
    pub buy_lower_sol: f64,
    pub buy_upper_sol: f64,
    /// A wallet below this balance stops trading
    pub fee_floor_sol: f64,
    /// Retries after the first attempt of a buy or sell
    pub retries: u32,
    pub retry_backoff_ms: u64,
    pub interval_min_ms: u64,
    pub interval_max_ms: u64,
    pub cycle_delay_ms: u64,
    pub settle_delay_ms: u64,
    /// Stop each wallet after this many cycles
    pub max_cycles: Option<u64>,
}

impl Default for TradingSection {
    fn default() -> Self {
        let defaults = TradingConfig::new(Pubkey::default());
        let (buy_lower_sol, buy_upper_sol) = match defaults.buy_policy {
            BuyAmountPolicy::Random { lower, upper } => (lower, upper),
            BuyAmountPolicy::Fixed(amount) => (amount, amount),
        };
        Self {
            fixed_buy_sol: None,
            buy_lower_sol,
            buy_upper_sol,
            fee_floor_sol: defaults.fee_floor_sol,
            retries: defaults.retry.max_attempts.saturating_sub(1),
            retry_backoff_ms: 1_000,
            interval_min_ms: defaults.pacing.interval_min_ms,
            interval_max_ms: defaults.pacing.interval_max_ms,
            cycle_delay_ms: defaults.pacing.cycle_delay_ms,
            settle_delay_ms: defaults.pacing.settle_delay_ms,
            max_cycles: None,
        }
    }
}

impl TradingSection {
    pub fn buy_policy(&self) -> BuyAmountPolicy {
        match self.fixed_buy_sol {
            Some(amount) => BuyAmountPolicy::Fixed(amount),
            None => BuyAmountPolicy::Random {
                lower: self.buy_lower_sol,
                upper: self.buy_upper_sol,
            },
        }
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            interval_min_ms: self.interval_min_ms,
            interval_max_ms: self.interval_max_ms,
            cycle_delay_ms: self.cycle_delay_ms,
            settle_delay_ms: self.settle_delay_ms,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutionSection {
    pub mode: ExecutionMode,
    /// Retry a swap directly when its bundle is not accepted
    pub fallback_to_direct: bool,
    pub confirm_poll_ms: u64,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Bundle,
            fallback_to_direct: true,
            confirm_poll_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BundleSection {
    pub block_engine_url: String,
    pub api_token: Option<String>,
    pub group_size: usize,
    pub max_attempts: u32,
    pub result_timeout_ms: u64,
    pub tip_lamports: u64,
    pub tip_pick_limit: usize,
    pub status_poll_ms: u64,
    pub tracking_ttl_secs: u64,
}

impl Default for BundleSection {
    fn default() -> Self {
        let defaults = BundleConfig::default();
        Self {
            block_engine_url: endpoints::MAINNET_DEFAULT.to_string(),
            api_token: None,
            group_size: defaults.group_size,
            max_attempts: defaults.max_attempts,
            result_timeout_ms: defaults.result_timeout.as_millis() as u64,
            tip_lamports: defaults.tip_lamports,
            tip_pick_limit: defaults.tip_pick_limit,
            status_poll_ms: 1_000,
            tracking_ttl_secs: 60,
        }
    }
}

impl BundleSection {
    /// API token, JITO_API_TOKEN wins over the file
    pub fn get_api_token(&self) -> Option<String> {
        env_non_empty("JITO_API_TOKEN").or_else(|| self.api_token.clone().filter(|t| !t.is_empty()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlockhashSection {
    pub refresh_ms: u64,
}

impl Default for BlockhashSection {
    fn default() -> Self {
        Self { refresh_ms: 1_000 }
    }
}

/// Jupiter API configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JupiterSection {
    pub api_url: String,
    pub api_key: Option<String>,
    pub slippage_bps: u16,
    pub priority_fee_lamports: Option<u64>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for JupiterSection {
    fn default() -> Self {
        let defaults = JupiterConfig::default();
        Self {
            api_url: defaults.api_base_url,
            api_key: None,
            slippage_bps: defaults.slippage_bps,
            priority_fee_lamports: None,
            timeout_secs: defaults.timeout.as_secs(),
            max_retries: defaults.max_retries,
        }
    }
}

impl JupiterSection {
    /// API key from the file, falling back to JUPITER_API_KEY
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        env_non_empty("JUPITER_API_KEY")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RaydiumSection {
    pub api_url: String,
    pub trade_api_url: String,
    pub slippage_bps: u16,
    pub compute_unit_price_micro_lamports: u64,
}

impl Default for RaydiumSection {
    fn default() -> Self {
        let defaults = RaydiumConfig::default();
        Self {
            api_url: defaults.api_base_url,
            trade_api_url: defaults.trade_api_url,
            slippage_bps: defaults.slippage_bps,
            compute_unit_price_micro_lamports: defaults.compute_unit_price_micro_lamports,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub roster_path: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            roster_path: "data/wallets.json".to_string(),
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Used when neither a CLI flag nor RUST_LOG sets the level
    pub level: Option<String>,
}

/// Alerts configuration section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AlertsSection {
    pub telegram_enabled: bool,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    /// Alert when a wallet's pre-buy balance is below this
    pub low_balance_threshold_sol: Option<f64>,
}

impl AlertsSection {
    /// Bot token and chat id, environment first; `None` when disabled or incomplete
    pub fn telegram_credentials(&self) -> Option<(String, String)> {
        if !self.telegram_enabled {
            return None;
        }
        let token = env_non_empty("TELEGRAM_BOT_TOKEN")
            .or_else(|| Some(self.telegram_bot_token.clone()).filter(|t| !t.is_empty()))?;
        let chat = env_non_empty("TELEGRAM_CHAT_ID")
            .or_else(|| Some(self.telegram_chat_id.clone()).filter(|c| !c.is_empty()))?;
        Some((token, chat))
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn invalid(message: String) -> ConfigError {
    ConfigError::ValidationError(message)
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.solana.rpc_url.is_empty() {
            return Err(invalid("rpc_url cannot be empty".to_string()));
        }

        self.mint()?;

        let d = &self.distribution;
        if d.wallet_count == 0 {
            return Err(invalid("wallet_count must be >= 1".to_string()));
        }
        if d.wallet_count > MAX_WALLETS {
            tracing::warn!("wallet_count {} capped at {}", d.wallet_count, MAX_WALLETS);
        }
        if d.amount_sol <= 0.0 {
            return Err(invalid(format!("amount_sol must be > 0, got {}", d.amount_sol)));
        }
        if d.max_attempts == 0 {
            return Err(invalid("distribution max_attempts must be >= 1".to_string()));
        }

        let t = &self.trading;
        if let Some(fixed) = t.fixed_buy_sol {
            if fixed <= 0.0 {
                return Err(invalid(format!("fixed_buy_sol must be > 0, got {}", fixed)));
            }
        }
        if t.buy_lower_sol <= 0.0 || t.buy_lower_sol > t.buy_upper_sol {
            return Err(invalid(format!(
                "buy range must satisfy 0 < buy_lower_sol <= buy_upper_sol, got {}..{}",
                t.buy_lower_sol, t.buy_upper_sol
            )));
        }
        if t.fee_floor_sol < 0.0 {
            return Err(invalid(format!("fee_floor_sol must be >= 0, got {}", t.fee_floor_sol)));
        }
        if t.interval_min_ms > t.interval_max_ms {
            return Err(invalid(format!(
                "interval_min_ms ({}) must be <= interval_max_ms ({})",
                t.interval_min_ms, t.interval_max_ms
            )));
        }
        if t.max_cycles == Some(0) {
            return Err(invalid("max_cycles must be >= 1 when set".to_string()));
        }

        let b = &self.bundle;
        // One slot in every bundle is taken by the tip
        if b.group_size == 0 || b.group_size >= MAX_BUNDLE_SIZE {
            return Err(invalid(format!(
                "group_size must be 1..={}, got {}",
                MAX_BUNDLE_SIZE - 1,
                b.group_size
            )));
        }
        if b.max_attempts == 0 || b.tip_pick_limit == 0 {
            return Err(invalid("bundle max_attempts and tip_pick_limit must be >= 1".to_string()));
        }
        if self.execution.mode == ExecutionMode::Bundle && b.block_engine_url.is_empty() {
            return Err(invalid("block_engine_url cannot be empty in bundle mode".to_string()));
        }

        if self.blockhash.refresh_ms == 0 {
            return Err(invalid("blockhash refresh_ms must be > 0".to_string()));
        }

        match self.market.routing {
            Routing::Aggregator if self.jupiter.api_url.is_empty() => {
                return Err(invalid("jupiter api_url cannot be empty".to_string()));
            }
            Routing::Direct
                if self.raydium.api_url.is_empty() || self.raydium.trade_api_url.is_empty() =>
            {
                return Err(invalid("raydium api_url and trade_api_url are required".to_string()));
            }
            _ => {}
        }

        if self.storage.roster_path.is_empty() {
            return Err(invalid("roster_path cannot be empty".to_string()));
        }

        Ok(())
    }

    pub fn mint(&self) -> Result<Pubkey, ConfigError> {
        self.market
            .mint
            .parse()
            .map_err(|_| invalid(format!("Invalid mint address: {}", self.market.mint)))
    }

    /// Orchestrator settings for a run
    pub fn swarm_settings(&self) -> Result<SwarmSettings, ConfigError> {
        let t = &self.trading;
        let buy_policy = t.buy_policy();

        let distribution = DistributionConfig {
            wallet_count: self.distribution.wallet_count,
            amount_sol: self.distribution.amount_sol,
            fee_floor_sol: t.fee_floor_sol,
            buy_upper_sol: buy_policy.upper_bound(),
            max_attempts: self.distribution.max_attempts,
            compute_unit_limit: self.distribution.compute_unit_limit,
            compute_unit_price: self.distribution.compute_unit_price_micro_lamports,
        };

        let trading = TradingConfig {
            buy_policy,
            fee_floor_sol: t.fee_floor_sol,
            low_balance_alert_sol: self.alerts.low_balance_threshold_sol,
            retry: RetryPolicy::with_retries(t.retries, Duration::from_millis(t.retry_backoff_ms)),
            pacing: t.pacing(),
            active_wallets: distribution.effective_wallet_count(),
            max_cycles: t.max_cycles,
            ..TradingConfig::new(self.mint()?)
        };

        let b = &self.bundle;
        let bundle = BundleConfig {
            group_size: b.group_size,
            max_attempts: b.max_attempts,
            result_timeout: Duration::from_millis(b.result_timeout_ms),
            tip_lamports: b.tip_lamports,
            tip_pick_limit: b.tip_pick_limit,
        };

        Ok(SwarmSettings {
            routing: self.market.routing,
            mode: self.execution.mode,
            fallback_to_direct: self.execution.fallback_to_direct,
            blockhash_refresh: Duration::from_millis(self.blockhash.refresh_ms),
            confirm_poll: Duration::from_millis(self.execution.confirm_poll_ms),
            distribution,
            trading,
            bundle,
        })
    }

    pub fn gather_config(&self, market: Option<MarketInfo>) -> Result<GatherConfig, ConfigError> {
        Ok(GatherConfig {
            mint: self.mint()?,
            market,
            sweep_reserve_lamports: self.distribution.sweep_reserve_lamports,
            settle_delay: Duration::from_millis(self.trading.settle_delay_ms),
        })
    }

    pub fn jito_config(&self) -> JitoConfig {
        let b = &self.bundle;
        let config = JitoConfig::default()
            .with_url(b.block_engine_url.clone())
            .with_status_poll_interval(Duration::from_millis(b.status_poll_ms));
        let config = JitoConfig {
            tracking_ttl: Duration::from_secs(b.tracking_ttl_secs),
            ..config
        };
        match b.get_api_token() {
            Some(token) => config.with_api_token(token),
            None => config,
        }
    }

    pub fn jupiter_config(&self) -> JupiterConfig {
        JupiterConfig {
            api_base_url: self.jupiter.api_url.clone(),
            api_key: self.jupiter.get_api_key(),
            timeout: Duration::from_secs(self.jupiter.timeout_secs),
            max_retries: self.jupiter.max_retries,
            slippage_bps: self.jupiter.slippage_bps,
            priority_fee_lamports: self.jupiter.priority_fee_lamports,
        }
    }

    pub fn raydium_config(&self) -> RaydiumConfig {
        RaydiumConfig {
            api_base_url: self.raydium.api_url.clone(),
            trade_api_url: self.raydium.trade_api_url.clone(),
            slippage_bps: self.raydium.slippage_bps,
            compute_unit_price_micro_lamports: self.raydium.compute_unit_price_micro_lamports,
            ..RaydiumConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn minimal_config() -> String {
        format!("[market]\nmint = \"{}\"\n", MINT)
    }

    fn create_valid_config() -> String {
        format!(
            r#"
[solana]
rpc_url = "https://example-rpc.invalid"
keypair_path = "~/.config/solana/id.json"

[market]
mint = "{MINT}"
routing = "direct"

[distribution]
wallet_count = 5
amount_sol = 0.05

[trading]
buy_lower_sol = 0.002
buy_upper_sol = 0.004
fee_floor_sol = 0.015
interval_min_ms = 0
interval_max_ms = 0
cycle_delay_ms = 0
settle_delay_ms = 0
max_cycles = 3

[execution]
mode = "legacy"
fallback_to_direct = false

[bundle]
group_size = 2
tip_lamports = 20000

[logging]
level = "debug"

[alerts]
low_balance_threshold_sol = 0.05
"#
        )
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(create_valid_config().as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();

        assert_eq!(config.market.routing, Routing::Direct);
        assert_eq!(config.execution.mode, ExecutionMode::Legacy);
        assert_eq!(config.distribution.wallet_count, 5);
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.bundle.tip_lamports, 20_000);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config(&minimal_config()).unwrap();

        assert_eq!(config.market.routing, Routing::Aggregator);
        assert_eq!(config.execution.mode, ExecutionMode::Bundle);
        assert!(config.execution.fallback_to_direct);
        assert_eq!(config.distribution.wallet_count, 3);
        assert_eq!(config.trading.retries, 10);
        assert_eq!(config.bundle.group_size, 3);
        assert_eq!(config.bundle.tip_pick_limit, 4);
        assert_eq!(config.blockhash.refresh_ms, 1_000);
        assert_eq!(config.storage.roster_path, "data/wallets.json");
        assert!(config.logging.level.is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/config.toml");
        assert!(matches!(result.unwrap_err(), ConfigError::IoError(_)));
    }

    #[test]
    fn test_missing_market_section() {
        let result = parse_config("[solana]\nrpc_url = \"http://x\"\n");
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_invalid_mint() {
        let result = parse_config("[market]\nmint = \"not-a-key\"\n");
        assert!(matches!(result.unwrap_err(), ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_inverted_buy_range() {
        let toml = format!(
            "{}\n[trading]\nbuy_lower_sol = 0.01\nbuy_upper_sol = 0.001\n",
            minimal_config()
        );
        assert!(matches!(parse_config(&toml), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_inverted_interval() {
        let toml = format!(
            "{}\n[trading]\ninterval_min_ms = 5000\ninterval_max_ms = 1000\n",
            minimal_config()
        );
        assert!(matches!(parse_config(&toml), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_zero_wallets() {
        let toml = format!("{}\n[distribution]\nwallet_count = 0\n", minimal_config());
        assert!(matches!(parse_config(&toml), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_group_size_leaves_room_for_tip() {
        let toml = format!("{}\n[bundle]\ngroup_size = 5\n", minimal_config());
        assert!(matches!(parse_config(&toml), Err(ConfigError::ValidationError(_))));

        let toml = format!("{}\n[bundle]\ngroup_size = 4\n", minimal_config());
        assert!(parse_config(&toml).is_ok());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let toml = format!("{}\n[execution]\nmode = \"turbo\"\n", minimal_config());
        assert!(matches!(parse_config(&toml), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_swarm_settings_conversion() {
        let config = parse_config(&create_valid_config()).unwrap();
        let settings = config.swarm_settings().unwrap();

        assert_eq!(settings.trading.mint.to_string(), MINT);
        assert_eq!(
            settings.trading.buy_policy,
            BuyAmountPolicy::Random {
                lower: 0.002,
                upper: 0.004
            }
        );
        assert_eq!(settings.trading.retry.max_attempts, 11);
        assert_eq!(settings.trading.max_cycles, Some(3));
        assert_eq!(settings.trading.low_balance_alert_sol, Some(0.05));
        assert_relative_eq!(settings.distribution.buy_upper_sol, 0.004);
        assert_relative_eq!(settings.distribution.fee_floor_sol, 0.015);
        assert_eq!(settings.bundle.group_size, 2);
        assert_eq!(settings.mode, ExecutionMode::Legacy);
        assert!(!settings.fallback_to_direct);
    }

    #[test]
    fn test_fixed_buy_policy() {
        let toml = format!("{}\n[trading]\nfixed_buy_sol = 0.003\n", minimal_config());
        let settings = parse_config(&toml).unwrap().swarm_settings().unwrap();
        assert_eq!(settings.trading.buy_policy, BuyAmountPolicy::Fixed(0.003));
    }

    #[test]
    fn test_keypair_path_tilde_expansion() {
        let config = parse_config(&create_valid_config()).unwrap();
        let path = config.solana.expanded_keypair_path().unwrap();
        assert!(!path.starts_with('~'));
        assert!(path.ends_with(".config/solana/id.json"));
    }

    #[test]
    fn test_telegram_disabled_by_default() {
        let config = parse_config(&minimal_config()).unwrap();
        assert!(config.alerts.telegram_credentials().is_none());
    }
}
