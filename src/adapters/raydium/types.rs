//! Raydium API v3 and trade API shapes

use serde::{Deserialize, Serialize};

/// Envelope shared by every Raydium endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub msg: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolPage {
    #[serde(default)]
    pub count: u64,
    pub data: Vec<PoolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfo {
    pub id: String,
    #[serde(rename = "type", default)]
    pub pool_type: String,
    #[serde(default)]
    pub tvl: f64,
    pub mint_a: MintRef,
    pub mint_b: MintRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MintRef {
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolKeys {
    pub id: String,
    pub mint_a: MintRef,
    pub mint_b: MintRef,
    pub vault: VaultPair,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VaultPair {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
}

/// `compute/swap-base-in` result; echoed back verbatim to build the transaction
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedSwap {
    #[serde(default)]
    pub output_amount: String,
    #[serde(default)]
    pub route_plan: Vec<RouteHop>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteHop {
    pub pool_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTransactionRequest {
    pub compute_unit_price_micro_lamports: String,
    pub swap_response: serde_json::Value,
    pub tx_version: &'static str,
    pub wallet: String,
    pub wrap_sol: bool,
    pub unwrap_sol: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_account: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncodedTransaction {
    pub transaction: String,
}
