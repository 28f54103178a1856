//! Jito Bundle Types
//!
//! JSON-RPC request and response shapes for the Block Engine bundle API.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ports::block_builder::BundleEvent;

/// Bundles per inflight status request
pub const MAX_STATUS_BATCH: usize = 5;

pub use crate::domain::bundle::MAX_BUNDLE_SIZE as MAX_BUNDLE_TRANSACTIONS;

/// JSON-RPC request envelope
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    pub params: Value,
}

impl JsonRpcRequest {
    fn new(method: &'static str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        }
    }

    /// `sendBundle` with base64-encoded transactions
    pub fn send_bundle(transactions: Vec<String>) -> Self {
        Self::new("sendBundle", json!([transactions, { "encoding": "base64" }]))
    }

    pub fn get_tip_accounts() -> Self {
        Self::new("getTipAccounts", json!([]))
    }

    pub fn get_inflight_bundle_statuses(bundle_ids: Vec<String>) -> Self {
        Self::new("getInflightBundleStatuses", json!([bundle_ids]))
    }
}

/// JSON-RPC response wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse<T> {
    /// Result (if success)
    pub result: Option<T>,
    /// Error (if failure)
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

/// Status reported for a bundle submitted in the last few minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum InflightStatus {
    Pending,
    Landed,
    Failed,
    Invalid,
    #[serde(other)]
    Unknown,
}

/// `getInflightBundleStatuses` result
#[derive(Debug, Clone, Deserialize)]
pub struct InflightBundleStatuses {
    pub value: Vec<InflightBundleEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InflightBundleEntry {
    pub bundle_id: String,
    pub status: InflightStatus,
    pub landed_slot: Option<u64>,
}

impl InflightBundleEntry {
    /// Event to publish, or `None` while still undecided
    pub fn to_event(&self) -> Option<BundleEvent> {
        match self.status {
            InflightStatus::Landed => Some(BundleEvent::accepted(&self.bundle_id, self.landed_slot)),
            InflightStatus::Failed => Some(BundleEvent::rejected(&self.bundle_id, "bundle failed")),
            InflightStatus::Invalid => {
                Some(BundleEvent::rejected(&self.bundle_id, "bundle invalid or expired"))
            }
            InflightStatus::Pending | InflightStatus::Unknown => None,
        }
    }
}
