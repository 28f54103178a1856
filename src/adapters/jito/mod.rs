//! Jito Bundle Adapter
//!
//! Atomic bundle submission via the Jito Block Engine, with a polling
//! watcher that turns in-flight statuses into pushed bundle events.

mod client;
mod config;
mod error;
mod types;
mod watcher;

pub use client::{encode_transaction, JitoBundleClient};
pub use config::{default_tip_accounts, endpoints, JitoConfig};
pub use error::JitoError;
pub use types::{InflightBundleEntry, InflightStatus};
