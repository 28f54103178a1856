//! Roster Port
//!
//! Durable list of managed wallets. An empty roster means first run.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::wallet::{WalletRecord, WalletUpdate};

#[derive(Debug, Clone, Error)]
pub enum RosterError {
    #[error("Failed to read roster: {0}")]
    Read(String),
    #[error("Failed to write roster: {0}")]
    Write(String),
    #[error("Roster file is corrupted: {0}")]
    Corrupted(String),
    #[error("No roster entry for wallet {0}")]
    UnknownWallet(String),
}

#[async_trait]
pub trait RosterStore: Send + Sync {
    async fn read_all(&self) -> Result<Vec<WalletRecord>, RosterError>;

    /// Replace the whole roster (initial creation)
    async fn write_all(&self, records: &[WalletRecord]) -> Result<(), RosterError>;

    /// Merge `update` into the record with the same public address
    async fn upsert(&self, update: &WalletUpdate) -> Result<(), RosterError>;
}
