//! Network Port
//!
//! Balance, submission and confirmation queries against the chain. Every
//! failure comes back as a `NetworkError` value, never a default.

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    #[error("RPC request failed: {0}")]
    Rpc(String),
    #[error("Transaction rejected by RPC: {0}")]
    Rejected(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Task join error: {0}")]
    Join(String),
}

/// Reference hash plus the last block height at which it is valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestBlockhash {
    pub hash: Hash,
    pub last_valid_block_height: u64,
}

/// Settlement state of a submitted signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureState {
    /// Reached confirmed commitment without error
    Confirmed,
    /// Landed but the program returned an error
    Failed(String),
}

#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Native balance in lamports
    async fn balance(&self, address: &Pubkey) -> Result<u64, NetworkError>;

    /// Raw token amount held in `owner`'s associated account for `mint`.
    ///
    /// `None` when the token account does not exist.
    async fn token_balance(&self, owner: &Pubkey, mint: &Pubkey)
        -> Result<Option<u64>, NetworkError>;

    /// Send without preflight simulation
    async fn send_raw_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, NetworkError>;

    /// `None` while the signature is unknown or below confirmed commitment
    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureState>, NetworkError>;

    async fn block_height(&self) -> Result<u64, NetworkError>;

    async fn latest_blockhash(&self) -> Result<LatestBlockhash, NetworkError>;
}
