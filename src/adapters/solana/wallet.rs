use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::VersionedTransaction,
};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::ports::swap::SwapBuildError;

#[derive(Debug, Error)]
pub enum KeyLoadError {
    #[error("Failed to load keypair from file: {0}")]
    LoadError(String),
    #[error("Invalid base58 key: {0}")]
    InvalidEncoding(String),
    #[error("Invalid keypair bytes: {0}")]
    InvalidKeypair(String),
}

/// Operator key loaded from the environment or a keypair file
pub struct WalletManager {
    keypair: Keypair,
}

impl WalletManager {
    /// Load keypair from a file path (JSON array format)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, KeyLoadError> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| KeyLoadError::LoadError(format!("Failed to read file: {}", e)))?;

        let bytes: Vec<u8> = serde_json::from_str(&contents)
            .map_err(|e| KeyLoadError::LoadError(format!("Invalid JSON format: {}", e)))?;

        Self::from_bytes(&bytes)
    }

    /// Load keypair from a base58-encoded secret key
    pub fn from_base58(encoded: &str) -> Result<Self, KeyLoadError> {
        let bytes = bs58::decode(encoded.trim())
            .into_vec()
            .map_err(|e| KeyLoadError::InvalidEncoding(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyLoadError> {
        let keypair =
            Keypair::try_from(bytes).map_err(|e| KeyLoadError::InvalidKeypair(e.to_string()))?;
        Ok(Self { keypair })
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn into_keypair(self) -> Keypair {
        self.keypair
    }
}

/// Decode a base64 transaction from a swap API and sign it with `signer`
pub fn sign_base64_transaction(
    encoded: &str,
    signer: &Keypair,
) -> Result<VersionedTransaction, SwapBuildError> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| SwapBuildError::Decode(format!("base64: {}", e)))?;
    let unsigned: VersionedTransaction = bincode::deserialize(&bytes)
        .map_err(|e| SwapBuildError::Decode(format!("bincode: {}", e)))?;

    VersionedTransaction::try_new(unsigned.message, &[signer])
        .map_err(|e| SwapBuildError::Signing(e.to_string()))
}
