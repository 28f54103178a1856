use async_trait::async_trait;
use solana_client::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::UiTransactionEncoding;
use spl_token::solana_program::program_pack::Pack;
use std::sync::Arc;

use crate::domain::wallet::associated_token_address;
use crate::ports::network::{LatestBlockhash, NetworkClient, NetworkError, SignatureState};

/// Raw amount held by a packed SPL token account
pub fn decode_token_amount(data: &[u8]) -> Result<u64, NetworkError> {
    spl_token::state::Account::unpack(data)
        .map(|account| account.amount)
        .map_err(|e| NetworkError::Rpc(format!("Invalid token account data: {}", e)))
}

/// Solana RPC client; blocking calls run on the blocking pool
#[derive(Clone)]
pub struct SolanaClient {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl SolanaClient {
    /// Create a client at `confirmed` commitment
    pub fn new(rpc_url: String) -> Self {
        let commitment = CommitmentConfig::confirmed();
        let client = Arc::new(RpcClient::new_with_commitment(rpc_url, commitment));
        Self { client, commitment }
    }

    pub fn url(&self) -> String {
        self.client.url()
    }

    async fn blocking<T, F>(&self, call: F) -> Result<T, NetworkError>
    where
        T: Send + 'static,
        F: FnOnce(&RpcClient) -> Result<T, NetworkError> + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || call(&client))
            .await
            .map_err(|e| NetworkError::Join(e.to_string()))?
    }
}

#[async_trait]
impl NetworkClient for SolanaClient {
    async fn balance(&self, address: &Pubkey) -> Result<u64, NetworkError> {
        let address = *address;
        self.blocking(move |client| {
            client
                .get_balance(&address)
                .map_err(|e| NetworkError::Rpc(e.to_string()))
        })
        .await
    }

    async fn token_balance(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Option<u64>, NetworkError> {
        let account = associated_token_address(owner, mint);
        let commitment = self.commitment;

        self.blocking(move |client| {
            let response = client
                .get_account_with_commitment(&account, commitment)
                .map_err(|e| NetworkError::Rpc(e.to_string()))?;

            response
                .value
                .map(|account| decode_token_amount(&account.data))
                .transpose()
        })
        .await
    }

    async fn send_raw_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, NetworkError> {
        let tx = transaction.clone();
        let config = RpcSendTransactionConfig {
            skip_preflight: true,
            encoding: Some(UiTransactionEncoding::Base64),
            ..RpcSendTransactionConfig::default()
        };

        self.blocking(move |client| {
            client
                .send_transaction_with_config(&tx, config)
                .map_err(|e| NetworkError::Rejected(e.to_string()))
        })
        .await
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureState>, NetworkError> {
        let signature = *signature;
        let commitment = self.commitment;

        self.blocking(move |client| {
            let statuses = client
                .get_signature_statuses(&[signature])
                .map_err(|e| NetworkError::Rpc(e.to_string()))?;

            let state = statuses.value.into_iter().next().flatten().and_then(|status| {
                if let Some(err) = &status.err {
                    Some(SignatureState::Failed(err.to_string()))
                } else if status.satisfies_commitment(commitment) {
                    Some(SignatureState::Confirmed)
                } else {
                    None
                }
            });
            Ok(state)
        })
        .await
    }

    async fn block_height(&self) -> Result<u64, NetworkError> {
        self.blocking(|client| {
            client
                .get_block_height()
                .map_err(|e| NetworkError::Rpc(e.to_string()))
        })
        .await
    }

    async fn latest_blockhash(&self) -> Result<LatestBlockhash, NetworkError> {
        let commitment = self.commitment;
        self.blocking(move |client| {
            client
                .get_latest_blockhash_with_commitment(commitment)
                .map(|(hash, last_valid_block_height)| LatestBlockhash {
                    hash,
                    last_valid_block_height,
                })
                .map_err(|e| NetworkError::Rpc(e.to_string()))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spl_token::state::{Account, AccountState};

    #[tokio::test]
    async fn test_client_creation() {
        let client = SolanaClient::new("https://api.devnet.solana.com".to_string());
        assert_eq!(client.url(), "https://api.devnet.solana.com");
    }

    #[test]
    fn test_decode_token_amount() {
        let account = Account {
            mint: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            amount: 42_000,
            state: AccountState::Initialized,
            ..Account::default()
        };
        let mut data = vec![0u8; Account::LEN];
        Account::pack(account, &mut data).unwrap();

        assert_eq!(decode_token_amount(&data).unwrap(), 42_000);
    }

    #[test]
    fn test_decode_garbage_is_error() {
        let result = decode_token_amount(&[1, 2, 3]);
        assert!(matches!(result, Err(NetworkError::Rpc(_))));
    }

    #[test]
    fn test_error_display() {
        let err = NetworkError::Rpc("test".to_string());
        assert!(err.to_string().contains("RPC request failed"));
    }
}
