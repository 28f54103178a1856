//! Wallet Records
//!
//! The roster entry for one managed wallet, and the partial update applied
//! after each settled buy or sell.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use thiserror::Error;

/// Explorer prefix used for settlement references
pub const EXPLORER_TX_URL: &str = "https://solscan.io/tx/";

/// SPL associated token account program
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid base58 secret key: {0}")]
    InvalidEncoding(String),
    #[error("Invalid keypair bytes: {0}")]
    InvalidKeypair(String),
    #[error("Public address mismatch: record says {recorded}, key derives {derived}")]
    AddressMismatch { recorded: String, derived: String },
}

/// One managed wallet, as persisted in the roster file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    /// Base58-encoded 64-byte secret key
    pub private_key: String,
    /// Base58 public address
    #[serde(rename = "pubkey")]
    pub public_address: String,
    /// Last known SOL balance (advisory, the network is authoritative)
    pub sol_balance: f64,
    /// Reference to the most recent settled buy
    #[serde(rename = "tokenBuyTx")]
    pub last_buy_ref: Option<String>,
    /// Reference to the most recent settled sell
    #[serde(rename = "tokenSellTx")]
    pub last_sell_ref: Option<String>,
    /// When this record was last mutated
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WalletRecord {
    /// Create a record for a freshly generated wallet
    pub fn new(keypair: &Keypair, sol_balance: f64) -> Self {
        Self {
            private_key: bs58::encode(keypair.to_bytes()).into_string(),
            public_address: keypair.pubkey().to_string(),
            sol_balance,
            last_buy_ref: None,
            last_sell_ref: None,
            updated_at: Some(Utc::now()),
        }
    }

    /// Decode the secret key and check it matches the recorded address
    pub fn keypair(&self) -> Result<Keypair, WalletError> {
        let bytes = bs58::decode(&self.private_key)
            .into_vec()
            .map_err(|e| WalletError::InvalidEncoding(e.to_string()))?;

        let keypair = Keypair::try_from(bytes.as_slice())
            .map_err(|e| WalletError::InvalidKeypair(e.to_string()))?;

        let derived = keypair.pubkey().to_string();
        if derived != self.public_address {
            return Err(WalletError::AddressMismatch {
                recorded: self.public_address.clone(),
                derived,
            });
        }

        Ok(keypair)
    }

    /// Parse the public address
    pub fn pubkey(&self) -> Option<Pubkey> {
        self.public_address.parse().ok()
    }

    /// Merge a settlement update into this record
    pub fn apply(&mut self, update: &WalletUpdate) {
        if let Some(balance) = update.sol_balance {
            self.sol_balance = balance;
        }
        if let Some(ref buy) = update.last_buy_ref {
            self.last_buy_ref = Some(buy.clone());
        }
        if let Some(ref sell) = update.last_sell_ref {
            self.last_sell_ref = Some(sell.clone());
        }
        self.updated_at = Some(Utc::now());
    }
}

/// Partial record update, keyed by public address
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletUpdate {
    pub public_address: String,
    pub sol_balance: Option<f64>,
    pub last_buy_ref: Option<String>,
    pub last_sell_ref: Option<String>,
}

impl WalletUpdate {
    pub fn new(public_address: impl Into<String>) -> Self {
        Self {
            public_address: public_address.into(),
            ..Default::default()
        }
    }

    pub fn with_balance(mut self, sol: f64) -> Self {
        self.sol_balance = Some(sol);
        self
    }

    pub fn with_buy(mut self, reference: String) -> Self {
        self.last_buy_ref = Some(reference);
        self
    }

    pub fn with_sell(mut self, reference: String) -> Self {
        self.last_sell_ref = Some(reference);
        self
    }
}

/// Explorer URL for a settled transaction
pub fn explorer_ref(signature: &Signature) -> String {
    format!("{}{}", EXPLORER_TX_URL, signature)
}

/// Associated token account holding `mint` for `owner`
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[owner.as_ref(), spl_token::id().as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .0
}

/// Convert lamports to whole SOL
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Convert whole SOL to lamports, rounded to the nearest lamport
pub fn sol_to_lamports(sol: f64) -> u64 {
    if sol <= 0.0 {
        return 0;
    }
    (sol * LAMPORTS_PER_SOL as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_record_keypair_roundtrip() {
        let kp = Keypair::new();
        let record = WalletRecord::new(&kp, 0.05);

        let decoded = record.keypair().unwrap();
        assert_eq!(decoded.pubkey(), kp.pubkey());
        assert_eq!(record.pubkey(), Some(kp.pubkey()));
        assert!(record.last_buy_ref.is_none());
        assert!(record.last_sell_ref.is_none());
    }

    #[test]
    fn test_record_rejects_mismatched_address() {
        let kp = Keypair::new();
        let mut record = WalletRecord::new(&kp, 0.05);
        record.public_address = Keypair::new().pubkey().to_string();

        assert!(matches!(
            record.keypair(),
            Err(WalletError::AddressMismatch { .. })
        ));
    }

    #[test]
    fn test_record_rejects_garbage_key() {
        let kp = Keypair::new();
        let mut record = WalletRecord::new(&kp, 0.05);
        record.private_key = "0OIl".to_string(); // not base58

        assert!(matches!(record.keypair(), Err(WalletError::InvalidEncoding(_))));
    }

    #[test]
    fn test_apply_only_touches_given_fields() {
        let kp = Keypair::new();
        let mut record = WalletRecord::new(&kp, 0.05);

        record.apply(&WalletUpdate::new(record.public_address.clone()).with_buy("buy-1".into()));
        assert_eq!(record.last_buy_ref.as_deref(), Some("buy-1"));
        assert_relative_eq!(record.sol_balance, 0.05);

        record.apply(
            &WalletUpdate::new(record.public_address.clone())
                .with_sell("sell-1".into())
                .with_balance(0.042),
        );
        assert_eq!(record.last_buy_ref.as_deref(), Some("buy-1"));
        assert_eq!(record.last_sell_ref.as_deref(), Some("sell-1"));
        assert_relative_eq!(record.sol_balance, 0.042);
    }

    #[test]
    fn test_roster_json_field_names() {
        let kp = Keypair::new();
        let record = WalletRecord::new(&kp, 0.1);
        let json = serde_json::to_value(&record).unwrap();

        assert!(json.get("privateKey").is_some());
        assert!(json.get("pubkey").is_some());
        assert!(json.get("solBalance").is_some());
        assert!(json.get("tokenBuyTx").is_some());
        assert!(json.get("tokenSellTx").is_some());
    }

    #[test]
    fn test_legacy_roster_without_timestamp_parses() {
        let kp = Keypair::new();
        let json = format!(
            r#"[{{"privateKey":"{}","pubkey":"{}","solBalance":0.02,"tokenBuyTx":null,"tokenSellTx":null}}]"#,
            bs58::encode(kp.to_bytes()).into_string(),
            kp.pubkey()
        );

        let records: Vec<WalletRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].updated_at.is_none());
        assert_eq!(records[0].keypair().unwrap().pubkey(), kp.pubkey());
    }

    #[test]
    fn test_sol_lamport_conversions() {
        assert_eq!(sol_to_lamports(0.01), 10_000_000);
        assert_eq!(sol_to_lamports(-1.0), 0);
        assert_relative_eq!(lamports_to_sol(1_500_000_000), 1.5);
    }

    #[test]
    fn test_associated_token_address_is_deterministic_pda() {
        let owner: Pubkey = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM".parse().unwrap();
        let mint = spl_token::native_mint::ID;
        let a = associated_token_address(&owner, &mint);
        let b = associated_token_address(&owner, &mint);
        assert_eq!(a, b);
        assert_ne!(a, associated_token_address(&Pubkey::new_unique(), &mint));
        assert!(!a.is_on_curve());
    }

    #[test]
    fn test_explorer_ref_format() {
        let sig = Signature::default();
        assert!(explorer_ref(&sig).starts_with("https://solscan.io/tx/"));
    }
}
