//! Roster persisted as a JSON array of wallet records
//!
//! Writes go to a sibling temp file that is then renamed over the roster,
//! so a crash mid-write leaves the previous roster intact. A mutex
//! serializes read-modify-write cycles from concurrent wallet tasks.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::wallet::{WalletRecord, WalletUpdate};
use crate::ports::roster::{RosterError, RosterStore};

#[derive(Debug)]
pub struct JsonRosterStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonRosterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<WalletRecord>, RosterError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RosterError::Read(e.to_string())),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| RosterError::Corrupted(e.to_string()))
    }

    async fn store(&self, records: &[WalletRecord]) -> Result<(), RosterError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RosterError::Write(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(records)
            .map_err(|e| RosterError::Write(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| RosterError::Write(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| RosterError::Write(e.to_string()))
    }
}

#[async_trait]
impl RosterStore for JsonRosterStore {
    async fn read_all(&self) -> Result<Vec<WalletRecord>, RosterError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    async fn write_all(&self, records: &[WalletRecord]) -> Result<(), RosterError> {
        let _guard = self.lock.lock().await;
        self.store(records).await?;
        tracing::info!("Roster saved: {} wallets -> {}", records.len(), self.path.display());
        Ok(())
    }

    async fn upsert(&self, update: &WalletUpdate) -> Result<(), RosterError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;

        let record = records
            .iter_mut()
            .find(|r| r.public_address == update.public_address)
            .ok_or_else(|| RosterError::UnknownWallet(update.public_address.clone()))?;
        record.apply(update);

        self.store(&records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::Keypair;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_empty_roster() {
        let dir = TempDir::new().unwrap();
        let store = JsonRosterStore::new(dir.path().join("wallets.json"));
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_file_is_empty_roster() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wallets.json");
        std::fs::write(&path, "  \n").unwrap();

        assert!(JsonRosterStore::new(path).read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let store = JsonRosterStore::new(dir.path().join("data").join("wallets.json"));
        let records = vec![
            WalletRecord::new(&Keypair::new(), 0.01),
            WalletRecord::new(&Keypair::new(), 0.01),
        ];

        store.write_all(&records).await.unwrap();

        assert_eq!(store.read_all().await.unwrap(), records);
        assert!(!dir.path().join("data").join("wallets.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_uses_roster_field_names() {
        let dir = TempDir::new().unwrap();
        let store = JsonRosterStore::new(dir.path().join("wallets.json"));
        store
            .write_all(&[WalletRecord::new(&Keypair::new(), 0.5)])
            .await
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert!(raw[0].get("privateKey").is_some());
        assert!(raw[0].get("pubkey").is_some());
        assert_eq!(raw[0]["solBalance"], 0.5);
    }

    #[tokio::test]
    async fn test_upsert_merges_update() {
        let dir = TempDir::new().unwrap();
        let store = JsonRosterStore::new(dir.path().join("wallets.json"));
        let record = WalletRecord::new(&Keypair::new(), 0.02);
        store.write_all(&[record.clone()]).await.unwrap();

        store
            .upsert(
                &WalletUpdate::new(&record.public_address)
                    .with_balance(0.018)
                    .with_buy("https://solscan.io/tx/abc".into()),
            )
            .await
            .unwrap();

        let stored = &store.read_all().await.unwrap()[0];
        assert_eq!(stored.sol_balance, 0.018);
        assert_eq!(stored.last_buy_ref.as_deref(), Some("https://solscan.io/tx/abc"));
        assert_eq!(stored.private_key, record.private_key);
    }

    #[tokio::test]
    async fn test_upsert_unknown_wallet() {
        let dir = TempDir::new().unwrap();
        let store = JsonRosterStore::new(dir.path().join("wallets.json"));
        store.write_all(&[]).await.unwrap();

        let result = store.upsert(&WalletUpdate::new("nobody").with_balance(1.0)).await;
        assert!(matches!(result, Err(RosterError::UnknownWallet(_))));
    }

    #[tokio::test]
    async fn test_corrupted_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wallets.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = JsonRosterStore::new(path).read_all().await;
        assert!(matches!(result, Err(RosterError::Corrupted(_))));
    }

    #[tokio::test]
    async fn test_concurrent_upserts_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonRosterStore::new(dir.path().join("wallets.json")));
        let records: Vec<_> = (0..5).map(|_| WalletRecord::new(&Keypair::new(), 0.0)).collect();
        store.write_all(&records).await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for (i, record) in records.iter().enumerate() {
            let store = Arc::clone(&store);
            let update = WalletUpdate::new(&record.public_address).with_balance(i as f64 + 1.0);
            tasks.spawn(async move { store.upsert(&update).await });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        let stored = store.read_all().await.unwrap();
        for (i, record) in stored.iter().enumerate() {
            assert_eq!(record.sol_balance, i as f64 + 1.0);
        }
    }
}
