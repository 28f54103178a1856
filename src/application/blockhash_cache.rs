//! Blockhash Cache
//!
//! Background-refreshed reference hash. Readers get the latest value without
//! touching the network; a single refresher task is the only writer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ports::network::{LatestBlockhash, NetworkClient, NetworkError};

/// Default refresh period
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(1_000);

#[derive(Clone)]
pub struct BlockhashCache {
    network: Arc<dyn NetworkClient>,
    tx: Arc<watch::Sender<Option<LatestBlockhash>>>,
    rx: watch::Receiver<Option<LatestBlockhash>>,
    interval: Duration,
}

impl BlockhashCache {
    pub fn new(network: Arc<dyn NetworkClient>, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(None);
        Self {
            network,
            tx: Arc::new(tx),
            rx,
            interval,
        }
    }

    /// Latest cached value, `None` before the first successful refresh
    pub fn current(&self) -> Option<LatestBlockhash> {
        *self.rx.borrow()
    }

    /// Cached value, or a private fetch when nothing is cached yet.
    ///
    /// Never stores what it fetched; the refresher is the only writer.
    pub async fn get_or_fetch(&self) -> Result<LatestBlockhash, NetworkError> {
        match self.current() {
            Some(latest) => Ok(latest),
            None => self.fetch_fresh().await,
        }
    }

    /// Network read that bypasses the cached value and leaves it untouched
    pub async fn fetch_fresh(&self) -> Result<LatestBlockhash, NetworkError> {
        self.network.latest_blockhash().await
    }

    async fn refresh(&self) -> Result<LatestBlockhash, NetworkError> {
        let latest = self.network.latest_blockhash().await?;
        self.tx.send_replace(Some(latest));
        Ok(latest)
    }

    /// Start the refresher; it stops when `cancel` fires
    pub fn spawn(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cache.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Blockhash refresher stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        // A failed refresh keeps the previous value
                        if let Err(e) = cache.refresh().await {
                            tracing::warn!("Blockhash refresh failed: {}", e);
                        }
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for BlockhashCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockhashCache")
            .field("current", &self.current())
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::MockNetwork;

    #[tokio::test]
    async fn test_empty_before_first_refresh() {
        let cache = BlockhashCache::new(Arc::new(MockNetwork::new()), DEFAULT_REFRESH_INTERVAL);
        assert!(cache.current().is_none());
    }

    #[tokio::test]
    async fn test_get_or_fetch_leaves_cache_empty() {
        let network = MockNetwork::new();
        let cache = BlockhashCache::new(Arc::new(network.clone()), DEFAULT_REFRESH_INTERVAL);

        let first = cache.get_or_fetch().await.unwrap();
        let second = cache.get_or_fetch().await.unwrap();

        assert_ne!(first.hash, second.hash);
        assert!(cache.current().is_none());
        assert_eq!(network.blockhash_calls(), 2);
    }

    #[tokio::test]
    async fn test_fetch_fresh_ignores_cached_value() {
        let network = MockNetwork::new();
        let cache = BlockhashCache::new(Arc::new(network.clone()), DEFAULT_REFRESH_INTERVAL);
        let cached = cache.refresh().await.unwrap();

        let fresh = cache.fetch_fresh().await.unwrap();

        assert_ne!(fresh.hash, cached.hash);
        assert_eq!(cache.current(), Some(cached));
    }

    #[tokio::test]
    async fn test_refresh_stores_value() {
        let network = MockNetwork::new();
        let cache = BlockhashCache::new(Arc::new(network.clone()), DEFAULT_REFRESH_INTERVAL);

        let fetched = cache.refresh().await.unwrap();
        assert_eq!(cache.current(), Some(fetched));

        // Served from cache
        assert_eq!(cache.get_or_fetch().await.unwrap(), fetched);
        assert_eq!(network.blockhash_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_value() {
        let network = MockNetwork::new();
        let cache = BlockhashCache::new(Arc::new(network.clone()), DEFAULT_REFRESH_INTERVAL);
        let first = cache.refresh().await.unwrap();

        let failing = MockNetwork::new().with_blockhash_failures(1);
        let stale = BlockhashCache {
            network: Arc::new(failing),
            ..cache.clone()
        };
        assert!(stale.refresh().await.is_err());
        assert_eq!(cache.current(), Some(first));
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_refresher_updates_and_stops() {
        let network = MockNetwork::new().with_blockhash_failures(1);
        let cache = BlockhashCache::new(Arc::new(network.clone()), Duration::from_millis(100));
        let cancel = CancellationToken::new();
        let handle = cache.spawn(cancel.clone());

        // First tick fails, second one lands
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cache.current().is_some());
        assert_eq!(network.blockhash_calls(), 2);

        cancel.cancel();
        handle.await.unwrap();

        let calls = network.blockhash_calls();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(network.blockhash_calls(), calls);
    }
}
