//! Run Statistics
//!
//! Counters shared by every wallet task of one run.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RunStats {
    buys: AtomicU64,
    sells: AtomicU64,
    failed_wallets: AtomicU64,
    tips_built: AtomicU64,
    direct_fallbacks: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub buys: u64,
    pub sells: u64,
    pub failed_wallets: u64,
    pub tips_built: u64,
    pub direct_fallbacks: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_buy(&self) -> u64 {
        self.buys.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_sell(&self) -> u64 {
        self.sells.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_failed_wallet(&self) -> u64 {
        self.failed_wallets.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_tips(&self, count: u32) {
        self.tips_built.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.direct_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            buys: self.buys.load(Ordering::Relaxed),
            sells: self.sells.load(Ordering::Relaxed),
            failed_wallets: self.failed_wallets.load(Ordering::Relaxed),
            tips_built: self.tips_built.load(Ordering::Relaxed),
            direct_fallbacks: self.direct_fallbacks.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "buys={} sells={} failed_wallets={} tips={} fallbacks={}",
            self.buys, self.sells, self.failed_wallets, self.tips_built, self.direct_fallbacks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_counters_across_tasks() {
        let stats = Arc::new(RunStats::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let stats = Arc::clone(&stats);
            handles.push(tokio::spawn(async move {
                for _ in 0..10 {
                    stats.record_buy();
                    stats.record_sell();
                }
                stats.record_tips(3);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let snap = stats.snapshot();
        assert_eq!(snap.buys, 80);
        assert_eq!(snap.sells, 80);
        assert_eq!(snap.tips_built, 24);
        assert_eq!(snap.failed_wallets, 0);
    }

    #[test]
    fn test_record_returns_running_total() {
        let stats = RunStats::new();
        assert_eq!(stats.record_buy(), 1);
        assert_eq!(stats.record_buy(), 2);
        assert_eq!(stats.record_failed_wallet(), 1);
        assert!(stats.snapshot().to_string().contains("buys=2"));
    }
}
