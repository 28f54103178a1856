//! Bundle status watcher
//!
//! Polls in-flight statuses for every tracked bundle and publishes the
//! decided ones on the client's event hub. Bundles nobody resolves are
//! dropped after the tracking TTL.

use std::collections::HashMap;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::client::JitoBundleClient;
use super::types::{InflightBundleEntry, MAX_STATUS_BATCH};

/// Remove and return ids tracked for longer than `ttl`
pub(super) fn expire(tracked: &mut HashMap<String, Instant>, now: Instant, ttl: Duration) -> Vec<String> {
    let expired: Vec<String> = tracked
        .iter()
        .filter(|(_, submitted)| now.saturating_duration_since(**submitted) >= ttl)
        .map(|(id, _)| id.clone())
        .collect();
    for id in &expired {
        tracked.remove(id);
    }
    expired
}

impl JitoBundleClient {
    /// Start polling until `cancel` fires
    pub fn spawn_watcher(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(client.poll_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => client.poll_once().await,
                }
            }
            tracing::debug!("Bundle watcher stopped");
        })
    }

    /// One polling pass over every tracked bundle
    pub async fn poll_once(&self) {
        let pending: Vec<String> = match self.tracked.lock() {
            Ok(mut tracked) => {
                for id in expire(&mut tracked, Instant::now(), self.config.tracking_ttl) {
                    tracing::debug!("Stopped tracking bundle {}", id);
                }
                tracked.keys().cloned().collect()
            }
            Err(_) => return,
        };

        for chunk in pending.chunks(MAX_STATUS_BATCH) {
            match self.get_inflight_statuses(chunk.to_vec()).await {
                Ok(entries) => self.publish_decided(&entries),
                Err(e) => tracing::warn!("Inflight status poll failed: {}", e),
            }
        }
    }

    fn publish_decided(&self, entries: &[InflightBundleEntry]) {
        for entry in entries {
            let Some(event) = entry.to_event() else {
                continue;
            };
            if let Ok(mut tracked) = self.tracked.lock() {
                tracked.remove(&entry.bundle_id);
            }
            tracing::debug!("Bundle {} resolved: {:?}", entry.bundle_id, event.kind);
            self.hub.publish(event);
        }
    }
}
