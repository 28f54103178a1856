//! Notification Port
//!
//! Fire-and-forget operator alerts. Delivery failures are logged and
//! never reach the caller.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), NotifyError>;
}

/// Sink used when alerts are disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    async fn send(&self, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Deliver `message` on a detached task
pub fn notify_detached(sink: &Arc<dyn NotificationSink>, message: String) {
    let sink = Arc::clone(sink);
    tokio::spawn(async move {
        if let Err(e) = sink.send(&message).await {
            tracing::warn!("{}", e);
        }
    });
}
