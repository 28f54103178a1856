//! Bounded Retry
//!
//! A retry combinator with an explicit attempt budget and backoff, returning
//! a tagged outcome instead of looping in caller code. Every wait between
//! attempts observes the shutdown token.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Delay between failed attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately
    None,
    /// Sleep a fixed duration between attempts
    Fixed(Duration),
}

impl Backoff {
    pub fn delay(&self) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(d) => *d,
        }
    }
}

/// Attempt budget for one call site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self { max_attempts, backoff }
    }

    /// Budget expressed as retries after the first attempt
    pub fn with_retries(retries: u32, delay: Duration) -> Self {
        Self::new(retries.saturating_add(1), Backoff::Fixed(delay))
    }

    /// No sleep between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Backoff::None)
    }
}

/// Tagged result of a retried operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Success { value: T, attempts: u32 },
    Exhausted { attempts: u32 },
    Cancelled { attempts: u32 },
}

/// Sleep for `duration` unless `cancel` fires first.
///
/// Returns `true` when the full duration elapsed.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if duration.is_zero() {
        return true;
    }

    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Run `op` until it succeeds, the budget is spent, or shutdown is requested.
///
/// `op` receives the 1-based attempt number. Cancellation is checked before
/// each attempt and during backoff, never in the middle of an attempt.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    context: &str,
    mut op: F,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempts = 0;

    while attempts < policy.max_attempts {
        if cancel.is_cancelled() {
            return RetryOutcome::Cancelled { attempts };
        }

        attempts += 1;
        match op(attempts).await {
            Ok(value) => return RetryOutcome::Success { value, attempts },
            Err(e) => {
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}",
                    context,
                    attempts,
                    policy.max_attempts,
                    e
                );
            }
        }

        if attempts < policy.max_attempts
            && !sleep_or_cancel(policy.backoff.delay(), cancel).await
        {
            return RetryOutcome::Cancelled { attempts };
        }
    }

    RetryOutcome::Exhausted { attempts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_success_first_try() {
        let cancel = CancellationToken::new();
        let outcome = retry(&RetryPolicy::immediate(3), &cancel, "op", |_| async {
            Ok::<_, String>(42)
        })
        .await;

        assert_eq!(outcome, RetryOutcome::Success { value: 42, attempts: 1 });
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let cancel = CancellationToken::new();
        let outcome = retry(&RetryPolicy::immediate(5), &cancel, "op", |attempt| async move {
            if attempt < 3 {
                Err(format!("boom {}", attempt))
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(outcome, RetryOutcome::Success { value: 3, attempts: 3 });
    }

    #[tokio::test]
    async fn test_exhausts_budget_with_increasing_counter() {
        let cancel = CancellationToken::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let outcome = retry(&RetryPolicy::immediate(11), &cancel, "op", move |attempt| {
            let seen = Arc::clone(&seen_clone);
            async move {
                seen.lock().unwrap().push(attempt);
                Err::<(), _>("nope")
            }
        })
        .await;

        assert_eq!(outcome, RetryOutcome::Exhausted { attempts: 11 });
        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen, (1..=11).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_backoff_between_attempts() {
        let cancel = CancellationToken::new();
        let start = tokio::time::Instant::now();

        let outcome = retry(
            &RetryPolicy::with_retries(2, Duration::from_millis(1000)),
            &cancel,
            "op",
            |_| async { Err::<(), _>("fail") },
        )
        .await;

        assert_eq!(outcome, RetryOutcome::Exhausted { attempts: 3 });
        // two sleeps, none after the final attempt
        assert_eq!(start.elapsed(), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicU32::new(0);

        let outcome = retry(&RetryPolicy::immediate(3), &cancel, "op", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>(()) }
        })
        .await;

        assert_eq!(outcome, RetryOutcome::Cancelled { attempts: 0 });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let outcome = retry(
            &RetryPolicy::with_retries(10, Duration::from_secs(60)),
            &cancel,
            "op",
            |_| async { Err::<(), _>("fail") },
        )
        .await;

        assert_eq!(outcome, RetryOutcome::Cancelled { attempts: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_or_cancel() {
        let cancel = CancellationToken::new();
        assert!(sleep_or_cancel(Duration::from_secs(5), &cancel).await);
        assert!(sleep_or_cancel(Duration::ZERO, &cancel).await);

        cancel.cancel();
        assert!(!sleep_or_cancel(Duration::from_secs(5), &cancel).await);
    }
}
