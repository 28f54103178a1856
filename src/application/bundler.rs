//! Bundle Coordinator
//!
//! Splits transactions into fixed-size atomic groups, appends a tip payment
//! to each, submits through the block builder and resolves the result from
//! its push channel. Rejections and timeouts both retry the whole group with
//! a freshly built tip.

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::{
    hash::Hash,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
    transaction::VersionedTransaction,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::blockhash_cache::BlockhashCache;
use crate::domain::bundle::{
    partition, pick_tip_account, remainder_len, BundleOutcome, BundleReport, GroupReport,
    DEFAULT_GROUP_SIZE, DEFAULT_TIP_PICK_LIMIT,
};
use crate::domain::stats::RunStats;
use crate::ports::block_builder::{
    BlockBuilder, BlockBuilderError, BundleEventKind, BundleSubscription,
};
use crate::ports::network::NetworkError;

/// Default wait for an accepted notification
pub const DEFAULT_RESULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default attempts per group
pub const DEFAULT_GROUP_ATTEMPTS: u32 = 3;

/// Default tip per bundle
pub const DEFAULT_TIP_LAMPORTS: u64 = 10_000;

#[derive(Debug, Clone, Error)]
pub enum BundleError {
    #[error("Block builder returned no tip accounts")]
    NoTipAccounts,
    #[error("No reference hash available: {0}")]
    NoBlockhash(NetworkError),
    #[error("Failed to build tip transaction: {0}")]
    TipBuild(String),
    #[error(transparent)]
    Builder(#[from] BlockBuilderError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BundleConfig {
    pub group_size: usize,
    pub max_attempts: u32,
    pub result_timeout: Duration,
    pub tip_lamports: u64,
    pub tip_pick_limit: usize,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            group_size: DEFAULT_GROUP_SIZE,
            max_attempts: DEFAULT_GROUP_ATTEMPTS,
            result_timeout: DEFAULT_RESULT_TIMEOUT,
            tip_lamports: DEFAULT_TIP_LAMPORTS,
            tip_pick_limit: DEFAULT_TIP_PICK_LIMIT,
        }
    }
}

/// Signed transfer of `lamports` from `payer` to `tip_account`
pub fn build_tip_transaction(
    payer: &Keypair,
    tip_account: &Pubkey,
    lamports: u64,
    blockhash: Hash,
) -> Result<VersionedTransaction, BundleError> {
    let ix = system_instruction::transfer(&payer.pubkey(), tip_account, lamports);
    let message = v0::Message::try_compile(&payer.pubkey(), &[ix], &[], blockhash)
        .map_err(|e| BundleError::TipBuild(e.to_string()))?;

    VersionedTransaction::try_new(VersionedMessage::V0(message), &[payer])
        .map_err(|e| BundleError::TipBuild(e.to_string()))
}

/// Wait for `bundle_id` to be accepted, or until `timeout` elapses.
///
/// Rejections do not end the wait; the last one is reported if nothing was
/// accepted. Consumes the subscription so it is torn down on return.
pub async fn wait_for_result(
    mut subscription: BundleSubscription,
    bundle_id: &str,
    timeout: Duration,
) -> BundleOutcome {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut rejection: Option<String> = None;

    loop {
        match tokio::time::timeout_at(deadline, subscription.recv()).await {
            Ok(Some(event)) if event.bundle_id == bundle_id => match event.kind {
                BundleEventKind::Accepted { slot } => return BundleOutcome::Accepted { slot },
                BundleEventKind::Rejected { reason } => {
                    tracing::debug!("Bundle {} rejected: {}", bundle_id, reason);
                    rejection = Some(reason);
                }
            },
            Ok(Some(_)) => {}
            Ok(None) => {
                // Channel gone: nothing more can arrive before the deadline
                tokio::time::sleep_until(deadline).await;
                break;
            }
            Err(_) => break,
        }
    }

    match rejection {
        Some(reason) => BundleOutcome::Rejected { reason },
        None => BundleOutcome::TimedOut,
    }
}

#[derive(Clone)]
pub struct BundleCoordinator {
    builder: Arc<dyn BlockBuilder>,
    cache: BlockhashCache,
    config: BundleConfig,
    stats: Arc<RunStats>,
}

impl BundleCoordinator {
    pub fn new(
        builder: Arc<dyn BlockBuilder>,
        cache: BlockhashCache,
        config: BundleConfig,
        stats: Arc<RunStats>,
    ) -> Self {
        Self {
            builder,
            cache,
            config,
            stats,
        }
    }

    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// Partition `transactions` and submit every complete group.
    ///
    /// All groups are attempted even after one fails; the report is a
    /// success only when each of them was accepted.
    pub async fn bundle(
        &self,
        transactions: Vec<VersionedTransaction>,
        payer: &Keypair,
        cancel: &CancellationToken,
    ) -> BundleReport {
        let dropped = remainder_len(transactions.len(), self.config.group_size);
        if dropped > 0 {
            tracing::warn!(
                "Dropping {} trailing transactions that do not fill a group of {}",
                dropped,
                self.config.group_size
            );
        }

        let groups = partition(transactions, self.config.group_size);
        let mut report = BundleReport {
            groups: Vec::with_capacity(groups.len()),
            dropped,
        };

        for (index, group) in groups.into_iter().enumerate() {
            if cancel.is_cancelled() {
                report.groups.push(GroupReport::new(index));
                continue;
            }

            let group_report = self.submit_group(&group, payer, index, cancel).await;
            if !group_report.is_accepted() {
                tracing::error!(
                    "Bundle group {} not accepted after {} attempts",
                    index,
                    group_report.attempts
                );
            }
            report.groups.push(group_report);
        }

        tracing::info!(
            "Bundle run: {}/{} groups accepted, {} tips built",
            report.accepted_groups(),
            report.groups.len(),
            report.tips_built()
        );
        report
    }

    /// Submit one group with a tip paid by `payer`, retrying within budget
    pub async fn submit_group(
        &self,
        transactions: &[VersionedTransaction],
        payer: &Keypair,
        index: usize,
        cancel: &CancellationToken,
    ) -> GroupReport {
        let mut report = GroupReport::new(index);

        for attempt in 1..=self.config.max_attempts {
            if cancel.is_cancelled() {
                tracing::info!("Bundle group {} cancelled before attempt {}", index, attempt);
                break;
            }
            report.attempts = attempt;

            match self.attempt(transactions, payer, &mut report).await {
                Ok((bundle_id, outcome)) if outcome.is_accepted() => {
                    tracing::info!(
                        "Bundle {} (group {}) {} on attempt {}",
                        bundle_id,
                        index,
                        outcome,
                        attempt
                    );
                    report.bundle_id = Some(bundle_id);
                    report.last_outcome = Some(outcome);
                    return report;
                }
                Ok((bundle_id, outcome)) => {
                    tracing::warn!(
                        "Bundle {} (group {}) {} on attempt {}/{}",
                        bundle_id,
                        index,
                        outcome,
                        attempt,
                        self.config.max_attempts
                    );
                    report.last_outcome = Some(outcome);
                }
                Err(e) => {
                    tracing::warn!(
                        "Bundle group {} attempt {}/{} failed: {}",
                        index,
                        attempt,
                        self.config.max_attempts,
                        e
                    );
                    report.last_outcome = Some(BundleOutcome::Rejected {
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }

    async fn attempt(
        &self,
        transactions: &[VersionedTransaction],
        payer: &Keypair,
        report: &mut GroupReport,
    ) -> Result<(String, BundleOutcome), BundleError> {
        let accounts = self.builder.tip_accounts().await?;
        let tip_account = {
            let mut rng = rand::thread_rng();
            pick_tip_account(&accounts, self.config.tip_pick_limit, &mut rng)
        }
        .ok_or(BundleError::NoTipAccounts)?;

        let reference = self
            .cache
            .get_or_fetch()
            .await
            .map_err(BundleError::NoBlockhash)?;

        let tip = build_tip_transaction(payer, &tip_account, self.config.tip_lamports, reference.hash)?;
        report.tips_built += 1;
        self.stats.record_tips(1);

        let mut bundle = Vec::with_capacity(transactions.len() + 1);
        bundle.extend_from_slice(transactions);
        bundle.push(tip);

        // Subscribe first so an immediate result is not missed
        let subscription = self.builder.subscribe();
        let bundle_id = self.builder.submit_bundle(&bundle).await?;
        let outcome = wait_for_result(subscription, &bundle_id, self.config.result_timeout).await;

        Ok((bundle_id, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::blockhash_cache::DEFAULT_REFRESH_INTERVAL;
    use crate::ports::block_builder::BundleEvent;
    use crate::ports::mocks::{dummy_transaction, BundleScript, MockBlockBuilder, MockNetwork};

    fn coordinator(builder: &MockBlockBuilder) -> (BundleCoordinator, Arc<RunStats>) {
        let cache = BlockhashCache::new(Arc::new(MockNetwork::new()), DEFAULT_REFRESH_INTERVAL);
        let stats = Arc::new(RunStats::new());
        let coordinator = BundleCoordinator::new(
            Arc::new(builder.clone()),
            cache,
            BundleConfig::default(),
            stats.clone(),
        );
        (coordinator, stats)
    }

    fn transactions(payer: &Keypair, count: usize) -> Vec<VersionedTransaction> {
        (0..count).map(|_| dummy_transaction(payer)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt_with_three_tips() {
        let builder = MockBlockBuilder::new().with_script(vec![
            BundleScript::Fail("engine down".into()),
            BundleScript::Fail("engine down".into()),
            BundleScript::Accept,
        ]);
        let (coordinator, stats) = coordinator(&builder);
        let payer = Keypair::new();

        let report = coordinator
            .bundle(transactions(&payer, 3), &payer, &CancellationToken::new())
            .await;

        assert!(report.is_success());
        assert_eq!(report.tips_built(), 3);
        assert_eq!(report.groups[0].attempts, 3);
        assert_eq!(stats.snapshot().tips_built, 3);
        assert_eq!(builder.submit_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_silent_group_fails_whole_run() {
        let builder = MockBlockBuilder::new().with_script(vec![
            BundleScript::Accept,
            BundleScript::Silent,
            BundleScript::Silent,
            BundleScript::Silent,
            BundleScript::Accept,
            BundleScript::Accept,
        ]);
        let (coordinator, _) = coordinator(&builder);
        let payer = Keypair::new();

        let report = coordinator
            .bundle(transactions(&payer, 12), &payer, &CancellationToken::new())
            .await;

        assert!(!report.is_success());
        assert_eq!(report.groups.len(), 4);
        assert_eq!(report.accepted_groups(), 3);
        assert!(!report.groups[1].is_accepted());
        assert_eq!(report.groups[1].attempts, 3);
        assert_eq!(report.groups[1].last_outcome, Some(BundleOutcome::TimedOut));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_retries_like_timeout() {
        let builder = MockBlockBuilder::new()
            .with_script(vec![BundleScript::Reject("simulation failed".into()), BundleScript::Accept]);
        let (coordinator, _) = coordinator(&builder);
        let payer = Keypair::new();

        let report = coordinator
            .submit_group(&transactions(&payer, 1), &payer, 0, &CancellationToken::new())
            .await;

        assert!(report.is_accepted());
        assert_eq!(report.attempts, 2);
        assert_eq!(report.tips_built, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_rejected_reports_last_reason() {
        let builder = MockBlockBuilder::new().with_default(BundleScript::Reject("dropped".into()));
        let (coordinator, _) = coordinator(&builder);
        let payer = Keypair::new();

        let report = coordinator
            .submit_group(&transactions(&payer, 1), &payer, 0, &CancellationToken::new())
            .await;

        assert!(!report.is_accepted());
        assert_eq!(
            report.last_outcome,
            Some(BundleOutcome::Rejected { reason: "dropped".into() })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_remainder_is_never_submitted() {
        let builder = MockBlockBuilder::new();
        let (coordinator, _) = coordinator(&builder);
        let payer = Keypair::new();

        let report = coordinator
            .bundle(transactions(&payer, 7), &payer, &CancellationToken::new())
            .await;

        assert!(report.is_success());
        assert_eq!(report.groups.len(), 2);
        assert_eq!(report.dropped, 1);
        let submissions = builder.submissions();
        assert_eq!(submissions.len(), 2);
        // Three transactions plus the tip
        assert!(submissions.iter().all(|b| b.len() == 4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_list_is_not_success() {
        let builder = MockBlockBuilder::new();
        let (coordinator, _) = coordinator(&builder);
        let payer = Keypair::new();

        let report = coordinator
            .bundle(transactions(&payer, 2), &payer, &CancellationToken::new())
            .await;

        assert!(!report.is_success());
        assert_eq!(builder.submit_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tip_pays_one_of_first_accounts() {
        let builder = MockBlockBuilder::new();
        let (coordinator, _) = coordinator(&builder);
        let payer = Keypair::new();

        coordinator
            .submit_group(&transactions(&payer, 3), &payer, 0, &CancellationToken::new())
            .await;

        let bundle = builder.submissions().remove(0);
        let tip = bundle.last().unwrap();
        let keys = tip.message.static_account_keys();
        let eligible = &builder.tip_account_list()[..DEFAULT_TIP_PICK_LIMIT];
        assert!(keys.iter().any(|k| eligible.contains(k)));
        assert_eq!(keys[0], payer.pubkey());
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_events_are_ignored() {
        let builder = MockBlockBuilder::new().with_default(BundleScript::Silent);
        let (coordinator, _) = coordinator(&builder);
        let payer = Keypair::new();

        let publisher = builder.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            publisher.publish(BundleEvent::accepted("someone-else", Some(1)));
        });

        let report = coordinator
            .submit_group(&transactions(&payer, 1), &payer, 0, &CancellationToken::new())
            .await;

        assert!(!report.is_accepted());
        assert_eq!(report.last_outcome, Some(BundleOutcome::TimedOut));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscriptions_are_released() {
        let builder = MockBlockBuilder::new().with_script(vec![BundleScript::Silent]);
        let (coordinator, _) = coordinator(&builder);
        let payer = Keypair::new();

        coordinator
            .submit_group(&transactions(&payer, 1), &payer, 0, &CancellationToken::new())
            .await;

        assert_eq!(builder.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start() {
        let builder = MockBlockBuilder::new();
        let (coordinator, _) = coordinator(&builder);
        let payer = Keypair::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = coordinator.bundle(transactions(&payer, 6), &payer, &cancel).await;

        assert_eq!(report.groups.len(), 2);
        assert!(report.groups.iter().all(|g| g.attempts == 0));
        assert_eq!(builder.submit_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tip_account_failure_counts_as_attempt() {
        let builder = MockBlockBuilder::new().with_tip_failures(1);
        let (coordinator, _) = coordinator(&builder);
        let payer = Keypair::new();

        let report = coordinator
            .submit_group(&transactions(&payer, 1), &payer, 0, &CancellationToken::new())
            .await;

        assert!(report.is_accepted());
        assert_eq!(report.attempts, 2);
        assert_eq!(report.tips_built, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_only_reads_the_cache() {
        let network = MockNetwork::new();
        let cache = BlockhashCache::new(Arc::new(network.clone()), DEFAULT_REFRESH_INTERVAL);
        let builder = MockBlockBuilder::new();
        let coordinator = BundleCoordinator::new(
            Arc::new(builder.clone()),
            cache.clone(),
            BundleConfig::default(),
            Arc::new(RunStats::new()),
        );
        let payer = Keypair::new();

        let report = coordinator
            .submit_group(&transactions(&payer, 1), &payer, 0, &CancellationToken::new())
            .await;

        assert!(report.is_accepted());
        // Tip was built on a private fetch; no refresher, so nothing is stored
        assert_eq!(network.blockhash_calls(), 1);
        assert!(cache.current().is_none());
    }
}
