//! Bundle Grouping
//!
//! Pure helpers for splitting a transaction list into fixed-size atomic
//! groups, picking a tip recipient, and describing the result of a
//! grouped submission.

use rand::Rng;
use solana_sdk::pubkey::Pubkey;

/// Transactions per atomic group
pub const DEFAULT_GROUP_SIZE: usize = 3;

/// Transactions the block engine accepts in one bundle, tip included
pub const MAX_BUNDLE_SIZE: usize = 5;

/// Only the first few tip accounts are considered for a pick
pub const DEFAULT_TIP_PICK_LIMIT: usize = 4;

/// Split `items` into complete groups of `size`.
///
/// A trailing remainder shorter than `size` is dropped, never padded.
/// `size == 0` yields no groups.
pub fn partition<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    if size == 0 {
        return Vec::new();
    }

    let complete = items.len() / size * size;
    let mut iter = items.into_iter().take(complete);
    let mut groups = Vec::with_capacity(complete / size);

    loop {
        let group: Vec<T> = iter.by_ref().take(size).collect();
        if group.is_empty() {
            break;
        }
        groups.push(group);
    }

    groups
}

/// Number of items `partition` would discard
pub fn remainder_len(len: usize, size: usize) -> usize {
    if size == 0 {
        len
    } else {
        len % size
    }
}

/// Pick a tip recipient, biased to the first `pick_limit` entries.
///
/// The index is drawn over the whole list and then clamped, so the last
/// eligible entry absorbs the tail of the distribution.
pub fn pick_tip_account<R: Rng + ?Sized>(
    accounts: &[Pubkey],
    pick_limit: usize,
    rng: &mut R,
) -> Option<Pubkey> {
    if accounts.is_empty() || pick_limit == 0 {
        return None;
    }

    let drawn = rng.gen_range(0..accounts.len());
    let idx = drawn.min(pick_limit - 1).min(accounts.len() - 1);
    Some(accounts[idx])
}

/// Resolution of one bundle submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleOutcome {
    /// The block builder accepted the bundle
    Accepted { slot: Option<u64> },
    /// Only rejections were seen before the wait ended
    Rejected { reason: String },
    /// Nothing was heard before the wait ended
    TimedOut,
}

impl BundleOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, BundleOutcome::Accepted { .. })
    }

    /// Rejection and timeout both send the group back for another attempt
    pub fn should_retry(&self) -> bool {
        !self.is_accepted()
    }
}

impl std::fmt::Display for BundleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BundleOutcome::Accepted { slot: Some(slot) } => write!(f, "accepted (slot {})", slot),
            BundleOutcome::Accepted { slot: None } => write!(f, "accepted"),
            BundleOutcome::Rejected { reason } => write!(f, "rejected: {}", reason),
            BundleOutcome::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Result of one group after its retry budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    /// Position of the group in the partition
    pub index: usize,
    /// Bundle id of the accepted attempt
    pub bundle_id: Option<String>,
    /// Attempts made, including the accepted one
    pub attempts: u32,
    /// Tip transactions built for this group
    pub tips_built: u32,
    /// Outcome of the last attempt
    pub last_outcome: Option<BundleOutcome>,
}

impl GroupReport {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            bundle_id: None,
            attempts: 0,
            tips_built: 0,
            last_outcome: None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.bundle_id.is_some()
    }
}

/// Result of a whole partitioned submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleReport {
    pub groups: Vec<GroupReport>,
    /// Transactions dropped because they did not fill a group
    pub dropped: usize,
}

impl BundleReport {
    /// Every group was accepted, and there was at least one group
    pub fn is_success(&self) -> bool {
        !self.groups.is_empty() && self.groups.iter().all(GroupReport::is_accepted)
    }

    pub fn accepted_groups(&self) -> usize {
        self.groups.iter().filter(|g| g.is_accepted()).count()
    }

    pub fn tips_built(&self) -> u32 {
        self.groups.iter().map(|g| g.tips_built).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_partition_exact_multiple() {
        let groups = partition((0..9).collect::<Vec<_>>(), 3);
        assert_eq!(groups, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8]]);
    }

    #[test]
    fn test_partition_drops_remainder() {
        for len in 0..20usize {
            let groups = partition((0..len).collect::<Vec<_>>(), 3);
            assert_eq!(groups.len(), len / 3, "len {}", len);
            assert!(groups.iter().all(|g| g.len() == 3));
            let flattened: Vec<usize> = groups.into_iter().flatten().collect();
            assert_eq!(flattened, (0..(len / 3 * 3)).collect::<Vec<_>>());
            assert_eq!(remainder_len(len, 3), len % 3);
        }
    }

    #[test]
    fn test_partition_short_list_is_empty() {
        assert!(partition(vec!["a", "b"], 3).is_empty());
        assert!(partition(Vec::<u8>::new(), 3).is_empty());
    }

    #[test]
    fn test_partition_zero_size() {
        assert!(partition(vec![1, 2, 3], 0).is_empty());
        assert_eq!(remainder_len(3, 0), 3);
    }

    #[test]
    fn test_pick_tip_account_bounded() {
        let accounts: Vec<Pubkey> = (0..8).map(|_| Pubkey::new_unique()).collect();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..500 {
            let picked = pick_tip_account(&accounts, 4, &mut rng).unwrap();
            let idx = accounts.iter().position(|a| *a == picked).unwrap();
            assert!(idx < 4);
        }
    }

    #[test]
    fn test_pick_tip_account_short_list() {
        let accounts = vec![Pubkey::new_unique(), Pubkey::new_unique()];
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..50 {
            let picked = pick_tip_account(&accounts, 4, &mut rng).unwrap();
            assert!(accounts.contains(&picked));
        }
    }

    #[test]
    fn test_pick_tip_account_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(pick_tip_account(&[], 4, &mut rng).is_none());
        assert!(pick_tip_account(&[Pubkey::new_unique()], 0, &mut rng).is_none());
    }

    #[test]
    fn test_outcome_retry_routing() {
        assert!(!BundleOutcome::Accepted { slot: Some(1) }.should_retry());
        assert!(BundleOutcome::Rejected { reason: "x".into() }.should_retry());
        assert!(BundleOutcome::TimedOut.should_retry());
        assert_ne!(
            BundleOutcome::Rejected { reason: "x".into() },
            BundleOutcome::TimedOut
        );
    }

    #[test]
    fn test_report_success_requires_all_groups() {
        let mut ok = GroupReport::new(0);
        ok.bundle_id = Some("b0".into());
        ok.tips_built = 1;
        let mut failed = GroupReport::new(1);
        failed.tips_built = 3;

        let report = BundleReport { groups: vec![ok.clone(), failed], dropped: 0 };
        assert!(!report.is_success());
        assert_eq!(report.accepted_groups(), 1);
        assert_eq!(report.tips_built(), 4);

        let report = BundleReport { groups: vec![ok], dropped: 2 };
        assert!(report.is_success());
    }

    #[test]
    fn test_empty_report_is_not_success() {
        let report = BundleReport { groups: vec![], dropped: 2 };
        assert!(!report.is_success());
    }
}
