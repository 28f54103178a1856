//! Trading Cycle
//!
//! Per-wallet phase machine plus the sizing and pacing policies that drive it.

use std::fmt;
use std::time::Duration;

use rand::Rng;

/// Phase of one wallet's buy/sell cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CyclePhase {
    Idle,
    Buying,
    BoughtPendingSell,
    Selling,
    /// Absorbing: the wallet's loop is over
    Failed,
}

impl CyclePhase {
    /// Phase entered after the current one completes
    pub fn advance(self) -> Self {
        match self {
            CyclePhase::Idle => CyclePhase::Buying,
            CyclePhase::Buying => CyclePhase::BoughtPendingSell,
            CyclePhase::BoughtPendingSell => CyclePhase::Selling,
            CyclePhase::Selling => CyclePhase::Idle,
            CyclePhase::Failed => CyclePhase::Failed,
        }
    }

    /// Phase entered after a fatal condition
    pub fn fail(self) -> Self {
        CyclePhase::Failed
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePhase::Idle => "idle",
            CyclePhase::Buying => "buying",
            CyclePhase::BoughtPendingSell => "bought-pending-sell",
            CyclePhase::Selling => "selling",
            CyclePhase::Failed => "failed",
        }
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much SOL each buy spends
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuyAmountPolicy {
    Fixed(f64),
    /// Uniform draw from `[lower, upper]`, rounded to 6 decimals
    Random { lower: f64, upper: f64 },
}

impl BuyAmountPolicy {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            BuyAmountPolicy::Fixed(amount) => amount,
            BuyAmountPolicy::Random { lower, upper } => {
                if upper <= lower {
                    return lower;
                }
                let raw = rng.gen_range(lower..=upper);
                (raw * 1e6).round() / 1e6
            }
        }
    }

    /// Largest amount a single buy may spend
    pub fn upper_bound(&self) -> f64 {
        match *self {
            BuyAmountPolicy::Fixed(amount) => amount,
            BuyAmountPolicy::Random { lower, upper } => upper.max(lower),
        }
    }

    /// Smallest amount a single buy may spend
    pub fn lower_bound(&self) -> f64 {
        match *self {
            BuyAmountPolicy::Fixed(amount) => amount,
            BuyAmountPolicy::Random { lower, .. } => lower,
        }
    }
}

/// Named delays between phases (all milliseconds, zero allowed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub interval_min_ms: u64,
    pub interval_max_ms: u64,
    /// Fixed part of the idle delay
    pub cycle_delay_ms: u64,
    /// Wait between a settled buy and the token balance query
    pub settle_delay_ms: u64,
}

impl Pacing {
    /// Start offset for the wallet at `index`
    pub fn start_stagger(&self, index: usize) -> Duration {
        let mid = (self.interval_min_ms + self.interval_max_ms) / 2;
        Duration::from_millis(mid.saturating_mul(index as u64))
    }

    /// One randomized interval in `[min, max]`
    pub fn interval<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        if self.interval_max_ms <= self.interval_min_ms {
            return self.interval_min_ms;
        }
        rng.gen_range(self.interval_min_ms..=self.interval_max_ms)
    }

    /// Idle delay after a completed cycle, scaled by active wallets
    pub fn idle_delay<R: Rng + ?Sized>(&self, active_wallets: usize, rng: &mut R) -> Duration {
        let scaled = self.interval(rng).saturating_mul(active_wallets as u64);
        Duration::from_millis(self.cycle_delay_ms.saturating_add(scaled))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// No waiting anywhere
    pub fn zero() -> Self {
        Self {
            interval_min_ms: 0,
            interval_max_ms: 0,
            cycle_delay_ms: 0,
            settle_delay_ms: 0,
        }
    }
}
