//! Domain Layer - Core types for the wallet swarm
//!
//! Pure types and logic with no I/O. All external interactions happen
//! through the ports layer.
//!
//! - `wallet`: roster records and key handling
//! - `cycle`: per-wallet buy/sell phases, amount policy and pacing
//! - `bundle`: grouping, tip account choice and bundle outcomes
//! - `retry`: bounded retry combinator shared by every stage
//! - `stats`: run-wide counters

pub mod bundle;
pub mod cycle;
pub mod retry;
pub mod stats;
pub mod wallet;

pub use bundle::{BundleOutcome, BundleReport, GroupReport};
pub use cycle::{BuyAmountPolicy, CyclePhase, Pacing};
pub use retry::{retry, Backoff, RetryOutcome, RetryPolicy};
pub use stats::{RunStats, StatsSnapshot};
pub use wallet::{WalletError, WalletRecord, WalletUpdate};
