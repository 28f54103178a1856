//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement:
//! - Chain access (balances, submission, confirmation)
//! - Swap transaction builders and market resolution
//! - Block builder bundles with a push-based result channel
//! - Wallet roster persistence
//! - Operator notifications

pub mod block_builder;
#[cfg(any(test, feature = "test-util"))]
pub mod mocks;
pub mod network;
pub mod notify;
pub mod roster;
pub mod swap;

pub use block_builder::{
    BlockBuilder, BlockBuilderError, BundleEvent, BundleEventHub, BundleEventKind,
    BundleSubscription,
};
pub use network::{LatestBlockhash, NetworkClient, NetworkError, SignatureState};
pub use notify::{notify_detached, NoopSink, NotificationSink, NotifyError};
pub use roster::{RosterError, RosterStore};
pub use swap::{MarketInfo, MarketResolver, SwapBuildError, SwapBuilder};
