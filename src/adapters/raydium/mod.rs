//! Raydium Adapter
//!
//! Direct routing against the highest-liquidity standard SOL pool.

mod builder;
mod client;
mod types;

pub use builder::RaydiumSwapBuilder;
pub use client::{RaydiumClient, RaydiumConfig};
