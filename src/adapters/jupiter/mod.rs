//! Jupiter Adapter
//!
//! Aggregator routing: quote and swap transactions from the Jupiter API,
//! signed locally by the trading wallet.

mod builder;
mod client;
mod error;
mod quote;
mod swap;

pub use builder::JupiterSwapBuilder;
pub use client::{JupiterClient, JupiterConfig, Quote};
pub use error::JupiterError;
pub use quote::{QuoteRequest, QuoteResponse};
pub use swap::{SwapRequest, SwapResponse};
