//! Trade execution: route selection, sell retry policy, buy/sell state machine
//!
//! Author: AI-Generated
//! Created: 2026-02-04

pub mod executor;
pub mod path;
pub mod retry;

pub use executor::TradeExecutor;
pub use path::{compute_min_out, SwapPathResolver};
pub use retry::{RetryDecision, SellRetryPolicy};
