//! Sell retry policy
//!
//! A sell gets `1 + max_retries` attempts with a fixed delay in between.
//! Deterministic errors (bad slippage, bad config) give up immediately since
//! another attempt would fail identically.

use crate::error::BotError;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait this long, then re-read balance and re-quote
    Retry(Duration),
    GiveUp,
}

#[derive(Debug, Clone, Copy)]
pub struct SellRetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl SellRetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Decision after the 1-based `attempt` failed with `err`
    pub fn decide(&self, attempt: u32, err: &BotError) -> RetryDecision {
        if !err.is_transient() || attempt >= self.total_attempts() {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry(self.delay)
        }
    }
}
