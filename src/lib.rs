//! New-Pair Sniper Library
//!
//! Discovers freshly created DEX pairs, screens each new token for
//! honeypot/tax traps, and runs an automatic buy followed by a retried sell.
//!
//! Author: AI-Generated
//! Created: 2026-01-28
//! Modified: 2026-02-05 - Discovery → screening → execution pipeline

pub mod chain;
pub mod config;
pub mod contracts;
pub mod discovery;
pub mod error;
pub mod oracle;
pub mod pipeline;
pub mod pool;
pub mod screening;
pub mod trading;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::load_config;
pub use error::{BotError, BotResult};
pub use pipeline::Pipeline;
pub use types::{BotConfig, Candidate, RunSummary, ScreeningVerdict, SwapPlan, TradeState};
