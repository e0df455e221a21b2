//! Pool reads for the discovery liquidity gate
//!
//! Author: AI-Generated
//! Created: 2026-01-27
//! Modified: 2026-02-04 (reduced to the new-pair liquidity probe)

pub mod liquidity;

pub use liquidity::{reserve_to_usd, units_to_decimal, LiquidityProbe};
