//! V2 Pair Liquidity Probe
//!
//! Reads a freshly created pair's reserves, orients them on the base asset
//! via `token0()`/`token1()`, and values the base-asset side in USD.
//! The token side of the pair is not counted.
//!
//! Author: AI-Generated
//! Created: 2026-02-04

use crate::chain::{read_state, ChainClient};
use crate::contracts::IUniswapV2Pair;
use crate::error::BotResult;
use crate::oracle::PriceFeed;
use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

/// Fractional digits kept when converting raw units to Decimal
const MAX_FRACTION_DIGITS: u32 = 6;

pub struct LiquidityProbe {
    client: Arc<dyn ChainClient>,
    price_feed: Arc<dyn PriceFeed>,
    base_asset: Address,
    base_decimals: u8,
}

impl LiquidityProbe {
    pub fn new(
        client: Arc<dyn ChainClient>,
        price_feed: Arc<dyn PriceFeed>,
        base_asset: Address,
        base_decimals: u8,
    ) -> Self {
        Self {
            client,
            price_feed,
            base_asset,
            base_decimals,
        }
    }

    /// Base-asset reserve of `pair` in smallest units. Zero when neither side is the base asset.
    pub async fn base_reserve(&self, pair: Address) -> BotResult<U256> {
        let client = self.client.as_ref();
        let (token0, token1, reserves) = tokio::try_join!(
            read_state(client, pair, IUniswapV2Pair::token0Call {}),
            read_state(client, pair, IUniswapV2Pair::token1Call {}),
            read_state(client, pair, IUniswapV2Pair::getReservesCall {}),
        )?;

        let reserve = if token0 == self.base_asset {
            U256::from(reserves.reserve0)
        } else if token1 == self.base_asset {
            U256::from(reserves.reserve1)
        } else {
            U256::ZERO
        };
        Ok(reserve)
    }

    /// USD value of the pair's base-asset reserve
    pub async fn liquidity_usd(&self, pair: Address) -> BotResult<Decimal> {
        let reserve = self.base_reserve(pair).await?;
        if reserve.is_zero() {
            return Ok(Decimal::ZERO);
        }

        let price = self.price_feed.base_asset_usd().await?;
        let usd = reserve_to_usd(reserve, self.base_decimals, price);
        debug!("Pair {:?}: base reserve {} → ${}", pair, reserve, usd);
        Ok(usd)
    }
}

/// Convert smallest units to a Decimal of whole units, truncated to 6 fractional digits.
/// None when the value does not fit Decimal's 96-bit mantissa.
pub fn units_to_decimal(amount: U256, decimals: u8) -> Option<Decimal> {
    let decimals = decimals as u32;
    let (mantissa, scale) = if decimals > MAX_FRACTION_DIGITS {
        let divisor = U256::from(10u64).checked_pow(U256::from(decimals - MAX_FRACTION_DIGITS))?;
        (amount / divisor, MAX_FRACTION_DIGITS)
    } else {
        (amount, decimals)
    };

    let mantissa = i128::try_from(u128::try_from(mantissa).ok()?).ok()?;
    Decimal::try_from_i128_with_scale(mantissa, scale).ok()
}

/// Reserve value in USD; saturates at `Decimal::MAX` for absurdly large reserves
pub fn reserve_to_usd(reserve: U256, decimals: u8, price_usd: Decimal) -> Decimal {
    units_to_decimal(reserve, decimals)
        .and_then(|units| units.checked_mul(price_usd))
        .unwrap_or(Decimal::MAX)
}
