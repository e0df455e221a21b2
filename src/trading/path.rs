//! Swap Path Resolver
//!
//! Picks the best route for a swap out of a fixed candidate set:
//! the direct base ↔ token path, then one route through each configured
//! intermediate asset (USDT, USDC, ...). Each candidate is quoted with the
//! router's `getAmountsOut`; a route that reverts or returns a short amounts
//! array is discarded. The largest final output wins; ties keep the first
//! examined route.
//!
//! Minimum output is `floor(expected * (1 - slippage))`, computed in exact
//! integer arithmetic on the slippage's decimal mantissa.
//!
//! Author: AI-Generated
//! Created: 2026-02-04

use crate::chain::{read_state, ChainClient};
use crate::contracts::IUniswapV2Router02;
use crate::error::{BotError, BotResult};
use crate::types::SwapPlan;
use alloy::primitives::{Address, U256};
use futures::future::join_all;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

pub struct SwapPathResolver {
    client: Arc<dyn ChainClient>,
    router: Address,
    base_asset: Address,
    intermediates: Vec<Address>,
}

impl SwapPathResolver {
    pub fn new(
        client: Arc<dyn ChainClient>,
        router: Address,
        base_asset: Address,
        intermediates: Vec<Address>,
    ) -> Self {
        Self {
            client,
            router,
            base_asset,
            intermediates,
        }
    }

    /// Candidate routes base → token, direct route first
    pub fn buy_routes(&self, token: Address) -> Vec<Vec<Address>> {
        let mut routes = vec![vec![self.base_asset, token]];
        for hop in &self.intermediates {
            if *hop != token && *hop != self.base_asset {
                routes.push(vec![self.base_asset, *hop, token]);
            }
        }
        routes
    }

    /// Candidate routes token → base: the buy routes reversed
    pub fn sell_routes(&self, token: Address) -> Vec<Vec<Address>> {
        self.buy_routes(token)
            .into_iter()
            .map(|mut route| {
                route.reverse();
                route
            })
            .collect()
    }

    /// Final output of `getAmountsOut(amount_in, path)`
    pub async fn quote(&self, amount_in: U256, path: &[Address]) -> BotResult<U256> {
        let call = IUniswapV2Router02::getAmountsOutCall {
            amountIn: amount_in,
            path: path.to_vec(),
        };
        let amounts = read_state(self.client.as_ref(), self.router, call).await?;
        if amounts.len() < 2 {
            return Err(BotError::ContractReverted(format!(
                "getAmountsOut returned {} amounts",
                amounts.len()
            )));
        }
        amounts
            .last()
            .copied()
            .ok_or_else(|| BotError::ContractReverted("getAmountsOut returned no amounts".to_string()))
    }

    /// Quote every route; return the strictly largest positive output.
    /// Fails with `NoViableRoute` when every route is discarded.
    pub async fn best_route(
        &self,
        token: Address,
        amount_in: U256,
        routes: Vec<Vec<Address>>,
    ) -> BotResult<(Vec<Address>, U256)> {
        let quotes = join_all(routes.iter().map(|route| self.quote(amount_in, route))).await;

        let mut best: Option<(Vec<Address>, U256)> = None;
        for (route, quote) in routes.into_iter().zip(quotes) {
            match quote {
                Ok(out) if out.is_zero() => debug!("Route {:?} quotes zero, discarded", route),
                Ok(out) => {
                    let better = match &best {
                        Some((_, best_out)) => out > *best_out,
                        None => true,
                    };
                    if better {
                        best = Some((route, out));
                    }
                }
                Err(e) => debug!("Route {:?} discarded: {}", route, e),
            }
        }

        best.ok_or(BotError::NoViableRoute { token })
    }

    /// Best plan for spending `amount_in` of the base asset on `token`
    pub async fn plan_buy(&self, token: Address, amount_in: U256, slippage: Decimal) -> BotResult<SwapPlan> {
        self.plan(token, amount_in, slippage, self.buy_routes(token)).await
    }

    /// Best plan for selling `amount_in` of `token` back to the base asset
    pub async fn plan_sell(&self, token: Address, amount_in: U256, slippage: Decimal) -> BotResult<SwapPlan> {
        self.plan(token, amount_in, slippage, self.sell_routes(token)).await
    }

    async fn plan(
        &self,
        token: Address,
        amount_in: U256,
        slippage: Decimal,
        routes: Vec<Vec<Address>>,
    ) -> BotResult<SwapPlan> {
        // Reject bad slippage before spending RPC calls on quotes
        compute_min_out(U256::ZERO, slippage)?;

        let (path, expected_out) = self.best_route(token, amount_in, routes).await?;
        let min_out = compute_min_out(expected_out, slippage)?;
        Ok(SwapPlan {
            path,
            amount_in,
            expected_out,
            min_out,
        })
    }
}

/// `floor(expected_out * (1 - slippage))` for slippage in [0, 1].
///
/// With slippage = m / 10^k the result is `floor(E * (10^k - m) / 10^k)`.
/// If `E * (10^k - m)` overflows 256 bits, split `E = q * 10^k + r`; then
/// the result is exactly `q * (10^k - m) + floor(r * (10^k - m) / 10^k)`.
pub fn compute_min_out(expected_out: U256, slippage: Decimal) -> BotResult<U256> {
    if slippage < Decimal::ZERO || slippage > Decimal::ONE {
        return Err(BotError::InvalidSlippage(slippage));
    }

    let denom = U256::from(10u64).pow(U256::from(slippage.scale()));
    let numer = U256::from(slippage.mantissa().unsigned_abs());
    let keep = denom - numer;

    let min_out = match expected_out.checked_mul(keep) {
        Some(product) => product / denom,
        None => {
            let q = expected_out / denom;
            let r = expected_out % denom;
            q * keep + (r * keep) / denom
        }
    };
    Ok(min_out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockChain, ROUTER, USDC, USDT, WBNB};
    use alloy::primitives::address;
    use rust_decimal_macros::dec;

    const TOKEN: Address = address!("0x00000000000000000000000000000000000000aa");

    fn resolver(chain: Arc<MockChain>) -> SwapPathResolver {
        SwapPathResolver::new(chain, ROUTER, WBNB, vec![USDT, USDC])
    }

    #[test]
    fn test_min_out_floors() {
        assert_eq!(compute_min_out(U256::from(1_000u64), dec!(0.02)).unwrap(), U256::from(980u64));
        // 999 * 0.98 = 979.02
        assert_eq!(compute_min_out(U256::from(999u64), dec!(0.02)).unwrap(), U256::from(979u64));
        // 10 * 0.667 = 6.67
        assert_eq!(compute_min_out(U256::from(10u64), dec!(0.333)).unwrap(), U256::from(6u64));
    }

    #[test]
    fn test_min_out_bounds() {
        let e = U256::from(123_456_789u64);
        assert_eq!(compute_min_out(e, dec!(0)).unwrap(), e);
        assert_eq!(compute_min_out(e, dec!(1)).unwrap(), U256::ZERO);
        for s in [dec!(0.005), dec!(0.1), dec!(0.5), dec!(0.99)] {
            let m = compute_min_out(e, s).unwrap();
            assert!(m <= e);
        }
    }

    #[test]
    fn test_min_out_rejects_out_of_range() {
        assert!(matches!(
            compute_min_out(U256::from(1u64), dec!(1.5)),
            Err(BotError::InvalidSlippage(_))
        ));
        assert!(matches!(
            compute_min_out(U256::from(1u64), dec!(-0.01)),
            Err(BotError::InvalidSlippage(_))
        ));
    }

    #[test]
    fn test_min_out_exact_near_u256_max() {
        // floor(MAX * 0.5): MAX is odd, so this is (MAX - 1) / 2
        let half = compute_min_out(U256::MAX, dec!(0.5)).unwrap();
        assert_eq!(half, (U256::MAX - U256::from(1u64)) / U256::from(2u64));
        assert_eq!(compute_min_out(U256::MAX, dec!(0)).unwrap(), U256::MAX);
    }

    #[test]
    fn test_routes() {
        let r = resolver(Arc::new(MockChain::new()));
        assert_eq!(
            r.buy_routes(TOKEN),
            vec![vec![WBNB, TOKEN], vec![WBNB, USDT, TOKEN], vec![WBNB, USDC, TOKEN]]
        );
        assert_eq!(r.sell_routes(TOKEN)[1], vec![TOKEN, USDT, WBNB]);
        // A token that is itself an intermediate gets no self-hop
        assert_eq!(r.buy_routes(USDT), vec![vec![WBNB, USDT], vec![WBNB, USDC, USDT]]);
    }

    #[tokio::test]
    async fn test_best_route_picks_largest() {
        let chain = Arc::new(MockChain::new());
        chain.set_quote(&[WBNB, TOKEN], U256::from(500u64));
        chain.set_quote(&[WBNB, USDT, TOKEN], U256::from(700u64));
        chain.set_quote(&[WBNB, USDC, TOKEN], U256::from(600u64));
        let r = resolver(chain);

        let plan = r.plan_buy(TOKEN, U256::from(10u64), dec!(0.02)).await.unwrap();
        assert_eq!(plan.path, vec![WBNB, USDT, TOKEN]);
        assert_eq!(plan.expected_out, U256::from(700u64));
        assert_eq!(plan.min_out, U256::from(686u64));
        assert_eq!(plan.amount_in, U256::from(10u64));
    }

    #[tokio::test]
    async fn test_tie_keeps_first_and_reverts_are_skipped() {
        let chain = Arc::new(MockChain::new());
        // Direct route reverts (not registered); both hops tie
        chain.set_quote(&[WBNB, USDT, TOKEN], U256::from(700u64));
        chain.set_quote(&[WBNB, USDC, TOKEN], U256::from(700u64));
        let r = resolver(chain);

        let (path, out) = r
            .best_route(TOKEN, U256::from(10u64), r.buy_routes(TOKEN))
            .await
            .unwrap();
        assert_eq!(path, vec![WBNB, USDT, TOKEN]);
        assert_eq!(out, U256::from(700u64));
    }

    #[tokio::test]
    async fn test_no_viable_route() {
        let chain = Arc::new(MockChain::new());
        chain.set_quote(&[TOKEN, WBNB], U256::ZERO);
        let r = resolver(chain);

        let err = r.plan_sell(TOKEN, U256::from(10u64), dec!(0.02)).await.unwrap_err();
        assert!(matches!(err, BotError::NoViableRoute { token } if token == TOKEN));
    }

    #[tokio::test]
    async fn test_invalid_slippage_fails_before_quoting() {
        let chain = Arc::new(MockChain::new());
        chain.set_quote(&[WBNB, TOKEN], U256::from(500u64));
        let r = resolver(chain);

        let err = r.plan_buy(TOKEN, U256::from(10u64), dec!(2)).await.unwrap_err();
        assert!(matches!(err, BotError::InvalidSlippage(_)));
    }
}
