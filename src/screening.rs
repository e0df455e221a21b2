//! Safety Screen
//!
//! Combines two independent signals into one admit/reject verdict:
//! - the risk-scoring API (risk label, buy/sell/transfer tax, flags)
//! - an on-chain resale simulation: quote selling one whole token back to
//!   the base asset through the router
//!
//! The two calls fail independently. A failed risk call makes the token
//! unclassified; a failed quote makes resale impossible. Both reject, and
//! neither is retried.
//!
//! Author: AI-Generated
//! Created: 2026-02-04

use crate::chain::{read_state, ChainClient};
use crate::contracts::IERC20;
use crate::oracle::RiskOracle;
use crate::trading::SwapPathResolver;
use crate::types::{ScreeningVerdict, Token, DEFAULT_DECIMALS};
use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Token metadata cache. Decimals are read once per token; a failed or
/// malformed `decimals()` falls back to 18. `symbol()` is best-effort.
pub struct TokenRegistry {
    client: Arc<dyn ChainClient>,
    tokens: DashMap<Address, Token>,
}

impl TokenRegistry {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self {
            client,
            tokens: DashMap::new(),
        }
    }

    pub async fn resolve(&self, address: Address) -> Token {
        if let Some(token) = self.tokens.get(&address) {
            return token.clone();
        }

        let client = self.client.as_ref();
        let (decimals, symbol) = tokio::join!(
            read_state(client, address, IERC20::decimalsCall {}),
            read_state(client, address, IERC20::symbolCall {}),
        );

        let decimals = decimals.unwrap_or_else(|e| {
            debug!("decimals() failed for {:?}, assuming {}: {}", address, DEFAULT_DECIMALS, e);
            DEFAULT_DECIMALS
        });
        let token = Token::new(address, decimals, symbol.ok());
        self.tokens.insert(address, token.clone());
        token
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

pub struct SafetyScreen {
    risk_oracle: Arc<dyn RiskOracle>,
    resolver: Arc<SwapPathResolver>,
    registry: Arc<TokenRegistry>,
    base_asset: Address,
}

impl SafetyScreen {
    pub fn new(
        risk_oracle: Arc<dyn RiskOracle>,
        resolver: Arc<SwapPathResolver>,
        registry: Arc<TokenRegistry>,
        base_asset: Address,
    ) -> Self {
        Self {
            risk_oracle,
            resolver,
            registry,
            base_asset,
        }
    }

    /// Fresh verdict for `token`. Never fails: every error degrades to a rejecting verdict.
    pub async fn evaluate(&self, token: Address) -> ScreeningVerdict {
        let meta = self.registry.resolve(token).await;

        let (report, resale_out) = tokio::join!(
            self.risk_oracle.assess(token),
            self.simulate_resale(&meta),
        );

        let verdict = match report {
            Ok(report) => ScreeningVerdict {
                risk: report.risk,
                buy_tax: report.buy_tax,
                sell_tax: report.sell_tax,
                transfer_tax: report.transfer_tax,
                flags: report.flags,
                resale_out,
            },
            Err(e) => {
                warn!("⚠️  Risk check for {} unavailable, treating as unclassified: {}", meta.label(), e);
                ScreeningVerdict::unclassified(resale_out)
            }
        };

        info!(
            "🔍 {} analysis: risk={} buyTax={:?} sellTax={:?} transferTax={:?} sellPossible={} flags={:?}",
            meta.label(),
            verdict.risk,
            verdict.buy_tax,
            verdict.sell_tax,
            verdict.transfer_tax,
            verdict.resale_ok(),
            verdict.flags
        );
        verdict
    }

    /// Quote selling one whole token on the direct token → base path.
    /// None when the quote fails or 10^decimals overflows.
    async fn simulate_resale(&self, token: &Token) -> Option<U256> {
        let one_unit = token.one_unit()?;
        match self
            .resolver
            .quote(one_unit, &[token.address, self.base_asset])
            .await
        {
            Ok(out) => Some(out),
            Err(e) => {
                debug!("Resale simulation failed for {}: {}", token.label(), e);
                None
            }
        }
    }
}
