//! Base Asset Price Feed
//!
//! USD price of the native/base asset, used to value pair reserves for the
//! liquidity gate. Backed by the CoinGecko `simple/price` endpoint with a
//! short TTL cache so a burst of new pairs costs one HTTP call.
//!
//! Key features:
//! - Cached price reused within the TTL
//! - Stale cache is NOT served after a failed refresh; the caller treats the
//!   failure as zero liquidity
//!
//! Author: AI-Generated
//! Created: 2026-02-04

use crate::error::{BotError, BotResult};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// USD value of one whole base-asset unit
    async fn base_asset_usd(&self) -> BotResult<Decimal>;
}

/// Cached price with its fetch time
#[derive(Debug, Clone, Copy)]
struct CachedPrice {
    usd: Decimal,
    fetched_at: Instant,
}

pub struct CoinGeckoPriceFeed {
    http: reqwest::Client,
    /// e.g. https://api.coingecko.com/api/v3
    base_url: String,
    /// CoinGecko asset id ("binancecoin")
    asset_id: String,
    cache: RwLock<Option<CachedPrice>>,
    cache_ttl: Duration,
}

impl CoinGeckoPriceFeed {
    pub fn new(base_url: &str, asset_id: &str, timeout: Duration) -> BotResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            asset_id: asset_id.to_string(),
            cache: RwLock::new(None),
            cache_ttl: Duration::from_secs(30),
        })
    }

    /// Set cache TTL
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    async fn fetch(&self) -> BotResult<Decimal> {
        let url = format!("{}/simple/price", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("ids", self.asset_id.as_str()), ("vs_currencies", "usd")])
            .send()
            .await
            .map_err(|e| BotError::ExternalApiUnavailable(format!("price API: {}", e)))?;

        if !response.status().is_success() {
            return Err(BotError::ExternalApiUnavailable(format!(
                "price API returned HTTP {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| BotError::ExternalApiUnavailable(format!("price API body: {}", e)))?;

        parse_price(&body, &self.asset_id)
    }
}

#[async_trait]
impl PriceFeed for CoinGeckoPriceFeed {
    async fn base_asset_usd(&self) -> BotResult<Decimal> {
        if let Some(cached) = *self.cache.read().await {
            if cached.fetched_at.elapsed() <= self.cache_ttl {
                return Ok(cached.usd);
            }
        }

        let usd = self.fetch().await?;
        debug!("{} price refreshed: ${}", self.asset_id, usd);
        *self.cache.write().await = Some(CachedPrice {
            usd,
            fetched_at: Instant::now(),
        });
        Ok(usd)
    }
}

/// Extract `{ "<asset_id>": { "usd": <price> } }`. Price must be positive.
pub fn parse_price(body: &Value, asset_id: &str) -> BotResult<Decimal> {
    let raw = body
        .get(asset_id)
        .and_then(|asset| asset.get("usd"))
        .ok_or_else(|| {
            BotError::ExternalApiUnavailable(format!("price API payload has no {}.usd", asset_id))
        })?;

    let text = match raw {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => {
            return Err(BotError::ExternalApiUnavailable(format!(
                "price is not numeric: {}",
                other
            )))
        }
    };

    let usd = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| BotError::ExternalApiUnavailable(format!("price '{}': {}", text, e)))?;

    if usd <= Decimal::ZERO {
        return Err(BotError::ExternalApiUnavailable(format!(
            "non-positive price {}",
            usd
        )));
    }
    Ok(usd)
}
