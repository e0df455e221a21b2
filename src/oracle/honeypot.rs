//! Risk-scoring API client (honeypot.is compatible)
//!
//! `GET {base}/IsHoneypot?address=<token>` returns the API's risk label,
//! simulated buy/sell/transfer taxes, and a list of flags. One call per
//! candidate; failures are never retried here.

use crate::error::{BotError, BotResult};
use crate::types::RiskLevel;
use alloy::primitives::Address;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;

/// Parsed risk report for one token
#[derive(Debug, Clone, PartialEq)]
pub struct RiskReport {
    pub risk: RiskLevel,
    pub buy_tax: Option<Decimal>,
    pub sell_tax: Option<Decimal>,
    pub transfer_tax: Option<Decimal>,
    pub flags: Vec<String>,
}

#[async_trait]
pub trait RiskOracle: Send + Sync {
    async fn assess(&self, token: Address) -> BotResult<RiskReport>;
}

pub struct HoneypotClient {
    http: reqwest::Client,
    base_url: String,
}

impl HoneypotClient {
    pub fn new(base_url: &str, timeout: Duration) -> BotResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RiskOracle for HoneypotClient {
    async fn assess(&self, token: Address) -> BotResult<RiskReport> {
        let url = format!("{}/IsHoneypot", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("address", format!("{:?}", token))])
            .send()
            .await
            .map_err(|e| BotError::ExternalApiUnavailable(format!("risk API: {}", e)))?;

        if !response.status().is_success() {
            return Err(BotError::ExternalApiUnavailable(format!(
                "risk API returned HTTP {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| BotError::ExternalApiUnavailable(format!("risk API body: {}", e)))?;

        parse_report(&body)
    }
}

/// Interpret the risk API payload.
///
/// A missing `summary.risk` is treated as an unreadable payload. Missing
/// taxes stay `None` (unknown), which the admission rule rejects.
pub fn parse_report(body: &Value) -> BotResult<RiskReport> {
    let risk = match body.pointer("/summary/risk").and_then(Value::as_str) {
        Some("low") => RiskLevel::Low,
        Some(label) => RiskLevel::Other(label.to_string()),
        None => {
            return Err(BotError::ExternalApiUnavailable(
                "risk API payload has no summary.risk".to_string(),
            ))
        }
    };

    let tax = |name: &str| {
        body.pointer(&format!("/simulationResult/{}", name))
            .and_then(json_decimal)
    };

    let flags = match body.get("flags") {
        Some(Value::Array(items)) => items.iter().map(flag_label).collect(),
        _ => Vec::new(),
    };

    Ok(RiskReport {
        risk,
        buy_tax: tax("buyTax"),
        sell_tax: tax("sellTax"),
        transfer_tax: tax("transferTax"),
        flags,
    })
}

/// Numbers may arrive as JSON numbers or numeric strings
fn json_decimal(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}

/// Flags are either plain strings or objects carrying a `flag` field
fn flag_label(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj
            .get("flag")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| item.to_string()),
        other => other.to_string(),
    }
}
