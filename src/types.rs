// Core data structures: value records passed forward through the pipeline.
// No record holds a reference back to the component that produced it.

use alloy::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Decimals assumed when `decimals()` is missing or malformed
pub const DEFAULT_DECIMALS: u8 = 18;

/// ERC20 token with resolved metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub address: Address,
    pub decimals: u8,
    pub symbol: Option<String>,
}

impl Token {
    pub fn new(address: Address, decimals: u8, symbol: Option<String>) -> Self {
        Self {
            address,
            decimals,
            symbol,
        }
    }

    /// One whole unit (10^decimals) in smallest units.
    /// None when 10^decimals does not fit in 256 bits.
    pub fn one_unit(&self) -> Option<U256> {
        U256::from(10u64).checked_pow(U256::from(self.decimals))
    }

    /// Symbol for log lines, falling back to the address
    pub fn label(&self) -> String {
        match &self.symbol {
            Some(s) => s.clone(),
            None => format!("{:?}", self.address),
        }
    }
}

/// V2 pair contract. Created once on-chain per token combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pair {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
}

impl Pair {
    pub fn new(address: Address, token0: Address, token1: Address) -> Self {
        Self {
            address,
            token0,
            token1,
        }
    }

    /// The non-base side of the pair. None when neither or both sides are the base asset.
    pub fn other_side(&self, base_asset: Address) -> Option<Address> {
        match (self.token0 == base_asset, self.token1 == base_asset) {
            (true, false) => Some(self.token1),
            (false, true) => Some(self.token0),
            _ => None,
        }
    }
}

/// Token discovered in a freshly created pair, past the liquidity gate
#[derive(Debug, Clone)]
pub struct Candidate {
    pub token: Address,
    pub pair: Pair,
    pub block_number: u64,
    pub discovered_at: DateTime<Utc>,
    pub liquidity_usd: Decimal,
}

/// Risk classification reported by the risk-scoring API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    /// Any other label the API returned ("medium", "high", "unknown", ...)
    Other(String),
    /// The API call failed or returned an unreadable payload
    Unclassified,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Other(label) => write!(f, "{}", label),
            RiskLevel::Unclassified => write!(f, "unclassified"),
        }
    }
}

/// Point-in-time screening result. Never cached.
#[derive(Debug, Clone)]
pub struct ScreeningVerdict {
    pub risk: RiskLevel,
    /// Taxes as reported by the risk API (percent); None means not reported
    pub buy_tax: Option<Decimal>,
    pub sell_tax: Option<Decimal>,
    pub transfer_tax: Option<Decimal>,
    pub flags: Vec<String>,
    /// Base-asset amount quoted for selling one whole token, if the quote succeeded
    pub resale_out: Option<U256>,
}

impl ScreeningVerdict {
    /// Verdict for a token whose risk report could not be obtained
    pub fn unclassified(resale_out: Option<U256>) -> Self {
        Self {
            risk: RiskLevel::Unclassified,
            buy_tax: None,
            sell_tax: None,
            transfer_tax: None,
            flags: Vec::new(),
            resale_out,
        }
    }

    pub fn resale_ok(&self) -> bool {
        matches!(self.resale_out, Some(out) if !out.is_zero())
    }

    /// All conditions must hold: low risk, zero taxes, no flags, resale possible
    pub fn is_admissible(&self) -> bool {
        self.rejection_reasons().is_empty()
    }

    /// Every failed admission condition, for logging
    pub fn rejection_reasons(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        if self.risk != RiskLevel::Low {
            reasons.push(format!("risk={}", self.risk));
        }
        for (name, tax) in [
            ("buyTax", self.buy_tax),
            ("sellTax", self.sell_tax),
            ("transferTax", self.transfer_tax),
        ] {
            match tax {
                Some(t) if t.is_zero() => {}
                Some(t) => reasons.push(format!("{}={}", name, t)),
                None => reasons.push(format!("{}=unknown", name)),
            }
        }
        if !self.flags.is_empty() {
            reasons.push(format!("flags=[{}]", self.flags.join(",")));
        }
        if !self.resale_ok() {
            reasons.push("resale simulation failed".to_string());
        }
        reasons
    }
}

/// Route and amounts for one swap. Computed fresh per trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPlan {
    pub path: Vec<Address>,
    pub amount_in: U256,
    pub expected_out: U256,
    /// floor(expected_out * (1 - slippage))
    pub min_out: U256,
}

/// Trade state machine for a single qualified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeState {
    Qualified,
    Buying,
    Bought,
    Cooldown,
    Selling,
    /// Allowance below balance; approval must confirm before the sell is sent
    Approving { amount: U256 },
    SellRetrying { delay: Duration },
    // Terminal
    BuyFailed { reason: String },
    Sold,
    SellFailedFinal { reason: String },
    /// Dry run: plan resolved and logged, nothing signed
    Simulated,
}

impl TradeState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TradeState::BuyFailed { .. }
                | TradeState::Sold
                | TradeState::SellFailedFinal { .. }
                | TradeState::Simulated
        )
    }
}

impl fmt::Display for TradeState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TradeState::Qualified => write!(f, "Qualified"),
            TradeState::Buying => write!(f, "Buying"),
            TradeState::Bought => write!(f, "Bought"),
            TradeState::Cooldown => write!(f, "Cooldown"),
            TradeState::Selling => write!(f, "Selling"),
            TradeState::Approving { .. } => write!(f, "Approving"),
            TradeState::SellRetrying { .. } => write!(f, "SellRetrying"),
            TradeState::BuyFailed { .. } => write!(f, "BuyFailed"),
            TradeState::Sold => write!(f, "Sold"),
            TradeState::SellFailedFinal { .. } => write!(f, "SellFailedFinal"),
            TradeState::Simulated => write!(f, "Simulated"),
        }
    }
}

/// Progress record for one token's trade. Discarded after the terminal state.
#[derive(Debug, Clone)]
pub struct TradeAttempt {
    pub token: Address,
    pub state: TradeState,
    pub buy_tx: Option<B256>,
    pub approve_txs: Vec<B256>,
    pub sell_txs: Vec<B256>,
    /// Failed sell attempts that were followed by another attempt
    pub sell_retries: u32,
    pub started_at: DateTime<Utc>,
}

impl TradeAttempt {
    pub fn new(token: Address) -> Self {
        Self {
            token,
            state: TradeState::Qualified,
            buy_tx: None,
            approve_txs: Vec::new(),
            sell_txs: Vec::new(),
            sell_retries: 0,
            started_at: Utc::now(),
        }
    }
}

/// Counters logged when the pipeline stops
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub discovered: u64,
    pub liquidity_rejected: u64,
    pub screen_rejected: u64,
    pub admitted: u64,
    pub buy_failed: u64,
    pub sold: u64,
    pub sell_failed: u64,
    pub simulated: u64,
}

/// Bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    // Network
    pub rpc_url: String,
    pub chain_id: u64,

    // Wallet
    pub account: Address,
    pub private_key: String,

    // DEX addresses
    pub base_asset: Address,
    pub base_asset_decimals: u8,
    pub router: Address,
    pub factory: Address,
    /// Hop assets tried between the base asset and the token
    pub intermediate_tokens: Vec<Address>,

    // Trading parameters
    /// Base asset spent per buy, smallest units
    pub spend_amount: U256,
    /// Fraction in [0, 1]
    pub slippage: Decimal,
    pub deadline_secs: u64,
    pub gas_limit_buy: u64,
    pub gas_limit_sell: u64,
    pub gas_limit_approve: u64,
    pub max_gas_price_gwei: Option<u64>,
    pub max_sell_retries: u32,
    pub retry_delay_secs: u64,
    pub cooldown_secs: u64,
    pub live_mode: bool,

    // Screening
    pub min_liquidity_usd: Decimal,
    pub honeypot_api_url: String,
    pub price_api_url: String,
    pub price_asset_id: String,
    pub price_cache_secs: u64,
    pub http_timeout_secs: u64,

    // Performance
    pub poll_interval_ms: u64,
    pub receipt_timeout_secs: u64,
}

impl BotConfig {
    /// Gas price ceiling in wei, if configured
    pub fn max_gas_price_wei(&self) -> Option<u128> {
        self.max_gas_price_gwei
            .map(|gwei| gwei as u128 * 1_000_000_000u128)
    }

    /// First 40 characters of the RPC URL, for logs
    pub fn rpc_url_preview(&self) -> String {
        self.rpc_url.chars().take(40).collect()
    }
}
