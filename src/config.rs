//! Configuration management
//! Load settings from the environment (optionally a .env file)

use anyhow::{anyhow, bail, Context, Result};
use alloy::primitives::{address, Address, U256};
use alloy::signers::local::PrivateKeySigner;
use rust_decimal::Decimal;
use std::str::FromStr;

// Re-export BotConfig for external access
pub use crate::types::BotConfig;

/// PancakeSwap V2 on BSC mainnet
pub const DEFAULT_ROUTER: Address = address!("0x10ED43C718714eb63d5aA57B78B54704E256024E");
pub const DEFAULT_FACTORY: Address = address!("0xcA143Ce32Fe78f1f7019d7d551a6402fC5350c73");
pub const DEFAULT_BASE_ASSET: Address = address!("0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c");
/// USDT, USDC on BSC
pub const DEFAULT_INTERMEDIATES: [Address; 2] = [
    address!("0x55d398326f99059fF775485246999027B3197955"),
    address!("0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d"),
];

/// Load config from the process environment, after reading `.env` if present.
pub fn load_config() -> Result<BotConfig> {
    dotenv::dotenv().ok();
    from_env()
}

/// Load config after reading a specific env file (e.g. `.env.bsc`).
pub fn load_config_from_file(path: &str) -> Result<BotConfig> {
    dotenv::from_filename(path).with_context(|| format!("Failed to read env file {}", path))?;
    from_env()
}

fn from_env() -> Result<BotConfig> {
    let account: Address = required("MY_ADDRESS")?
        .parse()
        .context("MY_ADDRESS is not a valid address")?;
    let private_key = required("PRIVATE_KEY")?;

    let base_asset_decimals: u8 = env_or("BASE_ASSET_DECIMALS", 18)?;
    let spend_str = env_string("SPEND_AMOUNT", "0.001");
    let spend_amount = parse_spend_amount(&spend_str, base_asset_decimals)?;

    let intermediate_tokens = match std::env::var("INTERMEDIATE_TOKENS") {
        Ok(list) => parse_address_list(&list).context("Invalid INTERMEDIATE_TOKENS")?,
        Err(_) => DEFAULT_INTERMEDIATES.to_vec(),
    };

    let max_gas_price_gwei = match std::env::var("MAX_GAS_PRICE_GWEI") {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().parse().context("Invalid MAX_GAS_PRICE_GWEI")?),
        _ => None,
    };

    let config = BotConfig {
        rpc_url: env_string("RPC_URL", "https://bsc-dataseed.binance.org/"),
        chain_id: env_or("CHAIN_ID", 56)?,

        account,
        private_key,

        base_asset: env_or("BASE_ASSET", DEFAULT_BASE_ASSET)?,
        base_asset_decimals,
        router: env_or("ROUTER_ADDRESS", DEFAULT_ROUTER)?,
        factory: env_or("FACTORY_ADDRESS", DEFAULT_FACTORY)?,
        intermediate_tokens,

        spend_amount,
        slippage: env_or("SLIPPAGE", Decimal::new(2, 2))?,
        deadline_secs: env_or("DEADLINE_SECONDS", 120)?,
        gas_limit_buy: env_or("GAS_LIMIT_BUY", 300_000)?,
        gas_limit_sell: env_or("GAS_LIMIT_SELL", 800_000)?,
        gas_limit_approve: env_or("GAS_LIMIT_APPROVE", 100_000)?,
        max_gas_price_gwei,
        max_sell_retries: env_or("MAX_SELL_RETRIES", 3)?,
        retry_delay_secs: env_or("RETRY_DELAY_SECONDS", 2)?,
        cooldown_secs: env_or("COOLDOWN_SECONDS", 5)?,
        live_mode: env_or("LIVE_MODE", false)?,

        min_liquidity_usd: env_or("MIN_LIQUIDITY_USD", Decimal::from(50_000))?,
        honeypot_api_url: env_string("HONEYPOT_API_URL", "https://api.honeypot.is/v2"),
        price_api_url: env_string("PRICE_API_URL", "https://api.coingecko.com/api/v3"),
        price_asset_id: env_string("PRICE_ASSET_ID", "binancecoin"),
        price_cache_secs: env_or("PRICE_CACHE_SECONDS", 30)?,
        http_timeout_secs: env_or("HTTP_TIMEOUT_SECONDS", 10)?,

        poll_interval_ms: env_or("POLL_INTERVAL_MS", 1000)?,
        receipt_timeout_secs: env_or("RECEIPT_TIMEOUT_SECONDS", 180)?,
    };

    validate(&config)?;
    Ok(config)
}

/// Startup checks. Any failure here is fatal.
pub fn validate(config: &BotConfig) -> Result<()> {
    if config.slippage < Decimal::ZERO || config.slippage > Decimal::ONE {
        bail!("SLIPPAGE must be within [0, 1], got {}", config.slippage);
    }
    if config.spend_amount.is_zero() {
        bail!("SPEND_AMOUNT must be positive");
    }
    if config.min_liquidity_usd < Decimal::ZERO {
        bail!("MIN_LIQUIDITY_USD must not be negative");
    }

    let signer = PrivateKeySigner::from_str(config.private_key.trim())
        .map_err(|e| anyhow!("PRIVATE_KEY is not a valid secp256k1 key: {}", e))?;
    if signer.address() != config.account {
        bail!(
            "PRIVATE_KEY belongs to {:?}, but MY_ADDRESS is {:?}",
            signer.address(),
            config.account
        );
    }
    Ok(())
}

/// Convert a human base-asset amount ("0.001") into smallest units.
/// Digits beyond `decimals` are truncated.
pub fn parse_spend_amount(amount: &str, decimals: u8) -> Result<U256> {
    let value = Decimal::from_str(amount.trim())
        .map_err(|e| anyhow!("Invalid SPEND_AMOUNT '{}': {}", amount, e))?;
    if value <= Decimal::ZERO {
        bail!("SPEND_AMOUNT must be positive, got {}", amount);
    }

    let mantissa = U256::from(value.mantissa().unsigned_abs());
    let scale = value.scale();
    let decimals = decimals as u32;
    let ten = U256::from(10u64);
    let wei = if scale <= decimals {
        mantissa
            .checked_mul(ten.pow(U256::from(decimals - scale)))
            .ok_or_else(|| anyhow!("SPEND_AMOUNT '{}' overflows", amount))?
    } else {
        mantissa / ten.pow(U256::from(scale - decimals))
    };

    if wei.is_zero() {
        bail!("SPEND_AMOUNT '{}' is below one smallest unit", amount);
    }
    Ok(wei)
}

/// Comma-separated address list; empty entries are ignored.
pub fn parse_address_list(list: &str) -> Result<Vec<Address>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Address::from_str(s).map_err(|e| anyhow!("'{}': {}", s, e)))
        .collect()
}

fn required(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => bail!("{} not set (required)", name),
    }
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("Invalid {} '{}': {}", name, raw, e)),
        _ => Ok(default),
    }
}
