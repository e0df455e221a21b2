//! New-Pair Sniper
//!
//! Main entry point. Polls the DEX factory for new pairs, screens every
//! new token (liquidity floor, risk API, resale simulation) and trades the
//! ones that pass: buy, cooldown, sell with retry.
//!
//! Runs in dry-run mode unless LIVE_MODE=true or --live is given.
//! SIGINT/SIGTERM stop discovery; a trade in progress finishes first.
//!
//! Author: AI-Generated
//! Created: 2026-01-27
//! Modified: 2026-02-05 - Pair sniper pipeline replaces the arbitrage loop

use anyhow::{bail, Context, Result};
use alloy::providers::{Provider, ProviderBuilder};
use clap::Parser;
use futures::StreamExt;
use pairsnipe_bot::chain::{ChainClient, RpcChainClient};
use pairsnipe_bot::config::{load_config, load_config_from_file};
use pairsnipe_bot::oracle::{CoinGeckoPriceFeed, HoneypotClient, PriceFeed, RiskOracle};
use pairsnipe_bot::Pipeline;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// New-pair sniper for PancakeSwap V2 style DEXes
#[derive(Parser)]
#[command(name = "pairsnipe-bot")]
struct Args {
    /// Env file to load instead of .env
    #[arg(long, env = "ENV_FILE")]
    env_file: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Sign and submit transactions (overrides LIVE_MODE)
    #[arg(long)]
    live: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging (RUST_LOG overrides the default level)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.log_json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).with_target(false).init();
    }

    let mut config = match &args.env_file {
        Some(path) => load_config_from_file(path)?,
        None => load_config()?,
    };
    if args.live {
        config.live_mode = true;
    }

    info!("New-pair sniper starting (chain_id: {})", config.chain_id);
    info!("RPC URL: {}", config.rpc_url_preview());
    info!("Account: {:?}", config.account);
    info!("Factory: {:?} | Router: {:?}", config.factory, config.router);
    info!(
        "Spend: {} wei | slippage: {} | min liquidity: ${}",
        config.spend_amount, config.slippage, config.min_liquidity_usd
    );
    info!(
        "Sell retries: {} (delay {}s) | cooldown: {}s",
        config.max_sell_retries, config.retry_delay_secs, config.cooldown_secs
    );
    if !config.live_mode {
        warn!("DRY RUN: no transaction will be signed");
    }

    let provider = ProviderBuilder::new()
        .connect(&config.rpc_url)
        .await
        .context("Failed to connect to RPC")?;
    let remote_chain_id = provider
        .get_chain_id()
        .await
        .context("Failed to read chain id")?;
    if remote_chain_id != config.chain_id {
        bail!(
            "RPC reports chain id {}, but CHAIN_ID is {}",
            remote_chain_id,
            config.chain_id
        );
    }
    let client: Arc<dyn ChainClient> = Arc::new(RpcChainClient::new(Arc::new(provider)));

    let http_timeout = Duration::from_secs(config.http_timeout_secs);
    let risk_oracle: Arc<dyn RiskOracle> =
        Arc::new(HoneypotClient::new(&config.honeypot_api_url, http_timeout)?);
    let price_feed: Arc<dyn PriceFeed> = Arc::new(
        CoinGeckoPriceFeed::new(&config.price_api_url, &config.price_asset_id, http_timeout)?
            .with_cache_ttl(Duration::from_secs(config.price_cache_secs)),
    );

    let pipeline = Pipeline::from_config(&config, client, risk_oracle, price_feed).await?;

    // Graceful shutdown on SIGINT / SIGTERM
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let signals_handle = signals.handle();
    tokio::spawn(async move {
        if let Some(sig) = signals.next().await {
            info!("Received signal {} - stopping after the current trade", sig);
            let _ = stop_tx.send(true);
        }
    });

    info!("🚀 Watching for new pairs every {}ms", config.poll_interval_ms);
    let summary = pipeline.run(stop_rx).await;
    signals_handle.close();

    info!("Run summary: {}", serde_json::to_string(&summary)?);
    Ok(())
}
