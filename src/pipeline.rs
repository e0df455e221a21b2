//! Pipeline Orchestrator
//!
//! Wires discovery → screening → execution:
//! - a discovery task polls for new pairs and queues candidates
//! - one worker screens each candidate, marks it processed, and trades the
//!   admitted ones to a terminal state before taking the next
//!
//! The single worker is what serializes signing for the trading account;
//! discovery keeps running while a trade waits on receipts.
//!
//! Shutdown: both sides watch a `watch` channel. The worker only checks it
//! between candidates, so an in-flight trade (and its receipt wait) is
//! allowed to finish.
//!
//! Author: AI-Generated
//! Created: 2026-02-05

use crate::chain::{ChainClient, TxSender};
use crate::discovery::{PairDiscovery, ProcessedSet};
use crate::error::BotResult;
use crate::oracle::{PriceFeed, RiskOracle};
use crate::pool::LiquidityProbe;
use crate::screening::{SafetyScreen, TokenRegistry};
use crate::trading::{SwapPathResolver, TradeExecutor};
use crate::types::{BotConfig, Candidate, RunSummary, TradeState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Candidates waiting for the worker
const QUEUE_CAPACITY: usize = 1024;

/// Discovery-side counters, returned when the discovery task stops
#[derive(Debug, Default, Clone, Copy)]
struct DiscoveryStats {
    discovered: u64,
    liquidity_rejected: u64,
}

/// Screens and trades candidates one at a time
pub struct CandidateWorker {
    screen: SafetyScreen,
    registry: Arc<TokenRegistry>,
    executor: TradeExecutor,
    processed: ProcessedSet,
}

impl CandidateWorker {
    pub fn new(
        screen: SafetyScreen,
        registry: Arc<TokenRegistry>,
        executor: TradeExecutor,
        processed: ProcessedSet,
    ) -> Self {
        Self {
            screen,
            registry,
            executor,
            processed,
        }
    }

    /// Classify one candidate and trade it if admitted.
    /// Returns the terminal trade state, or None when nothing was traded.
    pub async fn handle(&self, candidate: &Candidate, summary: &mut RunSummary) -> Option<TradeState> {
        let token = candidate.token;
        if self.processed.contains(&token) {
            debug!("Token {:?} already processed", token);
            return None;
        }

        let verdict = self.screen.evaluate(token).await;
        self.processed.mark(token);

        if !verdict.is_admissible() {
            summary.screen_rejected += 1;
            info!(
                "🚫 Rejected {:?}: {}",
                token,
                verdict.rejection_reasons().join(", ")
            );
            return None;
        }

        summary.admitted += 1;
        let meta = self.registry.resolve(token).await;
        info!(
            "✅ {} passed screening (pair {:?}, liquidity ${}), trading",
            meta.label(),
            candidate.pair.address,
            candidate.liquidity_usd
        );

        let attempt = self.executor.execute(&meta).await;
        match &attempt.state {
            TradeState::Sold => summary.sold += 1,
            TradeState::BuyFailed { .. } => summary.buy_failed += 1,
            TradeState::SellFailedFinal { .. } => summary.sell_failed += 1,
            TradeState::Simulated => summary.simulated += 1,
            other => warn!("Trade for {} stopped in non-terminal state {}", meta.label(), other),
        }
        Some(attempt.state)
    }
}

pub struct Pipeline {
    discovery: PairDiscovery,
    worker: CandidateWorker,
    poll_interval: Duration,
}

impl Pipeline {
    pub fn new(discovery: PairDiscovery, worker: CandidateWorker, poll_interval: Duration) -> Self {
        Self {
            discovery,
            worker,
            poll_interval,
        }
    }

    /// Build every component from config around the given chain and oracles
    pub async fn from_config(
        config: &BotConfig,
        client: Arc<dyn ChainClient>,
        risk_oracle: Arc<dyn RiskOracle>,
        price_feed: Arc<dyn PriceFeed>,
    ) -> BotResult<Self> {
        let processed = ProcessedSet::new();

        let sender = Arc::new(TxSender::new(
            client.clone(),
            &config.private_key,
            config.chain_id,
            config.max_gas_price_wei(),
            Duration::from_secs(config.receipt_timeout_secs),
        )?);
        let resolver = Arc::new(SwapPathResolver::new(
            client.clone(),
            config.router,
            config.base_asset,
            config.intermediate_tokens.clone(),
        ));
        let registry = Arc::new(TokenRegistry::new(client.clone()));

        let screen = SafetyScreen::new(risk_oracle, resolver.clone(), registry.clone(), config.base_asset);
        let executor = TradeExecutor::new(config, client.clone(), sender, resolver);
        let worker = CandidateWorker::new(screen, registry, executor, processed.clone());

        let probe = LiquidityProbe::new(
            client.clone(),
            price_feed,
            config.base_asset,
            config.base_asset_decimals,
        );
        let discovery = PairDiscovery::start(
            client,
            probe,
            processed,
            config.factory,
            config.base_asset,
            config.min_liquidity_usd,
        )
        .await?;

        Ok(Self::new(
            discovery,
            worker,
            Duration::from_millis(config.poll_interval_ms),
        ))
    }

    /// Run until `shutdown` flips to true (or its sender is dropped)
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> RunSummary {
        let (tx, mut rx) = mpsc::channel::<Candidate>(QUEUE_CAPACITY);

        let discovery_task = tokio::spawn(discovery_loop(
            self.discovery,
            tx,
            self.poll_interval,
            shutdown.clone(),
        ));

        let mut summary = RunSummary::default();
        let mut shutdown = shutdown;
        loop {
            tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => break,
                next = rx.recv() => match next {
                    Some(candidate) => {
                        self.worker.handle(&candidate, &mut summary).await;
                    }
                    None => break,
                },
            }
        }

        let mut pending = 0usize;
        while rx.try_recv().is_ok() {
            pending += 1;
        }
        if pending > 0 {
            info!("Dropping {} queued candidates on shutdown", pending);
        }
        info!("{} tokens classified this session", self.worker.processed.len());
        drop(rx);

        match discovery_task.await {
            Ok(stats) => {
                summary.discovered = stats.discovered;
                summary.liquidity_rejected = stats.liquidity_rejected;
            }
            Err(e) => warn!("Discovery task ended abnormally: {}", e),
        }
        summary
    }
}

/// Resolves once shutdown is requested
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    // Err means the sender is gone, which also stops the pipeline
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn discovery_loop(
    mut discovery: PairDiscovery,
    tx: mpsc::Sender<Candidate>,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> DiscoveryStats {
    let mut stats = DiscoveryStats::default();
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stopped(&mut shutdown) => break,
            _ = ticker.tick() => {
                let batch = discovery.poll_once().await;
                stats.discovered += batch.candidates.len() as u64 + batch.liquidity_rejected;
                stats.liquidity_rejected += batch.liquidity_rejected;

                for candidate in batch.candidates {
                    if tx.send(candidate).await.is_err() {
                        debug!("Worker gone, discovery stopping");
                        return stats;
                    }
                }
            }
        }
    }

    info!(
        "Discovery stopped at block {}",
        discovery.last_processed_block()
    );
    stats
}
