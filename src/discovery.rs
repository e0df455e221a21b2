//! New Pair Discovery
//!
//! Scans the factory's `PairCreated` logs block range by block range,
//! extracts the non-base token of each new pair and applies the liquidity
//! gate before a candidate reaches screening.
//!
//! `last_processed_block` starts at the chain head, so pairs created before
//! startup are never traded. It advances to the new head after every scan,
//! including a failed log fetch: a persistent RPC error skips blocks instead
//! of retrying the same range forever.
//!
//! Author: AI-Generated
//! Created: 2026-02-05

use crate::chain::ChainClient;
use crate::error::BotResult;
use crate::pool::LiquidityProbe;
use crate::types::{Candidate, Pair};
use alloy::primitives::Address;
use chrono::Utc;
use dashmap::DashSet;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tokens already classified this session (low liquidity, rejected, or traded).
/// Membership only. Shared between discovery and the trade worker.
#[derive(Debug, Clone, Default)]
pub struct ProcessedSet {
    tokens: Arc<DashSet<Address>>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, token: &Address) -> bool {
        self.tokens.contains(token)
    }

    /// Record `token` as classified. Returns false if it already was.
    pub fn mark(&self, token: Address) -> bool {
        self.tokens.insert(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Result of one poll tick
#[derive(Debug, Default)]
pub struct DiscoveryBatch {
    pub candidates: Vec<Candidate>,
    pub liquidity_rejected: u64,
}

pub struct PairDiscovery {
    client: Arc<dyn ChainClient>,
    liquidity: LiquidityProbe,
    processed: ProcessedSet,
    factory: Address,
    base_asset: Address,
    min_liquidity_usd: Decimal,
    last_processed_block: u64,
}

impl PairDiscovery {
    /// Start scanning after the current head block
    pub async fn start(
        client: Arc<dyn ChainClient>,
        liquidity: LiquidityProbe,
        processed: ProcessedSet,
        factory: Address,
        base_asset: Address,
        min_liquidity_usd: Decimal,
    ) -> BotResult<Self> {
        let head = client.block_number().await?;
        info!("📡 Pair discovery starting after block {}", head);
        Ok(Self {
            client,
            liquidity,
            processed,
            factory,
            base_asset,
            min_liquidity_usd,
            last_processed_block: head,
        })
    }

    pub fn last_processed_block(&self) -> u64 {
        self.last_processed_block
    }

    /// Scan `(last_processed_block, head]` for new pairs
    pub async fn poll_once(&mut self) -> DiscoveryBatch {
        let mut batch = DiscoveryBatch::default();

        let head = match self.client.block_number().await {
            Ok(head) => head,
            Err(e) => {
                warn!("⚠️  Head block read failed: {}", e);
                return batch;
            }
        };
        if head <= self.last_processed_block {
            return batch;
        }

        let from_block = self.last_processed_block + 1;
        let logs = self
            .client
            .pair_created_logs(self.factory, from_block, head)
            .await;
        self.last_processed_block = head;

        let events = match logs {
            Ok(events) => events,
            Err(e) => {
                warn!(
                    "⚠️  PairCreated scan failed, skipping blocks {}..={}: {}",
                    from_block, head, e
                );
                return batch;
            }
        };
        debug!("Blocks {}..={}: {} PairCreated events", from_block, head, events.len());

        let mut seen = HashSet::new();
        for event in events {
            let pair = Pair::new(event.pair, event.token0, event.token1);
            let token = match pair.other_side(self.base_asset) {
                Some(token) => token,
                None => {
                    debug!("Pair {:?} has no single base-asset side, ignored", pair.address);
                    continue;
                }
            };
            if self.processed.contains(&token) || !seen.insert(token) {
                debug!("Token {:?} already seen, skipped", token);
                continue;
            }

            let liquidity_usd = match self.liquidity.liquidity_usd(pair.address).await {
                Ok(usd) => usd,
                Err(e) => {
                    warn!("⚠️  Liquidity read for pair {:?} failed, treating as zero: {}", pair.address, e);
                    Decimal::ZERO
                }
            };

            if liquidity_usd < self.min_liquidity_usd {
                self.processed.mark(token);
                batch.liquidity_rejected += 1;
                info!(
                    "💧 Skip {:?}: liquidity ${} below ${}",
                    token, liquidity_usd, self.min_liquidity_usd
                );
                continue;
            }

            info!(
                "🆕 New token {:?} | pair {:?} | liquidity ${} | block {}",
                token, pair.address, liquidity_usd, event.block_number
            );
            batch.candidates.push(Candidate {
                token,
                pair,
                block_number: event.block_number,
                discovered_at: Utc::now(),
                liquidity_usd,
            });
        }

        batch
    }
}
