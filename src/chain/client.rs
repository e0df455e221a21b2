//! Chain Client
//!
//! Thin facade over "read a value from chain" and "submit a signed transaction".
//! Every other component talks to the chain through `ChainClient`, so the
//! pipeline can run against an in-memory chain in tests.
//!
//! No method retries. RPC failures surface as `ChainCallFailed`; a JSON-RPC
//! error response to `eth_call` (revert) surfaces as `ContractReverted`.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use crate::contracts::IUniswapV2Factory;
use crate::error::{BotError, BotResult};
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::Provider;
use alloy::rpc::types::{Filter, TransactionRequest};
use alloy::sol_types::{SolCall, SolEvent};
use alloy::transports::TransportError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

/// Interval between eth_getTransactionReceipt polls
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Decoded factory `PairCreated` log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairCreatedEvent {
    pub token0: Address,
    pub token1: Address,
    pub pair: Address,
    pub block_number: u64,
}

/// Mined transaction outcome. `success` is true only for status code 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub success: bool,
    pub block_number: Option<u64>,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn block_number(&self) -> BotResult<u64>;

    /// `PairCreated` events emitted by `factory` in `[from_block, to_block]`
    async fn pair_created_logs(
        &self,
        factory: Address,
        from_block: u64,
        to_block: u64,
    ) -> BotResult<Vec<PairCreatedEvent>>;

    /// Raw eth_call against the latest block
    async fn call(&self, to: Address, input: Bytes) -> BotResult<Bytes>;

    async fn native_balance(&self, account: Address) -> BotResult<U256>;

    /// Pending transaction count (next nonce as seen by the node)
    async fn transaction_count(&self, account: Address) -> BotResult<u64>;

    async fn gas_price(&self) -> BotResult<u128>;

    /// Fire-and-forget submission of an EIP-2718 encoded signed transaction
    async fn submit(&self, raw_tx: Bytes) -> BotResult<B256>;

    /// Block until the transaction is mined or `wait` elapses
    async fn await_receipt(&self, tx_hash: B256, wait: Duration) -> BotResult<TxReceipt>;
}

/// Typed read: ABI-encode `call`, eth_call it, decode the return value.
/// Undecodable output (e.g. empty data from a non-contract) is a revert.
pub async fn read_state<C>(client: &dyn ChainClient, to: Address, call: C) -> BotResult<C::Return>
where
    C: SolCall + Send,
{
    let input = Bytes::from(call.abi_encode());
    let output = client.call(to, input).await?;
    C::abi_decode_returns(&output).map_err(|e| {
        BotError::ContractReverted(format!("{} on {:?}: undecodable return: {}", C::SIGNATURE, to, e))
    })
}

/// alloy-backed ChainClient over any provider (HTTP or WS)
pub struct RpcChainClient<P> {
    provider: Arc<P>,
}

impl<P: Provider + 'static> RpcChainClient<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

fn transport_err(context: &str, err: TransportError) -> BotError {
    BotError::ChainCallFailed(format!("{}: {}", context, err))
}

#[async_trait]
impl<P: Provider + 'static> ChainClient for RpcChainClient<P> {
    async fn block_number(&self) -> BotResult<u64> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| transport_err("eth_blockNumber", e))
    }

    async fn pair_created_logs(
        &self,
        factory: Address,
        from_block: u64,
        to_block: u64,
    ) -> BotResult<Vec<PairCreatedEvent>> {
        let filter = Filter::new()
            .address(factory)
            .event_signature(IUniswapV2Factory::PairCreated::SIGNATURE_HASH)
            .from_block(from_block)
            .to_block(to_block);

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(|e| transport_err("eth_getLogs", e))?;

        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            match log.log_decode::<IUniswapV2Factory::PairCreated>() {
                Ok(decoded) => {
                    let data = &decoded.inner.data;
                    events.push(PairCreatedEvent {
                        token0: data.token0,
                        token1: data.token1,
                        pair: data.pair,
                        block_number: log.block_number.unwrap_or(to_block),
                    });
                }
                Err(e) => {
                    warn!("Malformed PairCreated log in tx {:?}: {}", log.transaction_hash, e);
                }
            }
        }
        Ok(events)
    }

    async fn call(&self, to: Address, input: Bytes) -> BotResult<Bytes> {
        let tx = TransactionRequest::default().with_to(to).with_input(input);
        match self.provider.call(tx).await {
            Ok(output) => Ok(output),
            Err(e) => match e.as_error_resp() {
                Some(payload) => Err(BotError::ContractReverted(format!(
                    "eth_call to {:?}: {}",
                    to, payload.message
                ))),
                None => Err(transport_err("eth_call", e)),
            },
        }
    }

    async fn native_balance(&self, account: Address) -> BotResult<U256> {
        self.provider
            .get_balance(account)
            .await
            .map_err(|e| transport_err("eth_getBalance", e))
    }

    async fn transaction_count(&self, account: Address) -> BotResult<u64> {
        self.provider
            .get_transaction_count(account)
            .pending()
            .await
            .map_err(|e| transport_err("eth_getTransactionCount", e))
    }

    async fn gas_price(&self) -> BotResult<u128> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| transport_err("eth_gasPrice", e))
    }

    async fn submit(&self, raw_tx: Bytes) -> BotResult<B256> {
        let pending = self
            .provider
            .send_raw_transaction(&raw_tx)
            .await
            .map_err(|e| transport_err("eth_sendRawTransaction", e))?;
        Ok(*pending.tx_hash())
    }

    async fn await_receipt(&self, tx_hash: B256, wait: Duration) -> BotResult<TxReceipt> {
        let deadline = Instant::now() + wait;
        let poll = async {
            loop {
                match self.provider.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => {
                        return TxReceipt {
                            tx_hash,
                            success: receipt.status(),
                            block_number: receipt.block_number,
                        };
                    }
                    Ok(None) => debug!("Receipt for {:?} not yet available", tx_hash),
                    // Transient poll errors are absorbed until the deadline
                    Err(e) => debug!("Receipt poll for {:?} failed: {}", tx_hash, e),
                }
                sleep(RECEIPT_POLL_INTERVAL).await;
            }
        };

        timeout(deadline.saturating_duration_since(Instant::now()), poll)
            .await
            .map_err(|_| {
                BotError::ChainCallFailed(format!(
                    "No receipt for {:?} within {}s",
                    tx_hash,
                    wait.as_secs()
                ))
            })
    }
}
