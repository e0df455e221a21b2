//! Transaction Sender
//!
//! Signs transactions locally with the bot's key, submits them as raw
//! EIP-2718 bytes and waits for the receipt.
//!
//! Nonces: the next nonce is `max(pending count on chain, last used + 1)`.
//! A nonce is only recorded once the node accepted the submission, so a
//! rejected submit does not burn it. A submission that never produces a
//! receipt clears the record: a dropped transaction leaves the node's pending
//! count at its nonce, which must be reused. The nonce lock is held for the whole
//! sign → submit → receipt sequence; one account never has two transactions
//! in flight.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use crate::chain::client::{ChainClient, TxReceipt};
use crate::error::{BotError, BotResult};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Unsigned transaction: everything except nonce and gas price
#[derive(Debug, Clone)]
pub struct TxIntent {
    pub to: Address,
    pub input: Bytes,
    pub value: U256,
    pub gas_limit: u64,
    /// Short description for logs ("buy", "approve", "sell")
    pub label: &'static str,
}

/// Nonce to use given the node's pending count and the last nonce we submitted
pub fn next_nonce(onchain_pending: u64, last_used: Option<u64>) -> u64 {
    match last_used {
        Some(last) => onchain_pending.max(last + 1),
        None => onchain_pending,
    }
}

pub struct TxSender {
    client: Arc<dyn ChainClient>,
    signer: PrivateKeySigner,
    wallet: EthereumWallet,
    chain_id: u64,
    max_gas_price: Option<u128>,
    receipt_timeout: Duration,
    last_nonce: Mutex<Option<u64>>,
}

impl TxSender {
    pub fn new(
        client: Arc<dyn ChainClient>,
        private_key: &str,
        chain_id: u64,
        max_gas_price: Option<u128>,
        receipt_timeout: Duration,
    ) -> BotResult<Self> {
        let signer = PrivateKeySigner::from_str(private_key.trim())
            .map_err(|e| BotError::SigningFailed(format!("Invalid private key: {}", e)))?;
        let wallet = EthereumWallet::from(signer.clone());

        Ok(Self {
            client,
            signer,
            wallet,
            chain_id,
            max_gas_price,
            receipt_timeout,
            last_nonce: Mutex::new(None),
        })
    }

    /// Account the transactions are sent from
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign, submit, and wait for the receipt.
    ///
    /// A mined-but-reverted transaction is returned as `Ok` with
    /// `success == false`; the caller decides what a revert means.
    /// A missing receipt is `BotError::Unconfirmed` carrying the hash.
    pub async fn send_and_confirm(&self, intent: TxIntent) -> BotResult<TxReceipt> {
        let mut last_nonce = self.last_nonce.lock().await;

        let onchain = self.client.transaction_count(self.address()).await?;
        let nonce = next_nonce(onchain, *last_nonce);

        let gas_price = self.client.gas_price().await?;
        if let Some(ceiling) = self.max_gas_price {
            if gas_price > ceiling {
                return Err(BotError::ChainCallFailed(format!(
                    "Gas price {} wei above ceiling {} wei, {} not sent",
                    gas_price, ceiling, intent.label
                )));
            }
        }

        let raw = self.sign(&intent, nonce, gas_price).await?;
        let tx_hash = self.client.submit(raw).await?;
        *last_nonce = Some(nonce);
        info!("📤 {} submitted: {:?} (nonce {})", intent.label, tx_hash, nonce);

        let receipt = match self.client.await_receipt(tx_hash, self.receipt_timeout).await {
            Ok(receipt) => receipt,
            Err(e) => {
                *last_nonce = None;
                warn!("⚠️  {} {:?} has no receipt (nonce {}): {}", intent.label, tx_hash, nonce, e);
                return Err(BotError::Unconfirmed {
                    tx_hash,
                    reason: e.to_string(),
                });
            }
        };
        debug!(
            "{} mined in block {:?}, success={}",
            intent.label, receipt.block_number, receipt.success
        );
        Ok(receipt)
    }

    /// Build and sign a legacy transaction, returning its EIP-2718 bytes
    pub async fn sign(&self, intent: &TxIntent, nonce: u64, gas_price: u128) -> BotResult<Bytes> {
        let mut request = TransactionRequest::default()
            .with_to(intent.to)
            .with_input(intent.input.clone())
            .with_value(intent.value)
            .with_nonce(nonce)
            .with_chain_id(self.chain_id)
            .with_gas_limit(intent.gas_limit)
            .with_gas_price(gas_price);
        request.from = Some(self.address());

        let envelope = request
            .build(&self.wallet)
            .await
            .map_err(|e| BotError::SigningFailed(format!("{}: {}", intent.label, e)))?;

        Ok(Bytes::from(envelope.encoded_2718()))
    }
}
