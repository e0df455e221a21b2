//! Error taxonomy for the discovery → screening → execution pipeline.
//!
//! Components return `Result<T, BotError>` so callers can tell a legitimate
//! zero apart from a failed call. `anyhow` is only used at the binary edge.

use alloy::primitives::{Address, B256, U256};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum BotError {
    /// RPC transport failure, timeout, or missing receipt
    #[error("Chain call failed: {0}")]
    ChainCallFailed(String),

    /// Logic-level failure: eth_call revert, undecodable return data, status 0 receipt
    #[error("Contract reverted: {0}")]
    ContractReverted(String),

    /// Every candidate route was discarded (illiquid or unpaired token)
    #[error("No viable swap route for {token}")]
    NoViableRoute { token: Address },

    #[error("Invalid slippage {0}: must be within [0, 1]")]
    InvalidSlippage(Decimal),

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: U256, need: U256 },

    /// Accepted by the node but no receipt arrived; the tx may still mine
    #[error("Transaction {tx_hash} unconfirmed: {reason}")]
    Unconfirmed { tx_hash: B256, reason: String },

    /// Risk or price HTTP API failed or returned a malformed payload
    #[error("External API unavailable: {0}")]
    ExternalApiUnavailable(String),

    /// Local key or transaction encoding failure
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl BotError {
    /// Deterministic errors repeat identically on every attempt.
    pub fn is_transient(&self) -> bool {
        !matches!(self, BotError::InvalidSlippage(_) | BotError::Config(_))
    }

    /// Hash of a submitted transaction whose outcome is unknown
    pub fn unconfirmed_tx(&self) -> Option<B256> {
        match self {
            BotError::Unconfirmed { tx_hash, .. } => Some(*tx_hash),
            _ => None,
        }
    }
}

pub type BotResult<T> = Result<T, BotError>;
