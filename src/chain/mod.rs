//! Chain access: typed reads plus signed transaction submission

pub mod client;
pub mod sender;

pub use client::{read_state, ChainClient, PairCreatedEvent, RpcChainClient, TxReceipt};
pub use sender::{next_nonce, TxIntent, TxSender};
