//! In-memory chain and oracle doubles for unit tests.
//!
//! `MockChain` answers the ERC20 / pair / router reads the bot performs and
//! applies the balance effects of buy, approve and sell transactions when
//! their receipt succeeds.

use crate::chain::client::{ChainClient, PairCreatedEvent, TxReceipt};
use crate::contracts::{IERC20, IUniswapV2Pair, IUniswapV2Router02};
use crate::error::{BotError, BotResult};
use crate::oracle::{PriceFeed, RiskOracle, RiskReport};
use crate::types::{BotConfig, RiskLevel};
use alloy::consensus::transaction::SignerRecoverable;
use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{address, keccak256, Address, Bytes, B256, U256};
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Anvil's first dev account
pub const TEST_PRIVATE_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ACCOUNT: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

pub const WBNB: Address = address!("0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c");
pub const USDT: Address = address!("0x55d398326f99059fF775485246999027B3197955");
pub const USDC: Address = address!("0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d");
pub const ROUTER: Address = address!("0x10ED43C718714eb63d5aA57B78B54704E256024E");
pub const FACTORY: Address = address!("0xcA143Ce32Fe78f1f7019d7d551a6402fC5350c73");

/// Config wired to the constants above, zero delays, live mode on
pub fn sample_config() -> BotConfig {
    BotConfig {
        rpc_url: "http://127.0.0.1:8545".to_string(),
        chain_id: 56,
        account: TEST_ACCOUNT,
        private_key: TEST_PRIVATE_KEY.to_string(),
        base_asset: WBNB,
        base_asset_decimals: 18,
        router: ROUTER,
        factory: FACTORY,
        intermediate_tokens: vec![USDT, USDC],
        spend_amount: U256::from(1_000_000_000_000_000u64),
        slippage: Decimal::new(2, 2),
        deadline_secs: 120,
        gas_limit_buy: 300_000,
        gas_limit_sell: 800_000,
        gas_limit_approve: 100_000,
        max_gas_price_gwei: None,
        max_sell_retries: 3,
        retry_delay_secs: 0,
        cooldown_secs: 0,
        live_mode: true,
        min_liquidity_usd: Decimal::from(50_000),
        honeypot_api_url: "http://127.0.0.1:9".to_string(),
        price_api_url: "http://127.0.0.1:9".to_string(),
        price_asset_id: "binancecoin".to_string(),
        price_cache_secs: 30,
        http_timeout_secs: 1,
        poll_interval_ms: 10,
        receipt_timeout_secs: 1,
    }
}

fn revert(reason: &str) -> BotError {
    BotError::ContractReverted(reason.to_string())
}

#[derive(Default)]
struct ChainState {
    head: u64,
    fail_head: bool,
    logs: Vec<PairCreatedEvent>,
    fail_logs: bool,
    /// path -> final output of getAmountsOut; absent path reverts
    quotes: HashMap<Vec<Address>, U256>,
    /// (token, owner) -> balance
    balances: HashMap<(Address, Address), U256>,
    /// (token, owner, spender) -> allowance
    allowances: HashMap<(Address, Address, Address), U256>,
    decimals: HashMap<Address, u8>,
    symbols: HashMap<Address, String>,
    /// pair -> (token0, token1, reserve0, reserve1)
    pairs: HashMap<Address, (Address, Address, U256, U256)>,
    native_balance: U256,
    /// Pending count; advances when a transaction mines unless lagging
    onchain_nonce: u64,
    nonce_lagging: bool,
    gas_price: u128,
    /// Tokens credited by each successful buy
    buy_fill: U256,
    failing_balance_reads: u32,
    failing_submits: u32,
    /// Outcome of upcoming submissions; None means dropped, no receipt ever
    receipt_statuses: VecDeque<Option<bool>>,
    /// Approvals mine but leave the allowance untouched
    frozen_allowances: bool,
    receipts: HashMap<B256, bool>,
    submitted: Vec<Bytes>,
}

pub struct MockChain {
    state: Mutex<ChainState>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    pub fn new() -> Self {
        let state = ChainState {
            native_balance: U256::from(10u64).pow(U256::from(18u64)),
            gas_price: 1_000_000_000,
            buy_fill: U256::from(1_000_000u64),
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut ChainState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set_head(&self, head: u64) {
        self.with(|s| s.head = head);
    }

    pub fn set_head_failing(&self, failing: bool) {
        self.with(|s| s.fail_head = failing);
    }

    pub fn push_pair_created(&self, token0: Address, token1: Address, pair: Address, block_number: u64) {
        self.with(|s| {
            s.logs.push(PairCreatedEvent {
                token0,
                token1,
                pair,
                block_number,
            })
        });
    }

    pub fn set_logs_failing(&self, failing: bool) {
        self.with(|s| s.fail_logs = failing);
    }

    /// Register a V2 pair with its reserves
    pub fn add_pair(&self, pair: Address, token0: Address, token1: Address, reserve0: U256, reserve1: U256) {
        self.with(|s| {
            s.pairs.insert(pair, (token0, token1, reserve0, reserve1));
        });
    }

    pub fn set_quote(&self, path: &[Address], amount_out: U256) {
        self.with(|s| {
            s.quotes.insert(path.to_vec(), amount_out);
        });
    }

    pub fn token_balance(&self, token: Address, owner: Address) -> U256 {
        self.with(|s| s.balances.get(&(token, owner)).copied().unwrap_or_default())
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.with(|s| {
            s.allowances.insert((token, owner, spender), amount);
        });
    }

    pub fn set_token_metadata(&self, token: Address, decimals: u8, symbol: &str) {
        self.with(|s| {
            s.decimals.insert(token, decimals);
            s.symbols.insert(token, symbol.to_string());
        });
    }

    pub fn set_native_balance(&self, amount: U256) {
        self.with(|s| s.native_balance = amount);
    }

    pub fn set_onchain_nonce(&self, nonce: u64) {
        self.with(|s| s.onchain_nonce = nonce);
    }

    /// Pending count stops following mined transactions
    pub fn set_nonce_lagging(&self, lagging: bool) {
        self.with(|s| s.nonce_lagging = lagging);
    }

    pub fn set_gas_price(&self, wei: u128) {
        self.with(|s| s.gas_price = wei);
    }

    pub fn set_buy_fill(&self, amount: U256) {
        self.with(|s| s.buy_fill = amount);
    }

    /// Next `count` balanceOf reads fail with a transport error
    pub fn fail_next_balance_reads(&self, count: u32) {
        self.with(|s| s.failing_balance_reads = count);
    }

    /// Next `count` submissions are rejected by the node
    pub fn fail_next_submits(&self, count: u32) {
        self.with(|s| s.failing_submits = count);
    }

    /// Receipt status for the next submitted transaction (default success)
    pub fn push_receipt_status(&self, success: bool) {
        self.with(|s| s.receipt_statuses.push_back(Some(success)));
    }

    /// The next submitted transaction is accepted but never mined
    pub fn push_receipt_dropped(&self) {
        self.with(|s| s.receipt_statuses.push_back(None));
    }

    /// Token whose allowance() ignores approvals
    pub fn freeze_allowances(&self) {
        self.with(|s| s.frozen_allowances = true);
    }

    pub fn submitted(&self) -> Vec<Bytes> {
        self.with(|s| s.submitted.clone())
    }

    /// Function selectors of every accepted transaction, in order
    pub fn submitted_selectors(&self) -> Vec<[u8; 4]> {
        self.submitted()
            .iter()
            .filter_map(|raw| {
                let envelope = TxEnvelope::decode_2718(&mut raw.as_ref()).ok()?;
                let input = envelope.input();
                (input.len() >= 4).then(|| [input[0], input[1], input[2], input[3]])
            })
            .collect()
    }

    fn read(state: &mut ChainState, to: Address, input: &[u8]) -> BotResult<Vec<u8>> {
        if input.len() < 4 {
            return Err(revert("empty calldata"));
        }
        let selector: [u8; 4] = [input[0], input[1], input[2], input[3]];

        if selector == IERC20::balanceOfCall::SELECTOR {
            if state.failing_balance_reads > 0 {
                state.failing_balance_reads -= 1;
                return Err(BotError::ChainCallFailed("connection reset".to_string()));
            }
            let call = IERC20::balanceOfCall::abi_decode(input).map_err(|e| revert(&e.to_string()))?;
            let balance = state.balances.get(&(to, call.account)).copied().unwrap_or_default();
            Ok(balance.abi_encode())
        } else if selector == IERC20::allowanceCall::SELECTOR {
            let call = IERC20::allowanceCall::abi_decode(input).map_err(|e| revert(&e.to_string()))?;
            let allowance = state
                .allowances
                .get(&(to, call.owner, call.spender))
                .copied()
                .unwrap_or_default();
            Ok(allowance.abi_encode())
        } else if selector == IERC20::decimalsCall::SELECTOR {
            let decimals = state.decimals.get(&to).copied().ok_or_else(|| revert("no decimals"))?;
            Ok(IERC20::decimalsCall::abi_encode_returns(&decimals))
        } else if selector == IERC20::symbolCall::SELECTOR {
            let symbol = state.symbols.get(&to).cloned().ok_or_else(|| revert("no symbol"))?;
            Ok((symbol,).abi_encode_params())
        } else if selector == IUniswapV2Router02::getAmountsOutCall::SELECTOR {
            let call = IUniswapV2Router02::getAmountsOutCall::abi_decode(input)
                .map_err(|e| revert(&e.to_string()))?;
            let out = state
                .quotes
                .get(&call.path)
                .copied()
                .ok_or_else(|| revert("PancakeLibrary: INSUFFICIENT_LIQUIDITY"))?;
            let mut amounts = vec![out; call.path.len()];
            if let Some(first) = amounts.first_mut() {
                *first = call.amountIn;
            }
            Ok((amounts,).abi_encode_params())
        } else if selector == IUniswapV2Pair::token0Call::SELECTOR {
            let (token0, _, _, _) = state.pairs.get(&to).copied().ok_or_else(|| revert("not a pair"))?;
            Ok(token0.abi_encode())
        } else if selector == IUniswapV2Pair::token1Call::SELECTOR {
            let (_, token1, _, _) = state.pairs.get(&to).copied().ok_or_else(|| revert("not a pair"))?;
            Ok(token1.abi_encode())
        } else if selector == IUniswapV2Pair::getReservesCall::SELECTOR {
            let (_, _, r0, r1) = state.pairs.get(&to).copied().ok_or_else(|| revert("not a pair"))?;
            Ok((r0, r1, 0u32).abi_encode_params())
        } else {
            Err(revert("unknown selector"))
        }
    }

    /// Apply a mined transaction's effects on token balances and allowances
    fn apply(state: &mut ChainState, sender: Address, envelope: &TxEnvelope) {
        let Some(to) = envelope.to() else { return };
        let input = envelope.input();

        if let Ok(call) =
            IUniswapV2Router02::swapExactETHForTokensSupportingFeeOnTransferTokensCall::abi_decode(input)
        {
            if let Some(token) = call.path.last() {
                let fill = state.buy_fill;
                let balance = state.balances.entry((*token, call.to)).or_default();
                *balance += fill;
            }
            state.native_balance = state.native_balance.saturating_sub(envelope.value());
        } else if let Ok(call) = IERC20::approveCall::abi_decode(input) {
            if !state.frozen_allowances {
                state.allowances.insert((to, sender, call.spender), call.amount);
            }
        } else if let Ok(call) =
            IUniswapV2Router02::swapExactTokensForETHSupportingFeeOnTransferTokensCall::abi_decode(input)
        {
            if let Some(token) = call.path.first() {
                let balance = state.balances.entry((*token, sender)).or_default();
                *balance = balance.saturating_sub(call.amountIn);
            }
        }
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn block_number(&self) -> BotResult<u64> {
        self.with(|s| {
            if s.fail_head {
                Err(BotError::ChainCallFailed("eth_blockNumber: timeout".to_string()))
            } else {
                Ok(s.head)
            }
        })
    }

    async fn pair_created_logs(
        &self,
        _factory: Address,
        from_block: u64,
        to_block: u64,
    ) -> BotResult<Vec<PairCreatedEvent>> {
        self.with(|s| {
            if s.fail_logs {
                return Err(BotError::ChainCallFailed("eth_getLogs: timeout".to_string()));
            }
            Ok(s.logs
                .iter()
                .filter(|log| log.block_number >= from_block && log.block_number <= to_block)
                .cloned()
                .collect())
        })
    }

    async fn call(&self, to: Address, input: Bytes) -> BotResult<Bytes> {
        self.with(|s| Self::read(s, to, &input)).map(Bytes::from)
    }

    async fn native_balance(&self, _account: Address) -> BotResult<U256> {
        Ok(self.with(|s| s.native_balance))
    }

    async fn transaction_count(&self, _account: Address) -> BotResult<u64> {
        Ok(self.with(|s| s.onchain_nonce))
    }

    async fn gas_price(&self) -> BotResult<u128> {
        Ok(self.with(|s| s.gas_price))
    }

    async fn submit(&self, raw_tx: Bytes) -> BotResult<B256> {
        self.with(|s| {
            if s.failing_submits > 0 {
                s.failing_submits -= 1;
                return Err(BotError::ChainCallFailed("eth_sendRawTransaction: rejected".to_string()));
            }
            let envelope = TxEnvelope::decode_2718(&mut raw_tx.as_ref())
                .map_err(|e| BotError::ChainCallFailed(format!("undecodable tx: {}", e)))?;
            let sender = envelope
                .recover_signer()
                .map_err(|e| BotError::ChainCallFailed(format!("bad signature: {}", e)))?;

            let hash = keccak256(&raw_tx);
            if let Some(success) = s.receipt_statuses.pop_front().unwrap_or(Some(true)) {
                if success {
                    Self::apply(s, sender, &envelope);
                }
                s.receipts.insert(hash, success);
                if !s.nonce_lagging {
                    s.onchain_nonce = s.onchain_nonce.max(envelope.nonce() + 1);
                }
            }
            s.submitted.push(raw_tx.clone());
            Ok(hash)
        })
    }

    async fn await_receipt(&self, tx_hash: B256, _wait: Duration) -> BotResult<TxReceipt> {
        self.with(|s| match s.receipts.get(&tx_hash) {
            Some(success) => Ok(TxReceipt {
                tx_hash,
                success: *success,
                block_number: Some(s.head),
            }),
            None => Err(BotError::ChainCallFailed(format!("No receipt for {:?}", tx_hash))),
        })
    }
}

/// Risk oracle returning a clean report unless told otherwise for a token
pub struct StaticRiskOracle {
    reports: Mutex<HashMap<Address, Option<RiskReport>>>,
    calls: AtomicUsize,
}

impl Default for StaticRiskOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticRiskOracle {
    pub fn new() -> Self {
        Self {
            reports: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn clean_report() -> RiskReport {
        RiskReport {
            risk: RiskLevel::Low,
            buy_tax: Some(Decimal::ZERO),
            sell_tax: Some(Decimal::ZERO),
            transfer_tax: Some(Decimal::ZERO),
            flags: Vec::new(),
        }
    }

    pub fn set_report(&self, token: Address, report: RiskReport) {
        self.reports.lock().unwrap().insert(token, Some(report));
    }

    /// The API is unreachable for this token
    pub fn set_unavailable(&self, token: Address) {
        self.reports.lock().unwrap().insert(token, None);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RiskOracle for StaticRiskOracle {
    async fn assess(&self, token: Address) -> BotResult<RiskReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.reports.lock().unwrap().get(&token) {
            Some(Some(report)) => Ok(report.clone()),
            Some(None) => Err(BotError::ExternalApiUnavailable("risk API: timeout".to_string())),
            None => Ok(Self::clean_report()),
        }
    }
}

/// Price feed with a fixed answer; None simulates an outage
pub struct FixedPriceFeed(pub Option<Decimal>);

#[async_trait]
impl PriceFeed for FixedPriceFeed {
    async fn base_asset_usd(&self) -> BotResult<Decimal> {
        self.0
            .ok_or_else(|| BotError::ExternalApiUnavailable("price API: timeout".to_string()))
    }
}
