//! Trade Executor
//!
//! Drives one qualified token through buy → cooldown → sell:
//!
//! ```text
//! Qualified → Buying → {BuyFailed, Bought} → Cooldown → Selling
//! Selling → {Sold, Approving → Selling, SellRetrying → Selling, SellFailedFinal}
//! ```
//!
//! Each transition submits at most one transaction and waits for its receipt
//! before the next state is entered. The buy is never retried. Every sell
//! attempt re-reads the balance and allowance and re-quotes the route.
//! A zero balance when selling counts as already sold.
//!
//! With `live_mode` off the buy is planned and logged, nothing is signed,
//! and the attempt ends in `Simulated`.
//!
//! Author: AI-Generated
//! Created: 2026-02-05

use crate::chain::{read_state, ChainClient, TxIntent, TxSender};
use crate::contracts::{IUniswapV2Router02, IERC20};
use crate::error::{BotError, BotResult};
use crate::trading::path::SwapPathResolver;
use crate::trading::retry::{RetryDecision, SellRetryPolicy};
use crate::types::{BotConfig, SwapPlan, Token, TradeAttempt, TradeState};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct TradeExecutor {
    client: Arc<dyn ChainClient>,
    sender: Arc<TxSender>,
    resolver: Arc<SwapPathResolver>,
    router: Address,
    account: Address,
    spend_amount: U256,
    slippage: Decimal,
    deadline_secs: u64,
    gas_limit_buy: u64,
    gas_limit_sell: u64,
    gas_limit_approve: u64,
    cooldown: Duration,
    retry: SellRetryPolicy,
    /// Dry run when false: plan only, never sign
    live_mode: bool,
}

impl TradeExecutor {
    pub fn new(
        config: &BotConfig,
        client: Arc<dyn ChainClient>,
        sender: Arc<TxSender>,
        resolver: Arc<SwapPathResolver>,
    ) -> Self {
        let executor = Self {
            client,
            account: sender.address(),
            sender,
            resolver,
            router: config.router,
            spend_amount: config.spend_amount,
            slippage: config.slippage,
            deadline_secs: config.deadline_secs,
            gas_limit_buy: config.gas_limit_buy,
            gas_limit_sell: config.gas_limit_sell,
            gas_limit_approve: config.gas_limit_approve,
            cooldown: Duration::from_secs(config.cooldown_secs),
            retry: SellRetryPolicy::new(
                config.max_sell_retries,
                Duration::from_secs(config.retry_delay_secs),
            ),
            live_mode: config.live_mode,
        };

        if executor.live_mode {
            warn!("⚠️ Executor in LIVE mode - trades will be executed!");
        } else {
            info!("Executor in DRY RUN mode - trades will be simulated");
        }
        executor
    }

    /// Run the state machine to a terminal state
    pub async fn execute(&self, token: &Token) -> TradeAttempt {
        let mut attempt = TradeAttempt::new(token.address);
        // 1-based number of the sell attempt in progress
        let mut sell_attempt: u32 = 0;
        // One approval per sell attempt
        let mut approved = false;

        while !attempt.state.is_terminal() {
            let next = match attempt.state.clone() {
                TradeState::Qualified => {
                    if self.live_mode {
                        TradeState::Buying
                    } else {
                        self.simulate(token).await
                    }
                }
                TradeState::Buying => match self.buy(token, &mut attempt).await {
                    Ok(()) => TradeState::Bought,
                    Err(e) => {
                        error!("❌ Buy {} failed: {}", token.label(), e);
                        TradeState::BuyFailed { reason: e.to_string() }
                    }
                },
                TradeState::Bought => TradeState::Cooldown,
                TradeState::Cooldown => {
                    debug!("Cooling down {:?} before selling {}", self.cooldown, token.label());
                    tokio::time::sleep(self.cooldown).await;
                    sell_attempt = 1;
                    TradeState::Selling
                }
                TradeState::Selling => match self.sell(token, &mut attempt).await {
                    Ok(TradeState::Approving { .. }) if approved => {
                        let err = BotError::ContractReverted(format!(
                            "allowance of {} not updated after approve",
                            token.label()
                        ));
                        self.after_sell_failure(token, sell_attempt, err)
                    }
                    Ok(next) => next,
                    Err(e) => self.after_sell_failure(token, sell_attempt, e),
                },
                TradeState::Approving { amount } => match self.approve(token, amount, &mut attempt).await {
                    Ok(()) => {
                        approved = true;
                        TradeState::Selling
                    }
                    Err(e) => self.after_sell_failure(token, sell_attempt, e),
                },
                TradeState::SellRetrying { delay } => {
                    tokio::time::sleep(delay).await;
                    attempt.sell_retries += 1;
                    sell_attempt += 1;
                    approved = false;
                    TradeState::Selling
                }
                // Loop condition excludes terminal states
                terminal => terminal,
            };

            debug!("{}: {} → {}", token.label(), attempt.state, next);
            attempt.state = next;
        }

        match &attempt.state {
            TradeState::Sold => info!(
                "✅ {} sold in {}s (buy {:?}, {} sell tx, {} retries)",
                token.label(),
                (Utc::now() - attempt.started_at).num_seconds(),
                attempt.buy_tx,
                attempt.sell_txs.len(),
                attempt.sell_retries
            ),
            TradeState::SellFailedFinal { reason } => warn!(
                "⚠️ {} sell gave up after {} attempts, balance still held: {}",
                token.label(),
                sell_attempt,
                reason
            ),
            _ => {}
        }
        attempt
    }

    /// Dry run: resolve and log the buy plan
    async fn simulate(&self, token: &Token) -> TradeState {
        match self
            .resolver
            .plan_buy(token.address, self.spend_amount, self.slippage)
            .await
        {
            Ok(plan) => {
                info!(
                    "🧪 [DRY RUN] Would buy {} via {:?}: in={} expected={} min={}",
                    token.label(),
                    plan.path,
                    plan.amount_in,
                    plan.expected_out,
                    plan.min_out
                );
                TradeState::Simulated
            }
            Err(e) => TradeState::BuyFailed { reason: e.to_string() },
        }
    }

    async fn buy(&self, token: &Token, attempt: &mut TradeAttempt) -> BotResult<()> {
        let native = self.client.native_balance(self.account).await?;
        if native < self.spend_amount {
            return Err(BotError::InsufficientBalance {
                have: native,
                need: self.spend_amount,
            });
        }

        let plan = self
            .resolver
            .plan_buy(token.address, self.spend_amount, self.slippage)
            .await?;
        self.log_plan("Buy", token, &plan);

        let call = IUniswapV2Router02::swapExactETHForTokensSupportingFeeOnTransferTokensCall {
            amountOutMin: plan.min_out,
            path: plan.path,
            to: self.account,
            deadline: self.deadline(),
        };
        let receipt = self
            .sender
            .send_and_confirm(TxIntent {
                to: self.router,
                input: Bytes::from(call.abi_encode()),
                value: plan.amount_in,
                gas_limit: self.gas_limit_buy,
                label: "buy",
            })
            .await
            .map_err(|e| {
                if let Some(tx_hash) = e.unconfirmed_tx() {
                    attempt.buy_tx = Some(tx_hash);
                    error!(
                        "🚨 Buy {:?} for {} has no receipt, position may be held",
                        tx_hash,
                        token.label()
                    );
                }
                e
            })?;
        attempt.buy_tx = Some(receipt.tx_hash);

        if !receipt.success {
            return Err(BotError::ContractReverted(format!(
                "buy tx {:?} reverted",
                receipt.tx_hash
            )));
        }
        info!("🟢 Bought {} in tx {:?}", token.label(), receipt.tx_hash);
        Ok(())
    }

    /// One sell step: either the sell itself, or a detour to `Approving`
    async fn sell(&self, token: &Token, attempt: &mut TradeAttempt) -> BotResult<TradeState> {
        let client = self.client.as_ref();
        let balance = read_state(
            client,
            token.address,
            IERC20::balanceOfCall {
                account: self.account,
            },
        )
        .await?;
        if balance.is_zero() {
            info!("{} balance is zero, treating as sold", token.label());
            return Ok(TradeState::Sold);
        }

        let allowance = read_state(
            client,
            token.address,
            IERC20::allowanceCall {
                owner: self.account,
                spender: self.router,
            },
        )
        .await?;
        if allowance < balance {
            return Ok(TradeState::Approving { amount: balance });
        }

        let plan = self
            .resolver
            .plan_sell(token.address, balance, self.slippage)
            .await?;
        self.log_plan("Sell", token, &plan);

        let call = IUniswapV2Router02::swapExactTokensForETHSupportingFeeOnTransferTokensCall {
            amountIn: plan.amount_in,
            amountOutMin: plan.min_out,
            path: plan.path,
            to: self.account,
            deadline: self.deadline(),
        };
        let receipt = self
            .sender
            .send_and_confirm(TxIntent {
                to: self.router,
                input: Bytes::from(call.abi_encode()),
                value: U256::ZERO,
                gas_limit: self.gas_limit_sell,
                label: "sell",
            })
            .await
            .map_err(|e| {
                attempt.sell_txs.extend(e.unconfirmed_tx());
                e
            })?;
        attempt.sell_txs.push(receipt.tx_hash);

        if !receipt.success {
            return Err(BotError::ContractReverted(format!(
                "sell tx {:?} reverted",
                receipt.tx_hash
            )));
        }
        Ok(TradeState::Sold)
    }

    /// Approve the router for exactly `amount` of the token
    async fn approve(&self, token: &Token, amount: U256, attempt: &mut TradeAttempt) -> BotResult<()> {
        let call = IERC20::approveCall {
            spender: self.router,
            amount,
        };
        let receipt = self
            .sender
            .send_and_confirm(TxIntent {
                to: token.address,
                input: Bytes::from(call.abi_encode()),
                value: U256::ZERO,
                gas_limit: self.gas_limit_approve,
                label: "approve",
            })
            .await
            .map_err(|e| {
                attempt.approve_txs.extend(e.unconfirmed_tx());
                e
            })?;
        attempt.approve_txs.push(receipt.tx_hash);

        if !receipt.success {
            return Err(BotError::ContractReverted(format!(
                "approve tx {:?} reverted",
                receipt.tx_hash
            )));
        }
        debug!("Approved router for {} {}", amount, token.label());
        Ok(())
    }

    fn after_sell_failure(&self, token: &Token, sell_attempt: u32, err: BotError) -> TradeState {
        match self.retry.decide(sell_attempt, &err) {
            RetryDecision::Retry(delay) => {
                warn!(
                    "Sell {} attempt {}/{} failed: {} (retrying in {:?})",
                    token.label(),
                    sell_attempt,
                    self.retry.total_attempts(),
                    err,
                    delay
                );
                TradeState::SellRetrying { delay }
            }
            RetryDecision::GiveUp => TradeState::SellFailedFinal {
                reason: err.to_string(),
            },
        }
    }

    fn log_plan(&self, side: &str, token: &Token, plan: &SwapPlan) {
        info!(
            "{} {}: path={:?} in={} expected={} min={}",
            side,
            token.label(),
            plan.path,
            plan.amount_in,
            plan.expected_out,
            plan.min_out
        );
    }

    fn deadline(&self) -> U256 {
        let now = Utc::now().timestamp().max(0) as u64;
        U256::from(now.saturating_add(self.deadline_secs))
    }
}
