//! In-process exchange contract.
//!
//! Implements [`ExchangeClient`] and [`EthereumProvider`] against local
//! state with the contract's settlement rules:
//! - the sender must be a registered operator and sign with its own key
//! - the transaction nonce must equal the sender's pending nonce
//! - on mining, bad order or trade signatures log `LogError(2)`, and a
//!   trade hash that already settled logs `LogError(10)`
//!
//! Transactions are mined on submission (`auto_mine`) or on [`SimulatedChain::commit`].

use std::collections::{HashMap, HashSet, VecDeque};

use alloy::primitives::{keccak256, Address, Log, B256};
use alloy::sol_types::SolEvent;
use dexop_core::{BoxFuture, Order, Trade};
use parking_lot::Mutex;
use tracing::debug;

use crate::client::{ExchangeClient, SignOpts, Transaction};
use crate::error::{ChainError, ChainResult};
use crate::provider::{
    EthereumProvider, LogError, Receipt, ERR_INVALID_SIGNATURE, ERR_TRADE_INVALID,
};

struct PendingCall {
    tx: Transaction,
    order: Order,
    trade: Trade,
}

#[derive(Default)]
struct ChainState {
    operators: HashSet<Address>,
    /// Next nonce per sender, pending transactions included.
    nonces: HashMap<Address, u64>,
    mempool: Vec<PendingCall>,
    receipts: HashMap<B256, Receipt>,
    settled: HashSet<B256>,
    block_number: u64,
    injected_rejections: VecDeque<String>,
}

/// Simulated exchange chain.
pub struct SimulatedChain {
    exchange: Address,
    auto_mine: bool,
    state: Mutex<ChainState>,
}

impl SimulatedChain {
    pub fn new(exchange: Address, auto_mine: bool) -> Self {
        Self {
            exchange,
            auto_mine,
            state: Mutex::new(ChainState::default()),
        }
    }

    #[must_use]
    pub fn exchange(&self) -> Address {
        self.exchange
    }

    /// Allow `address` to submit trades.
    pub fn register_operator(&self, address: Address) {
        self.state.lock().operators.insert(address);
    }

    pub fn remove_operator(&self, address: Address) {
        self.state.lock().operators.remove(&address);
    }

    /// Reject the next submission with `reason` before it reaches the mempool.
    pub fn reject_next_submission(&self, reason: impl Into<String>) {
        self.state
            .lock()
            .injected_rejections
            .push_back(reason.into());
    }

    /// Advance `address`'s nonce as if it sent transactions elsewhere.
    pub fn set_pending_nonce(&self, address: Address, nonce: u64) {
        self.state.lock().nonces.insert(address, nonce);
    }

    /// Mine every pending transaction into one block. Returns how many were mined.
    pub fn commit(&self) -> usize {
        let mut state = self.state.lock();
        self.mine(&mut state)
    }

    #[must_use]
    pub fn mempool_len(&self) -> usize {
        self.state.lock().mempool.len()
    }

    #[must_use]
    pub fn block_number(&self) -> u64 {
        self.state.lock().block_number
    }

    /// Whether `trade_hash` has settled successfully.
    #[must_use]
    pub fn is_settled(&self, trade_hash: B256) -> bool {
        self.state.lock().settled.contains(&trade_hash)
    }

    fn mine(&self, state: &mut ChainState) -> usize {
        if state.mempool.is_empty() {
            return 0;
        }

        state.block_number += 1;
        let block_number = state.block_number;
        let calls: Vec<PendingCall> = state.mempool.drain(..).collect();
        let mined = calls.len();

        for call in calls {
            let err_id = Self::settle(state, &call.order, &call.trade);
            let logs = err_id
                .map(|id| {
                    vec![Log {
                        address: self.exchange,
                        data: LogError {
                            errorId: id,
                            makerOrderHash: call.trade.maker_order_hash,
                            takerOrderHash: call.trade.taker_order_hash,
                        }
                        .encode_log_data(),
                    }]
                })
                .unwrap_or_default();

            debug!(
                tx_hash = %call.tx.hash,
                trade_hash = %call.trade.hash,
                block_number,
                ?err_id,
                "Simulated trade mined"
            );

            state.receipts.insert(
                call.tx.hash,
                Receipt {
                    tx_hash: call.tx.hash,
                    block_number,
                    status: true,
                    logs,
                },
            );
        }

        mined
    }

    /// Apply contract rules; returns the LogError id on refusal.
    fn settle(state: &mut ChainState, order: &Order, trade: &Trade) -> Option<u8> {
        let order_ok = order.verify_signature().unwrap_or(false);
        let trade_ok = trade.verify_signature().unwrap_or(false);

        if !order_ok || !trade_ok {
            return Some(ERR_INVALID_SIGNATURE);
        }
        if !state.settled.insert(trade.hash) {
            return Some(ERR_TRADE_INVALID);
        }
        None
    }

    fn transaction_hash(from: Address, nonce: u64, order: &Order, trade: &Trade) -> B256 {
        let mut data = Vec::with_capacity(20 + 8 + 64);
        data.extend_from_slice(from.as_slice());
        data.extend_from_slice(&nonce.to_be_bytes());
        data.extend_from_slice(order.hash.as_slice());
        data.extend_from_slice(trade.hash.as_slice());
        keccak256(&data)
    }
}

impl ExchangeClient for SimulatedChain {
    fn trade<'a>(
        &'a self,
        order: &'a Order,
        trade: &'a Trade,
        opts: &'a SignOpts,
    ) -> BoxFuture<'a, ChainResult<Transaction>> {
        Box::pin(async move {
            let mut state = self.state.lock();

            if let Some(reason) = state.injected_rejections.pop_front() {
                return Err(ChainError::Rejected(reason));
            }
            if !state.operators.contains(&opts.from) {
                return Err(ChainError::NotOperator(opts.from));
            }
            let signer = opts.signer.address();
            if signer != opts.from {
                return Err(ChainError::SignerMismatch {
                    signer,
                    from: opts.from,
                });
            }

            let expected = state.nonces.get(&opts.from).copied().unwrap_or(0);
            if opts.nonce != expected {
                return Err(ChainError::NonceMismatch {
                    account: opts.from,
                    expected,
                    got: opts.nonce,
                });
            }
            state.nonces.insert(opts.from, expected + 1);

            let tx = Transaction {
                hash: Self::transaction_hash(opts.from, opts.nonce, order, trade),
                from: opts.from,
                to: self.exchange,
                nonce: opts.nonce,
            };
            state.mempool.push(PendingCall {
                tx: tx.clone(),
                order: order.clone(),
                trade: trade.clone(),
            });

            if self.auto_mine {
                self.mine(&mut state);
            }

            Ok(tx)
        })
    }
}

impl EthereumProvider for SimulatedChain {
    fn transaction_receipt(&self, tx_hash: B256) -> BoxFuture<'_, ChainResult<Option<Receipt>>> {
        Box::pin(async move { Ok(self.state.lock().receipts.get(&tx_hash).cloned()) })
    }

    fn pending_nonce_at(&self, address: Address) -> BoxFuture<'_, ChainResult<u64>> {
        Box::pin(async move { Ok(self.state.lock().nonces.get(&address).copied().unwrap_or(0)) })
    }
}
