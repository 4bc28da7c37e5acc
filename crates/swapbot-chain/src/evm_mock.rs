//! Deterministic in-memory EVM node for tests.

use std::collections::HashMap;

use alloy::rpc::types::Log;
use alloy_primitives::{Address, LogData, B256, U256};
use async_trait::async_trait;
use parking_lot::Mutex;

use swapbot_core::error::{BotError, Result};
use swapbot_core::types::{MarketMakerInfo, SwapState};

use crate::evm::EvmClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedLock {
    pub receiver: Address,
    pub hash_lock: B256,
    pub valid_period_secs: u32,
    pub value_wei: U256,
}

#[derive(Default)]
pub struct MockEvmClient {
    tip_height: Mutex<u64>,
    tip_time: Mutex<u64>,
    tx_times: Mutex<HashMap<String, u64>>,
    logs: Mutex<Vec<Log>>,
    swap_states: Mutex<HashMap<B256, SwapState>>,
    market_maker: Mutex<Option<MarketMakerInfo>>,
    balance: Mutex<U256>,

    lock_calls: Mutex<Vec<RecordedLock>>,
    unlock_calls: Mutex<Vec<(Address, B256, B256)>>,
    refund_calls: Mutex<Vec<(Address, B256)>>,
    fail_unlock: Mutex<bool>,
    fail_refund: Mutex<bool>,
    next_tx: Mutex<u64>,
}

impl MockEvmClient {
    pub fn new(tip_height: u64, tip_time: u64) -> Self {
        let client = Self::default();
        *client.tip_height.lock() = tip_height;
        *client.tip_time.lock() = tip_time;
        client
    }

    pub fn set_tip(&self, height: u64, time: u64) {
        *self.tip_height.lock() = height;
        *self.tip_time.lock() = time;
    }

    pub fn set_market_maker(&self, info: MarketMakerInfo) {
        *self.market_maker.lock() = Some(info);
    }

    pub fn set_swap_state(&self, hash_lock: B256, state: SwapState) {
        self.swap_states.lock().insert(hash_lock, state);
    }

    pub fn set_balance(&self, wei: U256) {
        *self.balance.lock() = wei;
    }

    /// Next unlock/refund submissions fail, as they would once the
    /// counter-party finished first.
    pub fn fail_unlocks(&self) {
        *self.fail_unlock.lock() = true;
    }

    pub fn fail_refunds(&self) {
        *self.fail_refund.lock() = true;
    }

    /// Append a contract log at `block_number`, raising the tip to cover it.
    pub fn push_log(&self, block_number: u64, tx_hash: B256, data: LogData) {
        let mut tip = self.tip_height.lock();
        if *tip < block_number {
            *tip = block_number;
        }
        self.logs.lock().push(Log {
            inner: alloy_primitives::Log::new_unchecked(
                Address::ZERO,
                data.topics().to_vec(),
                data.data.clone(),
            ),
            block_hash: None,
            block_number: Some(block_number),
            block_timestamp: None,
            transaction_hash: Some(tx_hash),
            transaction_index: None,
            log_index: None,
            removed: false,
        });
    }

    pub fn lock_calls(&self) -> Vec<RecordedLock> {
        self.lock_calls.lock().clone()
    }

    pub fn unlock_calls(&self) -> Vec<(Address, B256, B256)> {
        self.unlock_calls.lock().clone()
    }

    pub fn refund_calls(&self) -> Vec<(Address, B256)> {
        self.refund_calls.lock().clone()
    }

    fn next_tx_hash(&self) -> String {
        let mut counter = self.next_tx.lock();
        *counter += 1;
        let hash = B256::from(U256::from(0xee00_0000u64 + *counter));
        let hash_hex = hex::encode(hash);
        self.tx_times
            .lock()
            .insert(hash_hex.clone(), *self.tip_time.lock());
        hash_hex
    }
}

#[async_trait]
impl EvmClient for MockEvmClient {
    async fn tip_height(&self) -> Result<u64> {
        Ok(*self.tip_height.lock())
    }

    async fn tip_time(&self) -> Result<u64> {
        Ok(*self.tip_time.lock())
    }

    async fn tx_block_time(&self, tx_hash: &str) -> Result<u64> {
        self.tx_times
            .lock()
            .get(tx_hash)
            .copied()
            .ok_or_else(|| BotError::Rpc(format!("unknown tx {tx_hash}")))
    }

    async fn get_logs(&self, from: u64, to: u64) -> Result<Vec<Log>> {
        Ok(self
            .logs
            .lock()
            .iter()
            .filter(|log| {
                log.block_number
                    .map(|n| n >= from && n <= to)
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn balance(&self) -> Result<U256> {
        Ok(*self.balance.lock())
    }

    async fn lock(
        &self,
        receiver: Address,
        hash_lock: B256,
        valid_period_secs: u32,
        value_wei: U256,
    ) -> Result<String> {
        self.lock_calls.lock().push(RecordedLock {
            receiver,
            hash_lock,
            valid_period_secs,
            value_wei,
        });
        self.swap_states.lock().insert(hash_lock, SwapState::Locked);
        Ok(self.next_tx_hash())
    }

    async fn unlock(&self, sender: Address, hash_lock: B256, secret: B256) -> Result<String> {
        if std::mem::take(&mut *self.fail_unlock.lock()) {
            return Err(BotError::TxFailed("tx reverted".into()));
        }
        self.unlock_calls.lock().push((sender, hash_lock, secret));
        self.swap_states
            .lock()
            .insert(hash_lock, SwapState::Unlocked);
        Ok(self.next_tx_hash())
    }

    async fn refund(&self, sender: Address, hash_lock: B256) -> Result<String> {
        if std::mem::take(&mut *self.fail_refund.lock()) {
            return Err(BotError::TxFailed("tx reverted".into()));
        }
        self.refund_calls.lock().push((sender, hash_lock));
        self.swap_states
            .lock()
            .insert(hash_lock, SwapState::Refunded);
        Ok(self.next_tx_hash())
    }

    async fn swap_state(&self, _sender: Address, hash_lock: B256) -> Result<SwapState> {
        Ok(self
            .swap_states
            .lock()
            .get(&hash_lock)
            .copied()
            .unwrap_or(SwapState::Invalid))
    }

    async fn market_maker(&self, _addr: Address) -> Result<MarketMakerInfo> {
        self.market_maker
            .lock()
            .clone()
            .ok_or_else(|| BotError::Rpc("no market maker registered".into()))
    }
}
