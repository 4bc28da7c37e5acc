//! Deterministic in-memory UTXO node for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use swapbot_core::error::{BotError, Result, SendOutcome};
use swapbot_core::types::{BlockView, Utxo};
use swapbot_htlc::Transaction;

use crate::utxo::UtxoClient;

#[derive(Default)]
pub struct MockUtxoClient {
    tip: Mutex<u64>,
    blocks: Mutex<HashMap<u64, BlockView>>,
    confirmations: Mutex<HashMap<String, i64>>,
    unspent: Mutex<Vec<Utxo>>,
    sent: Mutex<Vec<Transaction>>,
    reject_next_as_spent: Mutex<bool>,
}

impl MockUtxoClient {
    pub fn new(tip: u64) -> Self {
        let client = Self::default();
        *client.tip.lock() = tip;
        client
    }

    pub fn set_tip(&self, height: u64) {
        *self.tip.lock() = height;
    }

    pub fn put_block(&self, block: BlockView) {
        self.blocks.lock().insert(block.height, block);
    }

    pub fn set_confirmations(&self, txid: &str, confirmations: i64) {
        self.confirmations
            .lock()
            .insert(txid.to_string(), confirmations);
    }

    pub fn set_unspent(&self, utxos: Vec<Utxo>) {
        *self.unspent.lock() = utxos;
    }

    /// The next `send_tx` reports the input as already spent.
    pub fn reject_next_as_spent(&self) {
        *self.reject_next_as_spent.lock() = true;
    }

    pub fn sent_txs(&self) -> Vec<Transaction> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl UtxoClient for MockUtxoClient {
    async fn tip_height(&self) -> Result<u64> {
        Ok(*self.tip.lock())
    }

    async fn get_block(&self, height: u64) -> Result<BlockView> {
        self.blocks
            .lock()
            .get(&height)
            .cloned()
            .or_else(|| {
                // unseeded heights scan as empty blocks
                (height <= *self.tip.lock()).then(|| BlockView {
                    height,
                    txs: vec![],
                })
            })
            .ok_or_else(|| BotError::Rpc(format!("no block #{height}")))
    }

    async fn tx_confirmations(&self, txid: &str) -> Result<i64> {
        Ok(self.confirmations.lock().get(txid).copied().unwrap_or(0))
    }

    async fn list_unspent(&self) -> Result<Vec<Utxo>> {
        Ok(self.unspent.lock().clone())
    }

    async fn send_tx(&self, tx: &Transaction) -> Result<SendOutcome> {
        if std::mem::take(&mut *self.reject_next_as_spent.lock()) {
            return Ok(SendOutcome::AlreadyDone);
        }
        let txid = tx.txid();
        self.sent.lock().push(tx.clone());
        Ok(SendOutcome::Sent(txid))
    }
}
