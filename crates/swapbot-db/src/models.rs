use sqlx::FromRow;

use swapbot_core::error::{BotError, Result};
use swapbot_core::types::{B2sRecord, B2sStatus, S2bRecord, S2bStatus};

/// Row form of a B2S record; SQLite integers are signed.
#[derive(Debug, Clone, FromRow)]
pub struct DbB2sRecord {
    pub id: i64,
    pub utxo_lock_height: i64,
    pub utxo_lock_tx_hash: String,
    pub value: i64,
    pub recipient_pkh: String,
    pub sender_pkh: String,
    pub hash_lock: String,
    pub time_lock: i64,
    pub penalty_bps: i64,
    pub sender_evm_addr: String,
    pub expected_price: i64,
    pub script_hash: String,
    pub evm_lock_tx_hash: String,
    pub evm_lock_time: i64,
    pub evm_unlock_tx_hash: String,
    pub secret: String,
    pub utxo_unlock_tx_hash: String,
    pub evm_refund_tx_hash: String,
    pub status: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl DbB2sRecord {
    pub fn into_record(self) -> Result<B2sRecord> {
        let status = B2sStatus::from_i64(self.status)
            .ok_or_else(|| BotError::Database(format!("unknown b2s status {}", self.status)))?;
        Ok(B2sRecord {
            id: self.id,
            utxo_lock_height: self.utxo_lock_height as u64,
            utxo_lock_tx_hash: self.utxo_lock_tx_hash,
            value: self.value as u64,
            recipient_pkh: self.recipient_pkh,
            sender_pkh: self.sender_pkh,
            hash_lock: self.hash_lock,
            time_lock: self.time_lock as u32,
            penalty_bps: self.penalty_bps as u16,
            sender_evm_addr: self.sender_evm_addr,
            expected_price: self.expected_price as u64,
            script_hash: self.script_hash,
            evm_lock_tx_hash: self.evm_lock_tx_hash,
            evm_lock_time: self.evm_lock_time as u64,
            evm_unlock_tx_hash: self.evm_unlock_tx_hash,
            secret: self.secret,
            utxo_unlock_tx_hash: self.utxo_unlock_tx_hash,
            evm_refund_tx_hash: self.evm_refund_tx_hash,
            status,
            created_at: self.created_at as u64,
            updated_at: self.updated_at as u64,
        })
    }
}

/// Row form of an S2B record.
#[derive(Debug, Clone, FromRow)]
pub struct DbS2bRecord {
    pub id: i64,
    pub evm_lock_time: i64,
    pub evm_lock_tx_hash: String,
    pub value: i64,
    pub evm_sender_addr: String,
    pub utxo_recipient_pkh: String,
    pub hash_lock: String,
    pub time_lock: i64,
    pub penalty_bps: i64,
    pub expected_price: i64,
    pub script_hash: String,
    pub utxo_lock_tx_hash: String,
    pub utxo_unlock_tx_hash: String,
    pub secret: String,
    pub evm_unlock_tx_hash: String,
    pub utxo_refund_tx_hash: String,
    pub status: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl DbS2bRecord {
    pub fn into_record(self) -> Result<S2bRecord> {
        let status = S2bStatus::from_i64(self.status)
            .ok_or_else(|| BotError::Database(format!("unknown s2b status {}", self.status)))?;
        Ok(S2bRecord {
            id: self.id,
            evm_lock_time: self.evm_lock_time as u64,
            evm_lock_tx_hash: self.evm_lock_tx_hash,
            value: self.value as u64,
            evm_sender_addr: self.evm_sender_addr,
            utxo_recipient_pkh: self.utxo_recipient_pkh,
            hash_lock: self.hash_lock,
            time_lock: self.time_lock as u32,
            penalty_bps: self.penalty_bps as u16,
            expected_price: self.expected_price as u64,
            script_hash: self.script_hash,
            utxo_lock_tx_hash: self.utxo_lock_tx_hash,
            utxo_unlock_tx_hash: self.utxo_unlock_tx_hash,
            secret: self.secret,
            evm_unlock_tx_hash: self.evm_unlock_tx_hash,
            utxo_refund_tx_hash: self.utxo_refund_tx_hash,
            status,
            created_at: self.created_at as u64,
            updated_at: self.updated_at as u64,
        })
    }
}
