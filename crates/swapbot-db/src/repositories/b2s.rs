use sqlx::SqlitePool;

use swapbot_core::error::{BotError, Result};
use swapbot_core::types::{unix_now, B2sRecord, B2sStatus};

use crate::models::DbB2sRecord;
use crate::repositories::is_unique_violation;

const SELECT_COLUMNS: &str = "\
id, utxo_lock_height, utxo_lock_tx_hash, value, recipient_pkh, sender_pkh, \
hash_lock, time_lock, penalty_bps, sender_evm_addr, expected_price, script_hash, \
evm_lock_tx_hash, evm_lock_time, evm_unlock_tx_hash, secret, utxo_unlock_tx_hash, \
evm_refund_tx_hash, status, created_at, updated_at";

pub struct B2sRepository;

impl B2sRepository {
    /// Insert a freshly ingested record. Returns `false` when the hash-lock
    /// or lock txid is already present — the uniqueness guarantee that makes
    /// block replay a no-op.
    pub async fn insert(pool: &SqlitePool, record: &B2sRecord) -> Result<bool> {
        if record.utxo_lock_height == 0
            || record.utxo_lock_tx_hash.is_empty()
            || record.value == 0
            || record.recipient_pkh.is_empty()
            || record.sender_pkh.is_empty()
            || record.hash_lock.is_empty()
            || record.time_lock == 0
            || record.sender_evm_addr.is_empty()
            || record.script_hash.is_empty()
        {
            return Err(BotError::IllegalTransition(
                "b2s insert with missing required fields".into(),
            ));
        }

        let now = unix_now() as i64;
        let result = sqlx::query(
            r#"
INSERT INTO b2s_records (
  utxo_lock_height, utxo_lock_tx_hash, value, recipient_pkh, sender_pkh,
  hash_lock, time_lock, penalty_bps, sender_evm_addr, expected_price, script_hash,
  evm_lock_tx_hash, evm_lock_time, evm_unlock_tx_hash, secret, utxo_unlock_tx_hash,
  evm_refund_tx_hash, status, created_at, updated_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
"#,
        )
        .bind(record.utxo_lock_height as i64)
        .bind(&record.utxo_lock_tx_hash)
        .bind(record.value as i64)
        .bind(&record.recipient_pkh)
        .bind(&record.sender_pkh)
        .bind(&record.hash_lock)
        .bind(record.time_lock as i64)
        .bind(record.penalty_bps as i64)
        .bind(&record.sender_evm_addr)
        .bind(record.expected_price as i64)
        .bind(&record.script_hash)
        .bind(&record.evm_lock_tx_hash)
        .bind(record.evm_lock_time as i64)
        .bind(&record.evm_unlock_tx_hash)
        .bind(&record.secret)
        .bind(&record.utxo_unlock_tx_hash)
        .bind(&record.evm_refund_tx_hash)
        .bind(record.status as i64)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(BotError::Database(format!("insert b2s: {e}"))),
        }
    }

    /// Persist all mutable fields; refuses updates whose target status lacks
    /// its required fields.
    pub async fn update(pool: &SqlitePool, record: &B2sRecord) -> Result<()> {
        validate_required_fields(record)?;

        let rows = sqlx::query(
            r#"
UPDATE b2s_records SET
  evm_lock_tx_hash = ?1,
  evm_lock_time = ?2,
  evm_unlock_tx_hash = ?3,
  secret = ?4,
  utxo_unlock_tx_hash = ?5,
  evm_refund_tx_hash = ?6,
  status = ?7,
  updated_at = ?8
WHERE id = ?9
"#,
        )
        .bind(&record.evm_lock_tx_hash)
        .bind(record.evm_lock_time as i64)
        .bind(&record.evm_unlock_tx_hash)
        .bind(&record.secret)
        .bind(&record.utxo_unlock_tx_hash)
        .bind(&record.evm_refund_tx_hash)
        .bind(record.status as i64)
        .bind(unix_now() as i64)
        .bind(record.id)
        .execute(pool)
        .await
        .map_err(|e| BotError::Database(format!("update b2s: {e}")))?
        .rows_affected();

        if rows != 1 {
            return Err(BotError::Database(format!(
                "b2s record {} missing on update",
                record.id
            )));
        }
        Ok(())
    }

    /// FIFO by insertion order.
    pub async fn by_status(
        pool: &SqlitePool,
        status: B2sStatus,
        limit: u32,
    ) -> Result<Vec<B2sRecord>> {
        let rows: Vec<DbB2sRecord> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM b2s_records WHERE status = ?1 ORDER BY id ASC LIMIT ?2"
        ))
        .bind(status as i64)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(|e| BotError::Database(format!("b2s by status: {e}")))?;
        rows.into_iter().map(DbB2sRecord::into_record).collect()
    }

    pub async fn by_hash_lock(pool: &SqlitePool, hash_lock: &str) -> Result<Option<B2sRecord>> {
        let row: Option<DbB2sRecord> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM b2s_records WHERE hash_lock = ?1"
        ))
        .bind(hash_lock)
        .fetch_optional(pool)
        .await
        .map_err(|e| BotError::Database(format!("b2s by hash lock: {e}")))?;
        row.map(DbB2sRecord::into_record).transpose()
    }

    pub async fn all(pool: &SqlitePool) -> Result<Vec<B2sRecord>> {
        let rows: Vec<DbB2sRecord> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM b2s_records ORDER BY id ASC"
        ))
        .fetch_all(pool)
        .await
        .map_err(|e| BotError::Database(format!("b2s all: {e}")))?;
        rows.into_iter().map(DbB2sRecord::into_record).collect()
    }
}

fn validate_required_fields(record: &B2sRecord) -> Result<()> {
    let missing = match record.status {
        B2sStatus::EvmLocked => {
            record.evm_lock_tx_hash.is_empty() || record.evm_lock_time == 0
        }
        B2sStatus::SecretRevealed => {
            record.secret.is_empty() || record.evm_unlock_tx_hash.is_empty()
        }
        B2sStatus::UtxoUnlocked => record.utxo_unlock_tx_hash.is_empty(),
        B2sStatus::EvmRefunded => record.evm_refund_tx_hash.is_empty(),
        B2sStatus::New | B2sStatus::TooLateToLockEvm | B2sStatus::PriceChanged => false,
    };
    if missing {
        return Err(BotError::IllegalTransition(format!(
            "b2s record {} updated to {} with required fields empty",
            record.id,
            record.status.name()
        )));
    }
    Ok(())
}
