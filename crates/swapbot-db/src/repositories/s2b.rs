use sqlx::SqlitePool;

use swapbot_core::error::{BotError, Result};
use swapbot_core::types::{unix_now, S2bRecord, S2bStatus};

use crate::models::DbS2bRecord;
use crate::repositories::is_unique_violation;

const SELECT_COLUMNS: &str = "\
id, evm_lock_time, evm_lock_tx_hash, value, evm_sender_addr, utxo_recipient_pkh, \
hash_lock, time_lock, penalty_bps, expected_price, script_hash, utxo_lock_tx_hash, \
utxo_unlock_tx_hash, secret, evm_unlock_tx_hash, utxo_refund_tx_hash, status, \
created_at, updated_at";

pub struct S2bRepository;

impl S2bRepository {
    pub async fn insert(pool: &SqlitePool, record: &S2bRecord) -> Result<bool> {
        if record.evm_lock_time == 0
            || record.evm_lock_tx_hash.is_empty()
            || record.value == 0
            || record.evm_sender_addr.is_empty()
            || record.utxo_recipient_pkh.is_empty()
            || record.hash_lock.is_empty()
            || record.time_lock == 0
            || record.script_hash.is_empty()
        {
            return Err(BotError::IllegalTransition(
                "s2b insert with missing required fields".into(),
            ));
        }

        let now = unix_now() as i64;
        let result = sqlx::query(
            r#"
INSERT INTO s2b_records (
  evm_lock_time, evm_lock_tx_hash, value, evm_sender_addr, utxo_recipient_pkh,
  hash_lock, time_lock, penalty_bps, expected_price, script_hash, utxo_lock_tx_hash,
  utxo_unlock_tx_hash, secret, evm_unlock_tx_hash, utxo_refund_tx_hash, status,
  created_at, updated_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
"#,
        )
        .bind(record.evm_lock_time as i64)
        .bind(&record.evm_lock_tx_hash)
        .bind(record.value as i64)
        .bind(&record.evm_sender_addr)
        .bind(&record.utxo_recipient_pkh)
        .bind(&record.hash_lock)
        .bind(record.time_lock as i64)
        .bind(record.penalty_bps as i64)
        .bind(record.expected_price as i64)
        .bind(&record.script_hash)
        .bind(&record.utxo_lock_tx_hash)
        .bind(&record.utxo_unlock_tx_hash)
        .bind(&record.secret)
        .bind(&record.evm_unlock_tx_hash)
        .bind(&record.utxo_refund_tx_hash)
        .bind(record.status as i64)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(BotError::Database(format!("insert s2b: {e}"))),
        }
    }

    pub async fn update(pool: &SqlitePool, record: &S2bRecord) -> Result<()> {
        validate_required_fields(record)?;

        let rows = sqlx::query(
            r#"
UPDATE s2b_records SET
  utxo_lock_tx_hash = ?1,
  utxo_unlock_tx_hash = ?2,
  secret = ?3,
  evm_unlock_tx_hash = ?4,
  utxo_refund_tx_hash = ?5,
  status = ?6,
  updated_at = ?7
WHERE id = ?8
"#,
        )
        .bind(&record.utxo_lock_tx_hash)
        .bind(&record.utxo_unlock_tx_hash)
        .bind(&record.secret)
        .bind(&record.evm_unlock_tx_hash)
        .bind(&record.utxo_refund_tx_hash)
        .bind(record.status as i64)
        .bind(unix_now() as i64)
        .bind(record.id)
        .execute(pool)
        .await
        .map_err(|e| BotError::Database(format!("update s2b: {e}")))?
        .rows_affected();

        if rows != 1 {
            return Err(BotError::Database(format!(
                "s2b record {} missing on update",
                record.id
            )));
        }
        Ok(())
    }

    pub async fn by_status(
        pool: &SqlitePool,
        status: S2bStatus,
        limit: u32,
    ) -> Result<Vec<S2bRecord>> {
        let rows: Vec<DbS2bRecord> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM s2b_records WHERE status = ?1 ORDER BY id ASC LIMIT ?2"
        ))
        .bind(status as i64)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(|e| BotError::Database(format!("s2b by status: {e}")))?;
        rows.into_iter().map(DbS2bRecord::into_record).collect()
    }

    pub async fn by_hash_lock(pool: &SqlitePool, hash_lock: &str) -> Result<Option<S2bRecord>> {
        let row: Option<DbS2bRecord> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM s2b_records WHERE hash_lock = ?1"
        ))
        .bind(hash_lock)
        .fetch_optional(pool)
        .await
        .map_err(|e| BotError::Database(format!("s2b by hash lock: {e}")))?;
        row.map(DbS2bRecord::into_record).transpose()
    }

    /// Correlates a covenant spend with the swap whose mirror lock it spends.
    pub async fn by_utxo_lock_tx_hash(
        pool: &SqlitePool,
        tx_hash: &str,
    ) -> Result<Option<S2bRecord>> {
        let row: Option<DbS2bRecord> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM s2b_records WHERE utxo_lock_tx_hash = ?1"
        ))
        .bind(tx_hash)
        .fetch_optional(pool)
        .await
        .map_err(|e| BotError::Database(format!("s2b by utxo lock tx: {e}")))?;
        row.map(DbS2bRecord::into_record).transpose()
    }

    pub async fn all(pool: &SqlitePool) -> Result<Vec<S2bRecord>> {
        let rows: Vec<DbS2bRecord> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM s2b_records ORDER BY id ASC"
        ))
        .fetch_all(pool)
        .await
        .map_err(|e| BotError::Database(format!("s2b all: {e}")))?;
        rows.into_iter().map(DbS2bRecord::into_record).collect()
    }
}

fn validate_required_fields(record: &S2bRecord) -> Result<()> {
    let missing = match record.status {
        S2bStatus::UtxoLocked => record.utxo_lock_tx_hash.is_empty(),
        S2bStatus::SecretRevealed => {
            record.secret.is_empty() || record.utxo_unlock_tx_hash.is_empty()
        }
        S2bStatus::EvmUnlocked => record.evm_unlock_tx_hash.is_empty(),
        S2bStatus::UtxoRefunded => record.utxo_refund_tx_hash.is_empty(),
        S2bStatus::New | S2bStatus::TooLateToLockUtxo | S2bStatus::PriceChanged => false,
    };
    if missing {
        return Err(BotError::IllegalTransition(format!(
            "s2b record {} updated to {} with required fields empty",
            record.id,
            record.status.name()
        )));
    }
    Ok(())
}
