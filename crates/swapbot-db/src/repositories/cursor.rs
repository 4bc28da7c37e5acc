use sqlx::SqlitePool;

use swapbot_core::error::{BotError, Result};
use swapbot_core::types::Chain;

pub struct CursorRepository;

impl CursorRepository {
    /// Create zeroed cursor rows if they do not exist yet (first run).
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        for chain in [Chain::Utxo, Chain::Evm] {
            sqlx::query("INSERT OR IGNORE INTO cursors (id, height) VALUES (?1, 0)")
                .bind(chain.cursor_id())
                .execute(pool)
                .await
                .map_err(|e| BotError::Database(format!("init cursor: {e}")))?;
        }
        Ok(())
    }

    /// A missing cursor row after init is unrecoverable.
    pub async fn get(pool: &SqlitePool, chain: Chain) -> Result<u64> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT height FROM cursors WHERE id = ?1")
            .bind(chain.cursor_id())
            .fetch_optional(pool)
            .await
            .map_err(|e| BotError::Database(format!("get cursor: {e}")))?;
        match row {
            Some((height,)) => Ok(height as u64),
            None => Err(BotError::Database(format!(
                "cursor row '{}' missing",
                chain.cursor_id()
            ))),
        }
    }

    pub async fn set(pool: &SqlitePool, chain: Chain, height: u64) -> Result<()> {
        let rows = sqlx::query("UPDATE cursors SET height = ?1 WHERE id = ?2")
            .bind(height as i64)
            .bind(chain.cursor_id())
            .execute(pool)
            .await
            .map_err(|e| BotError::Database(format!("set cursor: {e}")))?
            .rows_affected();
        if rows != 1 {
            return Err(BotError::Database(format!(
                "cursor row '{}' missing on update",
                chain.cursor_id()
            )));
        }
        Ok(())
    }
}
