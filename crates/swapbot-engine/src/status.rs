//! Operator-facing snapshot of balances and live swaps.

use std::sync::Arc;

use serde::Serialize;

use swapbot_chain::{EvmClient, UtxoClient};
use swapbot_core::error::Result;
use swapbot_core::types::{wei_to_sats, B2sStatus, S2bStatus};
use swapbot_db::repositories::{B2sRepository, S2bRepository};
use swapbot_db::Db;

const SNAPSHOT_BATCH: u32 = 500;

#[derive(Debug, Clone, Serialize)]
pub struct SwapInfo {
    pub hash_lock: String,
    pub value: f64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BotInfo {
    pub free_utxo: f64,
    pub free_evm: f64,
    pub locked_utxo: f64,
    pub locked_evm: f64,
    pub to_be_unlocked_utxo: f64,
    pub to_be_unlocked_evm: f64,
    pub b2s_swaps: Vec<SwapInfo>,
    pub s2b_swaps: Vec<SwapInfo>,
}

fn sats_to_coin(sats: u64) -> f64 {
    sats as f64 / 1e8
}

pub async fn gather_info(
    db: &Db,
    utxo: &Arc<dyn UtxoClient>,
    evm: &Arc<dyn EvmClient>,
) -> Result<BotInfo> {
    let free_utxo: f64 = utxo
        .list_unspent()
        .await?
        .iter()
        .map(|u| sats_to_coin(u.value_sats))
        .sum();
    let free_evm = sats_to_coin(wei_to_sats(evm.balance().await?));

    // inbound-UTXO swaps: our value sits locked on the EVM side until the
    // revealed secret lets us claim the UTXO deposit
    let mut locked_evm = 0.0;
    let mut to_be_unlocked_utxo = 0.0;
    let mut b2s_swaps = Vec::new();
    for status in [
        B2sStatus::New,
        B2sStatus::EvmLocked,
        B2sStatus::SecretRevealed,
    ] {
        for record in B2sRepository::by_status(db.pool(), status, SNAPSHOT_BATCH).await? {
            let coin = sats_to_coin(record.value);
            to_be_unlocked_utxo += coin;
            if status != B2sStatus::New {
                locked_evm += coin;
            }
            b2s_swaps.push(SwapInfo {
                hash_lock: record.hash_lock,
                value: coin,
                status: status.name().to_string(),
            });
        }
    }

    let mut locked_utxo = 0.0;
    let mut to_be_unlocked_evm = 0.0;
    let mut s2b_swaps = Vec::new();
    for status in [
        S2bStatus::New,
        S2bStatus::UtxoLocked,
        S2bStatus::SecretRevealed,
    ] {
        for record in S2bRepository::by_status(db.pool(), status, SNAPSHOT_BATCH).await? {
            let coin = sats_to_coin(record.value);
            to_be_unlocked_evm += coin;
            if status != S2bStatus::New {
                locked_utxo += coin;
            }
            s2b_swaps.push(SwapInfo {
                hash_lock: record.hash_lock,
                value: coin,
                status: status.name().to_string(),
            });
        }
    }

    Ok(BotInfo {
        free_utxo,
        free_evm,
        locked_utxo,
        locked_evm,
        to_be_unlocked_utxo,
        to_be_unlocked_evm,
        b2s_swaps,
        s2b_swaps,
    })
}
