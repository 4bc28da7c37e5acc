mod chain;
mod params;
mod record;

pub use chain::{BlockView, Chain, TxInView, TxOutView, TxView, Utxo};
pub use params::{
    evm_seconds_to_utxo_blocks, sats_to_wei, unix_now, utxo_blocks_to_evm_seconds, wei_to_sats,
    BotIdentity, MarketMakerInfo, MarketMakerParams, SwapState,
};
pub use record::{secret_to_hash_lock, B2sRecord, B2sStatus, S2bRecord, S2bStatus};

use crate::error::{BotError, Result};

/// Which instance of the bot this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Master,
    Slave,
    /// A master that deliberately waits out the slave's grace period before
    /// finalizing, so the standby path can be exercised against real chains.
    LazyMaster,
}

impl RunMode {
    pub fn is_master(self) -> bool {
        matches!(self, RunMode::Master | RunMode::LazyMaster)
    }
}

/// Decode a hex string (with or without 0x prefix) into a fixed-size array.
pub fn hex_to_array<const N: usize>(s: &str) -> Result<[u8; N]> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| BotError::EventDecode(format!("bad hex: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| BotError::EventDecode(format!("expected {N} bytes")))
}
