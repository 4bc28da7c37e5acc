use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::{Address, U256};

/// The market-maker registration published on the HTLC contract, hot-reloaded
/// by the scheduler roughly every two minutes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketMakerParams {
    /// HTLC expiry users must post on the UTXO side, in blocks.
    pub utxo_time_lock: u16,
    /// HTLC expiry users must post on the EVM side, in seconds.
    /// Always `utxo_time_lock * 600` under the 10-minute block assumption.
    pub evm_time_lock: u32,
    pub penalty_bps: u16,
    /// Prices carry 8 decimals.
    pub utxo_price: u64,
    pub evm_price: u64,
    /// Swap value bounds in sats; `max_swap_amt == 0` disables the upper bound.
    pub min_swap_amt: u64,
    pub max_swap_amt: u64,
}

impl MarketMakerParams {
    pub fn value_in_range(&self, sats: u64) -> bool {
        sats >= self.min_swap_amt && (self.max_swap_amt == 0 || sats <= self.max_swap_amt)
    }
}

/// Raw `marketMakerByAddress` query result.
#[derive(Debug, Clone)]
pub struct MarketMakerInfo {
    pub addr: Address,
    pub retired_at: u64,
    pub intro: [u8; 32],
    pub utxo_pkh: [u8; 20],
    pub utxo_time_lock: u16,
    pub evm_time_lock: u32,
    pub penalty_bps: u16,
    pub fee_bps: u16,
    pub min_swap_amt: u64,
    pub max_swap_amt: u64,
    pub utxo_price: u64,
    pub evm_price: u64,
    pub status_checker: Address,
    pub unavailable: bool,
}

impl MarketMakerInfo {
    pub fn params(&self) -> MarketMakerParams {
        MarketMakerParams {
            utxo_time_lock: self.utxo_time_lock,
            evm_time_lock: self.evm_time_lock,
            penalty_bps: self.penalty_bps,
            utxo_price: self.utxo_price,
            evm_price: self.evm_price,
            min_swap_amt: self.min_swap_amt,
            max_swap_amt: self.max_swap_amt,
        }
    }
}

/// On-chain swap state as reported by `getSwapState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SwapState {
    Invalid = 0,
    Locked = 1,
    Unlocked = 2,
    Refunded = 3,
}

impl From<u8> for SwapState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Locked,
            2 => Self::Unlocked,
            3 => Self::Refunded,
            _ => Self::Invalid,
        }
    }
}

/// The bot's own addresses on both chains. The UTXO PKH is the master's even
/// in slave mode; the slave never signs UTXO lock transactions.
#[derive(Debug, Clone)]
pub struct BotIdentity {
    pub utxo_pkh: [u8; 20],
    pub evm_addr: Address,
}

pub fn utxo_blocks_to_evm_seconds(blocks: u32) -> u32 {
    blocks * 10 * 60
}

pub fn evm_seconds_to_utxo_blocks(seconds: u32) -> u16 {
    (seconds / (10 * 60)) as u16
}

/// The EVM side counts in wei (18 decimals), the UTXO side in sats (8).
pub fn sats_to_wei(sats: u64) -> U256 {
    U256::from(sats) * U256::from(10_000_000_000u64)
}

pub fn wei_to_sats(wei: U256) -> u64 {
    (wei / U256::from(10_000_000_000u64)).saturating_to::<u64>()
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
