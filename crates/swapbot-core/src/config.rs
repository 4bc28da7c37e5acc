use std::env;

use alloy_primitives::Address;

use crate::error::{BotError, Result};
use crate::types::RunMode;

/// Runtime configuration from environment variables.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub db_path: String,
    pub utxo_rpc_url: String,
    pub evm_rpc_url: String,
    pub htlc_contract: Address,

    /// Hex-encoded secp256k1 key; master only.
    pub utxo_key_hex: Option<String>,
    /// Hex-encoded EVM key; both modes.
    pub evm_key_hex: String,
    /// Hex-encoded 20-byte PKH of the master's UTXO address; slave only.
    pub master_utxo_pkh_hex: Option<String>,

    pub evm_gas_price_wei: u128,
    pub utxo_lock_fee_rate: u64,
    pub utxo_unlock_fee_rate: u64,
    pub utxo_refund_fee_rate: u64,
    pub utxo_confirmations: u64,
    pub rpc_timeout_secs: u64,
    pub mode: RunMode,
    pub status_listen: String,
    pub cashaddr_prefix: String,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        let slave = env_bool("SWAPBOT_SLAVE", false);
        let lazy_master = env_bool("SWAPBOT_LAZY_MASTER", false);
        let mode = match (slave, lazy_master) {
            (true, true) => {
                return Err(BotError::Config(
                    "SWAPBOT_SLAVE and SWAPBOT_LAZY_MASTER are mutually exclusive".into(),
                ));
            }
            (true, false) => RunMode::Slave,
            (false, true) => RunMode::LazyMaster,
            (false, false) => RunMode::Master,
        };

        let htlc_contract = required("SWAPBOT_HTLC_CONTRACT")?
            .parse::<Address>()
            .map_err(|e| BotError::Config(format!("bad SWAPBOT_HTLC_CONTRACT: {e}")))?;

        let utxo_key_hex = env::var("SWAPBOT_UTXO_KEY").ok().filter(|s| !s.is_empty());
        let master_utxo_pkh_hex = env::var("SWAPBOT_MASTER_UTXO_PKH")
            .ok()
            .filter(|s| !s.is_empty());

        match mode {
            RunMode::Slave => {
                if master_utxo_pkh_hex.is_none() {
                    return Err(BotError::Config(
                        "slave mode needs SWAPBOT_MASTER_UTXO_PKH".into(),
                    ));
                }
            }
            _ => {
                if utxo_key_hex.is_none() {
                    return Err(BotError::MissingEnvVar("SWAPBOT_UTXO_KEY".into()));
                }
            }
        }

        Ok(Self {
            db_path: env::var("SWAPBOT_DB_PATH").unwrap_or_else(|_| "swapbot.db".into()),
            utxo_rpc_url: required("SWAPBOT_UTXO_RPC_URL")?,
            evm_rpc_url: required("SWAPBOT_EVM_RPC_URL")?,
            htlc_contract,
            utxo_key_hex,
            evm_key_hex: required("SWAPBOT_EVM_KEY")?,
            master_utxo_pkh_hex,
            evm_gas_price_wei: env_u128("SWAPBOT_EVM_GAS_PRICE_WEI", 1_050_000_000),
            utxo_lock_fee_rate: env_u64("SWAPBOT_UTXO_LOCK_FEE_RATE", 2),
            utxo_unlock_fee_rate: env_u64("SWAPBOT_UTXO_UNLOCK_FEE_RATE", 2),
            utxo_refund_fee_rate: env_u64("SWAPBOT_UTXO_REFUND_FEE_RATE", 2),
            utxo_confirmations: env_u64("SWAPBOT_UTXO_CONFIRMATIONS", 10),
            rpc_timeout_secs: env_u64("SWAPBOT_RPC_TIMEOUT_SECS", 5),
            mode,
            status_listen: env::var("SWAPBOT_STATUS_LISTEN")
                .unwrap_or_else(|_| "127.0.0.1:8801".into()),
            cashaddr_prefix: env::var("SWAPBOT_CASHADDR_PREFIX")
                .unwrap_or_else(|_| "bitcoincash".into()),
        })
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| BotError::MissingEnvVar(name.to_string()))
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_u128(name: &str, default: u128) -> u128 {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v.to_lowercase() == "true" || v == "1")
        .unwrap_or(default)
}
