use sha2::{Digest, Sha256};

/// Status of an inbound-UTXO swap (user locks on the UTXO chain, the bot
/// mirrors on the EVM chain).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum B2sStatus {
    New = 0,
    EvmLocked = 1,
    SecretRevealed = 2,
    UtxoUnlocked = 3,
    EvmRefunded = 4,
    TooLateToLockEvm = 5,
    PriceChanged = 6,
}

impl B2sStatus {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::New),
            1 => Some(Self::EvmLocked),
            2 => Some(Self::SecretRevealed),
            3 => Some(Self::UtxoUnlocked),
            4 => Some(Self::EvmRefunded),
            5 => Some(Self::TooLateToLockEvm),
            6 => Some(Self::PriceChanged),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::EvmLocked => "EvmLocked",
            Self::SecretRevealed => "SecretRevealed",
            Self::UtxoUnlocked => "UtxoUnlocked",
            Self::EvmRefunded => "EvmRefunded",
            Self::TooLateToLockEvm => "TooLateToLockEvm",
            Self::PriceChanged => "PriceChanged",
        }
    }
}

/// Status of an inbound-EVM swap (user locks on the EVM chain, the bot
/// mirrors on the UTXO chain).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum S2bStatus {
    New = 0,
    UtxoLocked = 1,
    SecretRevealed = 2,
    EvmUnlocked = 3,
    UtxoRefunded = 4,
    TooLateToLockUtxo = 5,
    PriceChanged = 6,
}

impl S2bStatus {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::New),
            1 => Some(Self::UtxoLocked),
            2 => Some(Self::SecretRevealed),
            3 => Some(Self::EvmUnlocked),
            4 => Some(Self::UtxoRefunded),
            5 => Some(Self::TooLateToLockUtxo),
            6 => Some(Self::PriceChanged),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::UtxoLocked => "UtxoLocked",
            Self::SecretRevealed => "SecretRevealed",
            Self::EvmUnlocked => "EvmUnlocked",
            Self::UtxoRefunded => "UtxoRefunded",
            Self::TooLateToLockUtxo => "TooLateToLockUtxo",
            Self::PriceChanged => "PriceChanged",
        }
    }
}

/// One UTXO→EVM swap, keyed by its hash-lock. Hex fields are lowercase,
/// unprefixed. Fields past `script_hash` start empty and are filled in by the
/// typed transition methods as the swap advances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct B2sRecord {
    pub id: i64,
    pub utxo_lock_height: u64,
    pub utxo_lock_tx_hash: String,
    /// Locked amount, in sats.
    pub value: u64,
    /// The bot's PKH (lock recipient).
    pub recipient_pkh: String,
    /// The user's PKH (lock sender, refund destination).
    pub sender_pkh: String,
    pub hash_lock: String,
    /// User-side expiry, in UTXO blocks.
    pub time_lock: u32,
    pub penalty_bps: u16,
    /// Where the mirrored EVM lock pays out.
    pub sender_evm_addr: String,
    /// Highest price the user accepts, 8 decimals.
    pub expected_price: u64,
    /// hash160 of the covenant redeem script, cross-checked at detection.
    pub script_hash: String,
    pub evm_lock_tx_hash: String,
    pub evm_lock_time: u64,
    pub evm_unlock_tx_hash: String,
    pub secret: String,
    pub utxo_unlock_tx_hash: String,
    pub evm_refund_tx_hash: String,
    pub status: B2sStatus,
    pub created_at: u64,
    pub updated_at: u64,
}

impl B2sRecord {
    pub fn evm_locked(&mut self, tx_hash: String, tx_time: u64) {
        self.evm_lock_tx_hash = tx_hash;
        self.evm_lock_time = tx_time;
        self.status = B2sStatus::EvmLocked;
    }

    pub fn secret_revealed(&mut self, secret: String, evm_unlock_tx_hash: String) {
        self.secret = secret;
        self.evm_unlock_tx_hash = evm_unlock_tx_hash;
        self.status = B2sStatus::SecretRevealed;
    }

    pub fn utxo_unlocked(&mut self, tx_hash: String) {
        self.utxo_unlock_tx_hash = tx_hash;
        self.status = B2sStatus::UtxoUnlocked;
    }

    pub fn evm_refunded(&mut self, tx_hash: String) {
        self.evm_refund_tx_hash = tx_hash;
        self.status = B2sStatus::EvmRefunded;
    }
}

/// One EVM→UTXO swap, keyed by its hash-lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S2bRecord {
    pub id: i64,
    /// Creation time of the user's EVM lock, chain clock.
    pub evm_lock_time: u64,
    pub evm_lock_tx_hash: String,
    /// Locked amount converted to sats.
    pub value: u64,
    /// The user's EVM address (locker, unlock counter-party).
    pub evm_sender_addr: String,
    /// Where the mirrored UTXO lock pays out.
    pub utxo_recipient_pkh: String,
    pub hash_lock: String,
    /// User-side expiry, in seconds.
    pub time_lock: u32,
    pub penalty_bps: u16,
    pub expected_price: u64,
    /// Expected hash160 of the mirrored covenant, precomputed at ingestion.
    pub script_hash: String,
    pub utxo_lock_tx_hash: String,
    pub utxo_unlock_tx_hash: String,
    pub secret: String,
    pub evm_unlock_tx_hash: String,
    pub utxo_refund_tx_hash: String,
    pub status: S2bStatus,
    pub created_at: u64,
    pub updated_at: u64,
}

impl S2bRecord {
    pub fn utxo_locked(&mut self, tx_hash: String) {
        self.utxo_lock_tx_hash = tx_hash;
        self.status = S2bStatus::UtxoLocked;
    }

    pub fn secret_revealed(&mut self, secret: String, utxo_unlock_tx_hash: String) {
        self.secret = secret;
        self.utxo_unlock_tx_hash = utxo_unlock_tx_hash;
        self.status = S2bStatus::SecretRevealed;
    }

    pub fn evm_unlocked(&mut self, tx_hash: String) {
        self.evm_unlock_tx_hash = tx_hash;
        self.status = S2bStatus::EvmUnlocked;
    }

    pub fn utxo_refunded(&mut self, tx_hash: String) {
        self.utxo_refund_tx_hash = tx_hash;
        self.status = S2bStatus::UtxoRefunded;
    }
}

/// Hex-encoded sha256 of a revealed secret, for comparison against the
/// stored hash-lock.
pub fn secret_to_hash_lock(secret: &[u8]) -> String {
    hex::encode(Sha256::digest(secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for i in 0..=6 {
            assert_eq!(B2sStatus::from_i64(i).unwrap() as i64, i);
            assert_eq!(S2bStatus::from_i64(i).unwrap() as i64, i);
        }
        assert!(B2sStatus::from_i64(7).is_none());
        assert!(S2bStatus::from_i64(-1).is_none());
    }

    #[test]
    fn secret_hashes_to_hash_lock() {
        let secret = [0x42u8; 32];
        let hash_lock = secret_to_hash_lock(&secret);
        assert_eq!(hash_lock.len(), 64);
        assert_eq!(hash_lock, hex::encode(Sha256::digest(secret)));
    }
}
