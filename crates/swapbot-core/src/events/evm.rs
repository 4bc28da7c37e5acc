use alloy_primitives::{Address, FixedBytes, B256, U256};
use alloy_sol_types::{sol, SolEvent};

sol! {
    /// Emitted when value is locked into the HTLC contract.
    #[derive(Debug)]
    event Lock(
        address indexed locker,
        address indexed unlocker,
        bytes32 hashLock,
        uint256 unlockTime,
        uint256 value,
        bytes20 utxoRecipientPkh,
        uint256 createdTime,
        uint16 penaltyBPS,
        uint256 expectedPrice
    );

    /// Emitted when a swap is claimed with its secret.
    #[derive(Debug)]
    event Unlock(
        bytes32 indexed hashLock,
        bytes32 indexed secret
    );

    /// Emitted when an expired swap is refunded to its locker.
    #[derive(Debug)]
    event Refund(
        bytes32 indexed hashLock
    );
}

#[derive(Debug, Clone)]
pub struct EvmLockEvent {
    pub tx_hash: B256,
    pub locker: Address,
    pub unlocker: Address,
    pub hash_lock: B256,
    pub unlock_time: u64,
    pub value: U256,
    pub utxo_recipient_pkh: [u8; 20],
    pub created_time: u64,
    pub penalty_bps: u16,
    pub expected_price: U256,
}

#[derive(Debug, Clone)]
pub struct EvmUnlockEvent {
    pub tx_hash: B256,
    pub hash_lock: B256,
    pub secret: B256,
}

#[derive(Debug, Clone)]
pub struct EvmRefundEvent {
    pub tx_hash: B256,
    pub hash_lock: B256,
}

impl EvmLockEvent {
    pub fn decode(log: &alloy_primitives::Log, tx_hash: B256) -> Option<Self> {
        let ev = Lock::decode_log(log).ok()?;
        Some(Self {
            tx_hash,
            locker: ev.locker,
            unlocker: ev.unlocker,
            hash_lock: ev.hashLock,
            unlock_time: ev.unlockTime.saturating_to::<u64>(),
            value: ev.value,
            utxo_recipient_pkh: ev.utxoRecipientPkh.0,
            created_time: ev.createdTime.saturating_to::<u64>(),
            penalty_bps: ev.penaltyBPS,
            expected_price: ev.expectedPrice,
        })
    }

    /// User-side time-lock span in seconds.
    pub fn time_lock_secs(&self) -> u32 {
        self.unlock_time.saturating_sub(self.created_time) as u32
    }
}

impl EvmUnlockEvent {
    pub fn decode(log: &alloy_primitives::Log, tx_hash: B256) -> Option<Self> {
        let ev = Unlock::decode_log(log).ok()?;
        Some(Self {
            tx_hash,
            hash_lock: ev.hashLock,
            secret: ev.secret,
        })
    }
}

impl EvmRefundEvent {
    pub fn decode(log: &alloy_primitives::Log, tx_hash: B256) -> Option<Self> {
        let ev = Refund::decode_log(log).ok()?;
        Some(Self {
            tx_hash,
            hash_lock: ev.hashLock,
        })
    }
}

/// bytes20 helper for building `Lock` fixtures.
pub fn pkh_bytes(pkh: [u8; 20]) -> FixedBytes<20> {
    FixedBytes::<20>::from(pkh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::LogData;
    use alloy_sol_types::SolEvent;

    #[test]
    fn lock_event_roundtrip() {
        let ev = Lock {
            locker: Address::repeat_byte(1),
            unlocker: Address::repeat_byte(2),
            hashLock: B256::repeat_byte(3),
            unlockTime: U256::from(1_700_043_200u64),
            value: U256::from(123_456_780_000_000_000u128),
            utxoRecipientPkh: FixedBytes::<20>::repeat_byte(4),
            createdTime: U256::from(1_700_000_000u64),
            penaltyBPS: 500,
            expectedPrice: U256::from(90_000_000u64),
        };
        let data: LogData = ev.encode_log_data();
        let raw = alloy_primitives::Log::new_unchecked(
            Address::repeat_byte(9),
            data.topics().to_vec(),
            data.data.clone(),
        );

        let parsed = EvmLockEvent::decode(&raw, B256::repeat_byte(7)).unwrap();
        assert_eq!(parsed.locker, Address::repeat_byte(1));
        assert_eq!(parsed.unlocker, Address::repeat_byte(2));
        assert_eq!(parsed.hash_lock, B256::repeat_byte(3));
        assert_eq!(parsed.time_lock_secs(), 43_200);
        assert_eq!(parsed.utxo_recipient_pkh, [4u8; 20]);
        assert_eq!(parsed.penalty_bps, 500);
    }

    #[test]
    fn unlock_event_decodes_indexed_topics() {
        let ev = Unlock {
            hashLock: B256::repeat_byte(3),
            secret: B256::repeat_byte(5),
        };
        let data: LogData = ev.encode_log_data();
        let raw = alloy_primitives::Log::new_unchecked(
            Address::repeat_byte(9),
            data.topics().to_vec(),
            data.data.clone(),
        );
        let parsed = EvmUnlockEvent::decode(&raw, B256::repeat_byte(7)).unwrap();
        assert_eq!(parsed.hash_lock, B256::repeat_byte(3));
        assert_eq!(parsed.secret, B256::repeat_byte(5));
    }
}
