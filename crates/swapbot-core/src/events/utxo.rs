/// A user deposit into an HTLC covenant, reconstructed from a block's
/// transactions by the lock detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoLockEvent {
    /// Display-order hex txid.
    pub tx_hash: String,
    /// Value of output #0, in sats.
    pub value: u64,
    pub recipient_pkh: [u8; 20],
    pub sender_pkh: [u8; 20],
    pub hash_lock: [u8; 32],
    /// Expiry in blocks.
    pub expiration: u16,
    pub penalty_bps: u16,
    pub sender_evm_addr: [u8; 20],
    /// 8 decimals.
    pub expected_price: u64,
    /// hash160 of the covenant redeem script, taken from output #0.
    pub script_hash: [u8; 20],
}

/// A covenant spend revealing its secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoUnlockEvent {
    pub prev_tx_hash: String,
    pub tx_hash: String,
    pub secret: [u8; 32],
}
