//! OP_RETURN lock tag: the machine-readable swap terms carried next to every
//! covenant deposit.
//!
//! Push sequence (exactly 8): `"SBAS"`, recipient_pkh(20), sender_pkh(20),
//! hash_lock(32), expiration(2 BE), penalty_bps(2 BE), sender_evm_addr(20),
//! expected_price(8 BE).

use crate::script::{opcodes::OP_RETURN, pushed_data, ScriptBuilder};

pub const PROTOCOL_ID: &[u8; 4] = b"SBAS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockTag {
    pub recipient_pkh: [u8; 20],
    pub sender_pkh: [u8; 20],
    pub hash_lock: [u8; 32],
    /// Expiry in blocks.
    pub expiration: u16,
    pub penalty_bps: u16,
    pub sender_evm_addr: [u8; 20],
    /// 8 decimals.
    pub expected_price: u64,
}

impl LockTag {
    /// Full OP_RETURN locking script.
    pub fn encode(&self) -> Vec<u8> {
        ScriptBuilder::new()
            .push_op(OP_RETURN)
            .push_data(PROTOCOL_ID)
            .push_data(&self.recipient_pkh)
            .push_data(&self.sender_pkh)
            .push_data(&self.hash_lock)
            .push_data(&self.expiration.to_be_bytes())
            .push_data(&self.penalty_bps.to_be_bytes())
            .push_data(&self.sender_evm_addr)
            .push_data(&self.expected_price.to_be_bytes())
            .build()
    }

    /// Parse an OP_RETURN locking script; `None` for anything that is not an
    /// exact match of the push layout above.
    pub fn decode(script: &[u8]) -> Option<Self> {
        if script.first() != Some(&OP_RETURN) {
            return None;
        }
        let pushes = pushed_data(&script[1..])?;
        if pushes.len() != 8
            || pushes[0] != PROTOCOL_ID
            || pushes[1].len() != 20
            || pushes[2].len() != 20
            || pushes[3].len() != 32
            || pushes[4].len() != 2
            || pushes[5].len() != 2
            || pushes[6].len() != 20
            || pushes[7].len() != 8
        {
            return None;
        }

        Some(Self {
            recipient_pkh: pushes[1].as_slice().try_into().ok()?,
            sender_pkh: pushes[2].as_slice().try_into().ok()?,
            hash_lock: pushes[3].as_slice().try_into().ok()?,
            expiration: u16::from_be_bytes([pushes[4][0], pushes[4][1]]),
            penalty_bps: u16::from_be_bytes([pushes[5][0], pushes[5][1]]),
            sender_evm_addr: pushes[6].as_slice().try_into().ok()?,
            expected_price: u64::from_be_bytes(pushes[7].as_slice().try_into().ok()?),
        })
    }
}
