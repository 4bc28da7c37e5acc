//! Minimal script assembly and inspection for the covenant and its spends.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

pub mod opcodes {
    pub const OP_0: u8 = 0x00;
    pub const OP_PUSHDATA1: u8 = 0x4c;
    pub const OP_PUSHDATA2: u8 = 0x4d;
    pub const OP_PUSHDATA4: u8 = 0x4e;
    pub const OP_1NEGATE: u8 = 0x4f;
    pub const OP_1: u8 = 0x51;
    pub const OP_16: u8 = 0x60;
    pub const OP_RETURN: u8 = 0x6a;
    pub const OP_DUP: u8 = 0x76;
    pub const OP_EQUAL: u8 = 0x87;
    pub const OP_EQUALVERIFY: u8 = 0x88;
    pub const OP_HASH160: u8 = 0xa9;
    pub const OP_CHECKSIG: u8 = 0xac;
    pub const OP_DATA_20: u8 = 0x14;
}

use opcodes::*;

/// Growable script with data-push and small-integer helpers.
#[derive(Debug, Clone, Default)]
pub struct ScriptBuilder {
    bytes: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_op(mut self, op: u8) -> Self {
        self.bytes.push(op);
        self
    }

    /// Raw opcode bytes appended verbatim (used for the compiled covenant
    /// template body).
    pub fn push_ops(mut self, ops: &[u8]) -> Self {
        self.bytes.extend_from_slice(ops);
        self
    }

    pub fn push_data(mut self, data: &[u8]) -> Self {
        match data.len() {
            0 => self.bytes.push(OP_0),
            len @ 1..=75 => {
                self.bytes.push(len as u8);
                self.bytes.extend_from_slice(data);
            }
            len @ 76..=255 => {
                self.bytes.push(OP_PUSHDATA1);
                self.bytes.push(len as u8);
                self.bytes.extend_from_slice(data);
            }
            len => {
                self.bytes.push(OP_PUSHDATA2);
                self.bytes.extend_from_slice(&(len as u16).to_le_bytes());
                self.bytes.extend_from_slice(data);
            }
        }
        self
    }

    /// Minimal script-number push: OP_0 / OP_1..OP_16 where possible,
    /// little-endian sign-magnitude data otherwise.
    pub fn push_int(self, n: i64) -> Self {
        match n {
            0 => self.push_op(OP_0),
            1..=16 => self.push_op(OP_1 + (n as u8) - 1),
            -1 => self.push_op(OP_1NEGATE),
            _ => {
                let num = script_num(n);
                self.push_data(&num)
            }
        }
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

pub fn script_num(n: i64) -> Vec<u8> {
    if n == 0 {
        return vec![];
    }
    let negative = n < 0;
    let mut abs = n.unsigned_abs();
    let mut out = Vec::new();
    while abs > 0 {
        out.push((abs & 0xff) as u8);
        abs >>= 8;
    }
    // the most significant byte carries the sign bit
    if out.last().map(|b| b & 0x80 != 0).unwrap_or(false) {
        out.push(if negative { 0x80 } else { 0 });
    } else if negative {
        let last = out.len() - 1;
        out[last] |= 0x80;
    }
    out
}

/// Extract all data pushes from a script. OP_0 yields an empty push,
/// OP_1..OP_16 a single byte; non-push opcodes are skipped.
pub fn pushed_data(script: &[u8]) -> Option<Vec<Vec<u8>>> {
    let mut pushes = Vec::new();
    let mut i = 0usize;
    while i < script.len() {
        let op = script[i];
        i += 1;
        match op {
            OP_0 => pushes.push(vec![]),
            1..=75 => {
                let len = op as usize;
                let data = script.get(i..i + len)?;
                pushes.push(data.to_vec());
                i += len;
            }
            OP_PUSHDATA1 => {
                let len = *script.get(i)? as usize;
                i += 1;
                let data = script.get(i..i + len)?;
                pushes.push(data.to_vec());
                i += len;
            }
            OP_PUSHDATA2 => {
                let len_bytes = script.get(i..i + 2)?;
                let len = u16::from_le_bytes([len_bytes[0], len_bytes[1]]) as usize;
                i += 2;
                let data = script.get(i..i + len)?;
                pushes.push(data.to_vec());
                i += len;
            }
            OP_PUSHDATA4 => {
                let len_bytes = script.get(i..i + 4)?;
                let len =
                    u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]])
                        as usize;
                i += 4;
                let data = script.get(i..i + len)?;
                pushes.push(data.to_vec());
                i += len;
            }
            op @ OP_1..=OP_16 => pushes.push(vec![op - OP_1 + 1]),
            _ => {}
        }
    }
    Some(pushes)
}

pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    Ripemd160::digest(sha).into()
}

/// OP_HASH160 <20> OP_EQUAL
pub fn p2sh_script(script_hash: &[u8; 20]) -> Vec<u8> {
    ScriptBuilder::new()
        .push_op(OP_HASH160)
        .push_data(script_hash)
        .push_op(OP_EQUAL)
        .build()
}

/// OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG
pub fn p2pkh_script(pkh: &[u8; 20]) -> Vec<u8> {
    ScriptBuilder::new()
        .push_op(OP_DUP)
        .push_op(OP_HASH160)
        .push_data(pkh)
        .push_op(OP_EQUALVERIFY)
        .push_op(OP_CHECKSIG)
        .build()
}

/// Returns the script hash when `script` is exactly a P2SH locking script.
pub fn parse_p2sh(script: &[u8]) -> Option<[u8; 20]> {
    if script.len() != 23
        || script[0] != OP_HASH160
        || script[1] != OP_DATA_20
        || script[22] != OP_EQUAL
    {
        return None;
    }
    script[2..22].try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_num_encoding() {
        assert_eq!(script_num(0), Vec::<u8>::new());
        assert_eq!(script_num(1), vec![0x01]);
        assert_eq!(script_num(127), vec![0x7f]);
        assert_eq!(script_num(128), vec![0x80, 0x00]);
        assert_eq!(script_num(500), vec![0xf4, 0x01]);
        assert_eq!(script_num(-1), vec![0x81]);
        assert_eq!(script_num(43_200), vec![0xc0, 0xa8, 0x00]);
    }

    #[test]
    fn p2sh_roundtrip() {
        let hash = [7u8; 20];
        let script = p2sh_script(&hash);
        assert_eq!(parse_p2sh(&script), Some(hash));
        assert_eq!(parse_p2sh(&script[..22]), None);
    }

    #[test]
    fn pushed_data_walks_mixed_scripts() {
        let script = ScriptBuilder::new()
            .push_data(b"SBAS")
            .push_int(0)
            .push_int(5)
            .push_data(&[9u8; 80])
            .build();
        let pushes = pushed_data(&script).unwrap();
        assert_eq!(pushes.len(), 4);
        assert_eq!(pushes[0], b"SBAS");
        assert_eq!(pushes[1], Vec::<u8>::new());
        assert_eq!(pushes[2], vec![5]);
        assert_eq!(pushes[3], vec![9u8; 80]);
    }

    #[test]
    fn pushed_data_rejects_truncated_push() {
        let mut script = ScriptBuilder::new().push_data(&[1, 2, 3]).build();
        script.truncate(2);
        assert!(pushed_data(&script).is_none());
    }
}
