//! Transaction model, serialization, and signing for the UTXO chain.
//!
//! Signature digests follow the post-fork scheme: the BIP143 preimage with
//! the fork-id bit, SIGHASH_ALL | SIGHASH_FORKID (0x41).

use secp256k1::{Message, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};

pub const SIGHASH_ALL_FORKID: u32 = 0x41;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutPoint {
    /// Display-order txid bytes; reversed on serialization.
    pub txid: [u8; 32],
    pub vout: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    pub prev: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            version: 2,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(256);
        out.extend_from_slice(&self.version.to_le_bytes());
        write_varint(&mut out, self.inputs.len() as u64);
        for input in &self.inputs {
            let mut txid = input.prev.txid;
            txid.reverse();
            out.extend_from_slice(&txid);
            out.extend_from_slice(&input.prev.vout.to_le_bytes());
            write_varint(&mut out, input.script_sig.len() as u64);
            out.extend_from_slice(&input.script_sig);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }
        write_varint(&mut out, self.outputs.len() as u64);
        for output in &self.outputs {
            out.extend_from_slice(&output.value.to_le_bytes());
            write_varint(&mut out, output.script_pubkey.len() as u64);
            out.extend_from_slice(&output.script_pubkey);
        }
        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out
    }

    /// Display-order hex txid.
    pub fn txid(&self) -> String {
        let mut hash = double_sha256(&self.serialize());
        hash.reverse();
        hex::encode(hash)
    }

    /// Signature digest for `input_index` spending `amount` under
    /// `script_code`.
    pub fn sighash(&self, input_index: usize, script_code: &[u8], amount: u64) -> [u8; 32] {
        let mut prevouts = Vec::with_capacity(self.inputs.len() * 36);
        let mut sequences = Vec::with_capacity(self.inputs.len() * 4);
        for input in &self.inputs {
            let mut txid = input.prev.txid;
            txid.reverse();
            prevouts.extend_from_slice(&txid);
            prevouts.extend_from_slice(&input.prev.vout.to_le_bytes());
            sequences.extend_from_slice(&input.sequence.to_le_bytes());
        }
        let mut outputs = Vec::new();
        for output in &self.outputs {
            outputs.extend_from_slice(&output.value.to_le_bytes());
            write_varint(&mut outputs, output.script_pubkey.len() as u64);
            outputs.extend_from_slice(&output.script_pubkey);
        }

        let input = &self.inputs[input_index];
        let mut preimage = Vec::with_capacity(256);
        preimage.extend_from_slice(&self.version.to_le_bytes());
        preimage.extend_from_slice(&double_sha256(&prevouts));
        preimage.extend_from_slice(&double_sha256(&sequences));
        let mut txid = input.prev.txid;
        txid.reverse();
        preimage.extend_from_slice(&txid);
        preimage.extend_from_slice(&input.prev.vout.to_le_bytes());
        write_varint(&mut preimage, script_code.len() as u64);
        preimage.extend_from_slice(script_code);
        preimage.extend_from_slice(&amount.to_le_bytes());
        preimage.extend_from_slice(&input.sequence.to_le_bytes());
        preimage.extend_from_slice(&double_sha256(&outputs));
        preimage.extend_from_slice(&self.lock_time.to_le_bytes());
        preimage.extend_from_slice(&SIGHASH_ALL_FORKID.to_le_bytes());

        double_sha256(&preimage)
    }

    /// DER signature over the input's digest, with the hash-type byte
    /// appended, ready for a script push.
    pub fn sign_input(
        &self,
        input_index: usize,
        script_code: &[u8],
        amount: u64,
        key: &SecretKey,
    ) -> Vec<u8> {
        let digest = self.sighash(input_index, script_code, amount);
        let secp = Secp256k1::signing_only();
        let sig = secp.sign_ecdsa(&Message::from_digest(digest), key);
        let mut out = sig.serialize_der().to_vec();
        out.push(SIGHASH_ALL_FORKID as u8);
        out
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

fn write_varint(out: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x10000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}
