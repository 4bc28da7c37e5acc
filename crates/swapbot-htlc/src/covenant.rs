//! The HTLC covenant: redeem-script assembly and the three spend-path
//! transaction builders.
//!
//! The covenant enforces its own spend conditions, so unlock and refund
//! transactions carry no signature — anyone holding the secret (or waiting
//! out the expiry) can submit them, and the script forces the payout
//! destination. Only the lock transaction, which spends the bot's own P2PKH
//! coins, is signed.

use std::sync::LazyLock;

use secp256k1::{PublicKey, Secp256k1, SecretKey};

use swapbot_core::error::{BotError, Result};

use crate::address::{self, AddressKind};
use crate::script::{hash160, p2pkh_script, p2sh_script, ScriptBuilder};
use crate::tag::LockTag;
use crate::tx::{OutPoint, Transaction, TxIn, TxOut};

/// Compiled covenant body; the five constructor arguments are pushed in
/// front of it to form the full redeem script.
pub const TEMPLATE_HEX: &str = "5579009c635679827700a0635779a952798856795879ad670376a91452797e0288ac7e51c778887568c0009d587aa8537a886d6d6d755167557a519d5579827700a0635679a9788855795779ad670376a914787e0288ac7e51c778887568c0009d537ab275537900a06300c65479950210279600cc78a2690376a91453797e0288ac7e00cd78886d686d6d6d5168";

pub static TEMPLATE: LazyLock<Vec<u8>> =
    LazyLock::new(|| hex::decode(TEMPLATE_HEX).expect("covenant template hex is valid"));

/// Dust threshold for penalty outputs.
pub const DUST_SATS: u64 = 546;

/// Lock transactions select at most this many inputs.
pub const MAX_LOCK_INPUTS: usize = 10;

const FEE_PROBE_SATS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct InputInfo {
    /// Display-order txid bytes.
    pub txid: [u8; 32],
    pub vout: u32,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtlcCovenant {
    sender_pkh: [u8; 20],
    recipient_pkh: [u8; 20],
    hash_lock: [u8; 32],
    expiration: u16,
    penalty_bps: u16,
}

impl HtlcCovenant {
    pub fn new(
        sender_pkh: [u8; 20],
        recipient_pkh: [u8; 20],
        hash_lock: [u8; 32],
        expiration: u16,
        penalty_bps: u16,
    ) -> Self {
        Self {
            sender_pkh,
            recipient_pkh,
            hash_lock,
            expiration,
            penalty_bps,
        }
    }

    pub fn redeem_script(&self) -> Vec<u8> {
        ScriptBuilder::new()
            .push_int(self.penalty_bps as i64)
            .push_int(self.expiration as i64)
            .push_data(&self.hash_lock)
            .push_data(&self.recipient_pkh)
            .push_data(&self.sender_pkh)
            .push_ops(&TEMPLATE)
            .build()
    }

    pub fn redeem_script_hash(&self) -> [u8; 20] {
        hash160(&self.redeem_script())
    }

    pub fn p2sh_address(&self, prefix: &str) -> String {
        address::encode(prefix, AddressKind::ScriptHash, &self.redeem_script_hash())
    }

    /// Pay `amt` into the covenant from the key's P2PKH coins. Outputs:
    /// covenant P2SH, the OP_RETURN lock tag, and P2PKH change. The fee is
    /// probed by building once at a fixed miner fee, measuring, and
    /// rebuilding at `serialized_len * fee_rate`.
    pub fn build_lock_tx(
        &self,
        from_key: &SecretKey,
        inputs: &[InputInfo],
        amt: u64,
        fee_rate: u64,
        sender_evm_addr: [u8; 20],
        expected_price: u64,
    ) -> Result<Transaction> {
        let probe = self.lock_tx_with_fee(
            from_key,
            inputs,
            amt,
            FEE_PROBE_SATS,
            sender_evm_addr,
            expected_price,
        )?;
        let fee = probe.serialize().len() as u64 * fee_rate;
        self.lock_tx_with_fee(from_key, inputs, amt, fee, sender_evm_addr, expected_price)
    }

    fn lock_tx_with_fee(
        &self,
        from_key: &SecretKey,
        inputs: &[InputInfo],
        amt: u64,
        fee: u64,
        sender_evm_addr: [u8; 20],
        expected_price: u64,
    ) -> Result<Transaction> {
        let secp = Secp256k1::signing_only();
        let pubkey = PublicKey::from_secret_key(&secp, from_key).serialize();
        let from_pkh = hash160(&pubkey);
        let prev_script = p2pkh_script(&from_pkh);

        let total_in: u64 = inputs.iter().map(|i| i.value).sum();
        let change = total_in
            .checked_sub(amt)
            .and_then(|v| v.checked_sub(fee))
            .ok_or_else(|| {
                BotError::TxFailed(format!(
                    "insufficient input value: {total_in} < {}",
                    amt + fee
                ))
            })?;

        let tag = LockTag {
            recipient_pkh: self.recipient_pkh,
            sender_pkh: self.sender_pkh,
            hash_lock: self.hash_lock,
            expiration: self.expiration,
            penalty_bps: self.penalty_bps,
            sender_evm_addr,
            expected_price,
        };

        let mut tx = Transaction::new();
        for input in inputs {
            tx.inputs.push(TxIn {
                prev: OutPoint {
                    txid: input.txid,
                    vout: input.vout,
                },
                script_sig: vec![],
                sequence: 0,
            });
        }
        tx.outputs.push(TxOut {
            value: amt,
            script_pubkey: p2sh_script(&self.redeem_script_hash()),
        });
        tx.outputs.push(TxOut {
            value: 0,
            script_pubkey: tag.encode(),
        });
        tx.outputs.push(TxOut {
            value: change,
            script_pubkey: p2pkh_script(&from_pkh),
        });

        for i in 0..tx.inputs.len() {
            let sig = tx.sign_input(i, &prev_script, inputs[i].value, from_key);
            tx.inputs[i].script_sig = ScriptBuilder::new()
                .push_data(&sig)
                .push_data(&pubkey)
                .build();
        }
        Ok(tx)
    }

    /// Claim the covenant output with the revealed secret; pays the
    /// recipient's P2PKH. Sequence 0.
    pub fn build_unlock_tx(
        &self,
        prev_txid: [u8; 32],
        vout: u32,
        in_amt: u64,
        fee_rate: u64,
        secret: [u8; 32],
    ) -> Result<Transaction> {
        let probe = self.unlock_tx_with_fee(prev_txid, vout, in_amt, FEE_PROBE_SATS, secret)?;
        let fee = probe.serialize().len() as u64 * fee_rate;
        self.unlock_tx_with_fee(prev_txid, vout, in_amt, fee, secret)
    }

    fn unlock_tx_with_fee(
        &self,
        prev_txid: [u8; 32],
        vout: u32,
        in_amt: u64,
        fee: u64,
        secret: [u8; 32],
    ) -> Result<Transaction> {
        let out_amt = in_amt
            .checked_sub(fee)
            .ok_or_else(|| BotError::TxFailed(format!("fee {fee} exceeds input {in_amt}")))?;

        let mut tx = Transaction::new();
        tx.inputs.push(TxIn {
            prev: OutPoint {
                txid: prev_txid,
                vout,
            },
            script_sig: ScriptBuilder::new()
                .push_data(&secret)
                .push_int(0) // spend-path selector
                .push_data(&self.redeem_script())
                .build(),
            sequence: 0,
        });
        tx.outputs.push(TxOut {
            value: out_amt,
            script_pubkey: p2pkh_script(&self.recipient_pkh),
        });
        Ok(tx)
    }

    /// Reclaim the covenant output after expiry; pays the sender's P2PKH,
    /// minus the penalty cut to the recipient when one is configured.
    /// Sequence equals the expiration block count.
    pub fn build_refund_tx(
        &self,
        prev_txid: [u8; 32],
        vout: u32,
        in_amt: u64,
        fee_rate: u64,
    ) -> Result<Transaction> {
        let probe = self.refund_tx_with_fee(prev_txid, vout, in_amt, FEE_PROBE_SATS)?;
        let fee = probe.serialize().len() as u64 * fee_rate;
        self.refund_tx_with_fee(prev_txid, vout, in_amt, fee)
    }

    fn refund_tx_with_fee(
        &self,
        prev_txid: [u8; 32],
        vout: u32,
        in_amt: u64,
        fee: u64,
    ) -> Result<Transaction> {
        let penalty = if self.penalty_bps > 0 {
            (in_amt * self.penalty_bps as u64 / 10_000).max(DUST_SATS)
        } else {
            0
        };
        let sender_amt = in_amt
            .checked_sub(penalty)
            .and_then(|v| v.checked_sub(fee))
            .ok_or_else(|| {
                BotError::TxFailed(format!(
                    "refund value {in_amt} cannot cover penalty {penalty} and fee {fee}"
                ))
            })?;

        let mut tx = Transaction::new();
        tx.inputs.push(TxIn {
            prev: OutPoint {
                txid: prev_txid,
                vout,
            },
            script_sig: ScriptBuilder::new()
                .push_int(1) // spend-path selector
                .push_data(&self.redeem_script())
                .build(),
            sequence: self.expiration as u32,
        });
        tx.outputs.push(TxOut {
            value: sender_amt,
            script_pubkey: p2pkh_script(&self.sender_pkh),
        });
        if penalty > 0 {
            tx.outputs.push(TxOut {
                value: penalty,
                script_pubkey: p2pkh_script(&self.recipient_pkh),
            });
        }
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parse_p2sh;

    fn covenant() -> HtlcCovenant {
        HtlcCovenant::new([1u8; 20], [2u8; 20], [3u8; 32], 72, 500)
    }

    #[test]
    fn redeem_script_embeds_args_before_template() {
        let script = covenant().redeem_script();
        assert!(script.ends_with(&TEMPLATE));
        // 500 -> two-byte script number push, 72 -> one-byte push
        assert_eq!(&script[..3], &[0x02, 0xf4, 0x01]);
        assert_eq!(&script[3..5], &[0x01, 72]);
    }

    #[test]
    fn script_hash_changes_with_params() {
        let a = covenant().redeem_script_hash();
        let b = HtlcCovenant::new([1u8; 20], [2u8; 20], [3u8; 32], 73, 500).redeem_script_hash();
        assert_ne!(a, b);
    }

    #[test]
    fn p2sh_address_has_prefix() {
        let addr = covenant().p2sh_address("bitcoincash");
        assert!(addr.starts_with("bitcoincash:p"));
    }

    #[test]
    fn lock_tx_shape() {
        let key = SecretKey::from_slice(&[0x55; 32]).unwrap();
        let inputs = [InputInfo {
            txid: [9u8; 32],
            vout: 0,
            value: 1_000_000,
        }];
        let cov = covenant();
        let tx = cov
            .build_lock_tx(&key, &inputs, 500_000, 2, [4u8; 20], 90_000_000)
            .unwrap();

        assert_eq!(tx.outputs.len(), 3);
        assert_eq!(tx.outputs[0].value, 500_000);
        assert_eq!(
            parse_p2sh(&tx.outputs[0].script_pubkey),
            Some(cov.redeem_script_hash())
        );
        let tag = LockTag::decode(&tx.outputs[1].script_pubkey).unwrap();
        assert_eq!(tag.hash_lock, [3u8; 32]);
        assert_eq!(tag.expected_price, 90_000_000);
        // fee was probed on a sibling build whose DER signature may differ
        // in length by a couple of bytes
        let change = tx.outputs[2].value;
        let fee = 1_000_000 - 500_000 - change;
        let len = tx.serialize().len() as u64;
        assert!(fee >= (len - 4) * 2 && fee <= (len + 4) * 2, "fee {fee} vs len {len}");
        assert!(!tx.inputs[0].script_sig.is_empty());
    }

    #[test]
    fn lock_tx_rejects_insufficient_inputs() {
        let key = SecretKey::from_slice(&[0x55; 32]).unwrap();
        let inputs = [InputInfo {
            txid: [9u8; 32],
            vout: 0,
            value: 400_000,
        }];
        let err = covenant()
            .build_lock_tx(&key, &inputs, 500_000, 2, [4u8; 20], 0)
            .unwrap_err();
        assert!(matches!(err, BotError::TxFailed(_)));
    }

    #[test]
    fn unlock_tx_is_keyless_and_pays_recipient() {
        let cov = covenant();
        let tx = cov
            .build_unlock_tx([9u8; 32], 0, 500_000, 2, [7u8; 32])
            .unwrap();
        assert_eq!(tx.inputs[0].sequence, 0);
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.outputs[0].script_pubkey, p2pkh_script(&[2u8; 20]));
        let fee = tx.serialize().len() as u64 * 2;
        assert_eq!(tx.outputs[0].value, 500_000 - fee);
        // sig script reveals the secret first
        let pushes = crate::script::pushed_data(&tx.inputs[0].script_sig).unwrap();
        assert_eq!(pushes[0], vec![7u8; 32]);
    }

    #[test]
    fn refund_tx_splits_penalty_with_dust_floor() {
        let cov = covenant();
        let tx = cov.build_refund_tx([9u8; 32], 0, 500_000, 2).unwrap();
        assert_eq!(tx.inputs[0].sequence, 72);
        assert_eq!(tx.outputs.len(), 2);
        // 5% of 500_000
        assert_eq!(tx.outputs[1].value, 25_000);
        assert_eq!(tx.outputs[1].script_pubkey, p2pkh_script(&[2u8; 20]));

        // tiny value: penalty clamps to dust
        let tx = cov.build_refund_tx([9u8; 32], 0, 10_000, 0).unwrap();
        assert_eq!(tx.outputs[1].value, DUST_SATS);
        assert_eq!(tx.outputs[0].value, 10_000 - DUST_SATS);
    }

    #[test]
    fn refund_tx_without_penalty_has_single_output() {
        let cov = HtlcCovenant::new([1u8; 20], [2u8; 20], [3u8; 32], 72, 0);
        let tx = cov.build_refund_tx([9u8; 32], 0, 500_000, 2).unwrap();
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.outputs[0].script_pubkey, p2pkh_script(&[1u8; 20]));
    }
}
