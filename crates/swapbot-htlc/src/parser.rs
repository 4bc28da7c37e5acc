//! Block-level detectors for covenant deposits and covenant spends.

use swapbot_core::events::{UtxoLockEvent, UtxoUnlockEvent};
use swapbot_core::types::{BlockView, TxView};

use crate::covenant::{HtlcCovenant, TEMPLATE};
use crate::script::{parse_p2sh, pushed_data};
use crate::tag::LockTag;

/// All covenant deposits in a block. A deposit is a transaction whose
/// output #0 pays a P2SH covenant and whose output #1 carries the lock tag;
/// the covenant hash recomputed from the tag must match the P2SH hash, which
/// cross-checks the tag against the actual lock.
pub fn find_lock_events(block: &BlockView) -> Vec<UtxoLockEvent> {
    block.txs.iter().filter_map(lock_event).collect()
}

fn lock_event(tx: &TxView) -> Option<UtxoLockEvent> {
    if tx.outputs.len() < 2 {
        return None;
    }
    let script_hash = parse_p2sh(&tx.outputs[0].script_pubkey)?;
    let tag = LockTag::decode(&tx.outputs[1].script_pubkey)?;

    let covenant = HtlcCovenant::new(
        tag.sender_pkh,
        tag.recipient_pkh,
        tag.hash_lock,
        tag.expiration,
        tag.penalty_bps,
    );
    if covenant.redeem_script_hash() != script_hash {
        return None;
    }

    Some(UtxoLockEvent {
        tx_hash: tx.txid.clone(),
        value: tx.outputs[0].value_sats,
        recipient_pkh: tag.recipient_pkh,
        sender_pkh: tag.sender_pkh,
        hash_lock: tag.hash_lock,
        expiration: tag.expiration,
        penalty_bps: tag.penalty_bps,
        sender_evm_addr: tag.sender_evm_addr,
        expected_price: tag.expected_price,
        script_hash,
    })
}

/// All covenant secret-revealing spends in a block: single-input
/// transactions whose signature script ends with the covenant template and
/// whose first push is the 32-byte secret.
pub fn find_unlock_events(block: &BlockView) -> Vec<UtxoUnlockEvent> {
    block.txs.iter().filter_map(unlock_event).collect()
}

fn unlock_event(tx: &TxView) -> Option<UtxoUnlockEvent> {
    if tx.inputs.len() != 1 {
        return None;
    }
    let script_sig = &tx.inputs[0].script_sig;
    if !script_sig.ends_with(&TEMPLATE) {
        return None;
    }
    let pushes = pushed_data(script_sig)?;
    if pushes.len() != 3 || pushes[0].len() != 32 {
        return None;
    }

    Some(UtxoUnlockEvent {
        prev_tx_hash: tx.inputs[0].prev_txid.clone(),
        tx_hash: tx.txid.clone(),
        secret: pushes[0].as_slice().try_into().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use swapbot_core::types::{TxInView, TxOutView};

    use crate::script::p2sh_script;

    fn lock_tx_view(covenant: &HtlcCovenant, tag: &LockTag, value: u64) -> TxView {
        TxView {
            txid: "aa".repeat(32),
            inputs: vec![],
            outputs: vec![
                TxOutView {
                    value_sats: value,
                    script_pubkey: p2sh_script(&covenant.redeem_script_hash()),
                },
                TxOutView {
                    value_sats: 0,
                    script_pubkey: tag.encode(),
                },
            ],
        }
    }

    fn sample() -> (HtlcCovenant, LockTag) {
        let tag = LockTag {
            recipient_pkh: [1u8; 20],
            sender_pkh: [2u8; 20],
            hash_lock: [3u8; 32],
            expiration: 72,
            penalty_bps: 500,
            sender_evm_addr: [4u8; 20],
            expected_price: 90_000_000,
        };
        let covenant = HtlcCovenant::new(
            tag.sender_pkh,
            tag.recipient_pkh,
            tag.hash_lock,
            tag.expiration,
            tag.penalty_bps,
        );
        (covenant, tag)
    }

    #[test]
    fn detects_matching_deposit() {
        let (covenant, tag) = sample();
        let block = BlockView {
            height: 100,
            txs: vec![lock_tx_view(&covenant, &tag, 500_000)],
        };
        let events = find_lock_events(&block);
        assert_eq!(events.len(), 1);
        let ev = &events[0];
        assert_eq!(ev.value, 500_000);
        assert_eq!(ev.hash_lock, [3u8; 32]);
        assert_eq!(ev.script_hash, covenant.redeem_script_hash());
    }

    #[test]
    fn rejects_tag_covenant_mismatch() {
        let (covenant, mut tag) = sample();
        // tag advertises different terms than the P2SH actually enforces
        tag.expiration = 144;
        let block = BlockView {
            height: 100,
            txs: vec![lock_tx_view(&covenant, &tag, 500_000)],
        };
        assert!(find_lock_events(&block).is_empty());
    }

    #[test]
    fn detects_unlock_spend() {
        let (covenant, _) = sample();
        let unlock = covenant
            .build_unlock_tx([9u8; 32], 0, 500_000, 2, [7u8; 32])
            .unwrap();
        let block = BlockView {
            height: 101,
            txs: vec![TxView {
                txid: unlock.txid(),
                inputs: vec![TxInView {
                    prev_txid: hex::encode([9u8; 32]),
                    prev_vout: 0,
                    script_sig: unlock.inputs[0].script_sig.clone(),
                }],
                outputs: vec![],
            }],
        };
        let events = find_unlock_events(&block);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].secret, [7u8; 32]);
        assert_eq!(events[0].prev_tx_hash, hex::encode([9u8; 32]));
    }

    #[test]
    fn refund_spend_is_not_an_unlock() {
        let (covenant, _) = sample();
        let refund = covenant.build_refund_tx([9u8; 32], 0, 500_000, 2).unwrap();
        let block = BlockView {
            height: 101,
            txs: vec![TxView {
                txid: refund.txid(),
                inputs: vec![TxInView {
                    prev_txid: hex::encode([9u8; 32]),
                    prev_vout: 0,
                    script_sig: refund.inputs[0].script_sig.clone(),
                }],
                outputs: vec![],
            }],
        };
        assert!(find_unlock_events(&block).is_empty());
    }
}
