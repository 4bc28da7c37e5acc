//! End-to-end swap flows driven through the mock chain clients and an
//! in-memory record store.

use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolEvent;
use secp256k1::{PublicKey, Secp256k1, SecretKey};

use swapbot_chain::{EvmClient, MockEvmClient, MockUtxoClient, UtxoClient};
use swapbot_core::events::{Lock, Unlock};
use swapbot_core::types::{
    hex_to_array, secret_to_hash_lock, unix_now, B2sRecord, B2sStatus, BlockView, BotIdentity,
    Chain, MarketMakerParams, RunMode, S2bStatus, TxInView, TxOutView, TxView, Utxo,
};
use swapbot_core::ErrorRing;
use swapbot_db::repositories::{B2sRepository, CursorRepository, S2bRepository};
use swapbot_db::Db;
use swapbot_engine::{EngineConfig, SwapBot};
use swapbot_htlc::script::{hash160, p2sh_script};
use swapbot_htlc::tag::LockTag;
use swapbot_htlc::HtlcCovenant;

const T0: u64 = 1_700_000_000;
const USER_PKH: [u8; 20] = [0x22; 20];
const SECRET: [u8; 32] = [0x5e; 32];

fn bot_key() -> SecretKey {
    SecretKey::from_slice(&[0x11; 32]).unwrap()
}

fn bot_pkh() -> [u8; 20] {
    let secp = Secp256k1::signing_only();
    hash160(&PublicKey::from_secret_key(&secp, &bot_key()).serialize())
}

fn bot_evm_addr() -> Address {
    Address::repeat_byte(0xbb)
}

fn user_evm_addr() -> Address {
    Address::repeat_byte(0xcc)
}

fn secret_hash() -> [u8; 32] {
    hex_to_array::<32>(&secret_to_hash_lock(&SECRET)).unwrap()
}

fn b2s_params() -> MarketMakerParams {
    MarketMakerParams {
        utxo_time_lock: 100,
        evm_time_lock: 60_000,
        penalty_bps: 500,
        utxo_price: 100_000_000,
        evm_price: 100_000_000,
        min_swap_amt: 100_000,
        max_swap_amt: 999_999,
    }
}

fn s2b_params() -> MarketMakerParams {
    MarketMakerParams {
        utxo_time_lock: 72,
        evm_time_lock: 43_200,
        penalty_bps: 500,
        utxo_price: 100_000_000,
        evm_price: 100_000_000,
        min_swap_amt: 100_000,
        max_swap_amt: 20_000_000,
    }
}

struct Harness {
    db: Db,
    utxo: Arc<MockUtxoClient>,
    evm: Arc<MockEvmClient>,
    bot: SwapBot,
}

async fn harness(mode: RunMode, params: MarketMakerParams) -> Harness {
    let db = Db::connect_memory().await.unwrap();
    db.migrate().await.unwrap();
    CursorRepository::init(db.pool()).await.unwrap();

    let utxo = Arc::new(MockUtxoClient::new(128));
    let evm = Arc::new(MockEvmClient::new(1000, T0));

    let utxo_key = match mode {
        RunMode::Slave => None,
        _ => Some(bot_key()),
    };
    let bot = SwapBot::new(
        db.clone(),
        utxo.clone() as Arc<dyn UtxoClient>,
        evm.clone() as Arc<dyn EvmClient>,
        BotIdentity {
            utxo_pkh: bot_pkh(),
            evm_addr: bot_evm_addr(),
        },
        utxo_key,
        params,
        EngineConfig {
            mode,
            utxo_lock_fee_rate: 2,
            utxo_unlock_fee_rate: 2,
            utxo_refund_fee_rate: 2,
            utxo_confirmations: 2,
        },
        Arc::new(ErrorRing::default()),
    );
    Harness { db, utxo, evm, bot }
}

/// A user deposit into the covenant at the given height, tagged for us.
fn user_deposit_block(height: u64, value: u64, expected_price: u64) -> (BlockView, String) {
    let covenant = HtlcCovenant::new(USER_PKH, bot_pkh(), secret_hash(), 100, 500);
    let tag = LockTag {
        recipient_pkh: bot_pkh(),
        sender_pkh: USER_PKH,
        hash_lock: secret_hash(),
        expiration: 100,
        penalty_bps: 500,
        sender_evm_addr: user_evm_addr().0 .0,
        expected_price,
    };
    let txid = hex::encode([0xab; 32]);
    let block = BlockView {
        height,
        txs: vec![TxView {
            txid: txid.clone(),
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
        }],
    };
    (block, txid)
}

fn user_evm_lock_data(value_wei: U256, expected_price: u64) -> alloy_primitives::LogData {
    Lock {
        locker: user_evm_addr(),
        unlocker: bot_evm_addr(),
        hashLock: B256::from(secret_hash()),
        unlockTime: U256::from(T0 + 43_200),
        value: value_wei,
        utxoRecipientPkh: USER_PKH.into(),
        createdTime: U256::from(T0),
        penaltyBPS: 500,
        expectedPrice: U256::from(expected_price),
    }
    .encode_log_data()
}

async fn b2s_record(db: &Db) -> B2sRecord {
    B2sRepository::by_hash_lock(db.pool(), &secret_to_hash_lock(&SECRET))
        .await
        .unwrap()
        .expect("b2s record")
}

#[tokio::test]
async fn b2s_happy_path() {
    let mut h = harness(RunMode::Master, b2s_params()).await;

    // user locks 500_000 sats at height 126 (tip 128, horizon 2)
    let (block, lock_txid) = user_deposit_block(126, 500_000, 90_000_000);
    h.utxo.put_block(block);
    h.utxo.set_confirmations(&lock_txid, 1);

    h.bot.run_once().await.unwrap();

    // ingested and mirrored in the same iteration
    let record = b2s_record(&h.db).await;
    assert_eq!(record.status, B2sStatus::EvmLocked);
    assert_eq!(record.value, 500_000);
    assert_eq!(record.utxo_lock_height, 126);
    assert_eq!(record.utxo_lock_tx_hash, lock_txid);
    assert_eq!(record.sender_evm_addr, hex::encode(user_evm_addr()));
    assert_eq!(record.evm_lock_time, T0);

    let locks = h.evm.lock_calls();
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].receiver, user_evm_addr());
    assert_eq!(locks[0].hash_lock, B256::from(secret_hash()));
    // mirror carries half the user's window
    assert_eq!(locks[0].valid_period_secs, 30_000);
    assert_eq!(locks[0].value_wei, U256::from(500_000u64) * U256::from(10_000_000_000u64));

    assert_eq!(
        CursorRepository::get(h.db.pool(), Chain::Utxo).await.unwrap(),
        126
    );

    // a unlock log with the wrong secret is ignored
    let bad = Unlock {
        hashLock: B256::from(secret_hash()),
        secret: B256::repeat_byte(0x66),
    }
    .encode_log_data();
    h.evm.push_log(1001, B256::repeat_byte(0xd0), bad);
    h.bot.run_once().await.unwrap();
    assert_eq!(b2s_record(&h.db).await.status, B2sStatus::EvmLocked);

    // the real unlock reveals the secret
    let good = Unlock {
        hashLock: B256::from(secret_hash()),
        secret: B256::from(SECRET),
    }
    .encode_log_data();
    h.evm.push_log(1002, B256::repeat_byte(0xd1), good);
    h.bot.run_once().await.unwrap();

    let record = b2s_record(&h.db).await;
    assert_eq!(record.status, B2sStatus::SecretRevealed);
    assert_eq!(record.secret, hex::encode(SECRET));
    assert_eq!(record.evm_unlock_tx_hash, hex::encode([0xd1u8; 32]));

    // next iteration claims the UTXO deposit
    h.bot.run_once().await.unwrap();
    let record = b2s_record(&h.db).await;
    assert_eq!(record.status, B2sStatus::UtxoUnlocked);

    let sent = h.utxo.sent_txs();
    assert_eq!(sent.len(), 1);
    assert_eq!(record.utxo_unlock_tx_hash, sent[0].txid());
    assert_eq!(hex::encode(sent[0].inputs[0].prev.txid), lock_txid);
    // claim pays the full deposit minus the miner fee
    let fee = sent[0].serialize().len() as u64 * 2;
    assert_eq!(sent[0].outputs[0].value, 500_000 - fee);
}

#[tokio::test]
async fn b2s_too_late_to_mirror() {
    let mut h = harness(RunMode::Master, b2s_params()).await;

    let (block, lock_txid) = user_deposit_block(126, 500_000, 90_000_000);
    h.utxo.put_block(block);
    // 40 > 100 / 3: the user already burned too much of their window
    h.utxo.set_confirmations(&lock_txid, 40);

    h.bot.run_once().await.unwrap();

    assert_eq!(b2s_record(&h.db).await.status, B2sStatus::TooLateToLockEvm);
    assert!(h.evm.lock_calls().is_empty());
}

#[tokio::test]
async fn b2s_refund_after_expiry() {
    let mut h = harness(RunMode::Master, b2s_params()).await;

    let (block, lock_txid) = user_deposit_block(126, 500_000, 90_000_000);
    h.utxo.put_block(block);
    h.utxo.set_confirmations(&lock_txid, 1);
    h.bot.run_once().await.unwrap();
    assert_eq!(b2s_record(&h.db).await.status, B2sStatus::EvmLocked);

    // user never unlocks; half the user's window passes on the EVM clock
    h.evm.set_tip(1001, T0 + 30_001);
    h.bot.run_once().await.unwrap();

    let record = b2s_record(&h.db).await;
    assert_eq!(record.status, B2sStatus::EvmRefunded);
    assert!(!record.evm_refund_tx_hash.is_empty());

    let refunds = h.evm.refund_calls();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0], (bot_evm_addr(), B256::from(secret_hash())));
}

#[tokio::test]
async fn s2b_happy_path() {
    let mut h = harness(RunMode::Master, s2b_params()).await;

    // 0.12345678 coins locked for us on the EVM side
    let value_wei = U256::from(123_456_780_000_000_000u128);
    h.evm.push_log(
        1001,
        B256::repeat_byte(0xdc),
        user_evm_lock_data(value_wei, 90_000_000),
    );
    h.utxo.set_unspent(vec![Utxo {
        txid: hex::encode([0xef; 32]),
        vout: 0,
        value_sats: 200_000_000,
    }]);

    h.bot.run_once().await.unwrap();

    let hash_lock = secret_to_hash_lock(&SECRET);
    let record = S2bRepository::by_hash_lock(h.db.pool(), &hash_lock)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, S2bStatus::UtxoLocked);
    assert_eq!(record.value, 12_345_678);
    assert_eq!(record.time_lock, 43_200);
    assert_eq!(record.evm_sender_addr, hex::encode(user_evm_addr()));

    // the mirror lock pays the covenant with half the window, no penalty
    let covenant = HtlcCovenant::new(bot_pkh(), USER_PKH, secret_hash(), 36, 0);
    assert_eq!(record.script_hash, hex::encode(covenant.redeem_script_hash()));
    let sent = h.utxo.sent_txs();
    assert_eq!(sent.len(), 1);
    assert_eq!(record.utxo_lock_tx_hash, sent[0].txid());
    assert_eq!(sent[0].outputs[0].value, 12_345_678);
    assert_eq!(
        sent[0].outputs[0].script_pubkey,
        p2sh_script(&covenant.redeem_script_hash())
    );
    assert!(LockTag::decode(&sent[0].outputs[1].script_pubkey).is_some());

    // user claims the covenant, revealing the secret
    let lock_txid_bytes = hex_to_array::<32>(&record.utxo_lock_tx_hash).unwrap();
    let unlock_tx = covenant
        .build_unlock_tx(lock_txid_bytes, 0, record.value, 2, SECRET)
        .unwrap();
    h.utxo.put_block(BlockView {
        height: 127,
        txs: vec![TxView {
            txid: unlock_tx.txid(),
            inputs: vec![TxInView {
                prev_txid: record.utxo_lock_tx_hash.clone(),
                prev_vout: 0,
                script_sig: unlock_tx.inputs[0].script_sig.clone(),
            }],
            outputs: vec![],
        }],
    });
    h.utxo.set_tip(129);

    h.bot.run_once().await.unwrap();

    let record = S2bRepository::by_hash_lock(h.db.pool(), &hash_lock)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, S2bStatus::EvmUnlocked);
    assert_eq!(record.secret, hex::encode(SECRET));
    assert_eq!(record.utxo_unlock_tx_hash, unlock_tx.txid());
    assert!(!record.evm_unlock_tx_hash.is_empty());

    let unlocks = h.evm.unlock_calls();
    assert_eq!(unlocks.len(), 1);
    assert_eq!(
        unlocks[0],
        (user_evm_addr(), B256::from(secret_hash()), B256::from(SECRET))
    );
}

#[tokio::test]
async fn s2b_refund_after_expiry() {
    let mut h = harness(RunMode::Master, s2b_params()).await;

    h.evm.push_log(
        1001,
        B256::repeat_byte(0xdc),
        user_evm_lock_data(U256::from(123_456_780_000_000_000u128), 90_000_000),
    );
    h.utxo.set_unspent(vec![Utxo {
        txid: hex::encode([0xef; 32]),
        vout: 0,
        value_sats: 200_000_000,
    }]);
    h.bot.run_once().await.unwrap();

    let hash_lock = secret_to_hash_lock(&SECRET);
    let record = S2bRepository::by_hash_lock(h.db.pool(), &hash_lock)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, S2bStatus::UtxoLocked);

    // user never claims; the mirror lock matures past its 36-block expiry
    h.utxo.set_confirmations(&record.utxo_lock_tx_hash, 37);
    h.bot.run_once().await.unwrap();

    let record = S2bRepository::by_hash_lock(h.db.pool(), &hash_lock)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, S2bStatus::UtxoRefunded);

    let sent = h.utxo.sent_txs();
    assert_eq!(sent.len(), 2);
    let refund = &sent[1];
    assert_eq!(record.utxo_refund_tx_hash, refund.txid());
    assert_eq!(refund.inputs[0].sequence, 36);
    assert_eq!(
        hex::encode(refund.inputs[0].prev.txid),
        record.utxo_lock_tx_hash
    );
}

async fn seed_revealed_b2s(db: &Db, updated_at: u64) {
    let record = B2sRecord {
        id: 0,
        utxo_lock_height: 126,
        utxo_lock_tx_hash: hex::encode([0xab; 32]),
        value: 500_000,
        recipient_pkh: hex::encode(bot_pkh()),
        sender_pkh: hex::encode(USER_PKH),
        hash_lock: secret_to_hash_lock(&SECRET),
        time_lock: 100,
        penalty_bps: 500,
        sender_evm_addr: hex::encode(user_evm_addr()),
        expected_price: 90_000_000,
        script_hash: hex::encode([0x44; 20]),
        evm_lock_tx_hash: String::new(),
        evm_lock_time: 0,
        evm_unlock_tx_hash: String::new(),
        secret: String::new(),
        utxo_unlock_tx_hash: String::new(),
        evm_refund_tx_hash: String::new(),
        status: B2sStatus::New,
        created_at: 0,
        updated_at: 0,
    };
    assert!(B2sRepository::insert(db.pool(), &record).await.unwrap());
    sqlx::query(
        "UPDATE b2s_records SET status = ?1, secret = ?2, evm_unlock_tx_hash = ?3, \
         evm_lock_tx_hash = ?4, evm_lock_time = ?5, updated_at = ?6 WHERE hash_lock = ?7",
    )
    .bind(B2sStatus::SecretRevealed as i64)
    .bind(hex::encode(SECRET))
    .bind(hex::encode([0xd1u8; 32]))
    .bind(hex::encode([0xd2u8; 32]))
    .bind(T0 as i64)
    .bind(updated_at as i64)
    .bind(secret_to_hash_lock(&SECRET))
    .execute(db.pool())
    .await
    .unwrap();
}

#[tokio::test]
async fn slave_takes_over_after_grace() {
    let mut h = harness(RunMode::Slave, b2s_params()).await;

    // the active instance stalled just now: still inside the grace window
    seed_revealed_b2s(&h.db, unix_now()).await;
    h.bot.run_once().await.unwrap();
    assert_eq!(b2s_record(&h.db).await.status, B2sStatus::SecretRevealed);
    assert!(h.utxo.sent_txs().is_empty());

    // stalled for longer than the grace window: the standby finalizes,
    // which needs no UTXO key since the claim spend is keyless
    sqlx::query("UPDATE b2s_records SET updated_at = ?1")
        .bind((unix_now() - 700) as i64)
        .execute(h.db.pool())
        .await
        .unwrap();
    h.bot.run_once().await.unwrap();

    let record = b2s_record(&h.db).await;
    assert_eq!(record.status, B2sStatus::UtxoUnlocked);
    assert_eq!(h.utxo.sent_txs().len(), 1);

    // a recovering master sees the terminal record and does nothing
    let mut master = SwapBot::new(
        h.db.clone(),
        h.utxo.clone() as Arc<dyn UtxoClient>,
        h.evm.clone() as Arc<dyn EvmClient>,
        BotIdentity {
            utxo_pkh: bot_pkh(),
            evm_addr: bot_evm_addr(),
        },
        Some(bot_key()),
        b2s_params(),
        EngineConfig {
            mode: RunMode::Master,
            utxo_lock_fee_rate: 2,
            utxo_unlock_fee_rate: 2,
            utxo_refund_fee_rate: 2,
            utxo_confirmations: 2,
        },
        Arc::new(ErrorRing::default()),
    );
    master.run_once().await.unwrap();
    assert_eq!(b2s_record(&h.db).await.status, B2sStatus::UtxoUnlocked);
    assert_eq!(h.utxo.sent_txs().len(), 1);
}

#[tokio::test]
async fn already_spent_unlock_still_completes() {
    let mut h = harness(RunMode::Master, b2s_params()).await;
    seed_revealed_b2s(&h.db, unix_now() - 10).await;

    h.utxo.reject_next_as_spent();
    h.bot.run_once().await.unwrap();

    let record = b2s_record(&h.db).await;
    assert_eq!(record.status, B2sStatus::UtxoUnlocked);
    assert_eq!(record.utxo_unlock_tx_hash, "?");
    assert!(h.utxo.sent_txs().is_empty());
}

#[tokio::test]
async fn replayed_block_inserts_nothing() {
    // slave mode: records are ingested but never progressed
    let mut h = harness(RunMode::Slave, b2s_params()).await;

    let (block, _) = user_deposit_block(126, 500_000, 90_000_000);
    h.utxo.put_block(block);
    h.bot.run_once().await.unwrap();
    assert_eq!(B2sRepository::all(h.db.pool()).await.unwrap().len(), 1);

    // rewind the cursor and scan the same block again
    CursorRepository::set(h.db.pool(), Chain::Utxo, 125)
        .await
        .unwrap();
    h.bot.run_once().await.unwrap();
    assert_eq!(B2sRepository::all(h.db.pool()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn replayed_unlock_log_is_a_no_op() {
    let mut h = harness(RunMode::Master, b2s_params()).await;

    let (block, lock_txid) = user_deposit_block(126, 500_000, 90_000_000);
    h.utxo.put_block(block);
    h.utxo.set_confirmations(&lock_txid, 1);
    h.bot.run_once().await.unwrap();

    let unlock = Unlock {
        hashLock: B256::from(secret_hash()),
        secret: B256::from(SECRET),
    }
    .encode_log_data();
    h.evm.push_log(1001, B256::repeat_byte(0xd1), unlock.clone());
    h.bot.run_once().await.unwrap();
    let after_first = b2s_record(&h.db).await;
    assert_eq!(after_first.status, B2sStatus::SecretRevealed);

    // rewind the EVM cursor: the replayed log must not touch the record,
    // even though it is past EvmLocked
    CursorRepository::set(h.db.pool(), Chain::Evm, 1000)
        .await
        .unwrap();
    h.bot.run_once().await.unwrap();
    let after_replay = b2s_record(&h.db).await;
    // by now the unlock step has finished the swap; the replay itself
    // changed neither secret nor unlock tx
    assert_eq!(after_replay.secret, after_first.secret);
    assert_eq!(after_replay.evm_unlock_tx_hash, after_first.evm_unlock_tx_hash);
    assert_eq!(after_replay.status, B2sStatus::UtxoUnlocked);
}

#[tokio::test]
async fn deposits_violating_policy_are_not_recorded() {
    let mut h = harness(RunMode::Master, b2s_params()).await;

    // wrong penalty
    let covenant = HtlcCovenant::new(USER_PKH, bot_pkh(), secret_hash(), 100, 400);
    let tag = LockTag {
        recipient_pkh: bot_pkh(),
        sender_pkh: USER_PKH,
        hash_lock: secret_hash(),
        expiration: 100,
        penalty_bps: 400,
        sender_evm_addr: user_evm_addr().0 .0,
        expected_price: 90_000_000,
    };
    h.utxo.put_block(BlockView {
        height: 126,
        txs: vec![TxView {
            txid: hex::encode([0xa1; 32]),
            inputs: vec![],
            outputs: vec![
                TxOutView {
                    value_sats: 500_000,
                    script_pubkey: p2sh_script(&covenant.redeem_script_hash()),
                },
                TxOutView {
                    value_sats: 0,
                    script_pubkey: tag.encode(),
                },
            ],
        }],
    });
    h.bot.run_once().await.unwrap();
    assert!(B2sRepository::all(h.db.pool()).await.unwrap().is_empty());

    // value below the published minimum
    let (block, _) = user_deposit_block(127, 99_999, 90_000_000);
    h.utxo.set_tip(129);
    h.utxo.put_block(block);
    h.bot.run_once().await.unwrap();
    assert!(B2sRepository::all(h.db.pool()).await.unwrap().is_empty());

    // user demands a better price than published
    let (block, _) = user_deposit_block(128, 500_000, 100_000_001);
    h.utxo.set_tip(130);
    h.utxo.put_block(block);
    h.bot.run_once().await.unwrap();
    assert!(B2sRepository::all(h.db.pool()).await.unwrap().is_empty());
}

#[tokio::test]
async fn price_moving_past_the_bound_cancels_the_mirror() {
    // published price dropped below what this record demands
    let mut params = b2s_params();
    params.utxo_price = 80_000_000;
    let mut h = harness(RunMode::Master, params).await;

    let record = B2sRecord {
        id: 0,
        utxo_lock_height: 126,
        utxo_lock_tx_hash: hex::encode([0xab; 32]),
        value: 500_000,
        recipient_pkh: hex::encode(bot_pkh()),
        sender_pkh: hex::encode(USER_PKH),
        hash_lock: secret_to_hash_lock(&SECRET),
        time_lock: 100,
        penalty_bps: 500,
        sender_evm_addr: hex::encode(user_evm_addr()),
        expected_price: 90_000_000,
        script_hash: hex::encode([0x44; 20]),
        evm_lock_tx_hash: String::new(),
        evm_lock_time: 0,
        evm_unlock_tx_hash: String::new(),
        secret: String::new(),
        utxo_unlock_tx_hash: String::new(),
        evm_refund_tx_hash: String::new(),
        status: B2sStatus::New,
        created_at: 0,
        updated_at: 0,
    };
    assert!(B2sRepository::insert(h.db.pool(), &record).await.unwrap());
    h.utxo.set_confirmations(&record.utxo_lock_tx_hash, 1);

    h.bot.run_once().await.unwrap();

    assert_eq!(b2s_record(&h.db).await.status, B2sStatus::PriceChanged);
    assert!(h.evm.lock_calls().is_empty());
}

#[tokio::test]
async fn slave_mirrors_masters_mirror_lock() {
    let mut h = harness(RunMode::Slave, s2b_params()).await;

    // both instances saw the user's EVM lock
    h.evm.push_log(
        1001,
        B256::repeat_byte(0xdc),
        user_evm_lock_data(U256::from(123_456_780_000_000_000u128), 90_000_000),
    );
    h.bot.run_once().await.unwrap();

    let hash_lock = secret_to_hash_lock(&SECRET);
    let record = S2bRepository::by_hash_lock(h.db.pool(), &hash_lock)
        .await
        .unwrap()
        .unwrap();
    // the slave never initiates the mirror itself
    assert_eq!(record.status, S2bStatus::New);
    assert!(h.utxo.sent_txs().is_empty());

    // the master's lock appears on-chain; the slave follows it
    let covenant = HtlcCovenant::new(bot_pkh(), USER_PKH, secret_hash(), 36, 0);
    let tag = LockTag {
        recipient_pkh: USER_PKH,
        sender_pkh: bot_pkh(),
        hash_lock: secret_hash(),
        expiration: 36,
        penalty_bps: 0,
        sender_evm_addr: bot_evm_addr().0 .0,
        expected_price: 90_000_000,
    };
    let lock_txid = hex::encode([0xba; 32]);
    h.utxo.put_block(BlockView {
        height: 127,
        txs: vec![TxView {
            txid: lock_txid.clone(),
            inputs: vec![],
            outputs: vec![
                TxOutView {
                    value_sats: 12_345_678,
                    script_pubkey: p2sh_script(&covenant.redeem_script_hash()),
                },
                TxOutView {
                    value_sats: 0,
                    script_pubkey: tag.encode(),
                },
            ],
        }],
    });
    h.utxo.set_tip(129);
    h.bot.run_once().await.unwrap();

    let record = S2bRepository::by_hash_lock(h.db.pool(), &hash_lock)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, S2bStatus::UtxoLocked);
    assert_eq!(record.utxo_lock_tx_hash, lock_txid);
}
