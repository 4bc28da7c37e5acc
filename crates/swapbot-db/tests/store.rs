use swapbot_core::error::BotError;
use swapbot_core::types::{B2sRecord, B2sStatus, Chain, S2bRecord, S2bStatus};
use swapbot_db::repositories::{B2sRepository, CursorRepository, S2bRepository};
use swapbot_db::Db;

async fn open_db() -> Db {
    let db = Db::connect_memory().await.unwrap();
    db.migrate().await.unwrap();
    CursorRepository::init(db.pool()).await.unwrap();
    db
}

fn b2s_record(hash_lock: &str, lock_tx: &str) -> B2sRecord {
    B2sRecord {
        id: 0,
        utxo_lock_height: 100,
        utxo_lock_tx_hash: lock_tx.to_string(),
        value: 500_000,
        recipient_pkh: "11".repeat(20),
        sender_pkh: "22".repeat(20),
        hash_lock: hash_lock.to_string(),
        time_lock: 72,
        penalty_bps: 500,
        sender_evm_addr: "33".repeat(20),
        expected_price: 90_000_000,
        script_hash: "44".repeat(20),
        evm_lock_tx_hash: String::new(),
        evm_lock_time: 0,
        evm_unlock_tx_hash: String::new(),
        secret: String::new(),
        utxo_unlock_tx_hash: String::new(),
        evm_refund_tx_hash: String::new(),
        status: B2sStatus::New,
        created_at: 0,
        updated_at: 0,
    }
}

fn s2b_record(hash_lock: &str, lock_tx: &str) -> S2bRecord {
    S2bRecord {
        id: 0,
        evm_lock_time: 1_700_000_000,
        evm_lock_tx_hash: lock_tx.to_string(),
        value: 500_000,
        evm_sender_addr: "55".repeat(20),
        utxo_recipient_pkh: "66".repeat(20),
        hash_lock: hash_lock.to_string(),
        time_lock: 43_200,
        penalty_bps: 500,
        expected_price: 90_000_000,
        script_hash: "77".repeat(20),
        utxo_lock_tx_hash: String::new(),
        utxo_unlock_tx_hash: String::new(),
        secret: String::new(),
        evm_unlock_tx_hash: String::new(),
        utxo_refund_tx_hash: String::new(),
        status: S2bStatus::New,
        created_at: 0,
        updated_at: 0,
    }
}

#[tokio::test]
async fn cursors_init_and_advance() {
    let db = open_db().await;
    assert_eq!(CursorRepository::get(db.pool(), Chain::Utxo).await.unwrap(), 0);
    assert_eq!(CursorRepository::get(db.pool(), Chain::Evm).await.unwrap(), 0);

    CursorRepository::set(db.pool(), Chain::Utxo, 812_345).await.unwrap();
    assert_eq!(
        CursorRepository::get(db.pool(), Chain::Utxo).await.unwrap(),
        812_345
    );

    // re-init leaves advanced cursors alone
    CursorRepository::init(db.pool()).await.unwrap();
    assert_eq!(
        CursorRepository::get(db.pool(), Chain::Utxo).await.unwrap(),
        812_345
    );
}

#[tokio::test]
async fn duplicate_hash_lock_is_rejected_quietly() {
    let db = open_db().await;
    assert!(B2sRepository::insert(db.pool(), &b2s_record("aa", "tx1"))
        .await
        .unwrap());
    // same hash lock, different tx
    assert!(!B2sRepository::insert(db.pool(), &b2s_record("aa", "tx2"))
        .await
        .unwrap());
    // same lock tx, different hash lock
    assert!(!B2sRepository::insert(db.pool(), &b2s_record("bb", "tx1"))
        .await
        .unwrap());

    let all = B2sRepository::all(db.pool()).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn by_status_is_fifo_and_capped() {
    let db = open_db().await;
    for i in 0..5 {
        let record = b2s_record(&format!("hash{i}"), &format!("tx{i}"));
        assert!(B2sRepository::insert(db.pool(), &record).await.unwrap());
    }

    let records = B2sRepository::by_status(db.pool(), B2sStatus::New, 3)
        .await
        .unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].hash_lock, "hash0");
    assert_eq!(records[2].hash_lock, "hash2");
}

#[tokio::test]
async fn update_validates_required_fields() {
    let db = open_db().await;
    B2sRepository::insert(db.pool(), &b2s_record("aa", "tx1"))
        .await
        .unwrap();
    let mut record = B2sRepository::by_hash_lock(db.pool(), "aa")
        .await
        .unwrap()
        .unwrap();

    // advancing to SecretRevealed without a secret is a programming error
    record.status = B2sStatus::SecretRevealed;
    let err = B2sRepository::update(db.pool(), &record).await.unwrap_err();
    assert!(matches!(err, BotError::IllegalTransition(_)));
    assert!(err.is_fatal());

    record.secret_revealed("99".repeat(32), "ab".repeat(32));
    B2sRepository::update(db.pool(), &record).await.unwrap();

    let reloaded = B2sRepository::by_hash_lock(db.pool(), "aa")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, B2sStatus::SecretRevealed);
    assert!(reloaded.updated_at >= reloaded.created_at);
}

#[tokio::test]
async fn s2b_lookup_by_mirror_lock_tx() {
    let db = open_db().await;
    S2bRepository::insert(db.pool(), &s2b_record("aa", "evmtx1"))
        .await
        .unwrap();
    let mut record = S2bRepository::by_hash_lock(db.pool(), "aa")
        .await
        .unwrap()
        .unwrap();

    record.utxo_locked("utxotx1".to_string());
    S2bRepository::update(db.pool(), &record).await.unwrap();

    let found = S2bRepository::by_utxo_lock_tx_hash(db.pool(), "utxotx1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.hash_lock, "aa");
    assert_eq!(found.status, S2bStatus::UtxoLocked);

    assert!(S2bRepository::by_utxo_lock_tx_hash(db.pool(), "nope")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn empty_mirror_lock_hashes_do_not_collide() {
    let db = open_db().await;
    // two records both with empty utxo_lock_tx_hash must coexist
    assert!(S2bRepository::insert(db.pool(), &s2b_record("aa", "evmtx1"))
        .await
        .unwrap());
    assert!(S2bRepository::insert(db.pool(), &s2b_record("bb", "evmtx2"))
        .await
        .unwrap());
}
