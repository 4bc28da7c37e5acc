//! The swap state engine and its scheduler loop.
//!
//! One iteration walks both chains and every live record exactly once:
//! refresh prices, settle EVM refunds, ingest new UTXO blocks, settle UTXO
//! refunds, mirror fresh UTXO deposits, finalize revealed UTXO-side swaps,
//! ingest new EVM logs, mirror fresh EVM deposits, finalize revealed
//! EVM-side swaps. Every handler is idempotent; replaying a block or a log
//! window changes nothing.

use std::sync::Arc;
use std::time::Duration;

use alloy::rpc::types::Log;
use alloy_primitives::{Address, B256};
use alloy_sol_types::SolEvent;
use secp256k1::SecretKey;
use tracing::{debug, error, info, warn};

use swapbot_chain::{select_utxos, EvmClient, UtxoClient};
use swapbot_core::error::{BotError, Result, SendOutcome};
use swapbot_core::events::{
    EvmLockEvent, EvmRefundEvent, EvmUnlockEvent, Lock, Refund, Unlock, UtxoLockEvent,
    UtxoUnlockEvent,
};
use swapbot_core::types::{
    evm_seconds_to_utxo_blocks, hex_to_array, sats_to_wei, secret_to_hash_lock, unix_now,
    utxo_blocks_to_evm_seconds, wei_to_sats, B2sRecord, B2sStatus, BlockView, BotIdentity, Chain,
    MarketMakerParams, RunMode, S2bRecord, S2bStatus,
};
use swapbot_core::ErrorRing;
use swapbot_db::repositories::{B2sRepository, CursorRepository, S2bRepository};
use swapbot_db::Db;
use swapbot_htlc::covenant::MAX_LOCK_INPUTS;
use swapbot_htlc::{HtlcCovenant, InputInfo};

const LOOP_SLEEP: Duration = Duration::from_secs(2);
const PARAMS_REFRESH_SECS: u64 = 120;
const EVM_SCAN_WINDOW: u64 = 200;
const RECORD_BATCH: u32 = 100;

/// Extra sats selected on top of the lock value to cover the miner fee.
const LOCK_FUND_MARGIN_SATS: u64 = 5000;

/// How long a standby instance leaves a revealed swap to the active one.
const STANDBY_GRACE_SECS: u64 = 600;
/// How long a lazy master leaves it to the standby.
const LAZY_MASTER_GRACE_SECS: u64 = 1200;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub mode: RunMode,
    pub utxo_lock_fee_rate: u64,
    pub utxo_unlock_fee_rate: u64,
    pub utxo_refund_fee_rate: u64,
    /// Blocks behind the tip the UTXO scan stops at.
    pub utxo_confirmations: u64,
}

pub struct SwapBot {
    db: Db,
    utxo: Arc<dyn UtxoClient>,
    evm: Arc<dyn EvmClient>,
    identity: BotIdentity,
    /// Only the master holds the UTXO signing key.
    utxo_key: Option<SecretKey>,
    params: MarketMakerParams,
    params_refreshed_at: u64,
    cfg: EngineConfig,
    ring: Arc<ErrorRing>,
}

impl SwapBot {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Db,
        utxo: Arc<dyn UtxoClient>,
        evm: Arc<dyn EvmClient>,
        identity: BotIdentity,
        utxo_key: Option<SecretKey>,
        params: MarketMakerParams,
        cfg: EngineConfig,
        ring: Arc<ErrorRing>,
    ) -> Self {
        Self {
            db,
            utxo,
            evm,
            identity,
            utxo_key,
            params,
            params_refreshed_at: unix_now(),
            cfg,
            ring,
        }
    }

    pub fn params(&self) -> &MarketMakerParams {
        &self.params
    }

    /// Run until a fatal error. Transient failures are logged and retried on
    /// the next iteration.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.run_once().await?;
            tokio::time::sleep(LOOP_SLEEP).await;
        }
    }

    /// One full scheduler iteration. Errors returned here are fatal.
    pub async fn run_once(&mut self) -> Result<()> {
        self.refresh_params().await;
        self.refund_locked_evm().await?;
        self.scan_utxo_blocks().await?;
        self.refund_locked_utxo().await?;
        self.handle_new_utxo_deposits().await?;
        self.unlock_utxo_deposits().await?;
        self.scan_evm_logs().await?;
        self.handle_new_evm_deposits().await?;
        self.unlock_evm_deposits().await?;
        Ok(())
    }

    fn report(&self, context: &str, err: &BotError) {
        error!(error = %err, context, "handler error");
        self.ring.push("error", format!("{context}: {err}"));
    }

    fn report_warn(&self, msg: String) {
        warn!("{msg}");
        self.ring.push("warn", msg);
    }

    fn unlock_grace_secs(&self) -> u64 {
        match self.cfg.mode {
            RunMode::Master => 0,
            RunMode::Slave => STANDBY_GRACE_SECS,
            RunMode::LazyMaster => LAZY_MASTER_GRACE_SECS,
        }
    }

    fn evm_refund_extra_secs(&self) -> u64 {
        match self.cfg.mode {
            RunMode::Master => 0,
            RunMode::Slave => STANDBY_GRACE_SECS,
            RunMode::LazyMaster => LAZY_MASTER_GRACE_SECS,
        }
    }

    fn utxo_refund_extra_blocks(&self) -> i64 {
        match self.cfg.mode {
            RunMode::Master => 0,
            RunMode::Slave => 1,
            RunMode::LazyMaster => 2,
        }
    }

    // ---- market-maker parameters -------------------------------------------

    async fn refresh_params(&mut self) {
        let now = unix_now();
        if now.saturating_sub(self.params_refreshed_at) < PARAMS_REFRESH_SECS {
            return;
        }
        let info = match self.evm.market_maker(self.identity.evm_addr).await {
            Ok(info) => info,
            Err(e) => {
                self.report("refresh market-maker parameters", &e);
                return;
            }
        };
        let params = info.params();
        if params.evm_time_lock != utxo_blocks_to_evm_seconds(params.utxo_time_lock as u32) {
            self.report_warn(format!(
                "published time locks disagree: {} blocks vs {} seconds; keeping previous parameters",
                params.utxo_time_lock, params.evm_time_lock
            ));
            return;
        }
        if params != self.params {
            info!(
                utxo_time_lock = params.utxo_time_lock,
                evm_time_lock = params.evm_time_lock,
                utxo_price = params.utxo_price,
                evm_price = params.evm_price,
                "market-maker parameters updated"
            );
            self.params = params;
        }
        self.params_refreshed_at = now;
    }

    // ---- UTXO-side scanning ------------------------------------------------

    async fn scan_utxo_blocks(&self) -> Result<()> {
        let mut last = CursorRepository::get(self.db.pool(), Chain::Utxo).await?;
        let tip = match self.utxo.tip_height().await {
            Ok(tip) => tip,
            Err(e) => {
                self.report("get UTXO tip height", &e);
                return Ok(());
            }
        };
        let safe = tip.saturating_sub(self.cfg.utxo_confirmations);
        if last == 0 {
            last = safe.saturating_sub(1);
            info!(height = last, "initialized UTXO scan cursor");
        }

        for height in last + 1..=safe {
            let block = match self.utxo.get_block(height).await {
                Ok(block) => block,
                Err(e) => {
                    self.report("get UTXO block", &e);
                    break;
                }
            };
            debug!(height, txs = block.txs.len(), "scanning UTXO block");
            self.handle_utxo_block(&block).await?;
            CursorRepository::set(self.db.pool(), Chain::Utxo, height).await?;
        }
        Ok(())
    }

    async fn handle_utxo_block(&self, block: &BlockView) -> Result<()> {
        for event in swapbot_htlc::find_lock_events(block) {
            self.ingest_b2s_deposit(block.height, &event).await?;
            self.mirror_s2b_lock(&event).await?;
        }
        for event in swapbot_htlc::find_unlock_events(block) {
            self.on_utxo_unlock(&event).await?;
        }
        Ok(())
    }

    /// A user locked value for us on the UTXO side: admit it as a new swap
    /// if it matches our published terms.
    async fn ingest_b2s_deposit(&self, height: u64, ev: &UtxoLockEvent) -> Result<()> {
        if ev.recipient_pkh != self.identity.utxo_pkh {
            return Ok(());
        }
        if ev.hash_lock == [0u8; 32] {
            self.report_warn(format!("deposit {} carries a zero hash-lock", ev.tx_hash));
            return Ok(());
        }
        if ev.expiration as u32 != self.params.utxo_time_lock as u32 {
            info!(
                expiration = ev.expiration,
                expected = self.params.utxo_time_lock,
                "deposit time-lock differs from published terms"
            );
            return Ok(());
        }
        if ev.penalty_bps != self.params.penalty_bps {
            info!(
                penalty_bps = ev.penalty_bps,
                expected = self.params.penalty_bps,
                "deposit penalty differs from published terms"
            );
            return Ok(());
        }
        if !self.params.value_in_range(ev.value) {
            info!(
                value = ev.value,
                min = self.params.min_swap_amt,
                max = self.params.max_swap_amt,
                "deposit value out of range"
            );
            return Ok(());
        }
        if ev.expected_price > self.params.utxo_price {
            info!(
                expected_price = ev.expected_price,
                current = self.params.utxo_price,
                "deposit demands a better price than published"
            );
            return Ok(());
        }

        let record = B2sRecord {
            id: 0,
            utxo_lock_height: height,
            utxo_lock_tx_hash: ev.tx_hash.clone(),
            value: ev.value,
            recipient_pkh: hex::encode(ev.recipient_pkh),
            sender_pkh: hex::encode(ev.sender_pkh),
            hash_lock: hex::encode(ev.hash_lock),
            time_lock: ev.expiration as u32,
            penalty_bps: ev.penalty_bps,
            sender_evm_addr: hex::encode(ev.sender_evm_addr),
            expected_price: ev.expected_price,
            script_hash: hex::encode(ev.script_hash),
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
        if B2sRepository::insert(self.db.pool(), &record).await? {
            info!(
                hash_lock = %record.hash_lock,
                value = record.value,
                height,
                "admitted inbound UTXO deposit"
            );
        } else {
            debug!(hash_lock = %record.hash_lock, "deposit already recorded");
        }
        Ok(())
    }

    /// A standby instance watching the active one's mirror lock appear
    /// on-chain.
    async fn mirror_s2b_lock(&self, ev: &UtxoLockEvent) -> Result<()> {
        if self.cfg.mode != RunMode::Slave || ev.sender_pkh != self.identity.utxo_pkh {
            return Ok(());
        }

        let hash_lock = hex::encode(ev.hash_lock);
        let Some(mut record) = S2bRepository::by_hash_lock(self.db.pool(), &hash_lock).await?
        else {
            info!(hash_lock = %hash_lock, "our own lock matches no swap record");
            return Ok(());
        };
        if record.status != S2bStatus::New {
            return Ok(());
        }

        let mirror_blocks = evm_seconds_to_utxo_blocks(record.time_lock) / 2;
        if ev.value != record.value
            || ev.expiration != mirror_blocks
            || hex::encode(ev.script_hash) != record.script_hash
        {
            self.report_warn(format!(
                "observed mirror lock {} disagrees with record {}",
                ev.tx_hash, record.hash_lock
            ));
            return Ok(());
        }

        record.utxo_locked(ev.tx_hash.clone());
        S2bRepository::update(self.db.pool(), &record).await?;
        info!(hash_lock = %hash_lock, tx_hash = %ev.tx_hash, "mirror UTXO lock observed");
        Ok(())
    }

    /// A covenant spend revealed a secret on the UTXO side.
    async fn on_utxo_unlock(&self, ev: &UtxoUnlockEvent) -> Result<()> {
        let Some(mut record) =
            S2bRepository::by_utxo_lock_tx_hash(self.db.pool(), &ev.prev_tx_hash).await?
        else {
            return Ok(());
        };

        let revealed = secret_to_hash_lock(&ev.secret);
        if revealed != record.hash_lock {
            self.report_warn(format!(
                "secret in {} hashes to {revealed}, expected {}",
                ev.tx_hash, record.hash_lock
            ));
            return Ok(());
        }
        if record.status != S2bStatus::UtxoLocked {
            return Ok(());
        }

        record.secret_revealed(hex::encode(ev.secret), ev.tx_hash.clone());
        S2bRepository::update(self.db.pool(), &record).await?;
        info!(hash_lock = %record.hash_lock, "secret revealed on the UTXO side");
        Ok(())
    }

    // ---- B2S: mirror, finalize, refund -------------------------------------

    /// New → EvmLocked | TooLateToLockEvm | PriceChanged.
    async fn handle_new_utxo_deposits(&self) -> Result<()> {
        if !self.cfg.mode.is_master() {
            return Ok(());
        }
        let records =
            B2sRepository::by_status(self.db.pool(), B2sStatus::New, RECORD_BATCH).await?;
        for mut record in records {
            let confirmations = match self.utxo.tx_confirmations(&record.utxo_lock_tx_hash).await
            {
                Ok(confirmations) => confirmations,
                Err(e) => {
                    self.report("get deposit confirmations", &e);
                    continue;
                }
            };

            // Taking longer than a third of the user's window would leave the
            // mirrored lock without enough margin to refund safely.
            if confirmations > record.time_lock as i64 / 3 {
                info!(
                    hash_lock = %record.hash_lock,
                    confirmations,
                    time_lock = record.time_lock,
                    "too late to mirror on the EVM side"
                );
                record.status = B2sStatus::TooLateToLockEvm;
                B2sRepository::update(self.db.pool(), &record).await?;
                continue;
            }

            if record.expected_price > self.params.utxo_price {
                info!(
                    hash_lock = %record.hash_lock,
                    expected_price = record.expected_price,
                    current = self.params.utxo_price,
                    "price moved past the user's bound"
                );
                record.status = B2sStatus::PriceChanged;
                B2sRepository::update(self.db.pool(), &record).await?;
                continue;
            }

            let receiver = match hex_to_array::<20>(&record.sender_evm_addr) {
                Ok(bytes) => Address::from(bytes),
                Err(e) => {
                    self.report("decode record evm address", &e);
                    continue;
                }
            };
            let hash_lock = match hex_to_array::<32>(&record.hash_lock) {
                Ok(bytes) => B256::from(bytes),
                Err(e) => {
                    self.report("decode record hash lock", &e);
                    continue;
                }
            };

            let mirror_secs = utxo_blocks_to_evm_seconds(record.time_lock) / 2;
            let tx_hash = match self
                .evm
                .lock(receiver, hash_lock, mirror_secs, sats_to_wei(record.value))
                .await
            {
                Ok(tx_hash) => tx_hash,
                Err(e) => {
                    self.report("submit EVM mirror lock", &e);
                    continue;
                }
            };
            let lock_time = match self.evm.tx_block_time(&tx_hash).await {
                Ok(time) => time,
                Err(_) => match self.evm.tip_time().await {
                    Ok(time) => time,
                    Err(_) => unix_now(),
                },
            };

            info!(hash_lock = %record.hash_lock, tx_hash = %tx_hash, "EVM mirror lock submitted");
            record.evm_locked(tx_hash, lock_time);
            B2sRepository::update(self.db.pool(), &record).await?;
        }
        Ok(())
    }

    /// SecretRevealed → UtxoUnlocked. Runs in every mode; standby instances
    /// first give the active one its grace window.
    async fn unlock_utxo_deposits(&self) -> Result<()> {
        let records =
            B2sRepository::by_status(self.db.pool(), B2sStatus::SecretRevealed, RECORD_BATCH)
                .await?;
        if records.is_empty() {
            return Ok(());
        }
        let now = unix_now();
        let grace = self.unlock_grace_secs();
        for mut record in records {
            if grace > 0 && now.saturating_sub(record.updated_at) < grace {
                debug!(hash_lock = %record.hash_lock, "leaving the unlock to the active instance");
                continue;
            }

            let (sender_pkh, recipient_pkh, hash_lock, prev_txid, secret) = match (
                hex_to_array::<20>(&record.sender_pkh),
                hex_to_array::<20>(&record.recipient_pkh),
                hex_to_array::<32>(&record.hash_lock),
                hex_to_array::<32>(&record.utxo_lock_tx_hash),
                hex_to_array::<32>(&record.secret),
            ) {
                (Ok(a), Ok(b), Ok(c), Ok(d), Ok(e)) => (a, b, c, d, e),
                _ => {
                    self.report(
                        "decode b2s record",
                        &BotError::EventDecode(record.hash_lock.clone()),
                    );
                    continue;
                }
            };

            let covenant = HtlcCovenant::new(
                sender_pkh,
                recipient_pkh,
                hash_lock,
                record.time_lock as u16,
                record.penalty_bps,
            );
            let tx = match covenant.build_unlock_tx(
                prev_txid,
                0,
                record.value,
                self.cfg.utxo_unlock_fee_rate,
                secret,
            ) {
                Ok(tx) => tx,
                Err(e) => {
                    self.report("build UTXO unlock tx", &e);
                    continue;
                }
            };

            let outcome = match self.utxo.send_tx(&tx).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.report("send UTXO unlock tx", &e);
                    continue;
                }
            };
            if outcome == SendOutcome::AlreadyDone {
                info!(hash_lock = %record.hash_lock, "deposit already claimed elsewhere");
            }
            record.utxo_unlocked(outcome.tx_hash());
            B2sRepository::update(self.db.pool(), &record).await?;
            info!(hash_lock = %record.hash_lock, "UTXO deposit unlocked");
        }
        Ok(())
    }

    /// EvmLocked → EvmRefunded once the mirrored lock has expired.
    async fn refund_locked_evm(&self) -> Result<()> {
        let records =
            B2sRepository::by_status(self.db.pool(), B2sStatus::EvmLocked, RECORD_BATCH).await?;
        if records.is_empty() {
            return Ok(());
        }
        let evm_now = match self.evm.tip_time().await {
            Ok(time) => time,
            Err(e) => {
                self.report("get EVM tip time", &e);
                return Ok(());
            }
        };

        for mut record in records {
            let mirror_secs = utxo_blocks_to_evm_seconds(record.time_lock) / 2;
            let deadline =
                record.evm_lock_time + mirror_secs as u64 + self.evm_refund_extra_secs();
            if evm_now <= deadline {
                continue;
            }

            let hash_lock = match hex_to_array::<32>(&record.hash_lock) {
                Ok(bytes) => B256::from(bytes),
                Err(e) => {
                    self.report("decode record hash lock", &e);
                    continue;
                }
            };

            let tx_hash = match self.evm.refund(self.identity.evm_addr, hash_lock).await {
                Ok(tx_hash) => tx_hash,
                Err(e) => {
                    match self
                        .evm
                        .swap_state(self.identity.evm_addr, hash_lock)
                        .await
                    {
                        Ok(swapbot_core::types::SwapState::Refunded) => {
                            info!(hash_lock = %record.hash_lock, "swap already refunded elsewhere");
                            "?".to_string()
                        }
                        _ => {
                            self.report("submit EVM refund", &e);
                            continue;
                        }
                    }
                }
            };

            record.evm_refunded(tx_hash);
            B2sRepository::update(self.db.pool(), &record).await?;
            info!(hash_lock = %record.hash_lock, "EVM mirror lock refunded");
        }
        Ok(())
    }

    // ---- EVM-side scanning -------------------------------------------------

    async fn scan_evm_logs(&self) -> Result<()> {
        let mut last = CursorRepository::get(self.db.pool(), Chain::Evm).await?;
        let tip = match self.evm.tip_height().await {
            Ok(tip) => tip,
            Err(e) => {
                self.report("get EVM tip height", &e);
                return Ok(());
            }
        };
        if last == 0 && tip > 0 {
            last = tip - 1;
            info!(height = last, "initialized EVM scan cursor");
        }

        let mut from = last + 1;
        while from <= tip {
            let to = (from + EVM_SCAN_WINDOW - 1).min(tip);
            let logs = match self.evm.get_logs(from, to).await {
                Ok(logs) => logs,
                Err(e) => {
                    self.report("get EVM logs", &e);
                    break;
                }
            };
            debug!(from, to, count = logs.len(), "scanning EVM log window");
            for log in &logs {
                self.on_evm_log(log).await?;
            }
            CursorRepository::set(self.db.pool(), Chain::Evm, to).await?;
            from = to + 1;
        }
        Ok(())
    }

    async fn on_evm_log(&self, log: &Log) -> Result<()> {
        let Some(topic0) = log.topics().first().copied() else {
            return Ok(());
        };
        let tx_hash = log.transaction_hash.unwrap_or_default();

        match topic0 {
            t if t == Lock::SIGNATURE_HASH => {
                if let Some(ev) = EvmLockEvent::decode(&log.inner, tx_hash) {
                    self.ingest_s2b_deposit(&ev).await?;
                    self.mirror_b2s_lock(&ev).await?;
                }
            }
            t if t == Unlock::SIGNATURE_HASH => {
                if let Some(ev) = EvmUnlockEvent::decode(&log.inner, tx_hash) {
                    self.on_evm_unlock(&ev).await?;
                }
            }
            t if t == Refund::SIGNATURE_HASH => {
                if let Some(ev) = EvmRefundEvent::decode(&log.inner, tx_hash) {
                    self.on_evm_refund(&ev).await?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// A user locked value for us on the EVM side: admit it as a new swap if
    /// it matches our published terms.
    async fn ingest_s2b_deposit(&self, ev: &EvmLockEvent) -> Result<()> {
        if ev.unlocker != self.identity.evm_addr {
            return Ok(());
        }
        if ev.utxo_recipient_pkh == [0u8; 20] {
            info!(tx_hash = %ev.tx_hash, "lock names no UTXO payout address");
            return Ok(());
        }
        if ev.hash_lock == B256::ZERO {
            self.report_warn(format!("lock {} carries a zero hash-lock", ev.tx_hash));
            return Ok(());
        }
        if ev.penalty_bps != self.params.penalty_bps {
            info!(
                penalty_bps = ev.penalty_bps,
                expected = self.params.penalty_bps,
                "lock penalty differs from published terms"
            );
            return Ok(());
        }
        let time_lock = ev.time_lock_secs();
        if time_lock != self.params.evm_time_lock {
            info!(
                time_lock,
                expected = self.params.evm_time_lock,
                "lock time-lock differs from published terms"
            );
            return Ok(());
        }
        let value_sats = wei_to_sats(ev.value);
        if !self.params.value_in_range(value_sats) {
            info!(
                value = value_sats,
                min = self.params.min_swap_amt,
                max = self.params.max_swap_amt,
                "lock value out of range"
            );
            return Ok(());
        }
        let expected_price = ev.expected_price.saturating_to::<u64>();
        if expected_price > self.params.evm_price {
            info!(
                expected_price,
                current = self.params.evm_price,
                "lock demands a better price than published"
            );
            return Ok(());
        }

        let mirror_blocks = evm_seconds_to_utxo_blocks(time_lock) / 2;
        let covenant = HtlcCovenant::new(
            self.identity.utxo_pkh,
            ev.utxo_recipient_pkh,
            ev.hash_lock.0,
            mirror_blocks,
            0,
        );

        let record = S2bRecord {
            id: 0,
            evm_lock_time: ev.created_time,
            evm_lock_tx_hash: hex::encode(ev.tx_hash),
            value: value_sats,
            evm_sender_addr: hex::encode(ev.locker),
            utxo_recipient_pkh: hex::encode(ev.utxo_recipient_pkh),
            hash_lock: hex::encode(ev.hash_lock),
            time_lock,
            penalty_bps: ev.penalty_bps,
            expected_price,
            script_hash: hex::encode(covenant.redeem_script_hash()),
            utxo_lock_tx_hash: String::new(),
            utxo_unlock_tx_hash: String::new(),
            secret: String::new(),
            evm_unlock_tx_hash: String::new(),
            utxo_refund_tx_hash: String::new(),
            status: S2bStatus::New,
            created_at: 0,
            updated_at: 0,
        };
        if S2bRepository::insert(self.db.pool(), &record).await? {
            info!(
                hash_lock = %record.hash_lock,
                value = record.value,
                "admitted inbound EVM deposit"
            );
        } else {
            debug!(hash_lock = %record.hash_lock, "deposit already recorded");
        }
        Ok(())
    }

    /// A standby instance watching the active one's EVM mirror lock.
    async fn mirror_b2s_lock(&self, ev: &EvmLockEvent) -> Result<()> {
        if self.cfg.mode != RunMode::Slave || ev.locker != self.identity.evm_addr {
            return Ok(());
        }

        let hash_lock = hex::encode(ev.hash_lock);
        let Some(mut record) = B2sRepository::by_hash_lock(self.db.pool(), &hash_lock).await?
        else {
            info!(hash_lock = %hash_lock, "our own lock matches no swap record");
            return Ok(());
        };
        if record.status != B2sStatus::New {
            return Ok(());
        }

        record.evm_locked(hex::encode(ev.tx_hash), ev.created_time);
        B2sRepository::update(self.db.pool(), &record).await?;
        info!(hash_lock = %hash_lock, "mirror EVM lock observed");
        Ok(())
    }

    /// An EVM unlock revealed a secret.
    async fn on_evm_unlock(&self, ev: &EvmUnlockEvent) -> Result<()> {
        let hash_lock = hex::encode(ev.hash_lock);
        let Some(mut record) = B2sRepository::by_hash_lock(self.db.pool(), &hash_lock).await?
        else {
            debug!(hash_lock = %hash_lock, "unlock matches no swap record");
            return Ok(());
        };

        let revealed = secret_to_hash_lock(ev.secret.as_slice());
        if revealed != record.hash_lock {
            self.report_warn(format!(
                "secret in {} hashes to {revealed}, expected {}",
                hex::encode(ev.tx_hash),
                record.hash_lock
            ));
            return Ok(());
        }
        if record.status != B2sStatus::EvmLocked {
            return Ok(());
        }

        record.secret_revealed(hex::encode(ev.secret), hex::encode(ev.tx_hash));
        B2sRepository::update(self.db.pool(), &record).await?;
        info!(hash_lock = %hash_lock, "secret revealed on the EVM side");
        Ok(())
    }

    /// The counter-instance refunded the mirrored EVM lock.
    async fn on_evm_refund(&self, ev: &EvmRefundEvent) -> Result<()> {
        let hash_lock = hex::encode(ev.hash_lock);
        let Some(mut record) = B2sRepository::by_hash_lock(self.db.pool(), &hash_lock).await?
        else {
            return Ok(());
        };
        if record.status != B2sStatus::EvmLocked {
            return Ok(());
        }

        record.evm_refunded(hex::encode(ev.tx_hash));
        B2sRepository::update(self.db.pool(), &record).await?;
        info!(hash_lock = %hash_lock, "mirror EVM lock refund observed");
        Ok(())
    }

    // ---- S2B: mirror, finalize, refund -------------------------------------

    /// New → UtxoLocked | TooLateToLockUtxo | PriceChanged.
    async fn handle_new_evm_deposits(&self) -> Result<()> {
        if !self.cfg.mode.is_master() {
            return Ok(());
        }
        let Some(utxo_key) = self.utxo_key else {
            return Ok(());
        };
        let records =
            S2bRepository::by_status(self.db.pool(), S2bStatus::New, RECORD_BATCH).await?;
        if records.is_empty() {
            return Ok(());
        }
        let evm_now = match self.evm.tip_time().await {
            Ok(time) => time,
            Err(e) => {
                self.report("get EVM tip time", &e);
                return Ok(());
            }
        };

        for mut record in records {
            let elapsed = evm_now.saturating_sub(record.evm_lock_time);
            if elapsed > record.time_lock as u64 / 3 {
                info!(
                    hash_lock = %record.hash_lock,
                    elapsed,
                    time_lock = record.time_lock,
                    "too late to mirror on the UTXO side"
                );
                record.status = S2bStatus::TooLateToLockUtxo;
                S2bRepository::update(self.db.pool(), &record).await?;
                continue;
            }

            if record.expected_price > self.params.evm_price {
                info!(
                    hash_lock = %record.hash_lock,
                    expected_price = record.expected_price,
                    current = self.params.evm_price,
                    "price moved past the user's bound"
                );
                record.status = S2bStatus::PriceChanged;
                S2bRepository::update(self.db.pool(), &record).await?;
                continue;
            }

            let unspent = match self.utxo.list_unspent().await {
                Ok(unspent) => unspent,
                Err(e) => {
                    self.report("list unspent outputs", &e);
                    continue;
                }
            };
            let selected = match select_utxos(
                unspent,
                record.value + LOCK_FUND_MARGIN_SATS,
                MAX_LOCK_INPUTS,
            ) {
                Ok(selected) => selected,
                Err(e) => {
                    self.report("select inputs for mirror lock", &e);
                    continue;
                }
            };
            let mut inputs = Vec::with_capacity(selected.len());
            for utxo in &selected {
                match hex_to_array::<32>(&utxo.txid) {
                    Ok(txid) => inputs.push(InputInfo {
                        txid,
                        vout: utxo.vout,
                        value: utxo.value_sats,
                    }),
                    Err(e) => {
                        self.report("decode unspent txid", &e);
                        inputs.clear();
                        break;
                    }
                }
            }
            if inputs.is_empty() {
                continue;
            }

            let (recipient_pkh, hash_lock) = match (
                hex_to_array::<20>(&record.utxo_recipient_pkh),
                hex_to_array::<32>(&record.hash_lock),
            ) {
                (Ok(pkh), Ok(hash)) => (pkh, hash),
                _ => {
                    self.report(
                        "decode s2b record",
                        &BotError::EventDecode(record.hash_lock.clone()),
                    );
                    continue;
                }
            };

            let mirror_blocks = evm_seconds_to_utxo_blocks(record.time_lock) / 2;
            let covenant = HtlcCovenant::new(
                self.identity.utxo_pkh,
                recipient_pkh,
                hash_lock,
                mirror_blocks,
                0,
            );
            let tx = match covenant.build_lock_tx(
                &utxo_key,
                &inputs,
                record.value,
                self.cfg.utxo_lock_fee_rate,
                self.identity.evm_addr.0 .0,
                record.expected_price,
            ) {
                Ok(tx) => tx,
                Err(e) => {
                    self.report("build UTXO mirror lock tx", &e);
                    continue;
                }
            };

            let tx_hash = match self.utxo.send_tx(&tx).await {
                Ok(SendOutcome::Sent(tx_hash)) => tx_hash,
                // the node already knows this tx, so its id is still ours
                Ok(SendOutcome::AlreadyDone) => tx.txid(),
                Err(e) => {
                    self.report("send UTXO mirror lock tx", &e);
                    continue;
                }
            };

            info!(hash_lock = %record.hash_lock, tx_hash = %tx_hash, "UTXO mirror lock submitted");
            record.utxo_locked(tx_hash);
            S2bRepository::update(self.db.pool(), &record).await?;
        }
        Ok(())
    }

    /// SecretRevealed → EvmUnlocked.
    async fn unlock_evm_deposits(&self) -> Result<()> {
        let records =
            S2bRepository::by_status(self.db.pool(), S2bStatus::SecretRevealed, RECORD_BATCH)
                .await?;
        if records.is_empty() {
            return Ok(());
        }
        let now = unix_now();
        let grace = self.unlock_grace_secs();
        for mut record in records {
            if grace > 0 && now.saturating_sub(record.updated_at) < grace {
                debug!(hash_lock = %record.hash_lock, "leaving the unlock to the active instance");
                continue;
            }

            let (sender, hash_lock, secret) = match (
                hex_to_array::<20>(&record.evm_sender_addr),
                hex_to_array::<32>(&record.hash_lock),
                hex_to_array::<32>(&record.secret),
            ) {
                (Ok(addr), Ok(hash), Ok(secret)) => {
                    (Address::from(addr), B256::from(hash), B256::from(secret))
                }
                _ => {
                    self.report(
                        "decode s2b record",
                        &BotError::EventDecode(record.hash_lock.clone()),
                    );
                    continue;
                }
            };

            let tx_hash = match self.evm.unlock(sender, hash_lock, secret).await {
                Ok(tx_hash) => tx_hash,
                Err(e) => match self.evm.swap_state(sender, hash_lock).await {
                    Ok(swapbot_core::types::SwapState::Unlocked) => {
                        info!(hash_lock = %record.hash_lock, "swap already unlocked elsewhere");
                        "?".to_string()
                    }
                    _ => {
                        self.report("submit EVM unlock", &e);
                        continue;
                    }
                },
            };

            record.evm_unlocked(tx_hash);
            S2bRepository::update(self.db.pool(), &record).await?;
            info!(hash_lock = %record.hash_lock, "EVM deposit unlocked");
        }
        Ok(())
    }

    /// UtxoLocked → UtxoRefunded once the mirrored lock has enough
    /// confirmations to spend its refund path.
    async fn refund_locked_utxo(&self) -> Result<()> {
        let records =
            S2bRepository::by_status(self.db.pool(), S2bStatus::UtxoLocked, RECORD_BATCH).await?;
        for mut record in records {
            let mirror_blocks = evm_seconds_to_utxo_blocks(record.time_lock) / 2;
            let required = mirror_blocks as i64 + self.utxo_refund_extra_blocks();

            let confirmations = match self.utxo.tx_confirmations(&record.utxo_lock_tx_hash).await
            {
                Ok(confirmations) => confirmations,
                Err(e) => {
                    self.report("get mirror lock confirmations", &e);
                    continue;
                }
            };
            if confirmations <= required {
                continue;
            }

            let (recipient_pkh, hash_lock, prev_txid) = match (
                hex_to_array::<20>(&record.utxo_recipient_pkh),
                hex_to_array::<32>(&record.hash_lock),
                hex_to_array::<32>(&record.utxo_lock_tx_hash),
            ) {
                (Ok(pkh), Ok(hash), Ok(txid)) => (pkh, hash, txid),
                _ => {
                    self.report(
                        "decode s2b record",
                        &BotError::EventDecode(record.hash_lock.clone()),
                    );
                    continue;
                }
            };

            let covenant = HtlcCovenant::new(
                self.identity.utxo_pkh,
                recipient_pkh,
                hash_lock,
                mirror_blocks,
                0,
            );
            let tx = match covenant.build_refund_tx(
                prev_txid,
                0,
                record.value,
                self.cfg.utxo_refund_fee_rate,
            ) {
                Ok(tx) => tx,
                Err(e) => {
                    self.report("build UTXO refund tx", &e);
                    continue;
                }
            };

            let outcome = match self.utxo.send_tx(&tx).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.report("send UTXO refund tx", &e);
                    continue;
                }
            };
            if outcome == SendOutcome::AlreadyDone {
                info!(hash_lock = %record.hash_lock, "mirror lock already spent elsewhere");
            }
            record.utxo_refunded(outcome.tx_hash());
            S2bRepository::update(self.db.pool(), &record).await?;
            info!(hash_lock = %record.hash_lock, "UTXO mirror lock refunded");
        }
        Ok(())
    }
}
