use std::sync::Arc;
use std::time::Duration;

use alloy::signers::local::PrivateKeySigner;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use swapbot_chain::{EvmClient, RpcEvmClient, RpcUtxoClient, UtxoClient};
use swapbot_core::types::{hex_to_array, utxo_blocks_to_evm_seconds, BotIdentity, RunMode};
use swapbot_core::{BotConfig, ErrorRing};
use swapbot_db::repositories::CursorRepository;
use swapbot_db::Db;
use swapbot_engine::{serve_status, EngineConfig, StatusState, SwapBot};
use swapbot_htlc::address::{self, AddressKind};
use swapbot_htlc::script::hash160;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = BotConfig::from_env()?;

    // UTXO identity: the master signs with its own key, the slave only
    // tracks the master's address
    let (utxo_key, utxo_pkh) = match cfg.mode {
        RunMode::Slave => {
            let pkh_hex = cfg
                .master_utxo_pkh_hex
                .as_deref()
                .expect("checked by config");
            (None, hex_to_array::<20>(pkh_hex)?)
        }
        _ => {
            let key_hex = cfg.utxo_key_hex.as_deref().expect("checked by config");
            let key = SecretKey::from_slice(&hex::decode(key_hex)?)?;
            let secp = Secp256k1::signing_only();
            let pkh = hash160(&PublicKey::from_secret_key(&secp, &key).serialize());
            (Some(key), pkh)
        }
    };
    let signer: PrivateKeySigner = cfg.evm_key_hex.parse()?;
    let evm_addr = signer.address();
    let utxo_addr = address::encode(&cfg.cashaddr_prefix, AddressKind::PubKeyHash, &utxo_pkh);

    info!(mode = ?cfg.mode, "starting swap daemon");
    info!(pkh = %hex::encode(utxo_pkh), address = %utxo_addr, "UTXO identity");
    info!(address = %evm_addr, "EVM identity");

    let db = Db::connect(&cfg.db_path).await?;
    db.migrate().await?;
    CursorRepository::init(db.pool()).await?;

    let timeout = Duration::from_secs(cfg.rpc_timeout_secs);
    let utxo: Arc<dyn UtxoClient> =
        Arc::new(RpcUtxoClient::new(&cfg.utxo_rpc_url, utxo_addr, timeout)?);
    let evm: Arc<dyn EvmClient> = Arc::new(RpcEvmClient::new(
        &cfg.evm_rpc_url,
        signer,
        cfg.htlc_contract,
        cfg.evm_gas_price_wei,
        timeout,
    )?);

    // the on-chain registration is the authoritative parameter source
    let params = evm.market_maker(evm_addr).await?.params();
    anyhow::ensure!(
        params.evm_time_lock == utxo_blocks_to_evm_seconds(params.utxo_time_lock as u32),
        "registered time locks disagree: {} blocks vs {} seconds",
        params.utxo_time_lock,
        params.evm_time_lock,
    );
    info!(
        utxo_time_lock = params.utxo_time_lock,
        evm_time_lock = params.evm_time_lock,
        penalty_bps = params.penalty_bps,
        min_swap_amt = params.min_swap_amt,
        max_swap_amt = params.max_swap_amt,
        "market-maker parameters loaded"
    );

    let ring = Arc::new(ErrorRing::default());
    let status_state = StatusState {
        db: db.clone(),
        utxo: utxo.clone(),
        evm: evm.clone(),
        ring: ring.clone(),
    };
    let listen = cfg.status_listen.clone();
    tokio::spawn(async move {
        if let Err(e) = serve_status(&listen, status_state).await {
            error!(error = %e, "status server failed");
        }
    });

    let mut bot = SwapBot::new(
        db,
        utxo,
        evm,
        BotIdentity { utxo_pkh, evm_addr },
        utxo_key,
        params,
        EngineConfig {
            mode: cfg.mode,
            utxo_lock_fee_rate: cfg.utxo_lock_fee_rate,
            utxo_unlock_fee_rate: cfg.utxo_unlock_fee_rate,
            utxo_refund_fee_rate: cfg.utxo_refund_fee_rate,
            utxo_confirmations: cfg.utxo_confirmations,
        },
        ring,
    );

    tokio::select! {
        result = bot.run() => {
            if let Err(e) = result {
                error!(error = %e, "engine stopped on fatal error");
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }
    Ok(())
}
