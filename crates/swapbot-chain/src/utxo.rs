//! UTXO chain adapter: JSON-RPC node access plus coin selection.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use swapbot_core::error::{BotError, Result, SendOutcome};
use swapbot_core::types::{BlockView, TxInView, TxOutView, TxView, Utxo};
use swapbot_htlc::Transaction;

#[async_trait]
pub trait UtxoClient: Send + Sync {
    async fn tip_height(&self) -> Result<u64>;
    async fn get_block(&self, height: u64) -> Result<BlockView>;
    /// 0 while unconfirmed, -1 when the node does not know the transaction.
    async fn tx_confirmations(&self, txid: &str) -> Result<i64>;
    async fn list_unspent(&self) -> Result<Vec<Utxo>>;
    /// Submit a raw transaction. Mempool rejections that mean "this output
    /// is already spent / this tx already exists" come back as
    /// `SendOutcome::AlreadyDone` rather than an error.
    async fn send_tx(&self, tx: &Transaction) -> Result<SendOutcome>;
}

/// First tries a single UTXO covering `min_total` alone; otherwise
/// accumulates the largest UTXOs until the target is met or `max_count` is
/// exceeded.
pub fn select_utxos(mut all: Vec<Utxo>, min_total: u64, max_count: usize) -> Result<Vec<Utxo>> {
    if let Some(single) = all.iter().find(|u| u.value_sats >= min_total) {
        return Ok(vec![single.clone()]);
    }

    all.sort_by(|a, b| b.value_sats.cmp(&a.value_sats));
    let mut total = 0u64;
    let mut picked = Vec::new();
    for utxo in all {
        total += utxo.value_sats;
        picked.push(utxo);
        if total >= min_total {
            break;
        }
    }

    if total >= min_total && picked.len() <= max_count {
        Ok(picked)
    } else {
        Err(BotError::NoSpendableUtxos {
            needed: min_total,
            max_count,
        })
    }
}

const SPENT_ERR_PHRASES: [&str; 3] = [
    "txn-mempool-conflict",
    "Missing inputs",
    "transaction already in block chain",
];

fn is_utxo_spent_err(msg: &str) -> bool {
    SPENT_ERR_PHRASES.iter().any(|p| msg.contains(p))
}

/// Bitcoin-family JSON-RPC client for the node holding the bot's wallet.
pub struct RpcUtxoClient {
    http: reqwest::Client,
    url: reqwest::Url,
    user: String,
    pass: Option<String>,
    /// The bot's cashaddr, scoping `listunspent`.
    address: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    tx: Vec<RawTx>,
}

#[derive(Debug, Deserialize)]
struct RawTx {
    txid: String,
    #[serde(default)]
    vin: Vec<RawVin>,
    #[serde(default)]
    vout: Vec<RawVout>,
}

#[derive(Debug, Deserialize)]
struct RawVin {
    txid: Option<String>,
    vout: Option<u32>,
    #[serde(rename = "scriptSig")]
    script_sig: Option<RawHexScript>,
}

#[derive(Debug, Deserialize)]
struct RawVout {
    value: f64,
    #[serde(rename = "scriptPubKey")]
    script_pub_key: RawHexScript,
}

#[derive(Debug, Deserialize)]
struct RawHexScript {
    hex: String,
}

#[derive(Debug, Deserialize)]
struct RawUnspent {
    txid: String,
    vout: u32,
    amount: f64,
}

#[derive(Debug, Deserialize)]
struct RawTxVerbose {
    #[serde(default)]
    confirmations: Option<i64>,
}

impl RpcUtxoClient {
    pub fn new(url: &str, address: String, timeout: std::time::Duration) -> Result<Self> {
        let url: reqwest::Url = url
            .parse()
            .map_err(|e| BotError::Config(format!("bad UTXO RPC URL: {e}")))?;
        let user = url.username().to_string();
        let pass = url.password().map(str::to_string);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Config(format!("http client: {e}")))?;

        Ok(Self {
            http,
            url,
            user,
            pass,
            address,
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": "swapbot",
            "method": method,
            "params": params,
        });

        let mut req = self.http.post(self.url.clone()).json(&body);
        if !self.user.is_empty() {
            req = req.basic_auth(&self.user, self.pass.as_deref());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| BotError::Rpc(format!("{method}: {e}")))?;
        let rpc: RpcResponse<T> = resp
            .json()
            .await
            .map_err(|e| BotError::Rpc(format!("{method}: bad response: {e}")))?;

        if let Some(err) = rpc.error {
            return Err(BotError::Rpc(format!("{method}: {}: {}", err.code, err.message)));
        }
        rpc.result
            .ok_or_else(|| BotError::Rpc(format!("{method}: missing result")))
    }
}

fn coin_to_sats(amount: f64) -> u64 {
    (amount * 1e8).round() as u64
}

#[async_trait]
impl UtxoClient for RpcUtxoClient {
    async fn tip_height(&self) -> Result<u64> {
        self.call("getblockcount", json!([])).await
    }

    async fn get_block(&self, height: u64) -> Result<BlockView> {
        let hash: String = self.call("getblockhash", json!([height])).await?;
        let raw: RawBlock = self.call("getblock", json!([hash, 2])).await?;

        let txs = raw
            .tx
            .into_iter()
            .map(|tx| {
                let inputs = tx
                    .vin
                    .into_iter()
                    .filter_map(|vin| {
                        Some(TxInView {
                            prev_txid: vin.txid?,
                            prev_vout: vin.vout?,
                            script_sig: hex::decode(vin.script_sig?.hex).ok()?,
                        })
                    })
                    .collect();
                let outputs = tx
                    .vout
                    .into_iter()
                    .filter_map(|vout| {
                        Some(TxOutView {
                            value_sats: coin_to_sats(vout.value),
                            script_pubkey: hex::decode(vout.script_pub_key.hex).ok()?,
                        })
                    })
                    .collect();
                TxView {
                    txid: tx.txid,
                    inputs,
                    outputs,
                }
            })
            .collect();

        Ok(BlockView { height, txs })
    }

    async fn tx_confirmations(&self, txid: &str) -> Result<i64> {
        match self
            .call::<RawTxVerbose>("getrawtransaction", json!([txid, true]))
            .await
        {
            Ok(tx) => Ok(tx.confirmations.unwrap_or(0)),
            Err(BotError::Rpc(msg)) if msg.contains("No such") => Ok(-1),
            Err(e) => Err(e),
        }
    }

    async fn list_unspent(&self) -> Result<Vec<Utxo>> {
        let unspent: Vec<RawUnspent> = self
            .call("listunspent", json!([0, 9_999_999, [self.address]]))
            .await?;
        Ok(unspent
            .into_iter()
            .map(|u| Utxo {
                txid: u.txid,
                vout: u.vout,
                value_sats: coin_to_sats(u.amount),
            })
            .collect())
    }

    async fn send_tx(&self, tx: &Transaction) -> Result<SendOutcome> {
        let raw = hex::encode(tx.serialize());
        debug!(txid = %tx.txid(), "submitting raw transaction");
        match self
            .call::<String>("sendrawtransaction", json!([raw]))
            .await
        {
            Ok(txid) => Ok(SendOutcome::Sent(txid)),
            Err(BotError::Rpc(msg)) if is_utxo_spent_err(&msg) => Ok(SendOutcome::AlreadyDone),
            Err(e) => Err(e),
        }
    }
}
