//! EVM chain adapter over an HTTP provider.

use std::future::IntoFuture;
use std::time::Duration;

use alloy::eips::BlockNumberOrTag;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::TransportResult;
use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use swapbot_core::error::{BotError, Result};
use swapbot_core::types::{hex_to_array, MarketMakerInfo, SwapState};

use crate::contract::{
    getSwapStateCall, lockCall, marketMakerByAddressCall, refundCall, unlockCall, zero_pkh,
    MarketMaker,
};

const RECEIPT_RETRY_COUNT: u32 = 30;
const RECEIPT_WAIT: Duration = Duration::from_secs(2);

/// The bot's own `lock` calls carry the open-ended default price; the real
/// bound was already enforced when the swap record was admitted.
const DEFAULT_EXPECTED_PRICE_WEI: u128 = 1_000_000_000_000_000_000;

#[async_trait]
pub trait EvmClient: Send + Sync {
    async fn tip_height(&self) -> Result<u64>;
    /// Timestamp of the latest block; the only clock used for EVM-side
    /// time-lock comparisons.
    async fn tip_time(&self) -> Result<u64>;
    async fn tx_block_time(&self, tx_hash: &str) -> Result<u64>;
    async fn get_logs(&self, from: u64, to: u64) -> Result<Vec<Log>>;
    async fn balance(&self) -> Result<U256>;

    async fn lock(
        &self,
        receiver: Address,
        hash_lock: B256,
        valid_period_secs: u32,
        value_wei: U256,
    ) -> Result<String>;
    async fn unlock(&self, sender: Address, hash_lock: B256, secret: B256) -> Result<String>;
    async fn refund(&self, sender: Address, hash_lock: B256) -> Result<String>;
    async fn swap_state(&self, sender: Address, hash_lock: B256) -> Result<SwapState>;
    async fn market_maker(&self, addr: Address) -> Result<MarketMakerInfo>;
}

pub struct RpcEvmClient {
    provider: DynProvider,
    htlc_addr: Address,
    bot_addr: Address,
    gas_price: u128,
    timeout: Duration,
    chain_id: Mutex<Option<u64>>,
}

impl RpcEvmClient {
    pub fn new(
        url: &str,
        signer: PrivateKeySigner,
        htlc_addr: Address,
        gas_price: u128,
        timeout: Duration,
    ) -> Result<Self> {
        let bot_addr = signer.address();
        let url: reqwest::Url = url
            .parse()
            .map_err(|e| BotError::Config(format!("bad EVM RPC URL: {e}")))?;
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        Ok(Self {
            provider,
            htlc_addr,
            bot_addr,
            gas_price,
            timeout,
            chain_id: Mutex::new(None),
        })
    }

    async fn rpc<T>(&self, fut: impl IntoFuture<Output = TransportResult<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut.into_future()).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(BotError::Rpc(e.to_string())),
            Err(_) => Err(BotError::Rpc("EVM request timed out".into())),
        }
    }

    async fn chain_id(&self) -> Result<u64> {
        if let Some(id) = *self.chain_id.lock() {
            return Ok(id);
        }
        let id = self.rpc(self.provider.get_chain_id()).await?;
        *self.chain_id.lock() = Some(id);
        Ok(id)
    }

    async fn call_read(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        let tx = TransactionRequest::default()
            .with_from(self.bot_addr)
            .with_to(self.htlc_addr)
            .with_input(data);
        let out = self.rpc(self.provider.call(tx)).await?;
        Ok(out.to_vec())
    }

    /// Sign and submit a contract call, then wait for its receipt. The gas
    /// estimate gets a 20% cushion; the nonce is fetched fresh every call.
    async fn call_htlc(&self, value: U256, data: Vec<u8>) -> Result<String> {
        let chain_id = self.chain_id().await?;
        let nonce = self
            .rpc(self.provider.get_transaction_count(self.bot_addr))
            .await?;

        let mut tx = TransactionRequest::default()
            .with_from(self.bot_addr)
            .with_to(self.htlc_addr)
            .with_value(value)
            .with_input(data);
        let gas = self.rpc(self.provider.estimate_gas(tx.clone())).await?;
        tx = tx
            .with_nonce(nonce)
            .with_gas_limit(gas * 120 / 100)
            .with_gas_price(self.gas_price)
            .with_chain_id(chain_id);

        let pending = self
            .rpc(self.provider.send_transaction(tx))
            .await
            .map_err(|e| match e {
                BotError::Rpc(msg) => BotError::Rpc(format!("send tx: {msg}")),
                other => other,
            })?;
        let tx_hash = *pending.tx_hash();
        info!(tx_hash = %tx_hash, "contract call submitted");

        for _ in 0..RECEIPT_RETRY_COUNT {
            match self.rpc(self.provider.get_transaction_receipt(tx_hash)).await {
                Ok(Some(receipt)) => {
                    if receipt.status() {
                        return Ok(hex::encode(tx_hash));
                    }
                    return Err(BotError::TxFailed(format!(
                        "tx reverted: {}",
                        hex::encode(tx_hash)
                    )));
                }
                Ok(None) => {
                    debug!(tx_hash = %tx_hash, "receipt not ready");
                    tokio::time::sleep(RECEIPT_WAIT).await;
                }
                Err(e) => return Err(e),
            }
        }
        Err(BotError::TxFailed(format!(
            "no receipt after {RECEIPT_RETRY_COUNT} polls: {}",
            hex::encode(tx_hash)
        )))
    }
}

#[async_trait]
impl EvmClient for RpcEvmClient {
    async fn tip_height(&self) -> Result<u64> {
        self.rpc(self.provider.get_block_number()).await
    }

    async fn tip_time(&self) -> Result<u64> {
        let block = self
            .rpc(self.provider.get_block_by_number(BlockNumberOrTag::Latest))
            .await?
            .ok_or_else(|| BotError::Rpc("no latest block".into()))?;
        Ok(block.header.timestamp)
    }

    async fn tx_block_time(&self, tx_hash: &str) -> Result<u64> {
        let hash = B256::from(hex_to_array::<32>(tx_hash)?);
        let receipt = self
            .rpc(self.provider.get_transaction_receipt(hash))
            .await?
            .ok_or_else(|| BotError::Rpc(format!("no receipt for {tx_hash}")))?;
        let block_hash = receipt
            .block_hash
            .ok_or_else(|| BotError::Rpc(format!("receipt for {tx_hash} not in a block")))?;
        let block = self
            .rpc(self.provider.get_block_by_hash(block_hash))
            .await?
            .ok_or_else(|| BotError::Rpc(format!("missing block {block_hash}")))?;
        Ok(block.header.timestamp)
    }

    async fn get_logs(&self, from: u64, to: u64) -> Result<Vec<Log>> {
        let filter = Filter::new()
            .address(self.htlc_addr)
            .from_block(from)
            .to_block(to);
        self.rpc(self.provider.get_logs(&filter)).await
    }

    async fn balance(&self) -> Result<U256> {
        self.rpc(self.provider.get_balance(self.bot_addr)).await
    }

    async fn lock(
        &self,
        receiver: Address,
        hash_lock: B256,
        valid_period_secs: u32,
        value_wei: U256,
    ) -> Result<String> {
        let data = lockCall {
            receiver,
            hashLock: hash_lock,
            validPeriod: U256::from(valid_period_secs),
            receiverUtxoPkh: zero_pkh(),
            penaltyBPS: 0,
            receiverIsMM: false,
            expectedPrice: U256::from(DEFAULT_EXPECTED_PRICE_WEI),
        }
        .abi_encode();
        self.call_htlc(value_wei, data).await
    }

    async fn unlock(&self, sender: Address, hash_lock: B256, secret: B256) -> Result<String> {
        let data = unlockCall {
            sender,
            hashLock: hash_lock,
            secret,
        }
        .abi_encode();
        self.call_htlc(U256::ZERO, data).await
    }

    async fn refund(&self, sender: Address, hash_lock: B256) -> Result<String> {
        let data = refundCall {
            sender,
            hashLock: hash_lock,
        }
        .abi_encode();
        self.call_htlc(U256::ZERO, data).await
    }

    async fn swap_state(&self, sender: Address, hash_lock: B256) -> Result<SwapState> {
        let data = getSwapStateCall {
            sender,
            hashLock: hash_lock,
        }
        .abi_encode();
        let out = self.call_read(data).await?;
        let state = getSwapStateCall::abi_decode_returns(&out)
            .map_err(|e| BotError::EventDecode(format!("getSwapState return: {e}")))?;
        Ok(SwapState::from(state))
    }

    async fn market_maker(&self, addr: Address) -> Result<MarketMakerInfo> {
        let data = marketMakerByAddressCall { addr }.abi_encode();
        let out = self.call_read(data).await?;
        let mm: MarketMaker = marketMakerByAddressCall::abi_decode_returns(&out)
            .map_err(|e| BotError::EventDecode(format!("marketMakerByAddress return: {e}")))?;
        Ok(mm.into_info())
    }
}
