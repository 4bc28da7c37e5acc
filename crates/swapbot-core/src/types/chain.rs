/// Which chain a scan cursor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    Utxo,
    Evm,
}

impl Chain {
    pub fn cursor_id(self) -> &'static str {
        match self {
            Chain::Utxo => "utxo",
            Chain::Evm => "evm",
        }
    }
}

/// A UTXO-chain block as exposed by the chain adapter: enough of each
/// transaction to run the HTLC lock/unlock detectors.
#[derive(Debug, Clone, Default)]
pub struct BlockView {
    pub height: u64,
    pub txs: Vec<TxView>,
}

#[derive(Debug, Clone)]
pub struct TxView {
    /// Display-order hex txid.
    pub txid: String,
    pub inputs: Vec<TxInView>,
    pub outputs: Vec<TxOutView>,
}

#[derive(Debug, Clone)]
pub struct TxInView {
    pub prev_txid: String,
    pub prev_vout: u32,
    pub script_sig: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct TxOutView {
    pub value_sats: u64,
    pub script_pubkey: Vec<u8>,
}

/// An unspent output of the bot's P2PKH address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub value_sats: u64,
}
