use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("illegal record transition: {0}")]
    IllegalTransition(String),

    #[error("event decode error: {0}")]
    EventDecode(String),

    #[error("no spendable UTXO set: need {needed} sats within {max_count} inputs")]
    NoSpendableUtxos { needed: u64, max_count: usize },

    #[error("transaction failed: {0}")]
    TxFailed(String),
}

impl BotError {
    /// Fatal errors terminate the process; everything else is logged and
    /// retried on the next loop iteration.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BotError::Database(_) | BotError::IllegalTransition(_))
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

/// Outcome of submitting a terminal (unlock/refund) transaction. A submission
/// that fails because the counter-party already finished the job still
/// advances the local record, with `"?"` standing in for the unknown tx hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent(String),
    AlreadyDone,
}

impl SendOutcome {
    pub fn tx_hash(self) -> String {
        match self {
            SendOutcome::Sent(hash) => hash,
            SendOutcome::AlreadyDone => "?".to_string(),
        }
    }
}
