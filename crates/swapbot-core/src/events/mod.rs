pub mod evm;
pub mod utxo;

pub use evm::{EvmLockEvent, EvmRefundEvent, EvmUnlockEvent, Lock, Refund, Unlock};
pub use utxo::{UtxoLockEvent, UtxoUnlockEvent};
