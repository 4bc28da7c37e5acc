pub mod contract;
pub mod evm;
pub mod evm_mock;
pub mod utxo;
pub mod utxo_mock;

pub use evm::{EvmClient, RpcEvmClient};
pub use evm_mock::MockEvmClient;
pub use utxo::{select_utxos, RpcUtxoClient, UtxoClient};
pub use utxo_mock::MockUtxoClient;
