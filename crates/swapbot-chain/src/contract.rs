//! HTLC contract call surface.

use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;

use swapbot_core::types::MarketMakerInfo;

sol! {
    /// A registered market maker, as stored by the HTLC contract.
    #[derive(Debug)]
    struct MarketMaker {
        address addr;
        uint64 retiredAt;
        bytes32 intro;
        bytes20 utxoPkh;
        uint16 utxoLockTime;
        uint32 evmLockTime;
        uint16 penaltyBPS;
        uint16 feeBPS;
        uint256 minSwapAmt;
        uint256 maxSwapAmt;
        uint64 utxoPrice;
        uint64 evmPrice;
        address statusChecker;
        bool unavailable;
    }

    function lock(
        address receiver,
        bytes32 hashLock,
        uint256 validPeriod,
        bytes20 receiverUtxoPkh,
        uint16 penaltyBPS,
        bool receiverIsMM,
        uint256 expectedPrice
    ) external payable;

    function unlock(address sender, bytes32 hashLock, bytes32 secret) external;

    function refund(address sender, bytes32 hashLock) external;

    function getSwapState(address sender, bytes32 hashLock) external view returns (uint8);

    function marketMakerByAddress(address addr) external view returns (MarketMaker mm);
}

impl MarketMaker {
    pub fn into_info(self) -> MarketMakerInfo {
        MarketMakerInfo {
            addr: self.addr,
            retired_at: self.retiredAt,
            intro: self.intro.0,
            utxo_pkh: self.utxoPkh.0,
            utxo_time_lock: self.utxoLockTime,
            evm_time_lock: self.evmLockTime,
            penalty_bps: self.penaltyBPS,
            fee_bps: self.feeBPS,
            min_swap_amt: self.minSwapAmt.saturating_to::<u64>(),
            max_swap_amt: self.maxSwapAmt.saturating_to::<u64>(),
            utxo_price: self.utxoPrice,
            evm_price: self.evmPrice,
            status_checker: self.statusChecker,
            unavailable: self.unavailable,
        }
    }
}

impl From<MarketMakerInfo> for MarketMaker {
    fn from(info: MarketMakerInfo) -> Self {
        Self {
            addr: info.addr,
            retiredAt: info.retired_at,
            intro: info.intro.into(),
            utxoPkh: info.utxo_pkh.into(),
            utxoLockTime: info.utxo_time_lock,
            evmLockTime: info.evm_time_lock,
            penaltyBPS: info.penalty_bps,
            feeBPS: info.fee_bps,
            minSwapAmt: U256::from(info.min_swap_amt),
            maxSwapAmt: U256::from(info.max_swap_amt),
            utxoPrice: info.utxo_price,
            evmPrice: info.evm_price,
            statusChecker: info.status_checker,
            unavailable: info.unavailable,
        }
    }
}

/// Placeholder receiver PKH for the bot's own `lock` calls; the payout
/// address on the UTXO side is already fixed by the swap record.
pub fn zero_pkh() -> alloy_primitives::FixedBytes<20> {
    alloy_primitives::FixedBytes::<20>::ZERO
}

pub fn zero_address() -> Address {
    Address::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::SolCall;

    #[test]
    fn lock_calldata_roundtrip() {
        let call = lockCall {
            receiver: Address::repeat_byte(1),
            hashLock: alloy_primitives::B256::repeat_byte(2),
            validPeriod: U256::from(21_600u64),
            receiverUtxoPkh: zero_pkh(),
            penaltyBPS: 0,
            receiverIsMM: false,
            expectedPrice: U256::from(1_000_000_000_000_000_000u128),
        };
        let data = call.abi_encode();
        let decoded = lockCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.receiver, Address::repeat_byte(1));
        assert_eq!(decoded.validPeriod, U256::from(21_600u64));
    }

    #[test]
    fn market_maker_info_conversion() {
        let mm = MarketMaker {
            addr: Address::repeat_byte(7),
            retiredAt: 0,
            intro: Default::default(),
            utxoPkh: alloy_primitives::FixedBytes::<20>::repeat_byte(8),
            utxoLockTime: 72,
            evmLockTime: 43_200,
            penaltyBPS: 500,
            feeBPS: 0,
            minSwapAmt: U256::from(100_000u64),
            maxSwapAmt: U256::from(999_999u64),
            utxoPrice: 100_000_000,
            evmPrice: 100_000_000,
            statusChecker: Address::ZERO,
            unavailable: false,
        };
        let info = mm.into_info();
        assert_eq!(info.utxo_pkh, [8u8; 20]);
        assert_eq!(info.params().evm_time_lock, 43_200);
        assert_eq!(info.params().max_swap_amt, 999_999);
    }
}
