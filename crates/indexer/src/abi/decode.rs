//! Typed log decoding.
//!
//! Each registered contract belongs to a module; decoding matches the log's
//! `topic0` against that module's event set and returns a typed event, or
//! [`DecodeError::UnknownEvent`] when the ABI has no matching entry.

use crate::{
    abi::{fast_btc_bridge, moc, moc_queue, omoc, token, ContractModule},
    errors::DecodeError,
    types::ChainLog,
};
use alloy_primitives::LogData;
use alloy_sol_types::SolEvent;

/// A decoded event from any registered contract.
#[derive(Debug, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// Core contract event.
    Moc(MocEvent),
    /// Queue lifecycle or execution event.
    MocQueue(MocQueueEvent),
    /// ERC-20 transfer on a registered token.
    Token(token::Transfer),
    /// Peg-out bridge event.
    FastBtcBridge(BridgeEvent),
    /// OMOC governance event.
    Omoc(OmocEvent),
}

/// Events of the core Moc contract.
#[derive(Debug, PartialEq, Eq)]
pub enum MocEvent {
    /// Liquidation redemption of a pegged token.
    LiqTPRedeemed(moc::LiqTPRedeemed),
    /// Success fee distribution.
    SuccessFeeDistributed(moc::SuccessFeeDistributed),
    /// Settlement round completion.
    SettlementExecuted(moc::SettlementExecuted),
    /// Collateral interest payment.
    TCInterestPayment(moc::TCInterestPayment),
    /// Pegged token EMA update.
    TPemaUpdated(moc::TPemaUpdated),
}

/// Events of the MocQueue contract.
#[derive(Debug, PartialEq, Eq)]
pub enum MocQueueEvent {
    /// An operation entered the queue.
    OperationQueued(moc_queue::OperationQueued),
    /// The queue was drained by an executor.
    OperationExecuted(moc_queue::OperationExecuted),
    /// An operation failed with a protocol error code.
    OperationError(moc_queue::OperationError),
    /// An operation failed in an unexpected way.
    UnhandledError(moc_queue::UnhandledError),
    /// Execution settlement of a queued operation.
    Execution(ExecutionEvent),
}

/// The nine per-kind execution settlement events.
#[derive(Debug, PartialEq, Eq)]
pub enum ExecutionEvent {
    /// Collateral token minted.
    TCMinted(moc_queue::TCMinted),
    /// Collateral token redeemed.
    TCRedeemed(moc_queue::TCRedeemed),
    /// Pegged token minted.
    TPMinted(moc_queue::TPMinted),
    /// Pegged token redeemed.
    TPRedeemed(moc_queue::TPRedeemed),
    /// Joint mint.
    TCandTPMinted(moc_queue::TCandTPMinted),
    /// Joint redeem.
    TCandTPRedeemed(moc_queue::TCandTPRedeemed),
    /// TC swapped for TP.
    TCSwappedForTP(moc_queue::TCSwappedForTP),
    /// TP swapped for TC.
    TPSwappedForTC(moc_queue::TPSwappedForTC),
    /// TP swapped for TP.
    TPSwappedForTP(moc_queue::TPSwappedForTP),
}

/// Events of the FastBtcBridge contract.
#[derive(Debug, PartialEq, Eq)]
pub enum BridgeEvent {
    /// A peg-out transfer was registered.
    NewBitcoinTransfer(fast_btc_bridge::NewBitcoinTransfer),
    /// A peg-out transfer changed status.
    BitcoinTransferStatusUpdated(fast_btc_bridge::BitcoinTransferStatusUpdated),
}

/// Events of the OMOC governance contracts.
#[derive(Debug, PartialEq, Eq)]
pub enum OmocEvent {
    /// Incentive claim succeeded.
    ClaimOK(omoc::ClaimOK),
    /// Vesting machine created.
    VestingCreated(omoc::VestingCreated),
    /// Delayed payment cancelled.
    PaymentCancel(omoc::PaymentCancel),
    /// Delayed payment deposited.
    PaymentDeposit(omoc::PaymentDeposit),
    /// Delayed payment withdrawn.
    PaymentWithdraw(omoc::PaymentWithdraw),
    /// Supporter stake added.
    AddStake(omoc::AddStake),
    /// Round earnings cancelled.
    CancelEarnings(omoc::CancelEarnings),
    /// Round earnings paid.
    PayEarnings(omoc::PayEarnings),
    /// Supporter withdrawal.
    Withdraw(omoc::Withdraw),
    /// Supporter stake withdrawal.
    WithdrawStake(omoc::WithdrawStake),
    /// Vote cast.
    VoteEvent(omoc::VoteEvent),
}

impl ProtocolEvent {
    /// The event name, as used in dispatch logs and audit collection names.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Moc(e) => match e {
                MocEvent::LiqTPRedeemed(_) => "LiqTPRedeemed",
                MocEvent::SuccessFeeDistributed(_) => "SuccessFeeDistributed",
                MocEvent::SettlementExecuted(_) => "SettlementExecuted",
                MocEvent::TCInterestPayment(_) => "TCInterestPayment",
                MocEvent::TPemaUpdated(_) => "TPemaUpdated",
            },
            Self::MocQueue(e) => match e {
                MocQueueEvent::OperationQueued(_) => "OperationQueued",
                MocQueueEvent::OperationExecuted(_) => "OperationExecuted",
                MocQueueEvent::OperationError(_) => "OperationError",
                MocQueueEvent::UnhandledError(_) => "UnhandledError",
                MocQueueEvent::Execution(e) => e.name(),
            },
            Self::Token(_) => "Transfer",
            Self::FastBtcBridge(e) => match e {
                BridgeEvent::NewBitcoinTransfer(_) => "NewBitcoinTransfer",
                BridgeEvent::BitcoinTransferStatusUpdated(_) => "BitcoinTransferStatusUpdated",
            },
            Self::Omoc(e) => match e {
                OmocEvent::ClaimOK(_) => "ClaimOK",
                OmocEvent::VestingCreated(_) => "VestingCreated",
                OmocEvent::PaymentCancel(_) => "PaymentCancel",
                OmocEvent::PaymentDeposit(_) => "PaymentDeposit",
                OmocEvent::PaymentWithdraw(_) => "PaymentWithdraw",
                OmocEvent::AddStake(_) => "AddStake",
                OmocEvent::CancelEarnings(_) => "CancelEarnings",
                OmocEvent::PayEarnings(_) => "PayEarnings",
                OmocEvent::Withdraw(_) => "Withdraw",
                OmocEvent::WithdrawStake(_) => "WithdrawStake",
                OmocEvent::VoteEvent(_) => "VoteEvent",
            },
        }
    }
}

impl ExecutionEvent {
    /// The emitted event name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TCMinted(_) => "TCMinted",
            Self::TCRedeemed(_) => "TCRedeemed",
            Self::TPMinted(_) => "TPMinted",
            Self::TPRedeemed(_) => "TPRedeemed",
            Self::TCandTPMinted(_) => "TCandTPMinted",
            Self::TCandTPRedeemed(_) => "TCandTPRedeemed",
            Self::TCSwappedForTP(_) => "TCSwappedForTP",
            Self::TPSwappedForTC(_) => "TPSwappedForTC",
            Self::TPSwappedForTP(_) => "TPSwappedForTP",
        }
    }
}

/// Decodes a raw log against the event set of the given contract module.
pub fn decode_log(module: ContractModule, log: &ChainLog) -> Result<ProtocolEvent, DecodeError> {
    let unknown = || DecodeError::UnknownEvent {
        address: log.address,
        topic0: log.data.topics().first().copied(),
    };
    let topic0 = *log.data.topics().first().ok_or_else(unknown)?;
    let data = &log.data;

    macro_rules! try_decode {
        ($event:ty, $wrap:expr) => {
            if topic0 == <$event as SolEvent>::SIGNATURE_HASH {
                return decode_as::<$event>(log.address, data).map($wrap);
            }
        };
    }

    match module {
        ContractModule::Moc => {
            try_decode!(moc::LiqTPRedeemed, |e| ProtocolEvent::Moc(MocEvent::LiqTPRedeemed(e)));
            try_decode!(moc::SuccessFeeDistributed, |e| ProtocolEvent::Moc(
                MocEvent::SuccessFeeDistributed(e)
            ));
            try_decode!(moc::SettlementExecuted, |e| ProtocolEvent::Moc(
                MocEvent::SettlementExecuted(e)
            ));
            try_decode!(moc::TCInterestPayment, |e| ProtocolEvent::Moc(
                MocEvent::TCInterestPayment(e)
            ));
            try_decode!(moc::TPemaUpdated, |e| ProtocolEvent::Moc(MocEvent::TPemaUpdated(e)));
        }
        ContractModule::MocQueue => {
            try_decode!(moc_queue::OperationQueued, |e| ProtocolEvent::MocQueue(
                MocQueueEvent::OperationQueued(e)
            ));
            try_decode!(moc_queue::OperationExecuted, |e| ProtocolEvent::MocQueue(
                MocQueueEvent::OperationExecuted(e)
            ));
            try_decode!(moc_queue::OperationError, |e| ProtocolEvent::MocQueue(
                MocQueueEvent::OperationError(e)
            ));
            try_decode!(moc_queue::UnhandledError, |e| ProtocolEvent::MocQueue(
                MocQueueEvent::UnhandledError(e)
            ));
            try_decode!(moc_queue::TCMinted, |e| ProtocolEvent::MocQueue(
                MocQueueEvent::Execution(ExecutionEvent::TCMinted(e))
            ));
            try_decode!(moc_queue::TCRedeemed, |e| ProtocolEvent::MocQueue(
                MocQueueEvent::Execution(ExecutionEvent::TCRedeemed(e))
            ));
            try_decode!(moc_queue::TPMinted, |e| ProtocolEvent::MocQueue(
                MocQueueEvent::Execution(ExecutionEvent::TPMinted(e))
            ));
            try_decode!(moc_queue::TPRedeemed, |e| ProtocolEvent::MocQueue(
                MocQueueEvent::Execution(ExecutionEvent::TPRedeemed(e))
            ));
            try_decode!(moc_queue::TCandTPMinted, |e| ProtocolEvent::MocQueue(
                MocQueueEvent::Execution(ExecutionEvent::TCandTPMinted(e))
            ));
            try_decode!(moc_queue::TCandTPRedeemed, |e| ProtocolEvent::MocQueue(
                MocQueueEvent::Execution(ExecutionEvent::TCandTPRedeemed(e))
            ));
            try_decode!(moc_queue::TCSwappedForTP, |e| ProtocolEvent::MocQueue(
                MocQueueEvent::Execution(ExecutionEvent::TCSwappedForTP(e))
            ));
            try_decode!(moc_queue::TPSwappedForTC, |e| ProtocolEvent::MocQueue(
                MocQueueEvent::Execution(ExecutionEvent::TPSwappedForTC(e))
            ));
            try_decode!(moc_queue::TPSwappedForTP, |e| ProtocolEvent::MocQueue(
                MocQueueEvent::Execution(ExecutionEvent::TPSwappedForTP(e))
            ));
        }
        ContractModule::Token => {
            try_decode!(token::Transfer, ProtocolEvent::Token);
        }
        ContractModule::FastBtcBridge => {
            try_decode!(fast_btc_bridge::NewBitcoinTransfer, |e| ProtocolEvent::FastBtcBridge(
                BridgeEvent::NewBitcoinTransfer(e)
            ));
            try_decode!(fast_btc_bridge::BitcoinTransferStatusUpdated, |e| {
                ProtocolEvent::FastBtcBridge(BridgeEvent::BitcoinTransferStatusUpdated(e))
            });
        }
        ContractModule::IncentiveV2 => {
            try_decode!(omoc::ClaimOK, |e| ProtocolEvent::Omoc(OmocEvent::ClaimOK(e)));
        }
        ContractModule::VestingFactory => {
            try_decode!(omoc::VestingCreated, |e| ProtocolEvent::Omoc(OmocEvent::VestingCreated(
                e
            )));
        }
        ContractModule::DelayMachine => {
            try_decode!(omoc::PaymentCancel, |e| ProtocolEvent::Omoc(OmocEvent::PaymentCancel(e)));
            try_decode!(omoc::PaymentDeposit, |e| ProtocolEvent::Omoc(OmocEvent::PaymentDeposit(
                e
            )));
            try_decode!(omoc::PaymentWithdraw, |e| ProtocolEvent::Omoc(
                OmocEvent::PaymentWithdraw(e)
            ));
        }
        ContractModule::Supporters => {
            try_decode!(omoc::AddStake, |e| ProtocolEvent::Omoc(OmocEvent::AddStake(e)));
            try_decode!(omoc::CancelEarnings, |e| ProtocolEvent::Omoc(OmocEvent::CancelEarnings(
                e
            )));
            try_decode!(omoc::PayEarnings, |e| ProtocolEvent::Omoc(OmocEvent::PayEarnings(e)));
            try_decode!(omoc::Withdraw, |e| ProtocolEvent::Omoc(OmocEvent::Withdraw(e)));
            try_decode!(omoc::WithdrawStake, |e| ProtocolEvent::Omoc(OmocEvent::WithdrawStake(e)));
        }
        ContractModule::VotingMachine => {
            try_decode!(omoc::VoteEvent, |e| ProtocolEvent::Omoc(OmocEvent::VoteEvent(e)));
        }
    }

    Err(unknown())
}

fn decode_as<E: SolEvent>(
    address: alloy_primitives::Address,
    data: &LogData,
) -> Result<E, DecodeError> {
    E::decode_log_data(data).map_err(|e| DecodeError::Malformed {
        address,
        event: E::SIGNATURE,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, U256};
    use alloy_sol_types::SolEvent;

    fn log_of(address: alloy_primitives::Address, data: LogData) -> ChainLog {
        ChainLog { address, data, log_index: 0 }
    }

    #[test]
    fn decodes_a_queue_execution_event() {
        let tp = address!("3123456789012345678901234567890123456789");
        let event = moc_queue::TPMinted {
            tp_: tp,
            sender_: address!("aaaa456789012345678901234567890123456789"),
            recipient_: address!("bbbb456789012345678901234567890123456789"),
            qTP_: U256::from(1000u64),
            qAC_: U256::from(500u64),
            qACfee_: U256::from(1u64),
            qFeeToken_: U256::ZERO,
            qACVendorMarkup_: U256::ZERO,
            qFeeTokenVendorMarkup_: U256::ZERO,
            vendor_: alloy_primitives::Address::ZERO,
            operId_: U256::from(7u64),
        };
        let log = log_of(tp, event.encode_log_data());
        let decoded = decode_log(ContractModule::MocQueue, &log).unwrap();
        assert_eq!(decoded.name(), "TPMinted");
        match decoded {
            ProtocolEvent::MocQueue(MocQueueEvent::Execution(ExecutionEvent::TPMinted(e))) => {
                assert_eq!(e, event);
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn unknown_topic_is_an_unknown_event() {
        let token = address!("2123456789012345678901234567890123456789");
        let event = token::Transfer {
            from: address!("aaaa456789012345678901234567890123456789"),
            to: address!("bbbb456789012345678901234567890123456789"),
            value: U256::from(10u64),
        };
        let log = log_of(token, event.encode_log_data());
        // A Transfer topic is not part of the Moc module's ABI.
        let err = decode_log(ContractModule::Moc, &log).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownEvent { .. }));
        // Against the token module it decodes fine.
        assert!(decode_log(ContractModule::Token, &log).is_ok());
    }

    #[test]
    fn queue_lifecycle_events_decode() {
        let queue = address!("1123456789012345678901234567890123456789");
        let queued = moc_queue::OperationQueued {
            bucket_: address!("cccc456789012345678901234567890123456789"),
            operId_: U256::from(7u64),
            operType_: 3,
        };
        let log = log_of(queue, queued.encode_log_data());
        let decoded = decode_log(ContractModule::MocQueue, &log).unwrap();
        assert_eq!(decoded.name(), "OperationQueued");

        let error = moc_queue::OperationError {
            operId_: U256::from(7u64),
            errorCode_: alloy_primitives::fixed_bytes!("79121201"),
            msg_: "LOW_COVERAGE".to_string(),
        };
        let log = log_of(queue, error.encode_log_data());
        let decoded = decode_log(ContractModule::MocQueue, &log).unwrap();
        assert_eq!(decoded.name(), "OperationError");
    }
}
