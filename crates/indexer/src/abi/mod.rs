//! Typed ABI surface of the protocol contracts.
//!
//! The deployed ABIs are re-expressed as `sol!` declarations; decoding and
//! call encoding are fully typed, and an address's module decides which
//! event set its logs are decoded against.

pub mod decode;
pub mod fast_btc_bridge;
pub mod moc;
pub mod moc_queue;
pub mod omoc;
pub mod token;

pub use decode::{
    decode_log, BridgeEvent, ExecutionEvent, MocEvent, MocQueueEvent, OmocEvent, ProtocolEvent,
};

/// The contract families the registry can bind an address to. Each family
/// carries its own event set for log decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractModule {
    /// The core protocol contract.
    Moc,
    /// The operations queue.
    MocQueue,
    /// An ERC-20 token (TC, TP, CA or the fee token).
    Token,
    /// The peg-out bridge.
    FastBtcBridge,
    /// OMOC incentives.
    IncentiveV2,
    /// OMOC vesting factory.
    VestingFactory,
    /// OMOC delay machine.
    DelayMachine,
    /// OMOC supporters.
    Supporters,
    /// OMOC voting machine.
    VotingMachine,
}

impl ContractModule {
    /// The module name used in audit collection names
    /// (`event_<Module>_<EventName>`).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Moc => "Moc",
            Self::MocQueue => "MocQueue",
            Self::Token => "Token",
            Self::FastBtcBridge => "FastBtcBridge",
            Self::IncentiveV2 => "IncentiveV2",
            Self::VestingFactory => "VestingFactory",
            Self::DelayMachine => "DelayMachine",
            Self::Supporters => "Supporters",
            Self::VotingMachine => "VotingMachine",
        }
    }
}
