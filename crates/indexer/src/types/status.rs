//! The operation status state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a protocol operation.
///
/// Persisted as a plain integer. Transitions are monotonic: once an operation
/// reaches [`OperStatus::Executed`] or beyond, late queue/error events must
/// not demote it (the dispatcher enforces this before every write).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum OperStatus {
    /// Waiting on the queue (`OperationQueued`).
    Queued,
    /// Executed by the queue (any of the nine execution events).
    Executed,
    /// Deep enough below the head to be considered final.
    Confirmed,
    /// The queue rejected the operation (`OperationError`).
    Error,
    /// The queue failed in an unexpected way (`UnhandledError`).
    Unhandled,
    /// The transaction never surfaced on chain within the allowed window.
    Stale,
    /// The transaction itself reverted (`receipt.status == 0`).
    Reverted,
}

impl OperStatus {
    /// The persisted integer value.
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Queued => 0,
            Self::Executed => 1,
            Self::Confirmed => 2,
            Self::Error => -1,
            Self::Unhandled => -2,
            Self::Stale => -3,
            Self::Reverted => -4,
        }
    }

    /// Whether late queue/error events may no longer change the status.
    pub const fn is_settled(self) -> bool {
        self.as_i32() >= Self::Executed.as_i32()
    }
}

impl From<OperStatus> for i32 {
    fn from(status: OperStatus) -> Self {
        status.as_i32()
    }
}

impl TryFrom<i32> for OperStatus {
    type Error = UnknownStatus;

    fn try_from(value: i32) -> Result<Self, UnknownStatus> {
        match value {
            0 => Ok(Self::Queued),
            1 => Ok(Self::Executed),
            2 => Ok(Self::Confirmed),
            -1 => Ok(Self::Error),
            -2 => Ok(Self::Unhandled),
            -3 => Ok(Self::Stale),
            -4 => Ok(Self::Reverted),
            other => Err(UnknownStatus(other)),
        }
    }
}

/// An integer outside the known status range was read back from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation status {0}")]
pub struct UnknownStatus(pub i32);

/// The nine user operation kinds of the queue, plus the synthetic tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Mint collateral token.
    TCMint,
    /// Redeem collateral token.
    TCRedeem,
    /// Mint pegged token.
    TPMint,
    /// Redeem pegged token.
    TPRedeem,
    /// Joint mint of collateral and pegged token.
    TCandTPMint,
    /// Joint redeem of collateral and pegged token.
    TCandTPRedeem,
    /// Swap collateral token for pegged token.
    TCSwapForTP,
    /// Swap pegged token for collateral token.
    TPSwapForTC,
    /// Swap one pegged token for another.
    TPSwapForTP,
}

impl OperationKind {
    /// Maps the queue's `operType_` discriminant (1..=9) to a kind.
    pub const fn from_oper_type(oper_type: u8) -> Option<Self> {
        match oper_type {
            1 => Some(Self::TCMint),
            2 => Some(Self::TCRedeem),
            3 => Some(Self::TPMint),
            4 => Some(Self::TPRedeem),
            5 => Some(Self::TCandTPMint),
            6 => Some(Self::TCandTPRedeem),
            7 => Some(Self::TCSwapForTP),
            8 => Some(Self::TPSwapForTC),
            9 => Some(Self::TPSwapForTP),
            _ => None,
        }
    }

    /// The string tag persisted in `operations.operation`.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::TCMint => "TCMint",
            Self::TCRedeem => "TCRedeem",
            Self::TPMint => "TPMint",
            Self::TPRedeem => "TPRedeem",
            Self::TCandTPMint => "TCandTPMint",
            Self::TCandTPRedeem => "TCandTPRedeem",
            Self::TCSwapForTP => "TCSwapForTP",
            Self::TPSwapForTC => "TPSwapForTC",
            Self::TPSwapForTP => "TPSwapForTP",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrips_through_i32() {
        for status in [
            OperStatus::Queued,
            OperStatus::Executed,
            OperStatus::Confirmed,
            OperStatus::Error,
            OperStatus::Unhandled,
            OperStatus::Stale,
            OperStatus::Reverted,
        ] {
            assert_eq!(OperStatus::try_from(status.as_i32()), Ok(status));
        }
        assert!(OperStatus::try_from(7).is_err());
    }

    #[test]
    fn settled_statuses() {
        assert!(OperStatus::Executed.is_settled());
        assert!(OperStatus::Confirmed.is_settled());
        assert!(!OperStatus::Queued.is_settled());
        assert!(!OperStatus::Error.is_settled());
    }

    #[test]
    fn oper_type_mapping_covers_all_kinds() {
        assert_eq!(OperationKind::from_oper_type(1), Some(OperationKind::TCMint));
        assert_eq!(OperationKind::from_oper_type(3), Some(OperationKind::TPMint));
        assert_eq!(OperationKind::from_oper_type(9), Some(OperationKind::TPSwapForTP));
        assert_eq!(OperationKind::from_oper_type(0), None);
        assert_eq!(OperationKind::from_oper_type(10), None);
    }
}
