//! Events of the core Moc contract the pipeline records for audit.

use alloy_sol_types::sol;

sol! {
    /// A pegged token position was redeemed during liquidation.
    #[derive(Debug, PartialEq, Eq)]
    event LiqTPRedeemed(
        address indexed tp_,
        address indexed sender_,
        address indexed recipient_,
        uint256 qTP_,
        uint256 qAC_
    );

    /// Settlement distributed the protocol success fee.
    #[derive(Debug, PartialEq, Eq)]
    event SuccessFeeDistributed(uint256 mocGain_, uint256[] tpGain_);

    /// A settlement round completed.
    #[derive(Debug, PartialEq, Eq)]
    event SettlementExecuted();

    /// Holders paid the periodic collateral token interest.
    #[derive(Debug, PartialEq, Eq)]
    event TCInterestPayment(uint256 interestAmount_);

    /// The exponential moving average of a pegged token price updated.
    #[derive(Debug, PartialEq, Eq)]
    event TPemaUpdated(uint256 indexed i_, uint256 oldTPema_, uint256 newTPema_);
}
