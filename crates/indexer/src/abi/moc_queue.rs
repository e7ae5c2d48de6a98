//! Events and static-call surface of the MocQueue contract.
//!
//! The queue emits the operation lifecycle events (`OperationQueued`,
//! `OperationExecuted`, `OperationError`, `UnhandledError`) and, on
//! execution, one settlement event per operation kind. Queued request
//! parameters are not part of the `OperationQueued` payload; they are read
//! back through the per-kind `operations…` getters.

use alloy_sol_types::sol;

sol! {
    /// A user operation entered the queue.
    #[derive(Debug, PartialEq, Eq)]
    event OperationQueued(address bucket_, uint256 operId_, uint8 operType_);

    /// A batch executor drained the queue.
    #[derive(Debug, PartialEq, Eq)]
    event OperationExecuted(address indexed executor, uint256 operId_);

    /// The queue rejected an operation with a protocol error code.
    #[derive(Debug, PartialEq, Eq)]
    event OperationError(uint256 operId_, bytes4 errorCode_, string msg_);

    /// The queue failed on an operation in an unexpected way.
    #[derive(Debug, PartialEq, Eq)]
    event UnhandledError(uint256 operId_, bytes reason_);

    /// Collateral token minted.
    #[derive(Debug, PartialEq, Eq)]
    event TCMinted(
        address indexed sender_,
        address indexed recipient_,
        uint256 qTC_,
        uint256 qAC_,
        uint256 qACfee_,
        uint256 qFeeToken_,
        uint256 qACVendorMarkup_,
        uint256 qFeeTokenVendorMarkup_,
        address vendor_,
        uint256 operId_
    );

    /// Collateral token redeemed.
    #[derive(Debug, PartialEq, Eq)]
    event TCRedeemed(
        address indexed sender_,
        address indexed recipient_,
        uint256 qTC_,
        uint256 qAC_,
        uint256 qACfee_,
        uint256 qFeeToken_,
        uint256 qACVendorMarkup_,
        uint256 qFeeTokenVendorMarkup_,
        address vendor_,
        uint256 operId_
    );

    /// Pegged token minted.
    #[derive(Debug, PartialEq, Eq)]
    event TPMinted(
        address indexed tp_,
        address indexed sender_,
        address recipient_,
        uint256 qTP_,
        uint256 qAC_,
        uint256 qACfee_,
        uint256 qFeeToken_,
        uint256 qACVendorMarkup_,
        uint256 qFeeTokenVendorMarkup_,
        address vendor_,
        uint256 operId_
    );

    /// Pegged token redeemed.
    #[derive(Debug, PartialEq, Eq)]
    event TPRedeemed(
        address indexed tp_,
        address indexed sender_,
        address recipient_,
        uint256 qTP_,
        uint256 qAC_,
        uint256 qACfee_,
        uint256 qFeeToken_,
        uint256 qACVendorMarkup_,
        uint256 qFeeTokenVendorMarkup_,
        address vendor_,
        uint256 operId_
    );

    /// Collateral and pegged token minted jointly.
    #[derive(Debug, PartialEq, Eq)]
    event TCandTPMinted(
        address indexed tp_,
        address indexed sender_,
        address recipient_,
        uint256 qTC_,
        uint256 qTP_,
        uint256 qAC_,
        uint256 qACfee_,
        uint256 qFeeToken_,
        uint256 qACVendorMarkup_,
        uint256 qFeeTokenVendorMarkup_,
        address vendor_,
        uint256 operId_
    );

    /// Collateral and pegged token redeemed jointly.
    #[derive(Debug, PartialEq, Eq)]
    event TCandTPRedeemed(
        address indexed tp_,
        address indexed sender_,
        address recipient_,
        uint256 qTC_,
        uint256 qTP_,
        uint256 qAC_,
        uint256 qACfee_,
        uint256 qFeeToken_,
        uint256 qACVendorMarkup_,
        uint256 qFeeTokenVendorMarkup_,
        address vendor_,
        uint256 operId_
    );

    /// Collateral token swapped for pegged token.
    #[derive(Debug, PartialEq, Eq)]
    event TCSwappedForTP(
        address indexed tp_,
        address indexed sender_,
        address recipient_,
        uint256 qTC_,
        uint256 qTP_,
        uint256 qACfee_,
        uint256 qFeeToken_,
        uint256 qACVendorMarkup_,
        uint256 qFeeTokenVendorMarkup_,
        address vendor_,
        uint256 operId_
    );

    /// Pegged token swapped for collateral token.
    #[derive(Debug, PartialEq, Eq)]
    event TPSwappedForTC(
        address indexed tp_,
        address indexed sender_,
        address recipient_,
        uint256 qTC_,
        uint256 qTP_,
        uint256 qACfee_,
        uint256 qFeeToken_,
        uint256 qACVendorMarkup_,
        uint256 qFeeTokenVendorMarkup_,
        address vendor_,
        uint256 operId_
    );

    /// One pegged token swapped for another.
    #[derive(Debug, PartialEq, Eq)]
    event TPSwappedForTP(
        address indexed tpFrom_,
        address indexed tpTo_,
        address sender_,
        address recipient_,
        uint256 qTPfrom_,
        uint256 qTPto_,
        uint256 qACfee_,
        uint256 qFeeToken_,
        uint256 qACVendorMarkup_,
        uint256 qFeeTokenVendorMarkup_,
        address vendor_,
        uint256 operId_
    );

    /// Queued mint-TC request parameters.
    function operationsMintTC(uint256 operId_) external view returns (
        uint256 qTC, uint256 qACmax, address sender, address recipient, address vendor
    );

    /// Queued redeem-TC request parameters.
    function operationsRedeemTC(uint256 operId_) external view returns (
        uint256 qTC, uint256 qACmin, address sender, address recipient, address vendor
    );

    /// Queued mint-TP request parameters.
    function operationsMintTP(uint256 operId_) external view returns (
        address tp, uint256 qTP, uint256 qACmax, address sender, address recipient, address vendor
    );

    /// Queued redeem-TP request parameters.
    function operationsRedeemTP(uint256 operId_) external view returns (
        address tp, uint256 qTP, uint256 qACmin, address sender, address recipient, address vendor
    );

    /// Queued joint-mint request parameters.
    function operationsMintTCandTP(uint256 operId_) external view returns (
        address tp, uint256 qTP, uint256 qACmax, address sender, address recipient, address vendor
    );

    /// Queued joint-redeem request parameters.
    function operationsRedeemTCandTP(uint256 operId_) external view returns (
        address tp, uint256 qTC, uint256 qTP, uint256 qACmin,
        address sender, address recipient, address vendor
    );

    /// Queued TC-for-TP swap request parameters.
    function operationsSwapTCforTP(uint256 operId_) external view returns (
        address tp, uint256 qTC, uint256 qTPmin, uint256 qACmax,
        address sender, address recipient, address vendor
    );

    /// Queued TP-for-TC swap request parameters.
    function operationsSwapTPforTC(uint256 operId_) external view returns (
        address tp, uint256 qTP, uint256 qTCmin, uint256 qACmax,
        address sender, address recipient, address vendor
    );

    /// Queued TP-for-TP swap request parameters.
    function operationsSwapTPforTP(uint256 operId_) external view returns (
        address tpFrom, address tpTo, uint256 qTP, uint256 qTPmin, uint256 qACmax,
        address sender, address recipient, address vendor
    );
}
