//! Events of the FastBtcBridge peg-out contract.

use alloy_sol_types::sol;

sol! {
    /// A new peg-out transfer was registered.
    #[derive(Debug, PartialEq, Eq)]
    event NewBitcoinTransfer(
        bytes32 indexed transferId,
        string btcAddress,
        uint256 nonce,
        uint256 amountSatoshi,
        uint256 feeSatoshi,
        address indexed rskAddress
    );

    /// A peg-out transfer advanced through the bridge lifecycle.
    #[derive(Debug, PartialEq, Eq)]
    event BitcoinTransferStatusUpdated(bytes32 indexed transferId, uint8 newStatus);
}
