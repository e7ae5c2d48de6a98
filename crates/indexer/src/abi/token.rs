//! The ERC-20 surface shared by the TC, TP, CA and fee tokens.

use alloy_sol_types::sol;

sol! {
    /// Standard ERC-20 transfer.
    #[derive(Debug, PartialEq, Eq)]
    event Transfer(address indexed from, address indexed to, uint256 value);
}
