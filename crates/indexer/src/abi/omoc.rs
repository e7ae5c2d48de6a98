//! OMOC governance surface: the address registry getter plus the
//! governance events recorded for audit.

use alloy_sol_types::sol;

sol! {
    /// OMOC address registry lookup, keyed by a deployment constant.
    function getAddress(bytes32 key) external view returns (address addr);

    /// An incentive claim succeeded.
    #[derive(Debug, PartialEq, Eq)]
    event ClaimOK(address indexed origin, address indexed destination, uint256 amount);

    /// A vesting machine was created for a holder.
    #[derive(Debug, PartialEq, Eq)]
    event VestingCreated(address indexed vesting, address indexed holder);

    /// A delayed payment was cancelled.
    #[derive(Debug, PartialEq, Eq)]
    event PaymentCancel(
        uint256 indexed id, address source, address destination, uint256 amount
    );

    /// A delayed payment was deposited.
    #[derive(Debug, PartialEq, Eq)]
    event PaymentDeposit(
        uint256 indexed id, address source, address destination, uint256 amount, uint256 expiration
    );

    /// A delayed payment was withdrawn.
    #[derive(Debug, PartialEq, Eq)]
    event PaymentWithdraw(
        uint256 indexed id, address source, address destination, uint256 amount
    );

    /// Stake was added for a supporter.
    #[derive(Debug, PartialEq, Eq)]
    event AddStake(
        address indexed user, address indexed subaccount, address sender,
        uint256 amount, uint256 mocs
    );

    /// Earnings of a round were cancelled.
    #[derive(Debug, PartialEq, Eq)]
    event CancelEarnings(uint256 earnings, uint256 start, uint256 end);

    /// Earnings of a round were paid out.
    #[derive(Debug, PartialEq, Eq)]
    event PayEarnings(uint256 earnings, uint256 start, uint256 end);

    /// Tokens were withdrawn by a supporter.
    #[derive(Debug, PartialEq, Eq)]
    event Withdraw(
        address indexed msgSender, address indexed subaccount, address receiver,
        uint256 mocs, uint256 blockNum
    );

    /// Stake was withdrawn by a supporter.
    #[derive(Debug, PartialEq, Eq)]
    event WithdrawStake(
        address indexed user, address indexed subaccount, address destination,
        uint256 amount, uint256 mocs
    );

    /// A vote was cast on the voting machine.
    #[derive(Debug, PartialEq, Eq)]
    event VoteEvent(address indexed voter, uint256 votingPower, bool inFavor);
}
