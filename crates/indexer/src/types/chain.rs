//! Domain mirrors of the node's block, transaction, receipt and log shapes.
//!
//! The pipeline never touches transport-level RPC types directly; providers
//! convert into these structs at the boundary so that the walkers, the
//! dispatcher and the test doubles all speak the same language.

use alloy_primitives::{Address, Bytes, LogData, B256, U256};

/// A block with its full transaction bodies, as fetched by the walkers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainBlock {
    /// Block number.
    pub number: u64,
    /// Block hash.
    pub hash: B256,
    /// Block timestamp, seconds since the epoch.
    pub timestamp: u64,
    /// Full transactions included in the block, in block order.
    pub transactions: Vec<ChainTx>,
}

/// A transaction body as carried inside a fetched block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainTx {
    /// Transaction hash.
    pub hash: B256,
    /// Sender address.
    pub from: Address,
    /// Recipient address. `None` for contract creations.
    pub to: Option<Address>,
    /// Native value transferred.
    pub value: U256,
    /// Gas limit of the transaction.
    pub gas: u64,
    /// Gas price (effective price for dynamic-fee transactions).
    pub gas_price: U256,
    /// Calldata.
    pub input: Bytes,
}

impl ChainTx {
    /// Whether the transaction touches any address of the given filter set.
    pub fn touches(&self, filter_set: &std::collections::HashSet<Address>) -> bool {
        filter_set.contains(&self.from) || self.to.is_some_and(|to| filter_set.contains(&to))
    }
}

/// A transaction receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainReceipt {
    /// Hash of the transaction the receipt belongs to.
    pub transaction_hash: B256,
    /// Number of the block the transaction was included in.
    pub block_number: u64,
    /// Hash of the block the transaction was included in.
    pub block_hash: B256,
    /// Position of the transaction within its block.
    pub transaction_index: u64,
    /// `true` on success, `false` on EVM revert.
    pub success: bool,
    /// Gas consumed by the transaction.
    pub gas_used: u64,
    /// Effective gas price paid.
    pub effective_gas_price: U256,
    /// Logs emitted by the transaction, in `log_index` order.
    pub logs: Vec<ChainLog>,
}

/// A single log entry from a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLog {
    /// Emitting contract.
    pub address: Address,
    /// Topics and data, decodable against the contract's event set.
    pub data: LogData,
    /// Position of the log within its block.
    pub log_index: u64,
}
