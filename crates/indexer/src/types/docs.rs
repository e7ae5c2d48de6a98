//! Persisted document shapes.
//!
//! Field names are load-bearing: downstream consumers read these collections
//! directly, so the serialized names mirror the store schema rather than Rust
//! conventions.

use crate::{
    errors::StoreError,
    types::{
        chain::{ChainLog, ChainReceipt, ChainTx},
        oper_id::OperId,
    },
    util,
};
use alloy_primitives::{Address, Bytes, LogData, B256};
use serde::{Deserialize, Serialize};

/// One filtered transaction with its receipt, as stored in
/// `raw_transactions`. Keyed by `(hash, blockNumber)`.
///
/// Immutable once written except for `processed` and `lastUpdatedAt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTxDoc {
    /// Transaction hash, lowercase hex.
    pub hash: String,
    /// Inclusion block number.
    #[serde(rename = "blockNumber")]
    pub block_number: i64,
    /// Inclusion block hash, lowercase hex.
    #[serde(rename = "blockHash")]
    pub block_hash: String,
    /// Sender, lowercase hex.
    pub from: String,
    /// Recipient, lowercase hex. Absent for contract creations.
    pub to: Option<String>,
    /// Native value, decimal string.
    pub value: String,
    /// Gas limit.
    pub gas: i64,
    /// Gas price, decimal string.
    #[serde(rename = "gasPrice")]
    pub gas_price: String,
    /// Gas used per the receipt.
    #[serde(rename = "gasUsed")]
    pub gas_used: i64,
    /// Calldata, hex.
    pub input: String,
    /// Logs emitted by the transaction.
    pub logs: Vec<LogDoc>,
    /// Receipt status: 1 success, 0 EVM revert.
    pub status: i64,
    /// Whether the dispatcher already consumed this record.
    #[serde(default)]
    pub processed: bool,
    /// `head - blockNumber` at write time. Advisory only.
    pub confirmations: i64,
    /// Position of the transaction within its block.
    #[serde(rename = "transactionIndex")]
    pub transaction_index: i64,
    /// Timestamp of the inclusion block.
    pub timestamp: bson::DateTime,
    /// Record creation instant (the inclusion block's timestamp).
    #[serde(rename = "createdAt")]
    pub created_at: bson::DateTime,
    /// Last write instant.
    #[serde(rename = "lastUpdatedAt")]
    pub last_updated_at: bson::DateTime,
}

impl RawTxDoc {
    /// Materializes a filtered transaction and its receipt into a document.
    pub fn from_chain(tx: &ChainTx, receipt: &ChainReceipt, block_ts: u64, head: u64) -> Self {
        let block_ts = util::datetime_from_secs(block_ts);
        Self {
            hash: util::hash_lower(&tx.hash),
            block_number: receipt.block_number as i64,
            block_hash: util::hash_lower(&receipt.block_hash),
            from: util::addr_lower(&tx.from),
            to: tx.to.as_ref().map(util::addr_lower),
            value: tx.value.to_string(),
            gas: tx.gas as i64,
            gas_price: tx.gas_price.to_string(),
            gas_used: receipt.gas_used as i64,
            input: tx.input.to_string(),
            logs: receipt.logs.iter().map(LogDoc::from).collect(),
            status: receipt.success as i64,
            processed: false,
            confirmations: head.saturating_sub(receipt.block_number) as i64,
            transaction_index: receipt.transaction_index as i64,
            timestamp: block_ts,
            created_at: block_ts,
            last_updated_at: bson::DateTime::now(),
        }
    }
}

/// A log entry inside a [`RawTxDoc`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogDoc {
    /// Emitting contract, lowercase hex.
    pub address: String,
    /// Log topics, lowercase hex.
    pub topics: Vec<String>,
    /// ABI-encoded payload, hex.
    pub data: String,
    /// Position of the log within its block.
    #[serde(rename = "logIndex")]
    pub log_index: i64,
}

impl From<&ChainLog> for LogDoc {
    fn from(log: &ChainLog) -> Self {
        Self {
            address: util::addr_lower(&log.address),
            topics: log.data.topics().iter().map(util::hash_lower).collect(),
            data: log.data.data.to_string(),
            log_index: log.log_index as i64,
        }
    }
}

impl LogDoc {
    /// Reconstructs the decodable chain form of the log.
    pub fn to_chain(&self, collection: &str) -> Result<ChainLog, StoreError> {
        let malformed = |reason: String| StoreError::MalformedDocument {
            collection: collection.to_string(),
            reason,
        };
        let address = self
            .address
            .parse::<Address>()
            .map_err(|e| malformed(format!("log address `{}`: {e}", self.address)))?;
        let topics = self
            .topics
            .iter()
            .map(|t| t.parse::<B256>().map_err(|e| malformed(format!("log topic `{t}`: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;
        let data = self
            .data
            .parse::<Bytes>()
            .map_err(|e| malformed(format!("log data `{}`: {e}", self.data)))?;
        Ok(ChainLog {
            address,
            data: LogData::new_unchecked(topics, data),
            log_index: self.log_index as u64,
        })
    }
}

/// The slice of an `operations` document the pipeline reads back.
///
/// Writes go through `$set` patches; this struct only exists for the
/// monotonicity guard and the status scanner, so unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationRow {
    /// Operation id. Absent for synthesized Transfer/ERROR records.
    #[serde(rename = "operId", default)]
    pub oper_id: Option<OperId>,
    /// Hash of the transaction that last touched the record.
    pub hash: String,
    /// Block of that transaction.
    #[serde(rename = "blockNumber")]
    pub block_number: i64,
    /// Current lifecycle status.
    pub status: i32,
    /// Record creation instant.
    #[serde(rename = "createdAt")]
    pub created_at: bson::DateTime,
    /// Confirmation stamp, set once by the status scanner.
    #[serde(rename = "confirmationTime", default)]
    pub confirmation_time: Option<bson::DateTime>,
}

/// The single checkpoint document in `indexer_state`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointDoc {
    /// Highest block fully written by the raw walker.
    #[serde(default)]
    pub last_raw_block: Option<i64>,
    /// Highest block fully re-scanned by the confirming walker.
    #[serde(default)]
    pub last_raw_confirming_block: Option<i64>,
    /// Head observed by the status scanner on its last run.
    #[serde(default)]
    pub last_status_block: Option<i64>,
    /// Head-side block number observed by the raw walker.
    #[serde(default)]
    pub last_block_number: Option<i64>,
    /// Timestamp of that block.
    #[serde(default)]
    pub last_block_ts: Option<bson::DateTime>,
    /// Last checkpoint write instant.
    #[serde(default)]
    pub updated_at: Option<bson::DateTime>,
}
