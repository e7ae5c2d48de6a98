//! Error types shared across the indexing pipeline.

use alloy_primitives::{Address, B256};
use thiserror::Error;

/// An error reaching the chain node over JSON-RPC.
///
/// All variants are transient from the pipeline's point of view: the failing
/// tick is aborted without advancing any checkpoint and the scheduler retries
/// on its next interval.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The transport failed (node unreachable, timeout, malformed frame).
    #[error("rpc transport error: {0}")]
    Transport(String),
    /// The requested block does not exist on the node yet.
    #[error("block {0} not found")]
    BlockNotFound(u64),
    /// The node answered with data the pipeline cannot interpret.
    #[error("malformed node response: {0}")]
    Malformed(String),
    /// A static call reverted or returned undecodable data.
    #[error("eth_call to {to} failed: {reason}")]
    Call {
        /// The contract that was called.
        to: Address,
        /// Why the call result could not be used.
        reason: String,
    },
}

/// An error talking to the document store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store is unreachable or rejected the operation.
    #[error("store error: {0}")]
    Backend(String),
    /// A stored document could not be decoded into its typed form.
    #[error("malformed document in `{collection}`: {reason}")]
    MalformedDocument {
        /// Collection the document was read from.
        collection: String,
        /// Decoding failure detail.
        reason: String,
    },
}

impl From<bson::ser::Error> for StoreError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// An error decoding a raw log against a registered contract.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The log's `topic0` does not match any event of the contract's ABI.
    #[error("unknown event for contract {address}: topic0 {topic0:?}")]
    UnknownEvent {
        /// The emitting contract.
        address: Address,
        /// The first topic of the log, if any.
        topic0: Option<B256>,
    },
    /// The topics/data payload did not match the matched event's layout.
    #[error("malformed {event} log from {address}: {reason}")]
    Malformed {
        /// The emitting contract.
        address: Address,
        /// The event the log matched by signature.
        event: &'static str,
        /// Decoding failure detail.
        reason: String,
    },
}

/// An error building the contract registry at startup.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// An OMOC registry constant required for address resolution is missing.
    #[error("missing registry constant `{0}` in configuration")]
    MissingConstant(String),
    /// The `IRegistry.getAddress` static call failed.
    #[error("failed to resolve `{name}` through IRegistry: {source}")]
    Resolution {
        /// Symbolic name being resolved.
        name: String,
        /// Underlying provider failure.
        #[source]
        source: ProviderError,
    },
    /// `IRegistry` resolved a symbolic name to the zero address.
    #[error("IRegistry resolved `{0}` to the zero address")]
    ZeroAddress(String),
}

/// A configuration loading failure. Fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config file `{path}`: {source}")]
    Io {
        /// Path that was attempted.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration JSON is invalid or missing required fields.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// A field has a value the pipeline cannot work with.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A failure inside a scheduled task tick.
///
/// Every variant is caught by the scheduler's top-level guard, logged with
/// the task name, and retried on the next interval. None aborts the process.
#[derive(Error, Debug)]
pub enum TaskError {
    /// Chain access failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// Store access failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The tick exceeded its configured timeout and was cancelled.
    #[error("task timed out after {0} seconds")]
    Timeout(u64),
}

/// Top-level error for registry bootstrap and pipeline construction.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Registry bootstrap failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Chain access failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// Store access failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}
