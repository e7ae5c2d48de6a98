//! Traits at the pipeline's external seams: the chain node and the
//! document store.

use crate::{
    errors::{ProviderError, StoreError},
    types::{ChainBlock, ChainReceipt},
};
use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use bson::Document;

/// Read access to an EVM node over JSON-RPC.
///
/// Implementations are shared across tasks behind an `Arc`; they must be
/// internally synchronized.
#[async_trait]
pub trait NodeProvider: Send + Sync {
    /// The current head block number (`eth_blockNumber`).
    async fn block_number(&self) -> Result<u64, ProviderError>;

    /// The block at the given number with full transaction bodies
    /// (`eth_getBlockByNumber(full=true)`), or `None` if the node does not
    /// have it.
    async fn block_by_number(&self, number: u64) -> Result<Option<ChainBlock>, ProviderError>;

    /// The receipt for the given transaction hash
    /// (`eth_getTransactionReceipt`), or `None` if the transaction is not
    /// (or no longer) on chain.
    async fn receipt_by_hash(&self, hash: B256) -> Result<Option<ChainReceipt>, ProviderError>;

    /// A contract static call (`eth_call` at the latest block).
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError>;
}

/// Sort order of an index field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrder {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl IndexOrder {
    /// The store-side integer form (`1` / `-1`).
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }
}

/// An upsert-by-key document store with per-collection secondary indexes.
///
/// All mutation goes through per-key `$set` patches so that concurrent
/// writers never need read-modify-write loops on whole documents.
#[async_trait]
pub trait DocStore: Send + Sync {
    /// Sets `set` on the document matching `key`, inserting it if absent.
    /// `set_on_insert` fields are only written when the upsert inserts.
    async fn upsert(
        &self,
        collection: &str,
        key: Document,
        set: Document,
        set_on_insert: Document,
    ) -> Result<(), StoreError>;

    /// The first document matching `filter`, honoring `sort` when given.
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Option<Document>, StoreError>;

    /// All documents matching `filter`, honoring `sort` when given.
    async fn find_many(
        &self,
        collection: &str,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Sets `set` on the document matching `filter` without ever inserting.
    /// Returns whether a document matched.
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<bool, StoreError>;

    /// Ensures a secondary index exists on the collection.
    async fn create_index(
        &self,
        collection: &str,
        fields: &[(&str, IndexOrder)],
        unique: bool,
    ) -> Result<(), StoreError>;
}
