//! A mock chain provider for testing.

use crate::{
    errors::ProviderError,
    traits::NodeProvider,
    types::{ChainBlock, ChainReceipt},
};
use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    sync::Mutex,
};

use super::fixtures::TxFixture;

/// An in-memory [`NodeProvider`] fed by tests.
///
/// Blocks, receipts and `eth_call` responses are registered up front; an
/// unregistered call fails like an unreachable node would.
#[derive(Debug, Default)]
pub struct TestNodeProvider {
    head: AtomicU64,
    blocks: Mutex<HashMap<u64, ChainBlock>>,
    receipts: Mutex<HashMap<B256, ChainReceipt>>,
    calls: Mutex<HashMap<(Address, Bytes), Bytes>>,
}

impl TestNodeProvider {
    /// Sets the head block number.
    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    /// Inserts a block with no transactions.
    pub fn insert_empty_block(&self, number: u64, timestamp: u64) {
        self.blocks.lock().unwrap().insert(
            number,
            ChainBlock { number, hash: B256::with_last_byte(number as u8), timestamp, transactions: vec![] },
        );
    }

    /// Inserts a block carrying the given transaction fixtures, wiring up
    /// their receipts (unless a fixture withholds its receipt).
    pub fn insert_block_with_txs(&self, number: u64, timestamp: u64, txs: Vec<&TxFixture>) {
        let mut receipts = self.receipts.lock().unwrap();
        let transactions = txs
            .iter()
            .enumerate()
            .map(|(index, fixture)| {
                if let Some(receipt) = fixture.receipt(number, index as u64) {
                    receipts.insert(fixture.tx.hash, receipt);
                }
                fixture.tx.clone()
            })
            .collect();
        drop(receipts);
        self.blocks.lock().unwrap().insert(
            number,
            ChainBlock { number, hash: B256::with_last_byte(number as u8), timestamp, transactions },
        );
    }

    /// Registers a receipt directly, outside of any block.
    pub fn insert_receipt(&self, receipt: ChainReceipt) {
        self.receipts.lock().unwrap().insert(receipt.transaction_hash, receipt);
    }

    /// Removes a receipt, simulating a transaction that fell out of the
    /// chain.
    pub fn remove_receipt(&self, hash: &B256) {
        self.receipts.lock().unwrap().remove(hash);
    }

    /// Registers an `eth_call` response for exact calldata to a contract.
    pub fn insert_call(&self, to: Address, data: Bytes, response: Bytes) {
        self.calls.lock().unwrap().insert((to, data), response);
    }
}

#[async_trait]
impl NodeProvider for TestNodeProvider {
    async fn block_number(&self) -> Result<u64, ProviderError> {
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn block_by_number(&self, number: u64) -> Result<Option<ChainBlock>, ProviderError> {
        Ok(self.blocks.lock().unwrap().get(&number).cloned())
    }

    async fn receipt_by_hash(&self, hash: B256) -> Result<Option<ChainReceipt>, ProviderError> {
        Ok(self.receipts.lock().unwrap().get(&hash).cloned())
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .get(&(to, data))
            .cloned()
            .ok_or_else(|| ProviderError::Transport(format!("no call registered for {to}")))
    }
}
