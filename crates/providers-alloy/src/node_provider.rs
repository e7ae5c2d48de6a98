//! A [`NodeProvider`] over Ethereum JSON-RPC using an alloy provider as the
//! backend.

use alloy::{
    consensus::Transaction as _,
    eips::BlockNumberOrTag,
    providers::{Provider, RootProvider},
    rpc::types::{Block, TransactionReceipt, TransactionRequest},
};
use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use lru::LruCache;
use stablescan_indexer::{
    errors::ProviderError,
    traits::NodeProvider,
    types::{ChainBlock, ChainLog, ChainReceipt, ChainTx},
};
use std::{num::NonZeroUsize, sync::Mutex};
use tracing::trace;

/// Receipts are immutable once mined; the status scanner re-polls the same
/// hashes every tick, so a small cache removes most of that traffic.
const RECEIPT_CACHE_SIZE: usize = 256;

/// The concrete [`NodeProvider`] over an alloy HTTP provider.
#[derive(Debug)]
pub struct AlloyNodeProvider {
    inner: RootProvider,
    receipt_cache: Mutex<LruCache<B256, ChainReceipt>>,
}

impl AlloyNodeProvider {
    /// Wraps an existing alloy provider.
    pub fn new(inner: RootProvider) -> Self {
        Self {
            inner,
            receipt_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(RECEIPT_CACHE_SIZE).unwrap(),
            )),
        }
    }

    /// Connects to the given HTTP endpoint.
    pub fn new_http(url: reqwest::Url) -> Self {
        Self::new(RootProvider::new_http(url))
    }
}

#[async_trait]
impl NodeProvider for AlloyNodeProvider {
    async fn block_number(&self) -> Result<u64, ProviderError> {
        self.inner.get_block_number().await.map_err(transport)
    }

    async fn block_by_number(&self, number: u64) -> Result<Option<ChainBlock>, ProviderError> {
        let block = self
            .inner
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .full()
            .await
            .map_err(transport)?;
        block.map(convert_block).transpose()
    }

    async fn receipt_by_hash(&self, hash: B256) -> Result<Option<ChainReceipt>, ProviderError> {
        if let Some(receipt) = self.receipt_cache.lock().unwrap().get(&hash) {
            trace!(target: "node_provider", "Receipt cache hit for {hash}");
            return Ok(Some(receipt.clone()));
        }

        let Some(receipt) = self.inner.get_transaction_receipt(hash).await.map_err(transport)?
        else {
            // Absence is not cached: the transaction may surface later.
            return Ok(None);
        };
        let receipt = convert_receipt(receipt)?;
        self.receipt_cache.lock().unwrap().put(hash, receipt.clone());
        Ok(Some(receipt))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError> {
        let request = TransactionRequest::default().to(to).input(data.into());
        self.inner
            .call(request)
            .await
            .map_err(|e| ProviderError::Call { to, reason: e.to_string() })
    }
}

fn transport(err: impl std::fmt::Display) -> ProviderError {
    ProviderError::Transport(err.to_string())
}

fn convert_block(block: Block) -> Result<ChainBlock, ProviderError> {
    let transactions = block
        .transactions
        .as_transactions()
        .ok_or_else(|| {
            ProviderError::Malformed("block fetched without full transactions".to_string())
        })?
        .iter()
        .map(|tx| {
            let gas_price = tx.gas_price().unwrap_or_else(|| tx.max_fee_per_gas());
            ChainTx {
                hash: *tx.inner.inner().tx_hash(),
                from: tx.inner.signer(),
                to: tx.to(),
                value: tx.value(),
                gas: tx.gas_limit(),
                gas_price: U256::from(gas_price),
                input: tx.input().clone(),
            }
        })
        .collect();

    Ok(ChainBlock {
        number: block.header.number,
        hash: block.header.hash,
        timestamp: block.header.timestamp,
        transactions,
    })
}

fn convert_receipt(receipt: TransactionReceipt) -> Result<ChainReceipt, ProviderError> {
    let block_number = receipt.block_number.ok_or_else(|| {
        ProviderError::Malformed(format!("receipt {} has no block number", receipt.transaction_hash))
    })?;
    let logs = receipt
        .inner
        .logs()
        .iter()
        .map(|log| {
            let log_index = log.log_index.ok_or_else(|| {
                ProviderError::Malformed(format!(
                    "receipt {} carries a pending log",
                    receipt.transaction_hash
                ))
            })?;
            Ok(ChainLog { address: log.inner.address, data: log.inner.data.clone(), log_index })
        })
        .collect::<Result<Vec<_>, ProviderError>>()?;

    Ok(ChainReceipt {
        transaction_hash: receipt.transaction_hash,
        block_number,
        block_hash: receipt.block_hash.unwrap_or_default(),
        transaction_index: receipt.transaction_index.unwrap_or_default(),
        success: receipt.status(),
        gas_used: receipt.gas_used,
        effective_gas_price: U256::from(receipt.effective_gas_price),
        logs,
    })
}
