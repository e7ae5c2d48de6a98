//! The raw block walkers.
//!
//! Two instances of the same forward walk materialize filtered transactions
//! into `raw_transactions`: the primary walker trails the head by a small
//! recession lag, and the confirming rescanner trails it further by the
//! confirmation depth, re-visiting settled blocks to repair records missed
//! near the tip. Each advances its own cursor in the shared checkpoint and
//! only after a block is fully written, so an aborted tick resumes cleanly.

use crate::{
    checkpoint,
    collections::RAW_TRANSACTIONS,
    config::{ScanBlocksConfig, ScanConfirmingConfig},
    errors::{ProviderError, StoreError, TaskError},
    registry::ContractRegistry,
    traits::{DocStore, NodeProvider},
    types::{ChainBlock, RawTxDoc},
    util,
};
use bson::doc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Which cursor and lag a walker instance drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkMode {
    /// Primary forward walk, lagging `blocks_recession`.
    Forward,
    /// Insert-only re-scan, lagging `blocks_recession + confirm_blocks`.
    Confirming,
}

/// Walks the chain forward and persists filtered transaction receipts.
#[derive(Debug)]
pub struct BlockWalker<P, S> {
    provider: Arc<P>,
    store: Arc<S>,
    registry: Arc<ContractRegistry>,
    mode: WalkMode,
    from_block: u64,
    to_block: u64,
    lag: u64,
    max_blocks: u64,
    debug: bool,
    log_target: &'static str,
}

impl<P: NodeProvider, S: DocStore> BlockWalker<P, S> {
    /// The primary raw transaction walker.
    pub fn raw(
        provider: Arc<P>,
        store: Arc<S>,
        registry: Arc<ContractRegistry>,
        config: &ScanBlocksConfig,
        debug: bool,
    ) -> Self {
        Self {
            provider,
            store,
            registry,
            mode: WalkMode::Forward,
            from_block: config.from_block,
            to_block: config.to_block,
            lag: config.blocks_recession,
            max_blocks: config.max_blocks_to_process,
            debug,
            log_target: "scan_raw_txs",
        }
    }

    /// The confirming rescanner.
    pub fn confirming(
        provider: Arc<P>,
        store: Arc<S>,
        registry: Arc<ContractRegistry>,
        config: &ScanConfirmingConfig,
        debug: bool,
    ) -> Self {
        Self {
            provider,
            store,
            registry,
            mode: WalkMode::Confirming,
            from_block: config.from_block,
            to_block: config.to_block,
            lag: config.blocks_recession + config.confirm_blocks,
            max_blocks: config.max_blocks_to_process,
            debug,
            log_target: "scan_raw_txs_confirming",
        }
    }

    /// One scheduled tick: walk `[cursor + 1, head − lag]`, capped by the
    /// per-tick block budget. Any RPC or store failure aborts the tick
    /// without advancing the cursor past the last fully-written block.
    pub async fn tick(&self) -> Result<(), TaskError> {
        let head = self.provider.block_number().await?;
        let safe_head = head.saturating_sub(self.lag);

        let state = checkpoint::load(self.store.as_ref()).await?;
        let last_indexed = match self.mode {
            WalkMode::Forward => state.last_raw_block,
            WalkMode::Confirming => state.last_raw_confirming_block,
        }
        .unwrap_or(0) as u64;

        let cursor_from = (last_indexed + 1).max(self.from_block);
        let mut cursor_to = safe_head;
        if self.to_block > 0 {
            cursor_to = cursor_to.min(self.to_block);
        }
        if self.max_blocks > 0 {
            cursor_to = cursor_to.min(cursor_from + self.max_blocks - 1);
        }

        if cursor_from > cursor_to {
            if self.debug {
                match self.mode {
                    WalkMode::Forward => {
                        info!(target: "scan_raw_txs", "No new blocks available, nothing to scan");
                    }
                    WalkMode::Confirming => {
                        info!(
                            target: "scan_raw_txs_confirming",
                            "No new blocks available, nothing to scan"
                        );
                    }
                }
            }
            return Ok(());
        }

        if self.debug {
            match self.mode {
                WalkMode::Forward => {
                    info!(
                        target: "scan_raw_txs",
                        "Starting to scan transactions [{cursor_from} / {cursor_to}]"
                    );
                }
                WalkMode::Confirming => {
                    info!(
                        target: "scan_raw_txs_confirming",
                        "Starting to scan transactions [{cursor_from} / {cursor_to}]"
                    );
                }
            }
        }

        let mut written = 0usize;
        for number in cursor_from..=cursor_to {
            let block = self
                .provider
                .block_by_number(number)
                .await?
                .ok_or(ProviderError::BlockNotFound(number))?;
            written += self.index_block(&block, head).await?;

            let patch = match self.mode {
                WalkMode::Forward => doc! {
                    "last_raw_block": number as i64,
                    "last_block_number": block.number as i64,
                    "last_block_ts": util::datetime_from_secs(block.timestamp),
                    "updated_at": bson::DateTime::now(),
                },
                WalkMode::Confirming => doc! {
                    "last_raw_confirming_block": number as i64,
                },
            };
            checkpoint::update(self.store.as_ref(), patch).await?;

            if self.debug {
                match self.mode {
                    WalkMode::Forward => debug!(target: "scan_raw_txs", "OK [{number}] / [{cursor_to}]"),
                    WalkMode::Confirming => {
                        debug!(target: "scan_raw_txs_confirming", "OK [{number}] / [{cursor_to}]");
                    }
                }
            }
        }

        if self.mode == WalkMode::Confirming && written > 0 {
            warn!(target: "scan_raw_txs_confirming", "Re-homed {written} missed transactions");
        } else {
            match self.mode {
                WalkMode::Forward => info!(target: "scan_raw_txs", "Done, wrote {written} transactions"),
                WalkMode::Confirming => {
                    info!(target: "scan_raw_txs_confirming", "Done, wrote {written} transactions");
                }
            }
        }
        Ok(())
    }

    /// Persists the filtered transactions of one block. Returns how many
    /// records were written.
    async fn index_block(&self, block: &ChainBlock, head: u64) -> Result<usize, TaskError> {
        let filter_set = self.registry.filter_set();
        let mut written = 0usize;

        for tx in block.transactions.iter().filter(|tx| tx.touches(filter_set)) {
            let Some(receipt) = self.provider.receipt_by_hash(tx.hash).await? else {
                match self.mode {
                    WalkMode::Forward => error!(
                        target: "scan_raw_txs",
                        "No transaction receipt for hash [{}]", util::hash_lower(&tx.hash)
                    ),
                    WalkMode::Confirming => error!(
                        target: "scan_raw_txs_confirming",
                        "No transaction receipt for hash [{}]", util::hash_lower(&tx.hash)
                    ),
                }
                continue;
            };
            // Require at least one confirmation before persisting.
            if head.saturating_sub(receipt.block_number) < 1 {
                continue;
            }

            let record = RawTxDoc::from_chain(tx, &receipt, block.timestamp, head);
            let key = doc! { "hash": &record.hash, "blockNumber": record.block_number };

            if self.mode == WalkMode::Confirming
                && self
                    .store
                    .find_one(RAW_TRANSACTIONS, key.clone(), None)
                    .await?
                    .is_some()
            {
                // Already indexed; the rescanner never rewrites.
                continue;
            }

            let mut set = bson::to_document(&record).map_err(StoreError::from)?;
            // `processed` belongs to the dispatcher once the record exists.
            set.remove("processed");
            self.store
                .upsert(RAW_TRANSACTIONS, key, set, doc! { "processed": false })
                .await?;
            written += 1;
        }

        Ok(written)
    }
}
