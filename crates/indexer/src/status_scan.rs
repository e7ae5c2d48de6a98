//! The status scanner.
//!
//! Periodically advances operations that are executed but not yet
//! confirmed: stamps `confirmationTime` once the operation's block is deep
//! enough below the head, demotes operations whose transaction reverted,
//! and stales operations whose receipt can no longer be resolved after a
//! configured age. Head and head-timestamp come from the checkpoint, so the
//! scanner never runs ahead of what the walkers have persisted.

use crate::{
    checkpoint,
    collections::OPERATIONS,
    config::ScanStatusConfig,
    errors::{StoreError, TaskError},
    traits::{DocStore, NodeProvider},
    types::{OperStatus, OperationRow},
};
use alloy_primitives::B256;
use bson::{doc, Bson};
use std::sync::Arc;
use tracing::{info, warn};

const LOG_TARGET: &str = "scan_tx_status";

/// Promotes executed operations to confirmed and expires stale ones.
#[derive(Debug)]
pub struct StatusAdvancer<P, S> {
    provider: Arc<P>,
    store: Arc<S>,
    confirm_blocks: u64,
    stale_after_secs: u64,
}

impl<P: NodeProvider, S: DocStore> StatusAdvancer<P, S> {
    /// Builds the scanner.
    pub fn new(provider: Arc<P>, store: Arc<S>, config: &ScanStatusConfig) -> Self {
        Self {
            provider,
            store,
            confirm_blocks: config.confirm_blocks,
            stale_after_secs: config.seconds_not_in_chain_error,
        }
    }

    /// One scheduled tick. Skips entirely when the head has not advanced
    /// since the previous run.
    pub async fn tick(&self) -> Result<(), TaskError> {
        let state = checkpoint::load(self.store.as_ref()).await?;
        let head = state.last_block_number.unwrap_or(0) as u64;
        let head_ts = state.last_block_ts.unwrap_or_else(bson::DateTime::now);
        let last_status_block = state.last_status_block.unwrap_or(0) as u64;

        if head <= last_status_block {
            info!(target: LOG_TARGET, "Head has not advanced, nothing to scan");
            return Ok(());
        }
        checkpoint::update(
            self.store.as_ref(),
            doc! { "last_status_block": head as i64, "updated_at": bson::DateTime::now() },
        )
        .await?;

        let pending = self
            .store
            .find_many(
                OPERATIONS,
                doc! { "status": { "$gte": 1 }, "confirmationTime": Bson::Null },
                None,
            )
            .await?;

        for document in pending {
            let row: OperationRow =
                bson::from_document(document).map_err(|e| StoreError::MalformedDocument {
                    collection: OPERATIONS.to_string(),
                    reason: e.to_string(),
                })?;
            self.advance(&row, head, head_ts).await?;
        }

        info!(target: LOG_TARGET, "Done, scanned up to head {head}");
        Ok(())
    }

    async fn advance(
        &self,
        row: &OperationRow,
        head: u64,
        head_ts: bson::DateTime,
    ) -> Result<(), TaskError> {
        let key = match row.oper_id {
            Some(id) => doc! { "operId": id.0 },
            None => doc! { "hash": &row.hash },
        };
        let Ok(hash) = row.hash.parse::<B256>() else {
            warn!(target: LOG_TARGET, "Operation with malformed hash `{}`", row.hash);
            return Ok(());
        };

        match self.provider.receipt_by_hash(hash).await? {
            Some(receipt) if !receipt.success => {
                // The recorded transaction reverted after all.
                self.store
                    .update_one(
                        OPERATIONS,
                        key,
                        doc! {
                            "status": OperStatus::Reverted.as_i32(),
                            "lastUpdatedAt": bson::DateTime::now(),
                        },
                    )
                    .await?;
                info!(target: LOG_TARGET, "Setting status -4 for hash {}", row.hash);
            }
            Some(_) => {
                if (row.block_number as u64) + self.confirm_blocks < head {
                    self.store
                        .update_one(
                            OPERATIONS,
                            key,
                            doc! {
                                "status": OperStatus::Confirmed.as_i32(),
                                "confirmationTime": bson::DateTime::now(),
                                "lastUpdatedAt": bson::DateTime::now(),
                            },
                        )
                        .await?;
                    info!(target: LOG_TARGET, "Confirmed operation, hash {}", row.hash);
                }
            }
            None => {
                let stale_at =
                    row.created_at.timestamp_millis() + (self.stale_after_secs as i64) * 1000;
                if stale_at < head_ts.timestamp_millis() {
                    self.store
                        .update_one(
                            OPERATIONS,
                            key,
                            doc! {
                                "status": OperStatus::Stale.as_i32(),
                                "errorCode": "staleTransaction",
                                "lastUpdatedAt": bson::DateTime::now(),
                            },
                        )
                        .await?;
                    info!(target: LOG_TARGET, "Setting status -3 for hash {}", row.hash);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_utils::{MemStore, TestNodeProvider},
        types::ChainReceipt,
        util,
    };
    use alloy_primitives::U256;

    fn advancer(
        provider: &Arc<TestNodeProvider>,
        store: &Arc<MemStore>,
    ) -> StatusAdvancer<TestNodeProvider, MemStore> {
        StatusAdvancer::new(
            provider.clone(),
            store.clone(),
            &ScanStatusConfig { confirm_blocks: 10, seconds_not_in_chain_error: 7200 },
        )
    }

    async fn seed_head(store: &MemStore, head: u64, head_ts_secs: u64) {
        checkpoint::update(
            store,
            doc! {
                "last_block_number": head as i64,
                "last_block_ts": util::datetime_from_secs(head_ts_secs),
                "updated_at": bson::DateTime::now(),
            },
        )
        .await
        .unwrap();
    }

    async fn seed_operation(
        store: &MemStore,
        oper_id: i64,
        hash: B256,
        block_number: i64,
        created_secs: u64,
    ) {
        store
            .upsert(
                OPERATIONS,
                doc! { "operId": oper_id },
                doc! {
                    "hash": util::hash_lower(&hash),
                    "blockNumber": block_number,
                    "status": OperStatus::Executed.as_i32(),
                    "createdAt": util::datetime_from_secs(created_secs),
                    "confirmationTime": Bson::Null,
                },
                doc! {},
            )
            .await
            .unwrap();
    }

    fn receipt(hash: B256, block_number: u64, success: bool) -> ChainReceipt {
        ChainReceipt {
            transaction_hash: hash,
            block_number,
            block_hash: B256::with_last_byte(block_number as u8),
            transaction_index: 0,
            success,
            gas_used: 21_000,
            effective_gas_price: U256::from(1u64),
            logs: vec![],
        }
    }

    #[tokio::test]
    async fn confirms_operations_deep_enough_below_the_head() {
        let provider = Arc::new(TestNodeProvider::default());
        let store = Arc::new(MemStore::default());
        let hash = B256::repeat_byte(0x11);
        seed_operation(&store, 7, hash, 90, 1_700_000_000).await;
        provider.insert_receipt(receipt(hash, 90, true));
        seed_head(&store, 101, 1_700_000_500).await;

        advancer(&provider, &store).tick().await.unwrap();

        let op = store.find_one(OPERATIONS, doc! { "operId": 7_i64 }, None).await.unwrap().unwrap();
        assert_eq!(op.get_i32("status").unwrap(), 2);
        assert!(op.get_datetime("confirmationTime").is_ok());
        let state = checkpoint::load(store.as_ref()).await.unwrap();
        assert_eq!(state.last_status_block, Some(101));
    }

    #[tokio::test]
    async fn shallow_operations_stay_executed() {
        let provider = Arc::new(TestNodeProvider::default());
        let store = Arc::new(MemStore::default());
        let hash = B256::repeat_byte(0x12);
        // 95 + 10 is not < 101.
        seed_operation(&store, 8, hash, 95, 1_700_000_000).await;
        provider.insert_receipt(receipt(hash, 95, true));
        seed_head(&store, 101, 1_700_000_500).await;

        advancer(&provider, &store).tick().await.unwrap();

        let op = store.find_one(OPERATIONS, doc! { "operId": 8_i64 }, None).await.unwrap().unwrap();
        assert_eq!(op.get_i32("status").unwrap(), 1);
        assert_eq!(op.get("confirmationTime"), Some(&Bson::Null));
    }

    #[tokio::test]
    async fn reverted_receipts_demote_the_operation() {
        let provider = Arc::new(TestNodeProvider::default());
        let store = Arc::new(MemStore::default());
        let hash = B256::repeat_byte(0x13);
        seed_operation(&store, 9, hash, 90, 1_700_000_000).await;
        provider.insert_receipt(receipt(hash, 90, false));
        seed_head(&store, 101, 1_700_000_500).await;

        advancer(&provider, &store).tick().await.unwrap();

        let op = store.find_one(OPERATIONS, doc! { "operId": 9_i64 }, None).await.unwrap().unwrap();
        assert_eq!(op.get_i32("status").unwrap(), -4);
    }

    #[tokio::test]
    async fn unresolvable_receipts_stale_after_the_timeout() {
        let provider = Arc::new(TestNodeProvider::default());
        let store = Arc::new(MemStore::default());
        let hash = B256::repeat_byte(0x14);
        // Created two days before the head timestamp, well past 7200s.
        seed_operation(&store, 10, hash, 90, 1_700_000_000).await;
        seed_head(&store, 101, 1_700_172_800).await;

        advancer(&provider, &store).tick().await.unwrap();

        let op = store.find_one(OPERATIONS, doc! { "operId": 10_i64 }, None).await.unwrap().unwrap();
        assert_eq!(op.get_i32("status").unwrap(), -3);
        assert_eq!(op.get_str("errorCode").unwrap(), "staleTransaction");
    }

    #[tokio::test]
    async fn recently_created_operations_are_not_staled() {
        let provider = Arc::new(TestNodeProvider::default());
        let store = Arc::new(MemStore::default());
        let hash = B256::repeat_byte(0x15);
        seed_operation(&store, 11, hash, 90, 1_700_000_000).await;
        // Head timestamp within the allowed window.
        seed_head(&store, 101, 1_700_003_600).await;

        advancer(&provider, &store).tick().await.unwrap();

        let op = store.find_one(OPERATIONS, doc! { "operId": 11_i64 }, None).await.unwrap().unwrap();
        assert_eq!(op.get_i32("status").unwrap(), 1);
    }

    #[tokio::test]
    async fn skips_when_the_head_has_not_advanced() {
        let provider = Arc::new(TestNodeProvider::default());
        let store = Arc::new(MemStore::default());
        seed_head(&store, 101, 1_700_000_500).await;
        advancer(&provider, &store).tick().await.unwrap();

        // A confirmable operation arrives, but the head is unchanged.
        let hash = B256::repeat_byte(0x16);
        seed_operation(&store, 12, hash, 80, 1_700_000_000).await;
        provider.insert_receipt(receipt(hash, 80, true));
        advancer(&provider, &store).tick().await.unwrap();

        let op = store.find_one(OPERATIONS, doc! { "operId": 12_i64 }, None).await.unwrap().unwrap();
        assert_eq!(op.get_i32("status").unwrap(), 1);
        assert_eq!(op.get("confirmationTime"), Some(&Bson::Null));
    }
}
