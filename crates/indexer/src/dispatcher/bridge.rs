//! FastBtcBridge peg-out lifecycle records.

use crate::{
    abi::BridgeEvent, collections::FAST_BTC_BRIDGE, dispatcher::context::TxContext,
    errors::StoreError, traits::DocStore, util,
};
use bson::doc;
use tracing::{info, warn};

const LOG_TARGET: &str = "scan_events";

/// Applies a bridge event to the `FastBtcBridge` collection.
///
/// `NewBitcoinTransfer` inserts the transfer record; status updates patch
/// an existing record and never insert, so an update observed before its
/// transfer (a gap the confirming rescanner later repairs) is not
/// materialized half-empty.
pub async fn apply<S: DocStore + ?Sized>(
    store: &S,
    ctx: &TxContext<'_>,
    event: &BridgeEvent,
) -> Result<(), StoreError> {
    match event {
        BridgeEvent::NewBitcoinTransfer(e) => {
            let transfer_id = util::hash_lower(&e.transferId);
            let set = doc! {
                "transferId": &transfer_id,
                "type": "PEG_OUT",
                "transactionHash": &ctx.raw.hash,
                "transactionHashLastUpdated": &ctx.raw.hash,
                "blockNumber": ctx.raw.block_number,
                "btcAddress": &e.btcAddress,
                "nonce": e.nonce.to_string(),
                "amountSatoshi": e.amountSatoshi.to_string(),
                "feeSatoshi": e.feeSatoshi.to_string(),
                "rskAddress": util::addr_checksum(&e.rskAddress),
                "status": 0_i32,
                "timestamp": ctx.raw.timestamp,
                "updated": ctx.raw.timestamp,
            };
            store.upsert(FAST_BTC_BRIDGE, doc! { "transferId": &transfer_id }, set, doc! {}).await?;
            info!(target: LOG_TARGET, "New bitcoin transfer {transfer_id}");
        }
        BridgeEvent::BitcoinTransferStatusUpdated(e) => {
            let transfer_id = util::hash_lower(&e.transferId);
            let set = doc! {
                "status": e.newStatus as i32,
                "updated": ctx.raw.timestamp,
                "transactionHashLastUpdated": &ctx.raw.hash,
            };
            let matched = store
                .update_one(FAST_BTC_BRIDGE, doc! { "transferId": &transfer_id }, set)
                .await?;
            if matched {
                info!(
                    target: LOG_TARGET,
                    "Bitcoin transfer {transfer_id} moved to status {}", e.newStatus
                );
            } else {
                warn!(
                    target: LOG_TARGET,
                    "Status update for unknown bitcoin transfer {transfer_id}"
                );
            }
        }
    }
    Ok(())
}
