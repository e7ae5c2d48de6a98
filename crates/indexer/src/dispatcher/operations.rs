//! Writes to the `operations` ledger.
//!
//! Every write is a per-key `$set` upsert guarded by the state machine
//! rules: once an operation has reached `Executed` (status ≥ 1), late
//! queue or error events must not demote it, and re-dispatching an
//! already-applied event leaves the record unchanged.

use crate::{
    abi::ExecutionEvent,
    collections::OPERATIONS,
    dispatcher::context::TxContext,
    errors::StoreError,
    registry::ContractRegistry,
    traits::DocStore,
    types::{OperId, OperStatus, OperationKind, RawTxDoc},
    util,
};
use alloy_primitives::{fixed_bytes, FixedBytes, U256};
use bson::{doc, Bson, Document};
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "scan_events";

/// Protocol error code signalling the queue kept the operation for retry;
/// mapped back to `Queued` instead of `Error`.
pub const FLUX_CAPACITOR_REACHED: FixedBytes<4> = fixed_bytes!("0db483ca");

/// Ledger access for one dispatched transaction.
#[derive(Debug)]
pub struct OperationsLedger<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: DocStore + ?Sized> OperationsLedger<'a, S> {
    /// Wraps the store for ledger writes.
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    async fn current_status(&self, key: &Document) -> Result<Option<i32>, StoreError> {
        let found = self.store.find_one(OPERATIONS, key.clone(), None).await?;
        Ok(found.as_ref().and_then(|doc| doc.get_i32("status").ok()))
    }

    /// `OperationQueued`: create the record with its request parameters.
    ///
    /// An existing record keeps its status (a late queued event never
    /// demotes an executed or errored operation) but still receives the
    /// parameters, which only this event can provide.
    pub async fn apply_queued(
        &self,
        ctx: &TxContext<'_>,
        oper_id: OperId,
        kind: OperationKind,
        params: Option<Document>,
    ) -> Result<(), StoreError> {
        let key = doc! { "operId": oper_id.0 };
        let current = self.current_status(&key).await?;

        let mut set = doc! {
            "operation": kind.tag(),
            "lastUpdatedAt": bson::DateTime::now(),
        };
        if let Some(params) = params {
            set.insert("params", params);
        }
        if current.is_none() {
            set.insert("status", OperStatus::Queued.as_i32());
            set.insert("blockNumber", ctx.raw.block_number);
            set.insert("hash", &ctx.raw.hash);
            set.insert("operId", oper_id.0);
            set.insert("createdAt", ctx.raw.created_at);
            set.insert("confirmationTime", Bson::Null);
            set.insert("last_block_indexed", ctx.raw.block_number);
            set.extend(ctx.gas_fields());
        }
        self.store.upsert(OPERATIONS, key, set, doc! {}).await?;
        info!(target: LOG_TARGET, "Operation {oper_id} queued as {}", kind.tag());
        Ok(())
    }

    /// An execution settlement event: stamp the executed snapshot and
    /// promote to `Executed`. Idempotent: a record already at status ≥ 1 is
    /// left untouched, so the snapshot is written exactly once.
    pub async fn apply_executed(
        &self,
        ctx: &TxContext<'_>,
        oper_id: OperId,
        kind: OperationKind,
        executed: Document,
    ) -> Result<(), StoreError> {
        let key = doc! { "operId": oper_id.0 };
        if self.current_status(&key).await?.is_some_and(|s| s >= 1) {
            debug!(target: LOG_TARGET, "Operation {oper_id} already executed, skipping");
            return Ok(());
        }

        let mut set = doc! {
            "status": OperStatus::Executed.as_i32(),
            "operation": kind.tag(),
            "executed": executed,
            "blockNumber": ctx.raw.block_number,
            "hash": &ctx.raw.hash,
            "operId": oper_id.0,
            "createdAt": ctx.raw.created_at,
            "lastUpdatedAt": bson::DateTime::now(),
            "confirmationTime": Bson::Null,
            "last_block_indexed": ctx.raw.block_number,
        };
        set.extend(ctx.gas_fields());
        self.store.upsert(OPERATIONS, key, set, doc! {}).await?;
        info!(
            target: LOG_TARGET,
            "Operation {oper_id} executed as {} in tx {}", kind.tag(), ctx.raw.hash
        );
        Ok(())
    }

    /// `OperationError`: demote to `Error`, except for the flux-capacitor
    /// sentinel which keeps the operation queued for retry. Never demotes a
    /// record at status ≥ 1.
    pub async fn apply_error(
        &self,
        ctx: &TxContext<'_>,
        oper_id: OperId,
        error_code: FixedBytes<4>,
        msg: &str,
    ) -> Result<(), StoreError> {
        let key = doc! { "operId": oper_id.0 };
        if self.current_status(&key).await?.is_some_and(|s| s >= 1) {
            warn!(
                target: LOG_TARGET,
                "Operation {oper_id} already settled, ignoring late OperationError"
            );
            return Ok(());
        }

        let status = if error_code == FLUX_CAPACITOR_REACHED {
            OperStatus::Queued
        } else {
            OperStatus::Error
        };
        let mut set = doc! {
            "status": status.as_i32(),
            "errorCode": format!("{error_code:#x}"),
            "errorMsg": msg,
            "blockNumber": ctx.raw.block_number,
            "hash": &ctx.raw.hash,
            "operId": oper_id.0,
            "createdAt": ctx.raw.created_at,
            "lastUpdatedAt": bson::DateTime::now(),
            "last_block_indexed": ctx.raw.block_number,
        };
        set.extend(ctx.gas_fields());
        self.store.upsert(OPERATIONS, key, set, doc! {}).await?;
        info!(
            target: LOG_TARGET,
            "Operation {oper_id} errored with code {error_code:#x} ({msg})"
        );
        Ok(())
    }

    /// `UnhandledError`: demote to `Unhandled` unless already settled.
    pub async fn apply_unhandled(
        &self,
        ctx: &TxContext<'_>,
        oper_id: OperId,
        reason: &[u8],
    ) -> Result<(), StoreError> {
        let key = doc! { "operId": oper_id.0 };
        if self.current_status(&key).await?.is_some_and(|s| s >= 1) {
            warn!(
                target: LOG_TARGET,
                "Operation {oper_id} already settled, ignoring late UnhandledError"
            );
            return Ok(());
        }

        let mut set = doc! {
            "status": OperStatus::Unhandled.as_i32(),
            "reason": alloy_primitives::hex::encode_prefixed(reason),
            "blockNumber": ctx.raw.block_number,
            "hash": &ctx.raw.hash,
            "operId": oper_id.0,
            "createdAt": ctx.raw.created_at,
            "lastUpdatedAt": bson::DateTime::now(),
            "last_block_indexed": ctx.raw.block_number,
        };
        set.extend(ctx.gas_fields());
        self.store.upsert(OPERATIONS, key, set, doc! {}).await?;
        info!(target: LOG_TARGET, "Operation {oper_id} hit an unhandled error");
        Ok(())
    }

    /// A user-to-user transfer on a registered token, synthesized into the
    /// ledger keyed by transaction hash.
    pub async fn apply_transfer(
        &self,
        ctx: &TxContext<'_>,
        params: Document,
    ) -> Result<(), StoreError> {
        let key = doc! { "hash": &ctx.raw.hash };
        let mut set = doc! {
            "status": OperStatus::Executed.as_i32(),
            "operation": "Transfer",
            "operId": Bson::Null,
            "params": params,
            "blockNumber": ctx.raw.block_number,
            "hash": &ctx.raw.hash,
            "createdAt": ctx.raw.created_at,
            "lastUpdatedAt": bson::DateTime::now(),
            "confirmationTime": Bson::Null,
            "last_block_indexed": ctx.raw.block_number,
        };
        set.extend(ctx.gas_fields());
        self.store.upsert(OPERATIONS, key, set, doc! {}).await?;
        Ok(())
    }

    /// An EVM-reverted transaction against a protocol contract, synthesized
    /// into the ledger keyed by transaction hash.
    pub async fn apply_revert(
        &self,
        raw: &RawTxDoc,
        contract: &str,
    ) -> Result<(), StoreError> {
        let gas_price = raw.gas_price.parse::<U256>().unwrap_or(U256::ZERO);
        let key = doc! { "hash": &raw.hash };
        let set = doc! {
            "status": OperStatus::Reverted.as_i32(),
            "operation": "ERROR",
            "operId": Bson::Null,
            "params": doc! {
                "hash": &raw.hash,
                "blockNumber": raw.block_number,
                "sender": &raw.from,
                "recipient": &raw.from,
                "createdAt": raw.created_at,
                "lastUpdatedAt": bson::DateTime::now(),
            },
            "contract": contract,
            "from": &raw.from,
            "to": raw.to.as_deref().map_or(Bson::Null, Bson::from),
            "blockNumber": raw.block_number,
            "hash": &raw.hash,
            "gas": raw.gas,
            "gasPrice": &raw.gas_price,
            "gasUsed": raw.gas_used,
            "gasFeeNative": util::gas_fee_native(raw.gas_used as u64, &gas_price),
            "createdAt": raw.created_at,
            "lastUpdatedAt": bson::DateTime::now(),
            "confirmationTime": Bson::Null,
            "last_block_indexed": raw.block_number,
        };
        self.store.upsert(OPERATIONS, key, set, doc! {}).await?;
        info!(target: LOG_TARGET, "Tx (REVERT) against {contract}, hash {}", raw.hash);
        Ok(())
    }
}

/// Flattens an execution settlement event into `(kind, operId, snapshot)`.
///
/// The snapshot is the decoded field set with amounts as decimal strings,
/// addresses lowercased, and token-pegging indexes resolved by position.
pub fn execution_snapshot(
    registry: &ContractRegistry,
    event: &ExecutionEvent,
) -> (OperationKind, U256, Document) {
    let tp_index = |addr| bson_index(registry.tp_index(addr));
    match event {
        ExecutionEvent::TCMinted(e) => (
            OperationKind::TCMint,
            e.operId_,
            doc! {
                "sender": util::addr_lower(&e.sender_),
                "recipient": util::addr_lower(&e.recipient_),
                "qTC": e.qTC_.to_string(),
                "qAC": e.qAC_.to_string(),
                "qACfee": e.qACfee_.to_string(),
                "qFeeToken": e.qFeeToken_.to_string(),
                "qACVendorMarkup": e.qACVendorMarkup_.to_string(),
                "qFeeTokenVendorMarkup": e.qFeeTokenVendorMarkup_.to_string(),
                "vendor": bson_addr(&e.vendor_),
            },
        ),
        ExecutionEvent::TCRedeemed(e) => (
            OperationKind::TCRedeem,
            e.operId_,
            doc! {
                "sender": util::addr_lower(&e.sender_),
                "recipient": util::addr_lower(&e.recipient_),
                "qTC": e.qTC_.to_string(),
                "qAC": e.qAC_.to_string(),
                "qACfee": e.qACfee_.to_string(),
                "qFeeToken": e.qFeeToken_.to_string(),
                "qACVendorMarkup": e.qACVendorMarkup_.to_string(),
                "qFeeTokenVendorMarkup": e.qFeeTokenVendorMarkup_.to_string(),
                "vendor": bson_addr(&e.vendor_),
            },
        ),
        ExecutionEvent::TPMinted(e) => (
            OperationKind::TPMint,
            e.operId_,
            doc! {
                "tp": util::addr_lower(&e.tp_),
                "tpIndex": tp_index(&e.tp_),
                "sender": util::addr_lower(&e.sender_),
                "recipient": util::addr_lower(&e.recipient_),
                "qTP": e.qTP_.to_string(),
                "qAC": e.qAC_.to_string(),
                "qACfee": e.qACfee_.to_string(),
                "qFeeToken": e.qFeeToken_.to_string(),
                "qACVendorMarkup": e.qACVendorMarkup_.to_string(),
                "qFeeTokenVendorMarkup": e.qFeeTokenVendorMarkup_.to_string(),
                "vendor": bson_addr(&e.vendor_),
            },
        ),
        ExecutionEvent::TPRedeemed(e) => (
            OperationKind::TPRedeem,
            e.operId_,
            doc! {
                "tp": util::addr_lower(&e.tp_),
                "tpIndex": tp_index(&e.tp_),
                "sender": util::addr_lower(&e.sender_),
                "recipient": util::addr_lower(&e.recipient_),
                "qTP": e.qTP_.to_string(),
                "qAC": e.qAC_.to_string(),
                "qACfee": e.qACfee_.to_string(),
                "qFeeToken": e.qFeeToken_.to_string(),
                "qACVendorMarkup": e.qACVendorMarkup_.to_string(),
                "qFeeTokenVendorMarkup": e.qFeeTokenVendorMarkup_.to_string(),
                "vendor": bson_addr(&e.vendor_),
            },
        ),
        ExecutionEvent::TCandTPMinted(e) => (
            OperationKind::TCandTPMint,
            e.operId_,
            doc! {
                "tp": util::addr_lower(&e.tp_),
                "tpIndex": tp_index(&e.tp_),
                "sender": util::addr_lower(&e.sender_),
                "recipient": util::addr_lower(&e.recipient_),
                "qTC": e.qTC_.to_string(),
                "qTP": e.qTP_.to_string(),
                "qAC": e.qAC_.to_string(),
                "qACfee": e.qACfee_.to_string(),
                "qFeeToken": e.qFeeToken_.to_string(),
                "qACVendorMarkup": e.qACVendorMarkup_.to_string(),
                "qFeeTokenVendorMarkup": e.qFeeTokenVendorMarkup_.to_string(),
                "vendor": bson_addr(&e.vendor_),
            },
        ),
        ExecutionEvent::TCandTPRedeemed(e) => (
            OperationKind::TCandTPRedeem,
            e.operId_,
            doc! {
                "tp": util::addr_lower(&e.tp_),
                "tpIndex": tp_index(&e.tp_),
                "sender": util::addr_lower(&e.sender_),
                "recipient": util::addr_lower(&e.recipient_),
                "qTC": e.qTC_.to_string(),
                "qTP": e.qTP_.to_string(),
                "qAC": e.qAC_.to_string(),
                "qACfee": e.qACfee_.to_string(),
                "qFeeToken": e.qFeeToken_.to_string(),
                "qACVendorMarkup": e.qACVendorMarkup_.to_string(),
                "qFeeTokenVendorMarkup": e.qFeeTokenVendorMarkup_.to_string(),
                "vendor": bson_addr(&e.vendor_),
            },
        ),
        ExecutionEvent::TCSwappedForTP(e) => (
            OperationKind::TCSwapForTP,
            e.operId_,
            doc! {
                "tp": util::addr_lower(&e.tp_),
                "tpIndex": tp_index(&e.tp_),
                "sender": util::addr_lower(&e.sender_),
                "recipient": util::addr_lower(&e.recipient_),
                "qTC": e.qTC_.to_string(),
                "qTP": e.qTP_.to_string(),
                "qACfee": e.qACfee_.to_string(),
                "qFeeToken": e.qFeeToken_.to_string(),
                "qACVendorMarkup": e.qACVendorMarkup_.to_string(),
                "qFeeTokenVendorMarkup": e.qFeeTokenVendorMarkup_.to_string(),
                "vendor": bson_addr(&e.vendor_),
            },
        ),
        ExecutionEvent::TPSwappedForTC(e) => (
            OperationKind::TPSwapForTC,
            e.operId_,
            doc! {
                "tp": util::addr_lower(&e.tp_),
                "tpIndex": tp_index(&e.tp_),
                "sender": util::addr_lower(&e.sender_),
                "recipient": util::addr_lower(&e.recipient_),
                "qTC": e.qTC_.to_string(),
                "qTP": e.qTP_.to_string(),
                "qACfee": e.qACfee_.to_string(),
                "qFeeToken": e.qFeeToken_.to_string(),
                "qACVendorMarkup": e.qACVendorMarkup_.to_string(),
                "qFeeTokenVendorMarkup": e.qFeeTokenVendorMarkup_.to_string(),
                "vendor": bson_addr(&e.vendor_),
            },
        ),
        ExecutionEvent::TPSwappedForTP(e) => (
            OperationKind::TPSwapForTP,
            e.operId_,
            doc! {
                "tpFrom": util::addr_lower(&e.tpFrom_),
                "tpFromIndex": tp_index(&e.tpFrom_),
                "tpTo": util::addr_lower(&e.tpTo_),
                "tpToIndex": tp_index(&e.tpTo_),
                "sender": util::addr_lower(&e.sender_),
                "recipient": util::addr_lower(&e.recipient_),
                "qTPfrom": e.qTPfrom_.to_string(),
                "qTPto": e.qTPto_.to_string(),
                "qACfee": e.qACfee_.to_string(),
                "qFeeToken": e.qFeeToken_.to_string(),
                "qACVendorMarkup": e.qACVendorMarkup_.to_string(),
                "qFeeTokenVendorMarkup": e.qFeeTokenVendorMarkup_.to_string(),
                "vendor": bson_addr(&e.vendor_),
            },
        ),
    }
}

fn bson_addr(address: &alloy_primitives::Address) -> Bson {
    util::nonzero_lower(address).map_or(Bson::Null, Bson::String)
}

fn bson_index(index: Option<usize>) -> Bson {
    index.map_or(Bson::Null, |i| Bson::Int64(i as i64))
}
