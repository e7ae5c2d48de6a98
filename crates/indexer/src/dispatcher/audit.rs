//! Per-event audit collections.
//!
//! Every handled event leaves a verbatim decoded snapshot in
//! `event_<Module>_<EventName>`, keyed by `(hash, logIndex)`. The pipeline
//! never reads these back; they exist for downstream audit.

use crate::{
    abi::{BridgeEvent, MocEvent, MocQueueEvent, OmocEvent, ProtocolEvent},
    collections::event_collection,
    dispatcher::{context::TxContext, operations},
    errors::StoreError,
    registry::{Binding, ContractRegistry},
    traits::DocStore,
    util,
};
use bson::{doc, Document};

/// Upserts one audit record.
pub async fn record<S: DocStore + ?Sized>(
    store: &S,
    module: &str,
    event: &str,
    ctx: &TxContext<'_>,
    fields: Document,
) -> Result<(), StoreError> {
    let collection = event_collection(module, event);
    let key = doc! { "hash": &ctx.raw.hash, "logIndex": ctx.log_index };
    let mut set = ctx.audit_fields();
    set.extend(fields);
    store.upsert(&collection, key, set, doc! {}).await
}

/// The verbatim decoded field snapshot of an event.
pub fn snapshot_fields(
    registry: &ContractRegistry,
    binding: &Binding,
    event: &ProtocolEvent,
) -> Document {
    match event {
        ProtocolEvent::Moc(e) => match e {
            MocEvent::LiqTPRedeemed(e) => doc! {
                "tp": util::addr_lower(&e.tp_),
                "sender": util::addr_lower(&e.sender_),
                "recipient": util::addr_lower(&e.recipient_),
                "qTP": e.qTP_.to_string(),
                "qAC": e.qAC_.to_string(),
            },
            MocEvent::SuccessFeeDistributed(e) => doc! {
                "mocGain": e.mocGain_.to_string(),
                "tpGain": e.tpGain_.iter().map(|g| g.to_string()).collect::<Vec<_>>(),
            },
            MocEvent::SettlementExecuted(_) => doc! {},
            MocEvent::TCInterestPayment(e) => doc! {
                "interestAmount": e.interestAmount_.to_string(),
            },
            MocEvent::TPemaUpdated(e) => doc! {
                "i": e.i_.to_string(),
                "oldTPema": e.oldTPema_.to_string(),
                "newTPema": e.newTPema_.to_string(),
            },
        },
        ProtocolEvent::MocQueue(e) => match e {
            MocQueueEvent::OperationQueued(e) => doc! {
                "operId": e.operId_.to_string(),
                "bucket": util::addr_lower(&e.bucket_),
                "operType": e.operType_ as i32,
            },
            MocQueueEvent::OperationExecuted(e) => doc! {
                "operId": e.operId_.to_string(),
                "executor": util::addr_lower(&e.executor),
            },
            MocQueueEvent::OperationError(e) => doc! {
                "operId": e.operId_.to_string(),
                "errorCode": format!("{:#x}", e.errorCode_),
                "msg": &e.msg_,
            },
            MocQueueEvent::UnhandledError(e) => doc! {
                "operId": e.operId_.to_string(),
                "reason": alloy_primitives::hex::encode_prefixed(&e.reason_),
            },
            MocQueueEvent::Execution(exec) => {
                let (_, oper_id, mut snapshot) = operations::execution_snapshot(registry, exec);
                snapshot.insert("operId", oper_id.to_string());
                snapshot
            }
        },
        ProtocolEvent::Token(e) => doc! {
            "token": binding.token.map_or_else(String::new, |t| t.to_string()),
            "from": util::addr_lower(&e.from),
            "to": util::addr_lower(&e.to),
            "value": e.value.to_string(),
        },
        ProtocolEvent::FastBtcBridge(e) => match e {
            BridgeEvent::NewBitcoinTransfer(e) => doc! {
                "transferId": util::hash_lower(&e.transferId),
                "btcAddress": &e.btcAddress,
                "nonce": e.nonce.to_string(),
                "amountSatoshi": e.amountSatoshi.to_string(),
                "feeSatoshi": e.feeSatoshi.to_string(),
                "rskAddress": util::addr_checksum(&e.rskAddress),
            },
            BridgeEvent::BitcoinTransferStatusUpdated(e) => doc! {
                "transferId": util::hash_lower(&e.transferId),
                "newStatus": e.newStatus as i32,
            },
        },
        ProtocolEvent::Omoc(e) => match e {
            OmocEvent::ClaimOK(e) => doc! {
                "origin": util::addr_lower(&e.origin),
                "destination": util::addr_lower(&e.destination),
                "amount": e.amount.to_string(),
            },
            OmocEvent::VestingCreated(e) => doc! {
                "vesting": util::addr_lower(&e.vesting),
                "holder": util::addr_lower(&e.holder),
            },
            OmocEvent::PaymentCancel(e) => doc! {
                "id": e.id.to_string(),
                "source": util::addr_lower(&e.source),
                "destination": util::addr_lower(&e.destination),
                "amount": e.amount.to_string(),
            },
            OmocEvent::PaymentDeposit(e) => doc! {
                "id": e.id.to_string(),
                "source": util::addr_lower(&e.source),
                "destination": util::addr_lower(&e.destination),
                "amount": e.amount.to_string(),
                "expiration": e.expiration.to_string(),
            },
            OmocEvent::PaymentWithdraw(e) => doc! {
                "id": e.id.to_string(),
                "source": util::addr_lower(&e.source),
                "destination": util::addr_lower(&e.destination),
                "amount": e.amount.to_string(),
            },
            OmocEvent::AddStake(e) => doc! {
                "user": util::addr_lower(&e.user),
                "subaccount": util::addr_lower(&e.subaccount),
                "sender": util::addr_lower(&e.sender),
                "amount": e.amount.to_string(),
                "mocs": e.mocs.to_string(),
            },
            OmocEvent::CancelEarnings(e) => doc! {
                "earnings": e.earnings.to_string(),
                "start": e.start.to_string(),
                "end": e.end.to_string(),
            },
            OmocEvent::PayEarnings(e) => doc! {
                "earnings": e.earnings.to_string(),
                "start": e.start.to_string(),
                "end": e.end.to_string(),
            },
            OmocEvent::Withdraw(e) => doc! {
                "msgSender": util::addr_lower(&e.msgSender),
                "subaccount": util::addr_lower(&e.subaccount),
                "receiver": util::addr_lower(&e.receiver),
                "mocs": e.mocs.to_string(),
                "blockNum": e.blockNum.to_string(),
            },
            OmocEvent::WithdrawStake(e) => doc! {
                "user": util::addr_lower(&e.user),
                "subaccount": util::addr_lower(&e.subaccount),
                "destination": util::addr_lower(&e.destination),
                "amount": e.amount.to_string(),
                "mocs": e.mocs.to_string(),
            },
            OmocEvent::VoteEvent(e) => doc! {
                "voter": util::addr_lower(&e.voter),
                "votingPower": e.votingPower.to_string(),
                "inFavor": e.inFavor,
            },
        },
    }
}
