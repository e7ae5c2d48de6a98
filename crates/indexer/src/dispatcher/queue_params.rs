//! Queued request parameter fetch.
//!
//! `OperationQueued` does not carry the user's request; the per-kind
//! getters on the queue contract are read back with `eth_call`, keyed by
//! operation id, and flattened into the `params` document of the ledger.

use crate::{
    errors::ProviderError, registry::ContractRegistry, traits::NodeProvider,
    types::OperationKind, util,
};
use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use bson::{doc, Bson, Document};

use crate::abi::moc_queue::{
    operationsMintTCCall, operationsMintTCandTPCall, operationsMintTPCall,
    operationsRedeemTCCall, operationsRedeemTCandTPCall, operationsRedeemTPCall,
    operationsSwapTCforTPCall, operationsSwapTPforTCCall, operationsSwapTPforTPCall,
};

/// Fetches and flattens the queued request parameters for an operation.
pub async fn fetch_params<P: NodeProvider + ?Sized>(
    provider: &P,
    registry: &ContractRegistry,
    kind: OperationKind,
    oper_id: U256,
) -> Result<Document, ProviderError> {
    let queue = registry.moc_queue();
    let tp_index = |addr: &Address| {
        registry.tp_index(addr).map_or(Bson::Null, |i| Bson::Int64(i as i64))
    };

    let params = match kind {
        OperationKind::TCMint => {
            let ret = call(provider, queue, operationsMintTCCall { operId_: oper_id }).await?;
            doc! {
                "qTC": ret.qTC.to_string(),
                "qACmax": ret.qACmax.to_string(),
                "sender": bson_addr(&ret.sender),
                "recipient": bson_addr(&ret.recipient),
                "vendor": bson_addr(&ret.vendor),
            }
        }
        OperationKind::TCRedeem => {
            let ret = call(provider, queue, operationsRedeemTCCall { operId_: oper_id }).await?;
            doc! {
                "qTC": ret.qTC.to_string(),
                "qACmin": ret.qACmin.to_string(),
                "sender": bson_addr(&ret.sender),
                "recipient": bson_addr(&ret.recipient),
                "vendor": bson_addr(&ret.vendor),
            }
        }
        OperationKind::TPMint => {
            let ret = call(provider, queue, operationsMintTPCall { operId_: oper_id }).await?;
            doc! {
                "tp": util::addr_lower(&ret.tp),
                "tpIndex": tp_index(&ret.tp),
                "qTP": ret.qTP.to_string(),
                "qACmax": ret.qACmax.to_string(),
                "sender": bson_addr(&ret.sender),
                "recipient": bson_addr(&ret.recipient),
                "vendor": bson_addr(&ret.vendor),
            }
        }
        OperationKind::TPRedeem => {
            let ret = call(provider, queue, operationsRedeemTPCall { operId_: oper_id }).await?;
            doc! {
                "tp": util::addr_lower(&ret.tp),
                "tpIndex": tp_index(&ret.tp),
                "qTP": ret.qTP.to_string(),
                "qACmin": ret.qACmin.to_string(),
                "sender": bson_addr(&ret.sender),
                "recipient": bson_addr(&ret.recipient),
                "vendor": bson_addr(&ret.vendor),
            }
        }
        OperationKind::TCandTPMint => {
            let ret =
                call(provider, queue, operationsMintTCandTPCall { operId_: oper_id }).await?;
            doc! {
                "tp": util::addr_lower(&ret.tp),
                "tpIndex": tp_index(&ret.tp),
                "qTP": ret.qTP.to_string(),
                "qACmax": ret.qACmax.to_string(),
                "sender": bson_addr(&ret.sender),
                "recipient": bson_addr(&ret.recipient),
                "vendor": bson_addr(&ret.vendor),
            }
        }
        OperationKind::TCandTPRedeem => {
            let ret =
                call(provider, queue, operationsRedeemTCandTPCall { operId_: oper_id }).await?;
            doc! {
                "tp": util::addr_lower(&ret.tp),
                "tpIndex": tp_index(&ret.tp),
                "qTC": ret.qTC.to_string(),
                "qTP": ret.qTP.to_string(),
                "qACmin": ret.qACmin.to_string(),
                "sender": bson_addr(&ret.sender),
                "recipient": bson_addr(&ret.recipient),
                "vendor": bson_addr(&ret.vendor),
            }
        }
        OperationKind::TCSwapForTP => {
            let ret =
                call(provider, queue, operationsSwapTCforTPCall { operId_: oper_id }).await?;
            doc! {
                "tp": util::addr_lower(&ret.tp),
                "tpIndex": tp_index(&ret.tp),
                "qTC": ret.qTC.to_string(),
                "qTPmin": ret.qTPmin.to_string(),
                "qACmax": ret.qACmax.to_string(),
                "sender": bson_addr(&ret.sender),
                "recipient": bson_addr(&ret.recipient),
                "vendor": bson_addr(&ret.vendor),
            }
        }
        OperationKind::TPSwapForTC => {
            let ret =
                call(provider, queue, operationsSwapTPforTCCall { operId_: oper_id }).await?;
            doc! {
                "tp": util::addr_lower(&ret.tp),
                "tpIndex": tp_index(&ret.tp),
                "qTP": ret.qTP.to_string(),
                "qTCmin": ret.qTCmin.to_string(),
                "qACmax": ret.qACmax.to_string(),
                "sender": bson_addr(&ret.sender),
                "recipient": bson_addr(&ret.recipient),
                "vendor": bson_addr(&ret.vendor),
            }
        }
        OperationKind::TPSwapForTP => {
            let ret =
                call(provider, queue, operationsSwapTPforTPCall { operId_: oper_id }).await?;
            doc! {
                "tpFrom": util::addr_lower(&ret.tpFrom),
                "tpFromIndex": tp_index(&ret.tpFrom),
                "tpTo": util::addr_lower(&ret.tpTo),
                "tpToIndex": tp_index(&ret.tpTo),
                "qTP": ret.qTP.to_string(),
                "qTPmin": ret.qTPmin.to_string(),
                "qACmax": ret.qACmax.to_string(),
                "sender": bson_addr(&ret.sender),
                "recipient": bson_addr(&ret.recipient),
                "vendor": bson_addr(&ret.vendor),
            }
        }
    };
    Ok(params)
}

async fn call<P: NodeProvider + ?Sized, C: SolCall>(
    provider: &P,
    to: Address,
    call: C,
) -> Result<C::Return, ProviderError> {
    let returned = provider.call(to, call.abi_encode().into()).await?;
    C::abi_decode_returns(&returned)
        .map_err(|e| ProviderError::Call { to, reason: e.to_string() })
}

fn bson_addr(address: &Address) -> Bson {
    util::nonzero_lower(address).map_or(Bson::Null, Bson::String)
}
