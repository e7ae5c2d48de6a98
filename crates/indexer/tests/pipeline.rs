//! End-to-end pipeline flow over the in-memory test doubles: walker →
//! dispatcher → status scanner, sharing one checkpoint.

use alloy_primitives::{Address, U256};
use alloy_sol_types::{SolCall, SolValue};
use bson::doc;
use stablescan_indexer::{
    abi::moc_queue,
    checkpoint,
    collections::{OPERATIONS, RAW_TRANSACTIONS},
    config::{ScanBlocksConfig, ScanStatusConfig},
    dispatcher::EventDispatcher,
    status_scan::StatusAdvancer,
    test_utils::{sample_registry, test_addresses, MemStore, TestNodeProvider, TxFixture},
    traits::DocStore,
    walker::BlockWalker,
};
use std::sync::Arc;

const USER: Address = Address::repeat_byte(0xAA);

struct Pipeline {
    provider: Arc<TestNodeProvider>,
    store: Arc<MemStore>,
    walker: BlockWalker<TestNodeProvider, MemStore>,
    dispatcher: EventDispatcher<TestNodeProvider, MemStore>,
    advancer: StatusAdvancer<TestNodeProvider, MemStore>,
}

fn pipeline() -> Pipeline {
    let provider = Arc::new(TestNodeProvider::default());
    let store = Arc::new(MemStore::default());
    let registry = Arc::new(sample_registry());
    let walker = BlockWalker::raw(
        provider.clone(),
        store.clone(),
        registry.clone(),
        &ScanBlocksConfig {
            from_block: 45,
            to_block: 0,
            blocks_recession: 5,
            max_blocks_to_process: 60,
        },
        false,
    );
    let dispatcher = EventDispatcher::new(provider.clone(), store.clone(), registry);
    let advancer = StatusAdvancer::new(
        provider.clone(),
        store.clone(),
        &ScanStatusConfig { confirm_blocks: 10, seconds_not_in_chain_error: 7200 },
    );
    Pipeline { provider, store, walker, dispatcher, advancer }
}

#[tokio::test]
async fn an_operation_flows_from_block_to_confirmation() {
    let pipeline = pipeline();
    let addresses = test_addresses();
    pipeline.provider.set_head(100);
    for number in 45..=95 {
        pipeline.provider.insert_empty_block(number, 1_700_000_000 + number * 30);
    }

    // Block 50 carries one queue transaction: queued and executed at once.
    let queued = moc_queue::OperationQueued {
        bucket_: addresses.moc,
        operId_: U256::from(7u64),
        operType_: 3,
    };
    let minted = moc_queue::TPMinted {
        tp_: addresses.tp[0],
        sender_: USER,
        recipient_: USER,
        qTP_: U256::from(1000u64),
        qAC_: U256::from(500u64),
        qACfee_: U256::from(1u64),
        qFeeToken_: U256::ZERO,
        qACVendorMarkup_: U256::ZERO,
        qFeeTokenVendorMarkup_: U256::ZERO,
        vendor_: Address::ZERO,
        operId_: U256::from(7u64),
    };
    let fixture = TxFixture::new(0x51)
        .sender(USER)
        .to(addresses.moc_queue)
        .log_event(addresses.moc_queue, &queued)
        .log_event(addresses.moc_queue, &minted);
    pipeline.provider.insert_block_with_txs(50, 1_700_001_500, vec![&fixture]);

    let params_call = moc_queue::operationsMintTPCall { operId_: U256::from(7u64) };
    let params_returns =
        (addresses.tp[0], U256::from(1000u64), U256::from(600u64), USER, USER, Address::ZERO)
            .abi_encode_params();
    pipeline.provider.insert_call(
        addresses.moc_queue,
        params_call.abi_encode().into(),
        params_returns.into(),
    );

    // Walk, dispatch, advance.
    pipeline.walker.tick().await.unwrap();
    pipeline.dispatcher.tick().await.unwrap();
    pipeline.advancer.tick().await.unwrap();

    let state = checkpoint::load(pipeline.store.as_ref()).await.unwrap();
    assert_eq!(state.last_raw_block, Some(95));
    assert_eq!(state.last_status_block, Some(95));

    let op = pipeline
        .store
        .find_one(OPERATIONS, doc! { "operId": 7_i64 }, None)
        .await
        .unwrap()
        .unwrap();
    // Block 50 is more than confirm_blocks below the walked head (95), so
    // the scanner already confirmed it.
    assert_eq!(op.get_i32("status").unwrap(), 2);
    assert!(op.get_datetime("confirmationTime").is_ok());
    assert_eq!(op.get_str("operation").unwrap(), "TPMint");
    assert_eq!(op.get_document("params").unwrap().get_i64("tpIndex").unwrap(), 0);
    assert_eq!(op.get_document("executed").unwrap().get_str("qTP").unwrap(), "1000");

    // Re-walking and re-dispatching the same range changes nothing.
    checkpoint::update(pipeline.store.as_ref(), doc! { "last_raw_block": 44_i64 }).await.unwrap();
    pipeline.walker.tick().await.unwrap();
    pipeline
        .store
        .update_one(
            RAW_TRANSACTIONS,
            doc! { "hash": fixture.hash_hex() },
            doc! { "processed": false },
        )
        .await
        .unwrap();
    pipeline.dispatcher.tick().await.unwrap();

    let after = pipeline
        .store
        .find_one(OPERATIONS, doc! { "operId": 7_i64 }, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.get_i32("status").unwrap(), 2);
    assert_eq!(
        op.get_document("executed").unwrap(),
        after.get_document("executed").unwrap()
    );
    assert_eq!(pipeline.store.len(RAW_TRANSACTIONS), 1);
}
