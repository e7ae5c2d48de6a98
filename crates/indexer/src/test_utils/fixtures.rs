//! Shared fixtures for pipeline tests.

use crate::{
    config::AddressesConfig,
    registry::ContractRegistry,
    types::{ChainLog, ChainReceipt, ChainTx, RawTxDoc},
    util,
};
use alloy_primitives::{address, Address, Bytes, B256, U256};
use alloy_sol_types::SolEvent;

/// A canonical protocol deployment used across tests.
pub fn test_addresses() -> AddressesConfig {
    AddressesConfig {
        multicall2: None,
        moc: address!("0123456789012345678901234567890123456789"),
        moc_queue: address!("1123456789012345678901234567890123456789"),
        tc: address!("2123456789012345678901234567890123456789"),
        tp: vec![
            address!("3123456789012345678901234567890123456789"),
            address!("3223456789012345678901234567890123456789"),
        ],
        ca: vec![address!("4123456789012345678901234567890123456789")],
        fee_token: Some(address!("5123456789012345678901234567890123456789")),
        fast_btc_bridge: Some(address!("6123456789012345678901234567890123456789")),
        i_registry: None,
        incentive_v2: None,
    }
}

/// A registry over [`test_addresses`], without OMOC resolution.
pub fn sample_registry() -> ContractRegistry {
    ContractRegistry::from_config(&test_addresses())
}

/// Builder for a transaction plus its receipt, insertable into the mock
/// provider or materializable as a `raw_transactions` document.
#[derive(Debug, Clone)]
pub struct TxFixture {
    /// The transaction body.
    pub tx: ChainTx,
    logs: Vec<(Address, alloy_primitives::LogData)>,
    success: bool,
    has_receipt: bool,
}

impl TxFixture {
    /// A transaction whose hash and sender derive from `seed`.
    pub fn new(seed: u8) -> Self {
        Self {
            tx: ChainTx {
                hash: B256::repeat_byte(seed),
                from: Address::repeat_byte(seed),
                to: None,
                value: U256::ZERO,
                gas: 100_000,
                gas_price: U256::from(65_000_000u64),
                input: Bytes::default(),
            },
            logs: Vec::new(),
            success: true,
            has_receipt: true,
        }
    }

    /// Sets the recipient.
    pub fn to(mut self, to: Address) -> Self {
        self.tx.to = Some(to);
        self
    }

    /// Sets the sender.
    pub fn sender(mut self, from: Address) -> Self {
        self.tx.from = from;
        self
    }

    /// Marks the receipt as EVM-reverted.
    pub fn reverted(mut self) -> Self {
        self.success = false;
        self
    }

    /// Withholds the receipt, simulating a transient RPC omission.
    pub fn without_receipt(mut self) -> Self {
        self.has_receipt = false;
        self
    }

    /// Appends an event log emitted by `address`.
    pub fn log_event(mut self, address: Address, event: &impl SolEvent) -> Self {
        self.logs.push((address, event.encode_log_data()));
        self
    }

    /// The receipt for inclusion at `(block_number, transaction_index)`,
    /// if one exists.
    pub fn receipt(&self, block_number: u64, transaction_index: u64) -> Option<ChainReceipt> {
        self.has_receipt.then(|| ChainReceipt {
            transaction_hash: self.tx.hash,
            block_number,
            block_hash: B256::with_last_byte(block_number as u8),
            transaction_index,
            success: self.success,
            gas_used: 80_000,
            effective_gas_price: self.tx.gas_price,
            logs: self
                .logs
                .iter()
                .enumerate()
                .map(|(i, (address, data))| ChainLog {
                    address: *address,
                    data: data.clone(),
                    log_index: transaction_index * 16 + i as u64,
                })
                .collect(),
        })
    }

    /// The transaction materialized as a `raw_transactions` document, the
    /// way the walker would have written it.
    pub fn raw_doc(&self, block_number: u64, block_ts: u64, head: u64) -> RawTxDoc {
        let receipt = self.receipt(block_number, 0).expect("fixture has a receipt");
        RawTxDoc::from_chain(&self.tx, &receipt, block_ts, head)
    }

    /// The lowercase hex form of the transaction hash.
    pub fn hash_hex(&self) -> String {
        util::hash_lower(&self.tx.hash)
    }
}
