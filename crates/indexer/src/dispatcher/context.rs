//! Per-transaction dispatch context.

use crate::{types::RawTxDoc, util};
use alloy_primitives::U256;
use bson::{doc, Document};

/// The context a handler receives alongside the decoded event fields.
#[derive(Debug)]
pub struct TxContext<'a> {
    /// The raw transaction record being dispatched.
    pub raw: &'a RawTxDoc,
    /// Position of the current log within its block.
    pub log_index: i64,
}

impl TxContext<'_> {
    /// Gas fee in 18-decimal native units, integer arithmetic only.
    pub fn gas_fee_native(&self) -> String {
        let gas_price = self.raw.gas_price.parse::<U256>().unwrap_or(U256::ZERO);
        util::gas_fee_native(self.raw.gas_used as u64, &gas_price)
    }

    /// The gas accounting fields shared by every `operations` write.
    pub fn gas_fields(&self) -> Document {
        doc! {
            "gas": self.raw.gas,
            "gasPrice": &self.raw.gas_price,
            "gasUsed": self.raw.gas_used,
            "gasFeeNative": self.gas_fee_native(),
        }
    }

    /// The base fields shared by every audit record.
    pub fn audit_fields(&self) -> Document {
        doc! {
            "blockNumber": self.raw.block_number,
            "hash": &self.raw.hash,
            "logIndex": self.log_index,
            "createdAt": self.raw.created_at,
            "lastUpdatedAt": bson::DateTime::now(),
        }
    }
}
