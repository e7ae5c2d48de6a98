//! Store collection names. Load-bearing: downstream consumers read these
//! collections directly.

/// Raw filtered transactions with receipts.
pub const RAW_TRANSACTIONS: &str = "raw_transactions";
/// The normalized operations ledger.
pub const OPERATIONS: &str = "operations";
/// The single-document pipeline checkpoint.
pub const INDEXER_STATE: &str = "indexer_state";
/// Peg-out transfer lifecycle records.
pub const FAST_BTC_BRIDGE: &str = "FastBtcBridge";

/// The audit collection for one `(module, event)` pair.
pub fn event_collection(module: &str, event: &str) -> String {
    format!("event_{module}_{event}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_collection_names() {
        assert_eq!(event_collection("MocQueue", "TCMinted"), "event_MocQueue_TCMinted");
        assert_eq!(event_collection("Token", "Transfer"), "event_Token_Transfer");
    }
}
