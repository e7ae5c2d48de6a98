//! Small shared helpers: address normalization and gas accounting.

use alloy_primitives::{Address, B256, U256};

/// Lowercase `0x`-prefixed hex form of an address. Used for every stored
/// address key and comparison.
pub fn addr_lower(address: &Address) -> String {
    format!("{address:#x}")
}

/// EIP-55 checksummed form of an address. Display only.
pub fn addr_checksum(address: &Address) -> String {
    address.to_checksum(None)
}

/// Lowercase hex form of a 32-byte hash.
pub fn hash_lower(hash: &B256) -> String {
    format!("{hash:#x}")
}

/// Lowercase form of a non-zero address, `None` for the zero sentinel.
///
/// Event and queue-getter fields use the all-zero address as "not set"
/// (e.g. operations queued without a vendor).
pub fn nonzero_lower(address: &Address) -> Option<String> {
    (!address.is_zero()).then(|| addr_lower(address))
}

/// Parses an address that may arrive zero-padded to 32 bytes
/// (`0x000000000000000000000000<20 bytes>`), as some decoded event fields
/// do. The all-zero address yields `Ok(None)`.
pub fn sanitize_address(raw: &str) -> Result<Option<Address>, AddressParseError> {
    let hex = raw.strip_prefix("0x000000000000000000000000").unwrap_or(raw);
    let address =
        hex.to_lowercase().parse::<Address>().map_err(|_| AddressParseError(raw.to_string()))?;
    Ok((!address.is_zero()).then_some(address))
}

/// A string that does not parse to a 20-byte address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address `{0}`")]
pub struct AddressParseError(pub String);

/// Gas fee in native units: `gasUsed × gasPrice`, integer arithmetic only.
///
/// The wei product already is the 18-decimal fixed-point native value;
/// persisted as a decimal string.
pub fn gas_fee_native(gas_used: u64, gas_price: &U256) -> String {
    (U256::from(gas_used) * gas_price).to_string()
}

/// BSON datetime from a block timestamp in seconds since the epoch.
pub fn datetime_from_secs(secs: u64) -> bson::DateTime {
    bson::DateTime::from_millis(secs as i64 * 1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn lowercase_and_checksum_forms() {
        let addr = address!("fb6916095ca1df60bb79ce92ce3ea74c37c5d359");
        assert_eq!(addr_lower(&addr), "0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359");
        assert_eq!(addr_checksum(&addr), "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359");
    }

    #[test]
    fn sanitize_trims_32_byte_padding() {
        let padded = "0x000000000000000000000000fb6916095ca1df60bb79ce92ce3ea74c37c5d359";
        let addr = sanitize_address(padded).unwrap().unwrap();
        assert_eq!(addr, address!("fb6916095ca1df60bb79ce92ce3ea74c37c5d359"));
    }

    #[test]
    fn sanitize_accepts_plain_addresses() {
        let addr = sanitize_address("0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359").unwrap().unwrap();
        assert_eq!(addr, address!("fb6916095ca1df60bb79ce92ce3ea74c37c5d359"));
    }

    #[test]
    fn sanitize_rejects_garbage_and_nulls_zero() {
        assert!(sanitize_address("0x1234").is_err());
        let zero = "0x0000000000000000000000000000000000000000";
        assert_eq!(sanitize_address(zero).unwrap(), None);
        let padded_zero =
            "0x0000000000000000000000000000000000000000000000000000000000000000";
        assert_eq!(sanitize_address(padded_zero).unwrap(), None);
    }

    #[test]
    fn gas_fee_is_the_wei_product() {
        assert_eq!(gas_fee_native(21_000, &U256::from(65_000_000u64)), "1365000000000");
        assert_eq!(gas_fee_native(0, &U256::from(1u64)), "0");
    }
}
