//! Operation identifiers.

use alloy_primitives::U256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The integer handle the queue assigns to each user operation.
///
/// Persisted as an int64, but historical documents carry it as a decimal
/// string or a `0x`-prefixed hex string; both forms deserialize to the same
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperId(pub i64);

impl OperId {
    /// Parses a textual operation id, accepting decimal and `0x`-hex forms.
    pub fn parse(raw: &str) -> Result<Self, OperIdError> {
        let raw = raw.trim();
        let value = if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16).map_err(|_| OperIdError(raw.to_string()))?
        } else {
            raw.parse::<i64>().map_err(|_| OperIdError(raw.to_string()))?
        };
        Ok(Self(value))
    }

    /// Narrows a decoded `uint256` event field into an id.
    pub fn from_u256(value: U256) -> Result<Self, OperIdError> {
        i64::try_from(value).map(Self).map_err(|_| OperIdError(value.to_string()))
    }
}

impl fmt::Display for OperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for OperId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A value that cannot be interpreted as an operation id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid operation id `{0}`")]
pub struct OperIdError(pub String);

impl Serialize for OperId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for OperId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(OperIdVisitor)
    }
}

struct OperIdVisitor;

impl de::Visitor<'_> for OperIdVisitor {
    type Value = OperId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer, a decimal string or a 0x-hex string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<OperId, E> {
        Ok(OperId(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<OperId, E> {
        i64::try_from(v).map(OperId).map_err(|_| E::custom(OperIdError(v.to_string())))
    }

    fn visit_i32<E: de::Error>(self, v: i32) -> Result<OperId, E> {
        Ok(OperId(v.into()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<OperId, E> {
        OperId::parse(v).map_err(E::custom)
    }
}
