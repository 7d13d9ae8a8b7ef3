//! JSON encodings for on-chain values.
//!
//! Addresses and hashes travel as `0x`-prefixed hex strings, big integers
//! as decimal strings. Integer inputs also accept `0x` hex or a bare JSON
//! number so payloads from older producers still decode.
//!
//! Use with `#[serde(with = "crate::wire::...")]`.

use alloy::primitives::{Address, B256, U256};
use serde::{de, Deserialize, Deserializer, Serializer};
use std::str::FromStr;

/// Parse a decimal or `0x` hex string into a `U256`.
pub fn parse_u256(s: &str) -> Result<U256, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex_digits) => U256::from_str_radix(hex_digits, 16),
        None => U256::from_str_radix(s, 10),
    };
    parsed.map_err(|e| format!("invalid integer {s:?}: {e}"))
}

/// Encode a hash as `0x`-prefixed lowercase hex.
pub fn encode_b256(value: &B256) -> String {
    format!("0x{}", hex::encode(value.as_slice()))
}

pub mod address {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_checksum(None))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::from_str(raw.trim()).map_err(de::Error::custom)
    }
}

pub mod b256 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &B256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode_b256(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<B256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        B256::from_str(raw.trim()).map_err(de::Error::custom)
    }
}

pub mod opt_b256 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<B256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&encode_b256(v)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<B256>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => B256::from_str(s).map(Some).map_err(de::Error::custom),
        }
    }
}

pub mod u256_dec {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => parse_u256(&s).map_err(de::Error::custom),
            Raw::Number(n) => Ok(U256::from(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "address")]
        user: Address,
        #[serde(with = "b256")]
        hash: B256,
        #[serde(with = "opt_b256", default)]
        tx_hash: Option<B256>,
        #[serde(with = "u256_dec")]
        amount: U256,
    }

    #[test]
    fn test_parse_u256_decimal_and_hex() {
        assert_eq!(parse_u256("1000").unwrap(), U256::from(1000u64));
        assert_eq!(parse_u256("0x3e8").unwrap(), U256::from(1000u64));
        assert!(parse_u256("12ab").is_err());
    }

    #[test]
    fn test_amount_encoded_as_decimal_string() {
        let sample = Sample {
            user: Address::repeat_byte(0x11),
            hash: B256::repeat_byte(0xab),
            tx_hash: None,
            amount: U256::from(10u64).pow(U256::from(18u64)),
        };
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["amount"], "1000000000000000000");
        assert_eq!(json["hash"], format!("0x{}", "ab".repeat(32)));
        assert!(json["tx_hash"].is_null());
    }

    #[test]
    fn test_accepts_numeric_amount_and_missing_tx_hash() {
        let json = format!(
            r#"{{"user":"0x{}","hash":"0x{}","amount":42}}"#,
            "11".repeat(20),
            "cd".repeat(32)
        );
        let sample: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(sample.amount, U256::from(42u64));
        assert_eq!(sample.tx_hash, None);
        assert_eq!(sample.user, Address::repeat_byte(0x11));
    }
}
