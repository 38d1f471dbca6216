use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Width of an [`Address`] in bytes: a 32-byte unlock hash plus nothing else.
pub const ADDRESS_LEN: usize = 32;

/// How many leading hex digits of an address form its bucket prefix.
///
/// The prefix is used as a sharding key for anything that wants to fan an
/// address space out across buckets without hashing (the datastore key
/// schema itself does not use it, but callers building higher-level indices
/// do).
pub const ADDRESS_BUCKET_HEX_DIGITS: usize = 6;

/// An opaque, fixed-width unlock hash identifying a payable target.
///
/// Rendered textually as lowercase hex. Equality and hashing operate on the
/// raw bytes, never on the string form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Derive an address from arbitrary preimage bytes (e.g. a public key, or
    /// the canonical encoding of a multisig condition).
    pub fn derive_from(preimage: &[u8]) -> Self {
        let digest = blake3::hash(preimage);
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(digest.as_bytes());
        Self(out)
    }

    /// The hex bucket key: the first [`ADDRESS_BUCKET_HEX_DIGITS`] hex digits
    /// of the textual rendering.
    pub fn bucket_prefix(&self) -> String {
        let full = self.to_hex();
        full[..ADDRESS_BUCKET_HEX_DIGITS].to_string()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| anyhow!("invalid address hex: {e}"))?;
        if bytes.len() != ADDRESS_LEN {
            return Err(anyhow!(
                "invalid address length: expected {ADDRESS_LEN} bytes, got {}",
                bytes.len()
            ));
        }
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let addr = Address::derive_from(b"owner-one");
        let hex = addr.to_hex();
        assert_eq!(hex.len(), ADDRESS_LEN * 2);
        assert_eq!(Address::from_hex(&hex).unwrap(), addr);
    }

    #[test]
    fn bucket_prefix_is_leading_digits() {
        let addr = Address::derive_from(b"bucket-me");
        assert_eq!(addr.bucket_prefix(), addr.to_hex()[..6]);
    }

    #[test]
    fn json_roundtrip() {
        let addr = Address::derive_from(b"json-me");
        let json = serde_json::to_string(&addr).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Address::from_hex("abcd").is_err());
    }
}
