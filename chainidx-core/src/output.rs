use std::fmt;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::condition::SpendCondition;
use crate::currency::Currency;

/// Identifier of a coin output: unique across the chain's lifetime.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoinOutputId([u8; 32]);

impl CoinOutputId {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| anyhow!("invalid coin output id hex: {e}"))?;
        if bytes.len() != 32 {
            return Err(anyhow!("invalid coin output id length"));
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl fmt::Debug for CoinOutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CoinOutputId({})", self.to_hex())
    }
}

impl fmt::Display for CoinOutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// `(id, value, condition)`: the atomic unit of value in the UTXO model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinOutput {
    pub id: CoinOutputId,
    pub value: Currency,
    pub condition: SpendCondition,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;

    #[test]
    fn id_hex_roundtrip() {
        let id = CoinOutputId::from_bytes([7u8; 32]);
        let hex = id.to_hex();
        assert_eq!(CoinOutputId::from_hex(&hex).unwrap(), id);
    }

    #[test]
    fn output_json_roundtrip() {
        let output = CoinOutput {
            id: CoinOutputId::from_bytes([1u8; 32]),
            value: Currency::from_u64(42),
            condition: SpendCondition::UnlockHash(Address::derive_from(b"payee")),
        };
        let json = serde_json::to_string(&output).unwrap();
        let back: CoinOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, output.id);
        assert_eq!(back.value, output.value);
    }
}
