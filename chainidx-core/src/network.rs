use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Which chain network the daemon is indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Standard,
    Testnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Testnet => "testnet",
        }
    }

    /// Chain-constant parameters that differ per network.
    pub fn params(&self) -> NetworkParams {
        match self {
            // Mirrors the maturity delays real UTXO chains use: a longer
            // window on the production network, a short one on testnet so
            // integration tests don't have to mine/apply hundreds of blocks.
            Self::Standard => NetworkParams { maturity_delay: 144 },
            Self::Testnet => NetworkParams { maturity_delay: 10 },
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Network {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "standard" => Ok(Self::Standard),
            "testnet" => Ok(Self::Testnet),
            other => Err(anyhow!("unknown network {other:?}, expected standard|testnet")),
        }
    }
}

/// Chain constants the Projection Engine needs that vary per [`Network`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParams {
    /// Number of blocks a miner payout remains locked after being mined.
    pub maturity_delay: u64,
}
