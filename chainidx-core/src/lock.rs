use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::currency::Currency;
use crate::output::CoinOutputId;

pub use crate::condition::LockKind;

/// A coin output sitting in the Lock Index, not yet mature.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedOutputRecord {
    pub coin_output_id: CoinOutputId,
    pub address: Address,
    pub value: Currency,
    pub unlock_point: u64,
    pub lock_kind: LockKind,
}
