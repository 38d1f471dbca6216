use serde::{Deserialize, Serialize};

use crate::currency::Currency;

/// Chain-wide counters the projection maintains as a single JSON record.
///
/// Written as the engine's freshly-recomputed absolute values after each
/// consensus change rather than as incremental deltas, so a crash between
/// writes self-heals on the next successful pass instead of double-counting
/// (see the durability notes on the projection engine).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalStats {
    pub timestamp: u64,
    pub block_height: u64,
    pub tx_count: u64,
    pub value_tx_count: u64,
    pub coin_output_count: u64,
    pub coin_input_count: u64,
    pub miner_payout_count: u64,
    pub miner_payouts: Currency,
    pub coins: Currency,
}
