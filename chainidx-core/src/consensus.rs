use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::currency::Currency;
use crate::output::{CoinOutput, CoinOutputId};

/// Stable identifier of a [`ConsensusChange`], opaque to this crate.
///
/// Consensus engines mint these however they like (a block hash, a cursor,
/// a sequence number rendered as text); the projection engine only ever
/// stores and compares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(pub String);

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reward output minted by a block, outside of any transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerPayout {
    pub id: CoinOutputId,
    pub address: Address,
    pub value: Currency,
}

/// A coin input as the consensus engine resolves it: the spent output's id
/// together with the address and value it carried, so a revert can restore
/// the reverse index without re-querying chain data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinInput {
    pub parent_id: CoinOutputId,
    pub parent_address: Address,
    pub parent_value: Currency,
}

/// A transaction as it appears inside an applied or reverted block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub coin_inputs: Vec<CoinInput>,
    pub coin_outputs: Vec<CoinOutput>,
    /// Number of block-stake outputs the transaction produced; tracked only
    /// to classify "value transactions" for statistics.
    pub block_stake_output_count: u32,
}

impl Transaction {
    /// A transaction with ≥1 coin input or >1 block-stake outputs.
    pub fn is_value_transaction(&self) -> bool {
        !self.coin_inputs.is_empty() || self.block_stake_output_count > 1
    }
}

/// One block's worth of effects, either being applied or reverted.
///
/// `parent_id` is `None` exactly for the genesis block; every other block
/// has a parent and therefore advances `blockHeight` by one. `parent_timestamp`
/// carries the parent block's timestamp directly (analogous to `CoinInput`'s
/// `parent_address`/`parent_value`), so a revert can restore the post-revert
/// tip's timestamp without looking anything up elsewhere; `None` for genesis,
/// where there is no parent tip to restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockEffects {
    pub parent_id: Option<[u8; 32]>,
    pub parent_timestamp: Option<u64>,
    pub timestamp: u64,
    pub miner_payouts: Vec<MinerPayout>,
    pub transactions: Vec<Transaction>,
}

impl BlockEffects {
    pub fn is_genesis(&self) -> bool {
        self.parent_id.is_none()
    }
}

pub type AppliedBlock = BlockEffects;
pub type RevertedBlock = BlockEffects;

/// An atomic, ordered unit the consensus engine emits: potentially several
/// reverts and applies in one go (e.g. a reorg).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusChange {
    pub id: ChangeId,
    pub reverted: Vec<RevertedBlock>,
    pub applied: Vec<AppliedBlock>,
}
