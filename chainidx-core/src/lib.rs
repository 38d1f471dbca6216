//! Shared domain types for the chain explorer: addresses, currency, spend
//! conditions, consensus-change wire types, and the projection's error type.
//!
//! Nothing in this crate talks to a datastore or a consensus engine; it only
//! defines the vocabulary the other `chainidx-*` crates share.

pub mod address;
pub mod balance;
pub mod condition;
pub mod consensus;
pub mod currency;
pub mod error;
pub mod lock;
pub mod network;
pub mod output;
pub mod stats;
pub mod state;

pub use address::{Address, ADDRESS_BUCKET_HEX_DIGITS, ADDRESS_LEN};
pub use balance::Balance;
pub use condition::{classify_unlock_point, LockKind, SpendCondition, LOCK_TIME_MIN_TIMESTAMP_VALUE};
pub use consensus::{
    AppliedBlock, BlockEffects, ChangeId, CoinInput, ConsensusChange, MinerPayout, RevertedBlock,
    Transaction,
};
pub use currency::Currency;
pub use error::ProjectionError;
pub use lock::LockedOutputRecord;
pub use network::{Network, NetworkParams};
pub use output::{CoinOutput, CoinOutputId};
pub use state::ExplorerState;
pub use stats::GlobalStats;
