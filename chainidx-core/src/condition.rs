use serde::{Deserialize, Serialize};

use crate::address::Address;

/// The height/timestamp boundary below which an `unlockPoint` on a
/// [`SpendCondition::TimeLock`] is interpreted as a block height, and at or
/// above which it is interpreted as a Unix timestamp.
pub const LOCK_TIME_MIN_TIMESTAMP_VALUE: u64 = 500_000_000;

/// Which bucket a [`SpendCondition::TimeLock`]'s `unlockPoint` falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockKind {
    Height,
    Time,
}

pub fn classify_unlock_point(unlock_point: u64) -> LockKind {
    if unlock_point < LOCK_TIME_MIN_TIMESTAMP_VALUE {
        LockKind::Height
    } else {
        LockKind::Time
    }
}

/// A spend predicate, tagged by variant rather than dispatched virtually.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SpendCondition {
    UnlockHash(Address),
    MultiSignature {
        wallet: Address,
        owners: Vec<Address>,
        threshold: u64,
    },
    TimeLock {
        inner: Box<SpendCondition>,
        unlock_point: u64,
    },
}

impl SpendCondition {
    /// Build the `MultiSignature` variant, deriving the wallet address from
    /// the owner set and threshold so callers never have to keep the two in
    /// sync by hand.
    pub fn multisig(owners: Vec<Address>, threshold: u64) -> Self {
        let wallet = derive_multisig_address(&owners, threshold);
        Self::MultiSignature {
            wallet,
            owners,
            threshold,
        }
    }

    pub fn time_lock(inner: SpendCondition, unlock_point: u64) -> Self {
        Self::TimeLock {
            inner: Box::new(inner),
            unlock_point,
        }
    }

    /// Whether this condition's time/height predicate holds at the given
    /// evaluation point, independent of any signature check.
    pub fn fulfillable_at(&self, height: u64, timestamp: u64) -> bool {
        match self {
            Self::UnlockHash(_) | Self::MultiSignature { .. } => true,
            Self::TimeLock {
                inner,
                unlock_point,
            } => {
                let point_passed = match classify_unlock_point(*unlock_point) {
                    LockKind::Height => height >= *unlock_point,
                    LockKind::Time => timestamp >= *unlock_point,
                };
                point_passed && inner.fulfillable_at(height, timestamp)
            }
        }
    }

    /// The address that ultimately receives funds under this condition: the
    /// payee for `UnlockHash`, the wallet for `MultiSignature`, or whatever
    /// the wrapped condition resolves to for `TimeLock`.
    pub fn beneficiary(&self) -> Address {
        match self {
            Self::UnlockHash(addr) => *addr,
            Self::MultiSignature { wallet, .. } => *wallet,
            Self::TimeLock { inner, .. } => inner.beneficiary(),
        }
    }

    /// `Some((wallet, owners))` if this condition is, or wraps, a
    /// `MultiSignature` condition.
    pub fn multisig_owners(&self) -> Option<(Address, &[Address])> {
        match self {
            Self::UnlockHash(_) => None,
            Self::MultiSignature { wallet, owners, .. } => Some((*wallet, owners.as_slice())),
            Self::TimeLock { inner, .. } => inner.multisig_owners(),
        }
    }

    /// `Some((kind, unlockPoint))` if this is a top-level `TimeLock`.
    pub fn lock_point(&self) -> Option<(LockKind, u64)> {
        match self {
            Self::TimeLock { unlock_point, .. } => {
                Some((classify_unlock_point(*unlock_point), *unlock_point))
            }
            _ => None,
        }
    }
}

/// Derive a multisig wallet address the same way any other address is
/// derived: hash a canonical preimage of the condition's defining fields.
fn derive_multisig_address(owners: &[Address], threshold: u64) -> Address {
    let mut preimage = Vec::with_capacity(owners.len() * 32 + 8);
    preimage.extend_from_slice(&threshold.to_le_bytes());
    for owner in owners {
        preimage.extend_from_slice(owner.as_bytes());
    }
    Address::derive_from(&preimage)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(seed: &str) -> Address {
        Address::derive_from(seed.as_bytes())
    }

    #[test]
    fn unlock_hash_always_fulfillable() {
        let cond = SpendCondition::UnlockHash(addr("a"));
        assert!(cond.fulfillable_at(0, 0));
    }

    #[test]
    fn height_lock_below_threshold() {
        let cond = SpendCondition::time_lock(SpendCondition::UnlockHash(addr("a")), 100);
        assert!(!cond.fulfillable_at(99, u64::MAX));
        assert!(cond.fulfillable_at(100, 0));
        assert_eq!(cond.lock_point(), Some((LockKind::Height, 100)));
    }

    #[test]
    fn time_lock_above_threshold() {
        let cond = SpendCondition::time_lock(SpendCondition::UnlockHash(addr("a")), 2_000_000_000);
        assert!(!cond.fulfillable_at(u64::MAX, 1_999_999_999));
        assert!(cond.fulfillable_at(0, 2_000_000_000));
        assert_eq!(cond.lock_point(), Some((LockKind::Time, 2_000_000_000)));
    }

    #[test]
    fn multisig_wallet_is_derived_and_stable() {
        let owners = vec![addr("o1"), addr("o2")];
        let c1 = SpendCondition::multisig(owners.clone(), 2);
        let c2 = SpendCondition::multisig(owners, 2);
        assert_eq!(c1.beneficiary(), c2.beneficiary());
    }

    #[test]
    fn multisig_owners_surface_through_time_lock() {
        let owners = vec![addr("o1"), addr("o2")];
        let inner = SpendCondition::multisig(owners.clone(), 2);
        let wallet = inner.beneficiary();
        let wrapped = SpendCondition::time_lock(inner, 100);
        let (w, found) = wrapped.multisig_owners().unwrap();
        assert_eq!(w, wallet);
        assert_eq!(found, owners.as_slice());
    }
}
