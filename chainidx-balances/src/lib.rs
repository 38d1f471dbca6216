//! The Balance Tracker: per-address locked/unlocked balances, the global
//! address set, and bidirectional multisig ownership links.
//!
//! The tracker knows nothing about coin outputs, only about amounts and
//! addresses — the caller (the Lock Index or the Projection Engine) is
//! responsible for looking up what to credit or debit.

use std::sync::Arc;

use chainidx_core::{Address, Balance, Currency, ProjectionError};
use chainidx_datastore::{Datastore, JsonDatastoreExt, KeySchema};
use tracing::trace;

pub struct BalanceTracker<D> {
    store: Arc<D>,
    keys: KeySchema,
}

impl<D> Clone for BalanceTracker<D> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            keys: self.keys.clone(),
        }
    }
}

impl<D: Datastore> BalanceTracker<D> {
    pub fn new(store: Arc<D>, keys: KeySchema) -> Self {
        Self { store, keys }
    }

    pub async fn balance(&self, addr: &Address) -> Result<Balance, ProjectionError> {
        self.store.get_json(&self.keys.balance(addr)).await
    }

    /// Returns every address the tracker has ever recorded. Append-only: a
    /// full revert never removes an entry.
    pub async fn all_addresses(&self) -> Result<Vec<Address>, ProjectionError> {
        let raw = self
            .store
            .set_members(&self.keys.addresses())
            .await
            .map_err(ProjectionError::Transient)?;
        raw.iter()
            .map(|hex| Address::from_hex(hex).map_err(ProjectionError::Codec))
            .collect()
    }

    pub async fn record_address(&self, addr: &Address) -> Result<(), ProjectionError> {
        self.store
            .set_add(&self.keys.addresses(), &addr.to_hex())
            .await
            .map_err(ProjectionError::Transient)
    }

    pub async fn credit_unlocked(&self, addr: &Address, amount: &Currency) -> Result<(), ProjectionError> {
        let mut balance = self.balance(addr).await?;
        balance.unlocked = balance.unlocked.checked_add(amount);
        self.store.set_json(&self.keys.balance(addr), &balance).await
    }

    pub async fn debit_unlocked(&self, addr: &Address, amount: &Currency) -> Result<(), ProjectionError> {
        let mut balance = self.balance(addr).await?;
        balance.unlocked = balance.unlocked.checked_sub(amount).ok_or_else(|| {
            ProjectionError::Invariant(format!(
                "unlocked debit of {amount} would go negative for {addr}"
            ))
        })?;
        self.store.set_json(&self.keys.balance(addr), &balance).await
    }

    pub async fn credit_locked(&self, addr: &Address, amount: &Currency) -> Result<(), ProjectionError> {
        let mut balance = self.balance(addr).await?;
        balance.locked = balance.locked.checked_add(amount);
        self.store.set_json(&self.keys.balance(addr), &balance).await
    }

    pub async fn debit_locked(&self, addr: &Address, amount: &Currency) -> Result<(), ProjectionError> {
        let mut balance = self.balance(addr).await?;
        balance.locked = balance.locked.checked_sub(amount).ok_or_else(|| {
            ProjectionError::Invariant(format!(
                "locked debit of {amount} would go negative for {addr}"
            ))
        })?;
        self.store.set_json(&self.keys.balance(addr), &balance).await
    }

    /// Links `wallet` to every owner, symmetrically, and records all of them
    /// in the address set. Idempotent: repeated calls with the same owner
    /// set never duplicate or shrink either side of the link.
    pub async fn link_multisig(&self, wallet: &Address, owners: &[Address]) -> Result<(), ProjectionError> {
        self.record_address(wallet).await?;
        for owner in owners {
            self.record_address(owner).await?;
            self.store
                .set_add(&self.keys.multisig_addresses(wallet), &owner.to_hex())
                .await
                .map_err(ProjectionError::Transient)?;
            self.store
                .set_add(&self.keys.multisig_addresses(owner), &wallet.to_hex())
                .await
                .map_err(ProjectionError::Transient)?;
            trace!(%wallet, %owner, "linked multisig owner");
        }
        Ok(())
    }

    pub async fn multisig_owners_of(&self, wallet: &Address) -> Result<Vec<Address>, ProjectionError> {
        let raw = self
            .store
            .set_members(&self.keys.multisig_addresses(wallet))
            .await
            .map_err(ProjectionError::Transient)?;
        raw.iter()
            .map(|hex| Address::from_hex(hex).map_err(ProjectionError::Codec))
            .collect()
    }
}
