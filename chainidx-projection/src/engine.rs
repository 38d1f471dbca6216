use std::sync::Arc;

use chainidx_balances::BalanceTracker;
use chainidx_core::{
    BlockEffects, ChangeId, CoinOutput, CoinOutputId, ConsensusChange, ExplorerState, GlobalStats,
    LockKind, Network, NetworkParams, ProjectionError, SpendCondition,
};
use chainidx_datastore::{Datastore, JsonDatastoreExt, KeySchema};
use chainidx_locks::LockIndex;
use tracing::{debug, info, instrument};

use crate::ucos::{self, UcosRecord};

/// Drives a single `ConsensusChange` at a time through the Balance Tracker
/// and Lock Index, maintaining `stats` and `state` as it goes.
///
/// A single instance owns the reserved key prefix for one `(chainName,
/// network)` pair; it is not meant to be shared across networks.
pub struct ProjectionEngine<D> {
    store: Arc<D>,
    keys: KeySchema,
    balances: BalanceTracker<D>,
    locks: LockIndex<D>,
    network_params: NetworkParams,
}

impl<D: Datastore> ProjectionEngine<D> {
    pub fn new(store: Arc<D>, chain_name: &str, network: Network) -> Self {
        let keys = KeySchema::new(chain_name, network);
        let balances = BalanceTracker::new(store.clone(), keys.clone());
        let locks = LockIndex::new(store.clone(), keys.clone(), balances.clone());
        Self {
            store,
            keys,
            balances,
            locks,
            network_params: network.params(),
        }
    }

    pub async fn current_state(&self) -> Result<ExplorerState, ProjectionError> {
        self.store.get_json(&self.keys.state()).await
    }

    pub async fn stats(&self) -> Result<GlobalStats, ProjectionError> {
        self.store.get_json(&self.keys.stats()).await
    }

    pub fn balances(&self) -> &BalanceTracker<D> {
        &self.balances
    }

    /// Applies one consensus change in full: every revert, then every
    /// apply, both in the order given, followed by the two durability
    /// writes (`stats`, then `state.currentChangeId`).
    #[instrument(skip(self, change), fields(change_id = %change.id))]
    pub async fn process_change(&self, change: &ConsensusChange) -> Result<(), ProjectionError> {
        let mut stats = self.stats().await?;

        for block in &change.reverted {
            self.revert_block(&mut stats, block).await?;
        }
        for block in &change.applied {
            self.apply_block(&mut stats, block).await?;
        }

        self.store.set_json(&self.keys.stats(), &stats).await?;
        let state = ExplorerState {
            current_change_id: Some(change.id.clone()),
        };
        self.store.set_json(&self.keys.state(), &state).await?;
        debug!(block_height = stats.block_height, "consensus change applied");
        Ok(())
    }

    async fn apply_block(&self, stats: &mut GlobalStats, block: &BlockEffects) -> Result<(), ProjectionError> {
        if !block.is_genesis() {
            stats.block_height += 1;
        }
        stats.timestamp = block.timestamp;

        let promoted = self.locks.promote(stats.block_height, stats.timestamp).await?;
        for record in promoted {
            ucos::set(
                &*self.store,
                &self.keys,
                &record.coin_output_id.to_hex(),
                &UcosRecord {
                    address: record.address,
                    value: record.value,
                },
            )
            .await?;
        }

        for payout in &block.miner_payouts {
            stats.miner_payout_count += 1;
            stats.miner_payouts = stats.miner_payouts.checked_add(&payout.value);
            stats.coins = stats.coins.checked_add(&payout.value);

            let output = CoinOutput {
                id: payout.id,
                value: payout.value.clone(),
                condition: SpendCondition::UnlockHash(payout.address),
            };
            let unlock_point = stats.block_height + self.network_params.maturity_delay;
            self.locks
                .add_locked(&output, &payout.address, LockKind::Height, unlock_point)
                .await?;
        }

        for tx in &block.transactions {
            stats.tx_count += 1;
            if tx.is_value_transaction() {
                stats.value_tx_count += 1;
            }

            for input in &tx.coin_inputs {
                stats.coin_input_count += 1;
                let id_hex = input.parent_id.to_hex();
                let spent = ucos::get(&*self.store, &self.keys, &id_hex)
                    .await?
                    .ok_or_else(|| {
                        ProjectionError::Invariant(format!(
                            "missing ucos entry for spent output {}",
                            input.parent_id
                        ))
                    })?;
                self.balances.debit_unlocked(&spent.address, &spent.value).await?;
                ucos::del(&*self.store, &self.keys, &id_hex).await?;
            }

            for output in &tx.coin_outputs {
                stats.coin_output_count += 1;
                if block.is_genesis() {
                    stats.coins = stats.coins.checked_add(&output.value);
                }

                if let Some((wallet, owners)) = output.condition.multisig_owners() {
                    self.balances.link_multisig(&wallet, owners).await?;
                }

                if output.condition.fulfillable_at(stats.block_height, stats.timestamp) {
                    let addr = output.condition.beneficiary();
                    self.balances.record_address(&addr).await?;
                    self.balances.credit_unlocked(&addr, &output.value).await?;
                    ucos::set(
                        &*self.store,
                        &self.keys,
                        &output.id.to_hex(),
                        &UcosRecord {
                            address: addr,
                            value: output.value.clone(),
                        },
                    )
                    .await?;
                } else {
                    let (kind, unlock_point) = output.condition.lock_point().ok_or_else(|| {
                        ProjectionError::Invariant(format!(
                            "output {} is not fulfillable now and is not a time lock",
                            output.id
                        ))
                    })?;
                    let addr = output.condition.beneficiary();
                    self.locks.add_locked(output, &addr, kind, unlock_point).await?;
                }
            }
        }

        Ok(())
    }

    async fn revert_block(&self, stats: &mut GlobalStats, block: &BlockEffects) -> Result<(), ProjectionError> {
        for payout in &block.miner_payouts {
            stats.miner_payout_count = checked_dec(stats.miner_payout_count, "minerPayoutCount")?;
            stats.miner_payouts = checked_dec_currency(&stats.miner_payouts, &payout.value, "minerPayouts")?;
            stats.coins = checked_dec_currency(&stats.coins, &payout.value, "coins")?;
            self.revert_output_effects(payout.id).await?;
        }

        for tx in &block.transactions {
            stats.tx_count = checked_dec(stats.tx_count, "txCount")?;
            if tx.is_value_transaction() {
                stats.value_tx_count = checked_dec(stats.value_tx_count, "valueTxCount")?;
            }
            stats.coin_input_count = stats
                .coin_input_count
                .checked_sub(tx.coin_inputs.len() as u64)
                .ok_or_else(|| ProjectionError::Invariant("coinInputCount underflow on revert".into()))?;

            // Resolved per the projection's symmetry requirement: restore
            // the ucos entry and credit the balance back, rather than
            // leaving the spend's effects in place.
            for input in &tx.coin_inputs {
                self.balances
                    .credit_unlocked(&input.parent_address, &input.parent_value)
                    .await?;
                ucos::set(
                    &*self.store,
                    &self.keys,
                    &input.parent_id.to_hex(),
                    &UcosRecord {
                        address: input.parent_address,
                        value: input.parent_value.clone(),
                    },
                )
                .await?;
            }

            for output in &tx.coin_outputs {
                stats.coin_output_count = checked_dec(stats.coin_output_count, "coinOutputCount")?;
                if block.is_genesis() {
                    stats.coins = checked_dec_currency(&stats.coins, &output.value, "coins")?;
                }
                self.revert_output_effects(output.id).await?;
            }
        }

        if !block.is_genesis() {
            stats.block_height = checked_dec(stats.block_height, "blockHeight")?;
        }
        // Restore the post-revert tip's timestamp, not the reverted block's
        // own: `block.timestamp` is what apply set `stats.timestamp` to when
        // this block was applied, so reverting must undo that and fall back
        // to the parent's timestamp (0 if the reverted block was genesis).
        stats.timestamp = block.parent_timestamp.unwrap_or(0);

        // A reorg that drops the tip back below a bucket the Lock Index's
        // cursors already swept must make that bucket reachable again, or a
        // record re-locked into it on the new fork would never mature.
        self.locks.lower_height_cursor(stats.block_height).await?;
        self.locks.lower_time_cursor(stats.timestamp).await?;

        Ok(())
    }

    /// Removes a coin output's effects, recovering whether it was locked or
    /// already matured from the `ucos` index rather than from the caller.
    async fn revert_output_effects(&self, id: CoinOutputId) -> Result<(), ProjectionError> {
        match ucos::get(&*self.store, &self.keys, &id.to_hex()).await? {
            Some(record) => {
                self.balances.debit_unlocked(&record.address, &record.value).await?;
                ucos::del(&*self.store, &self.keys, &id.to_hex()).await?;
            }
            None => {
                self.locks.remove_locked(id).await?;
            }
        }
        Ok(())
    }
}

fn checked_dec(value: u64, field: &str) -> Result<u64, ProjectionError> {
    value
        .checked_sub(1)
        .ok_or_else(|| ProjectionError::Invariant(format!("{field} underflow on revert")))
}

fn checked_dec_currency(
    value: &chainidx_core::Currency,
    amount: &chainidx_core::Currency,
    field: &str,
) -> Result<chainidx_core::Currency, ProjectionError> {
    value
        .checked_sub(amount)
        .ok_or_else(|| ProjectionError::Invariant(format!("{field} underflow on revert")))
}

/// Log the id the process would resume a subscription from. Split out of
/// [`ProjectionEngine`] so callers (the daemon, tests) can decide when to
/// announce it.
pub fn log_resume_point(state: &ExplorerState) {
    match &state.current_change_id {
        Some(id) => info!(%id, "resuming subscription"),
        None => info!("no prior state, subscribing from genesis"),
    }
}

pub fn resume_from(state: &ExplorerState) -> Option<ChangeId> {
    state.current_change_id.clone()
}
