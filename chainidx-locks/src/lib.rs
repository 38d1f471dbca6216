//! The Lock Index: locked coin outputs keyed by maturation criterion
//! (exact block height, or coarse timestamp bucket), promoted into the
//! Balance Tracker's unlocked balances as the chain advances.

use std::sync::Arc;

use chainidx_balances::BalanceTracker;
use chainidx_core::{Address, CoinOutput, CoinOutputId, LockKind, LockedOutputRecord, ProjectionError};
use chainidx_datastore::keys::time_bucket;
use chainidx_datastore::{Datastore, KeySchema, Op};
use tracing::trace;

pub struct LockIndex<D> {
    store: Arc<D>,
    keys: KeySchema,
    balances: BalanceTracker<D>,
}

impl<D: Datastore> LockIndex<D> {
    pub fn new(store: Arc<D>, keys: KeySchema, balances: BalanceTracker<D>) -> Self {
        Self { store, keys, balances }
    }

    fn bucket_key(&self, kind: LockKind, unlock_point: u64) -> String {
        match kind {
            LockKind::Height => self.keys.lcos_height(unlock_point),
            LockKind::Time => self.keys.lcos_time_bucket(time_bucket(unlock_point)),
        }
    }

    /// Inserts a locked record, credits the beneficiary's locked balance,
    /// and records the per-address `outputs.locked` entry.
    pub async fn add_locked(
        &self,
        output: &CoinOutput,
        address: &Address,
        kind: LockKind,
        unlock_point: u64,
    ) -> Result<(), ProjectionError> {
        let record = LockedOutputRecord {
            coin_output_id: output.id,
            address: *address,
            value: output.value.clone(),
            unlock_point,
            lock_kind: kind,
        };
        let record_json = serde_json::to_string(&record).map_err(|e| ProjectionError::Codec(e.into()))?;
        let output_json = serde_json::to_string(output).map_err(|e| ProjectionError::Codec(e.into()))?;
        let bucket = self.bucket_key(kind, unlock_point);

        self.store
            .execute_batch(vec![
                Op::SetAdd {
                    key: bucket,
                    member: record_json.clone(),
                },
                Op::HashSet {
                    key: self.keys.lcos_by_id(),
                    field: output.id.to_hex(),
                    value: record_json,
                },
                Op::HashSet {
                    key: self.keys.outputs_locked(address),
                    field: output.id.to_hex(),
                    value: output_json,
                },
            ])
            .await
            .map_err(ProjectionError::Transient)?;

        self.balances.record_address(address).await?;
        self.balances.credit_locked(address, &output.value).await
    }

    /// Removes a locked record (used on revert of the block that created
    /// it) and debits the locked balance it had credited.
    pub async fn remove_locked(&self, id: CoinOutputId) -> Result<(), ProjectionError> {
        let record = self.load_record(id).await?.ok_or_else(|| {
            ProjectionError::Invariant(format!("no locked record for output {id}"))
        })?;
        self.retire(&record).await
    }

    async fn load_record(&self, id: CoinOutputId) -> Result<Option<LockedOutputRecord>, ProjectionError> {
        let raw = self
            .store
            .hash_get(&self.keys.lcos_by_id(), &id.to_hex())
            .await
            .map_err(ProjectionError::Transient)?;
        raw.map(|s| serde_json::from_str(&s).map_err(|e| ProjectionError::Codec(e.into())))
            .transpose()
    }

    /// `height` and `timestamp` are the tip's values *after* advancing for
    /// the block currently being applied. Must run before that block's
    /// payouts and transactions so a same-block lock never promotes itself.
    ///
    /// Returns every record that matured this call, so the caller can run
    /// any bookkeeping that depends on an output having become spendable
    /// (recording its `ucos` entry, for instance).
    pub async fn promote(
        &self,
        height: u64,
        timestamp: u64,
    ) -> Result<Vec<LockedOutputRecord>, ProjectionError> {
        let mut promoted = self.promote_height(height).await?;
        promoted.extend(self.promote_time(timestamp).await?);
        Ok(promoted)
    }

    async fn promote_height(&self, height: u64) -> Result<Vec<LockedOutputRecord>, ProjectionError> {
        let cursor_key = self.keys.lcos_height_cursor();
        let last = self.read_cursor(&cursor_key).await?;
        let mut promoted = Vec::new();
        let mut h = last;
        while h < height {
            h += 1;
            promoted.extend(self.promote_whole_bucket(&self.keys.lcos_height(h)).await?);
        }
        if height > last {
            self.store
                .set(&cursor_key, height.to_string())
                .await
                .map_err(ProjectionError::Transient)?;
        }
        Ok(promoted)
    }

    async fn promote_time(&self, timestamp: u64) -> Result<Vec<LockedOutputRecord>, ProjectionError> {
        let target_bucket = time_bucket(timestamp);
        let cursor_key = self.keys.lcos_time_cursor();
        let last = self.read_cursor(&cursor_key).await?;

        let mut promoted = Vec::new();
        // Any bucket strictly below the target bucket can hold no record
        // with unlockPoint > timestamp, so it is safe to clear wholesale.
        let mut b = last;
        while b < target_bucket {
            promoted.extend(self.promote_whole_bucket(&self.keys.lcos_time_bucket(b)).await?);
            b += 1;
        }
        // The target bucket is coarse: it may still hold records past
        // `timestamp`, so check each one exactly.
        promoted.extend(
            self.promote_bucket_exact(&self.keys.lcos_time_bucket(target_bucket), timestamp)
                .await?,
        );

        if target_bucket > last {
            self.store
                .set(&cursor_key, target_bucket.to_string())
                .await
                .map_err(ProjectionError::Transient)?;
        }
        Ok(promoted)
    }

    /// Lowers the height cursor to `height` if the persisted cursor is
    /// currently ahead of it. Called on revert: a reorg that drops the tip
    /// back below a height the cursor already swept means a later re-apply
    /// can insert fresh records into buckets the cursor would otherwise
    /// skip over, so those buckets must become reachable again.
    pub async fn lower_height_cursor(&self, height: u64) -> Result<(), ProjectionError> {
        let cursor_key = self.keys.lcos_height_cursor();
        let last = self.read_cursor(&cursor_key).await?;
        if height < last {
            self.store
                .set(&cursor_key, height.to_string())
                .await
                .map_err(ProjectionError::Transient)?;
        }
        Ok(())
    }

    /// Same as [`Self::lower_height_cursor`], for the timestamp-bucket
    /// cursor: lowers it to `timestamp`'s bucket if the persisted cursor is
    /// ahead of that bucket.
    pub async fn lower_time_cursor(&self, timestamp: u64) -> Result<(), ProjectionError> {
        let cursor_key = self.keys.lcos_time_cursor();
        let last = self.read_cursor(&cursor_key).await?;
        let bucket = time_bucket(timestamp);
        if bucket < last {
            self.store
                .set(&cursor_key, bucket.to_string())
                .await
                .map_err(ProjectionError::Transient)?;
        }
        Ok(())
    }

    async fn read_cursor(&self, key: &str) -> Result<u64, ProjectionError> {
        match self.store.get(key).await.map_err(ProjectionError::Transient)? {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| ProjectionError::Codec(anyhow::anyhow!("bad cursor value {raw:?}: {e}"))),
            None => Ok(0),
        }
    }

    async fn promote_whole_bucket(
        &self,
        bucket_key: &str,
    ) -> Result<Vec<LockedOutputRecord>, ProjectionError> {
        let mut promoted = Vec::new();
        for member in self
            .store
            .set_members(bucket_key)
            .await
            .map_err(ProjectionError::Transient)?
        {
            let record: LockedOutputRecord =
                serde_json::from_str(&member).map_err(|e| ProjectionError::Codec(e.into()))?;
            self.promote_one(bucket_key, &member, &record).await?;
            promoted.push(record);
        }
        Ok(promoted)
    }

    async fn promote_bucket_exact(
        &self,
        bucket_key: &str,
        threshold: u64,
    ) -> Result<Vec<LockedOutputRecord>, ProjectionError> {
        let mut promoted = Vec::new();
        for member in self
            .store
            .set_members(bucket_key)
            .await
            .map_err(ProjectionError::Transient)?
        {
            let record: LockedOutputRecord =
                serde_json::from_str(&member).map_err(|e| ProjectionError::Codec(e.into()))?;
            if record.unlock_point <= threshold {
                self.promote_one(bucket_key, &member, &record).await?;
                promoted.push(record);
            }
        }
        Ok(promoted)
    }

    async fn promote_one(
        &self,
        bucket_key: &str,
        member_json: &str,
        record: &LockedOutputRecord,
    ) -> Result<(), ProjectionError> {
        trace!(output_id = %record.coin_output_id, address = %record.address, "promoting locked output");
        self.store
            .execute_batch(vec![
                Op::SetRemove {
                    key: bucket_key.to_string(),
                    member: member_json.to_string(),
                },
                Op::HashDel {
                    key: self.keys.lcos_by_id(),
                    field: record.coin_output_id.to_hex(),
                },
                Op::HashDel {
                    key: self.keys.outputs_locked(&record.address),
                    field: record.coin_output_id.to_hex(),
                },
            ])
            .await
            .map_err(ProjectionError::Transient)?;
        self.balances.debit_locked(&record.address, &record.value).await?;
        self.balances.credit_unlocked(&record.address, &record.value).await
    }

    async fn retire(&self, record: &LockedOutputRecord) -> Result<(), ProjectionError> {
        let bucket = self.bucket_key(record.lock_kind, record.unlock_point);
        let member_json = serde_json::to_string(record).map_err(|e| ProjectionError::Codec(e.into()))?;
        self.store
            .execute_batch(vec![
                Op::SetRemove {
                    key: bucket,
                    member: member_json,
                },
                Op::HashDel {
                    key: self.keys.lcos_by_id(),
                    field: record.coin_output_id.to_hex(),
                },
                Op::HashDel {
                    key: self.keys.outputs_locked(&record.address),
                    field: record.coin_output_id.to_hex(),
                },
            ])
            .await
            .map_err(ProjectionError::Transient)?;
        self.balances.debit_locked(&record.address, &record.value).await
    }
}
