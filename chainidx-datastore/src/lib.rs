//! The Datastore Adapter: a typed surface over an external key/value store
//! (strings, hashes, sets, pipelined batches), plus the key-naming scheme the
//! rest of the projection relies on.
//!
//! Consumers depend only on the [`Datastore`] trait and [`KeySchema`]; the
//! Redis-backed implementation and the in-memory fake both live behind it.

pub mod keys;
pub mod memory;
pub mod redis_store;

pub use keys::KeySchema;
pub use memory::MemoryDatastore;
pub use redis_store::RedisDatastore;

use async_trait::async_trait;
use chainidx_core::ProjectionError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// One operation in a pipelined [`Datastore::execute_batch`] call.
#[derive(Debug, Clone)]
pub enum Op {
    Set { key: String, value: String },
    Del { key: String },
    HashSet { key: String, field: String, value: String },
    HashDel { key: String, field: String },
    SetAdd { key: String, member: String },
    SetRemove { key: String, member: String },
}

/// The raw, string-valued surface every backend must provide.
///
/// Kept generic-free so it stays object-safe; typed JSON access is layered
/// on top by [`JsonDatastoreExt`].
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> anyhow::Result<()>;
    async fn del(&self, key: &str) -> anyhow::Result<()>;

    async fn hash_get(&self, key: &str, field: &str) -> anyhow::Result<Option<String>>;
    async fn hash_set(&self, key: &str, field: &str, value: String) -> anyhow::Result<()>;
    async fn hash_del(&self, key: &str, field: &str) -> anyhow::Result<()>;
    /// All `(field, value)` pairs currently stored in the hash.
    async fn hash_get_all(&self, key: &str) -> anyhow::Result<Vec<(String, String)>>;

    async fn set_add(&self, key: &str, member: &str) -> anyhow::Result<()>;
    async fn set_remove(&self, key: &str, member: &str) -> anyhow::Result<()>;
    async fn set_members(&self, key: &str) -> anyhow::Result<Vec<String>>;

    /// Apply every op as a single pipelined round-trip. On a protocol error
    /// the whole batch must be re-attempted by the caller; no partial
    /// application is observable to a well-behaved backend.
    async fn execute_batch(&self, ops: Vec<Op>) -> anyhow::Result<()>;
}

/// Typed JSON access layered over any [`Datastore`].
///
/// A missing key decodes to `T::default()`, matching the codec's "absent
/// record is the zero value" rule; callers never have to special-case the
/// first read of a fresh address or a fresh chain.
#[async_trait]
pub trait JsonDatastoreExt: Datastore {
    async fn get_json<T>(&self, key: &str) -> Result<T, ProjectionError>
    where
        T: DeserializeOwned + Default + Send,
    {
        match self
            .get(key)
            .await
            .map_err(ProjectionError::Transient)?
        {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| ProjectionError::Codec(e.into())),
            None => Ok(T::default()),
        }
    }

    async fn set_json<T>(&self, key: &str, value: &T) -> Result<(), ProjectionError>
    where
        T: Serialize + Sync,
    {
        let raw = serde_json::to_string(value).map_err(|e| ProjectionError::Codec(e.into()))?;
        self.set(key, raw).await.map_err(ProjectionError::Transient)
    }
}

impl<T: Datastore + ?Sized> JsonDatastoreExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use chainidx_core::Balance;

    #[tokio::test]
    async fn json_ext_defaults_on_missing_key() {
        let store = MemoryDatastore::new();
        let balance: Balance = store.get_json("address:xyz:balance").await.unwrap();
        assert_eq!(balance, Balance::zero());
    }

    #[tokio::test]
    async fn json_ext_roundtrips_through_set() {
        let store = MemoryDatastore::new();
        let balance = Balance {
            locked: chainidx_core::Currency::from_u64(1),
            unlocked: chainidx_core::Currency::from_u64(2),
        };
        store.set_json("k", &balance).await.unwrap();
        let back: Balance = store.get_json("k").await.unwrap();
        assert_eq!(back, balance);
    }
}
