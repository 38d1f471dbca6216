use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{Datastore, Op};

#[derive(Debug, Default)]
struct Inner {
    strings: HashMap<String, String>,
    hashes: HashMap<String, HashMap<String, String>>,
    sets: HashMap<String, HashSet<String>>,
}

/// In-process stand-in for the external key/value store, used by the
/// balance/lock/projection test suites so they don't need a live Redis.
#[derive(Debug, Default)]
pub struct MemoryDatastore {
    inner: Mutex<Inner>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_op(inner: &mut Inner, op: Op) {
        match op {
            Op::Set { key, value } => {
                inner.strings.insert(key, value);
            }
            Op::Del { key } => {
                inner.strings.remove(&key);
            }
            Op::HashSet { key, field, value } => {
                inner.hashes.entry(key).or_default().insert(field, value);
            }
            Op::HashDel { key, field } => {
                if let Some(h) = inner.hashes.get_mut(&key) {
                    h.remove(&field);
                }
            }
            Op::SetAdd { key, member } => {
                inner.sets.entry(key).or_default().insert(member);
            }
            Op::SetRemove { key, member } => {
                if let Some(s) = inner.sets.get_mut(&key) {
                    s.remove(&member);
                }
            }
        }
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.inner.lock().strings.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        self.inner.lock().strings.insert(key.to_string(), value);
        Ok(())
    }

    async fn del(&self, key: &str) -> anyhow::Result<()> {
        self.inner.lock().strings.remove(key);
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .inner
            .lock()
            .hashes
            .get(key)
            .and_then(|h| h.get(field).cloned()))
    }

    async fn hash_set(&self, key: &str, field: &str, value: String) -> anyhow::Result<()> {
        self.inner
            .lock()
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value);
        Ok(())
    }

    async fn hash_del(&self, key: &str, field: &str) -> anyhow::Result<()> {
        if let Some(h) = self.inner.lock().hashes.get_mut(key) {
            h.remove(field);
        }
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> anyhow::Result<Vec<(String, String)>> {
        Ok(self
            .inner
            .lock()
            .hashes
            .get(key)
            .map(|h| h.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn set_add(&self, key: &str, member: &str) -> anyhow::Result<()> {
        self.inner
            .lock()
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> anyhow::Result<()> {
        if let Some(s) = self.inner.lock().sets.get_mut(key) {
            s.remove(member);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> anyhow::Result<Vec<String>> {
        Ok(self
            .inner
            .lock()
            .sets
            .get(key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn execute_batch(&self, ops: Vec<Op>) -> anyhow::Result<()> {
        let mut inner = self.inner.lock();
        for op in ops {
            Self::apply_op(&mut inner, op);
        }
        Ok(())
    }
}
