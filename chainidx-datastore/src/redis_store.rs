use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use crate::{Datastore, Op};

/// Redis-backed [`Datastore`]. Uses a `ConnectionManager` so transient
/// disconnects are retried transparently by the client rather than bubbling
/// up as a connection-level error on every call.
#[derive(Clone)]
pub struct RedisDatastore {
    conn: ConnectionManager,
}

impl RedisDatastore {
    pub async fn connect(addr: &str, db: i64) -> anyhow::Result<Self> {
        let url = format!("redis://{addr}/{db}");
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        debug!(addr, db, "connected to redis datastore");
        Ok(Self { conn })
    }
}

#[async_trait]
impl Datastore for RedisDatastore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        conn.set(key, value).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        conn.del(key).await?;
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.hget(key, field).await?)
    }

    async fn hash_set(&self, key: &str, field: &str, value: String) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        conn.hset(key, field, value).await?;
        Ok(())
    }

    async fn hash_del(&self, key: &str, field: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        conn.hdel(key, field).await?;
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> anyhow::Result<Vec<(String, String)>> {
        let mut conn = self.conn.clone();
        let pairs: Vec<(String, String)> = conn.hgetall(key).await?;
        Ok(pairs)
    }

    async fn set_add(&self, key: &str, member: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        conn.sadd(key, member).await?;
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        conn.srem(key, member).await?;
        Ok(())
    }

    async fn set_members(&self, key: &str) -> anyhow::Result<Vec<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.smembers(key).await?)
    }

    async fn execute_batch(&self, ops: Vec<Op>) -> anyhow::Result<()> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in ops {
            match op {
                Op::Set { key, value } => {
                    pipe.set(key, value).ignore();
                }
                Op::Del { key } => {
                    pipe.del(key).ignore();
                }
                Op::HashSet { key, field, value } => {
                    pipe.hset(key, field, value).ignore();
                }
                Op::HashDel { key, field } => {
                    pipe.hdel(key, field).ignore();
                }
                Op::SetAdd { key, member } => {
                    pipe.sadd(key, member).ignore();
                }
                Op::SetRemove { key, member } => {
                    pipe.srem(key, member).ignore();
                }
            }
        }
        let mut conn = self.conn.clone();
        pipe.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }
}
