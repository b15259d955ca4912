//! Redis-backed store.

use super::{KeyValueStore, StoreError, StoreResult};
use crate::error::{QueueError, QueueResult};
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use meridian_config::RedisConfig;
use redis::{AsyncCommands, Direction};
use std::collections::HashMap;
use tracing::info;

/// Create a Redis connection pool and verify it with a PING.
pub async fn create_pool(config: &RedisConfig) -> QueueResult<Pool> {
    info!(pool_size = config.pool_size, "Creating Redis connection pool...");

    let pool = Config::from_url(&config.url)
        .builder()
        .map_err(|e| QueueError::Configuration(format!("Invalid Redis config: {}", e)))?
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| QueueError::Configuration(format!("Failed to create pool: {}", e)))?;

    let store = RedisStore::new(pool.clone());
    tokio::time::timeout(config.connect_timeout(), store.ping())
        .await
        .map_err(|_| {
            StoreError::Unavailable(format!(
                "PING did not answer within {}s",
                config.connect_timeout_secs
            ))
        })??;

    info!("Redis connection pool created successfully");

    Ok(pool)
}

/// [`KeyValueStore`] over a Redis connection pool.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Wrap an existing pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> StoreResult<deadpool_redis::Connection> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn lpush(&self, key: &str, value: &str) -> StoreResult<u64> {
        let mut conn = self.conn().await?;
        Ok(conn.lpush(key, value).await?)
    }

    async fn rpush(&self, key: &str, value: &str) -> StoreResult<u64> {
        let mut conn = self.conn().await?;
        Ok(conn.rpush(key, value).await?)
    }

    async fn lpop(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn().await?;
        Ok(conn.lpop(key, None).await?)
    }

    async fn rpop(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn().await?;
        Ok(conn.rpop(key, None).await?)
    }

    async fn lmove(&self, source: &str, destination: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn().await?;
        Ok(conn
            .lmove(source, destination, Direction::Left, Direction::Right)
            .await?)
    }

    async fn llen(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.conn().await?;
        Ok(conn.llen(key).await?)
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        let mut conn = self.conn().await?;
        Ok(conn.lrange(key, start as isize, stop as isize).await?)
    }

    async fn lrem(&self, key: &str, value: &str) -> StoreResult<u64> {
        let mut conn = self.conn().await?;
        Ok(conn.lrem(key, 0, value).await?)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let _: () = conn.hset(key, field, value).await?;
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn().await?;
        Ok(conn.hget(key, field).await?)
    }

    async fn hdel(&self, key: &str, field: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let removed: u64 = conn.hdel(key, field).await?;
        Ok(removed > 0)
    }

    async fn hgetall(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let mut conn = self.conn().await?;
        Ok(conn.hgetall(key).await?)
    }

    async fn hlen(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.conn().await?;
        Ok(conn.hlen(key).await?)
    }

    async fn hincr(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        let mut conn = self.conn().await?;
        Ok(conn.hincr(key, field, delta).await?)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let _: () = conn.zadd(key, member, score).await?;
        Ok(())
    }

    async fn zpopmax(&self, key: &str) -> StoreResult<Option<(String, f64)>> {
        let mut conn = self.conn().await?;
        let popped: Vec<(String, f64)> = conn.zpopmax(key, 1).await?;
        Ok(popped.into_iter().next())
    }

    async fn zrangebyscore(&self, key: &str, min: f64, max: f64) -> StoreResult<Vec<String>> {
        let mut conn = self.conn().await?;
        Ok(conn.zrangebyscore(key, min, max).await?)
    }

    async fn zpop_range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<String>> {
        let mut conn = self.conn().await?;
        let (members, _removed): (Vec<String>, u64) = redis::pipe()
            .atomic()
            .zrangebyscore(key, min, max)
            .zrembyscore(key, min, max)
            .query_async(&mut *conn)
            .await?;
        Ok(members)
    }

    async fn zrem(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let removed: u64 = conn.zrem(key, member).await?;
        Ok(removed > 0)
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.conn().await?;
        Ok(conn.zcard(key).await?)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut *conn)
            .await?;
        Ok(())
    }
}
