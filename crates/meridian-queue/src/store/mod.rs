//! Key-value store abstraction.
//!
//! Every queue structure lives in an external store. The [`KeyValueStore`]
//! trait names the primitives the queue needs; each call must be atomic for
//! the key it touches. Two implementations ship with the crate:
//!
//! - [`RedisStore`] over a `deadpool-redis` pool, for production.
//! - [`InMemoryStore`], a process-local store for tests and single-node use.

mod memory;
mod redis;

pub use self::memory::InMemoryStore;
pub use self::redis::{create_pool, RedisStore};

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failure kinds reported by a store operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or rejected the command.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The requested entry does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Returns true if the same call may succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<::redis::RedisError> for StoreError {
    fn from(err: ::redis::RedisError) -> Self {
        match err.kind() {
            ::redis::ErrorKind::TypeError => StoreError::Serialization(err.to_string()),
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

impl From<deadpool_redis::PoolError> for StoreError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Primitive operations the queue layer needs from a key-value store.
///
/// Lists are FIFO when written with `rpush` and read with `lpop`. Sorted-set
/// members are unique strings ordered by an `f64` score.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Pushes to the head of a list and returns the new length.
    async fn lpush(&self, key: &str, value: &str) -> StoreResult<u64>;

    /// Pushes to the tail of a list and returns the new length.
    async fn rpush(&self, key: &str, value: &str) -> StoreResult<u64>;

    /// Pops from the head of a list.
    async fn lpop(&self, key: &str) -> StoreResult<Option<String>>;

    /// Pops from the tail of a list.
    async fn rpop(&self, key: &str) -> StoreResult<Option<String>>;

    /// Moves the head of `source` to the tail of `destination` in one step.
    async fn lmove(&self, source: &str, destination: &str) -> StoreResult<Option<String>>;

    /// Returns the length of a list.
    async fn llen(&self, key: &str) -> StoreResult<u64>;

    /// Returns list elements between two inclusive indexes. Negative indexes
    /// count from the tail.
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>>;

    /// Removes every element equal to `value` and returns how many went.
    async fn lrem(&self, key: &str, value: &str) -> StoreResult<u64>;

    /// Sets a hash field.
    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()>;

    /// Reads a hash field.
    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    /// Deletes a hash field. Returns true if it existed.
    async fn hdel(&self, key: &str, field: &str) -> StoreResult<bool>;

    /// Reads every field of a hash.
    async fn hgetall(&self, key: &str) -> StoreResult<HashMap<String, String>>;

    /// Returns the number of fields in a hash.
    async fn hlen(&self, key: &str) -> StoreResult<u64>;

    /// Atomically adds `delta` to an integer hash field.
    async fn hincr(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64>;

    /// Adds or updates a sorted-set member.
    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()>;

    /// Pops the member with the highest score.
    async fn zpopmax(&self, key: &str) -> StoreResult<Option<(String, f64)>>;

    /// Returns members with `min <= score <= max`, lowest score first.
    async fn zrangebyscore(&self, key: &str, min: f64, max: f64) -> StoreResult<Vec<String>>;

    /// Reads and removes members with `min <= score <= max` atomically.
    async fn zpop_range_by_score(&self, key: &str, min: f64, max: f64)
        -> StoreResult<Vec<String>>;

    /// Removes a sorted-set member. Returns true if it existed.
    async fn zrem(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// Returns the number of members in a sorted set.
    async fn zcard(&self, key: &str) -> StoreResult<u64>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> StoreResult<()>;
}
