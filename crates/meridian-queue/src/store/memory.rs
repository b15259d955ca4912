//! Process-local store.

use super::{KeyValueStore, StoreError, StoreResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
struct Inner {
    lists: HashMap<String, VecDeque<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
    zsets: HashMap<String, HashMap<String, f64>>,
}

/// In-memory [`KeyValueStore`] with Redis-compatible semantics.
///
/// A single mutex guards all keys, so every operation is atomic. The store can
/// be switched offline to exercise the unavailable paths of the queue layer.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    offline: AtomicBool,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("in-memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

fn sorted_members(set: &HashMap<String, f64>, min: f64, max: f64) -> Vec<String> {
    let mut entries: Vec<(&String, f64)> = set
        .iter()
        .filter(|(_, score)| **score >= min && **score <= max)
        .map(|(member, score)| (member, *score))
        .collect();
    entries.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    entries.into_iter().map(|(member, _)| member.clone()).collect()
}

fn resolve_index(index: i64, len: usize) -> i64 {
    if index < 0 {
        len as i64 + index
    } else {
        index
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn lpush(&self, key: &str, value: &str) -> StoreResult<u64> {
        self.check()?;
        let mut inner = self.inner.lock();
        let list = inner.lists.entry(key.to_string()).or_default();
        list.push_front(value.to_string());
        Ok(list.len() as u64)
    }

    async fn rpush(&self, key: &str, value: &str) -> StoreResult<u64> {
        self.check()?;
        let mut inner = self.inner.lock();
        let list = inner.lists.entry(key.to_string()).or_default();
        list.push_back(value.to_string());
        Ok(list.len() as u64)
    }

    async fn lpop(&self, key: &str) -> StoreResult<Option<String>> {
        self.check()?;
        let mut inner = self.inner.lock();
        Ok(inner.lists.get_mut(key).and_then(VecDeque::pop_front))
    }

    async fn rpop(&self, key: &str) -> StoreResult<Option<String>> {
        self.check()?;
        let mut inner = self.inner.lock();
        Ok(inner.lists.get_mut(key).and_then(VecDeque::pop_back))
    }

    async fn lmove(&self, source: &str, destination: &str) -> StoreResult<Option<String>> {
        self.check()?;
        let mut inner = self.inner.lock();
        let Some(value) = inner.lists.get_mut(source).and_then(VecDeque::pop_front) else {
            return Ok(None);
        };
        inner
            .lists
            .entry(destination.to_string())
            .or_default()
            .push_back(value.clone());
        Ok(Some(value))
    }

    async fn llen(&self, key: &str) -> StoreResult<u64> {
        self.check()?;
        let inner = self.inner.lock();
        Ok(inner.lists.get(key).map_or(0, |l| l.len() as u64))
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        self.check()?;
        let inner = self.inner.lock();
        let Some(list) = inner.lists.get(key) else {
            return Ok(Vec::new());
        };
        let len = list.len();
        let start = resolve_index(start, len).max(0);
        let stop = resolve_index(stop, len).min(len as i64 - 1);
        if len == 0 || start > stop {
            return Ok(Vec::new());
        }
        Ok(list
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .cloned()
            .collect())
    }

    async fn lrem(&self, key: &str, value: &str) -> StoreResult<u64> {
        self.check()?;
        let mut inner = self.inner.lock();
        let Some(list) = inner.lists.get_mut(key) else {
            return Ok(0);
        };
        let before = list.len();
        list.retain(|v| v != value);
        Ok((before - list.len()) as u64)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        self.check()?;
        self.inner
            .lock()
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        self.check()?;
        let inner = self.inner.lock();
        Ok(inner.hashes.get(key).and_then(|h| h.get(field).cloned()))
    }

    async fn hdel(&self, key: &str, field: &str) -> StoreResult<bool> {
        self.check()?;
        let mut inner = self.inner.lock();
        Ok(inner
            .hashes
            .get_mut(key)
            .is_some_and(|h| h.remove(field).is_some()))
    }

    async fn hgetall(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        self.check()?;
        let inner = self.inner.lock();
        Ok(inner.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn hlen(&self, key: &str) -> StoreResult<u64> {
        self.check()?;
        let inner = self.inner.lock();
        Ok(inner.hashes.get(key).map_or(0, |h| h.len() as u64))
    }

    async fn hincr(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        self.check()?;
        let mut inner = self.inner.lock();
        let slot = inner
            .hashes
            .entry(key.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert_with(|| "0".to_string());
        let current: i64 = slot.parse().map_err(|_| {
            StoreError::Serialization(format!("hash value is not an integer: {key}.{field}"))
        })?;
        let next = current + delta;
        *slot = next.to_string();
        Ok(next)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        self.check()?;
        self.inner
            .lock()
            .zsets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn zpopmax(&self, key: &str) -> StoreResult<Option<(String, f64)>> {
        self.check()?;
        let mut inner = self.inner.lock();
        let Some(set) = inner.zsets.get_mut(key) else {
            return Ok(None);
        };
        let top = set
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1).then_with(|| a.0.cmp(b.0)))
            .map(|(member, _)| member.clone());
        Ok(top.and_then(|member| set.remove_entry(&member)))
    }

    async fn zrangebyscore(&self, key: &str, min: f64, max: f64) -> StoreResult<Vec<String>> {
        self.check()?;
        let inner = self.inner.lock();
        Ok(inner
            .zsets
            .get(key)
            .map(|set| sorted_members(set, min, max))
            .unwrap_or_default())
    }

    async fn zpop_range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<String>> {
        self.check()?;
        let mut inner = self.inner.lock();
        let Some(set) = inner.zsets.get_mut(key) else {
            return Ok(Vec::new());
        };
        let members = sorted_members(set, min, max);
        for member in &members {
            set.remove(member);
        }
        Ok(members)
    }

    async fn zrem(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.check()?;
        let mut inner = self.inner.lock();
        Ok(inner
            .zsets
            .get_mut(key)
            .is_some_and(|set| set.remove(member).is_some()))
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        self.check()?;
        let inner = self.inner.lock();
        Ok(inner.zsets.get(key).map_or(0, |set| set.len() as u64))
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check()
    }
}
