//! Shared fixtures for the queue integration tests.

#![allow(dead_code)]

use meridian_config::{AppConfig, QueueConfig, RouterConfig};
use meridian_queue::{
    InMemoryStore, Job, KeyValueStore, OrderSide, Priority, PriorityRouter, QueueKeys, WorkQueue,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// A work queue and router sharing one in-memory store.
pub struct TestQueues {
    pub store: Arc<InMemoryStore>,
    pub keys: QueueKeys,
    pub work_queue: WorkQueue,
    pub router: PriorityRouter,
}

impl TestQueues {
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default(), RouterConfig::default())
    }

    pub fn with_config(queue: QueueConfig, router: RouterConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let keys = QueueKeys::default();
        let dyn_store: Arc<dyn KeyValueStore> = store.clone();

        Self {
            work_queue: WorkQueue::new(dyn_store.clone(), keys.clone(), queue),
            router: PriorityRouter::new(dyn_store, keys.clone(), router),
            store,
            keys,
        }
    }

    /// Where a job id currently lives, by WorkQueue key.
    pub async fn locations(&self, job_id: &str) -> Vec<&'static str> {
        let mut found = Vec::new();
        for (name, key) in [("normal", self.keys.normal()), ("priority", self.keys.priority())] {
            let entries = self.store.lrange(&key, 0, -1).await.unwrap();
            if entries.iter().any(|e| e.contains(job_id)) {
                found.push(name);
            }
        }
        if self
            .store
            .hget(&self.keys.processing(), job_id)
            .await
            .unwrap()
            .is_some()
        {
            found.push("processing");
        }
        let retries = self
            .store
            .zrangebyscore(&self.keys.retry(), f64::MIN, f64::MAX)
            .await
            .unwrap();
        if retries.iter().any(|e| e.contains(job_id)) {
            found.push("retry");
        }
        let failed = self.store.lrange(&self.keys.failed(), 0, -1).await.unwrap();
        if failed.iter().any(|e| e.contains(job_id)) {
            found.push("failed");
        }
        found
    }
}

pub fn order(priority: Priority) -> Job {
    Job::new("AAPL", OrderSide::Buy, 100.0)
        .with_price(187.25)
        .with_priority(priority)
}

/// Config with fast polling and a small pool, for driving the manager in tests.
pub fn fast_config(workers: usize) -> AppConfig {
    let mut config = AppConfig::default();
    config.workers.count = workers;
    config.workers.poll_fast_ms = 5;
    config.workers.poll_medium_ms = 10;
    config.workers.poll_slow_ms = 20;
    config.workers.job_timeout_secs = 1;
    config.workers.shutdown_timeout_secs = 2;
    config.queue.max_queue_size = 1_000;
    config.queue.max_retry_delay_secs = 0;
    config
}

/// Poll `check` until it holds or five seconds pass.
pub async fn wait_until<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
