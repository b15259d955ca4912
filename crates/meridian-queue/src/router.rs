//! Multi-tier priority router.
//!
//! Nine sub-queues: four urgency fast lanes and five generic tiers.
//!
//! ```text
//!   liquidation  (sorted set, highest score first)
//!   market_close (list, FIFO)
//!   arbitrage    (sorted set, highest score first)
//!   stop_loss    (list, FIFO)
//!   critical / urgent / high / normal / low  (lists, FIFO)
//! ```
//!
//! Workers drain the queues in that order. Rebalancing promotes the oldest
//! part of an oversized `normal` or `low` tier one level up so a burst of
//! low-priority work cannot starve its own backlog forever.

use crate::job::{Job, JobStatus};
use crate::keys::QueueKeys;
use crate::metrics::JobMetrics;
use crate::priority::{priority_score_at, Priority, PriorityMetadata, Urgency};
use crate::stats::{HealthStatus, RouterStats};
use crate::store::{KeyValueStore, StoreResult};
use chrono::{DateTime, Utc};
use meridian_config::RouterConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One of the router's sub-queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouterQueue {
    Liquidation,
    MarketClose,
    Arbitrage,
    StopLoss,
    Critical,
    Urgent,
    High,
    Normal,
    Low,
}

impl RouterQueue {
    /// Order in which workers drain the sub-queues.
    pub const DEQUEUE_ORDER: [RouterQueue; 9] = [
        RouterQueue::Liquidation,
        RouterQueue::MarketClose,
        RouterQueue::Arbitrage,
        RouterQueue::StopLoss,
        RouterQueue::Critical,
        RouterQueue::Urgent,
        RouterQueue::High,
        RouterQueue::Normal,
        RouterQueue::Low,
    ];

    /// Store name of the queue.
    pub const fn name(self) -> &'static str {
        match self {
            RouterQueue::Liquidation => "liquidation",
            RouterQueue::MarketClose => "market_close",
            RouterQueue::Arbitrage => "arbitrage",
            RouterQueue::StopLoss => "stop_loss",
            RouterQueue::Critical => "critical",
            RouterQueue::Urgent => "urgent",
            RouterQueue::High => "high",
            RouterQueue::Normal => "normal",
            RouterQueue::Low => "low",
        }
    }

    /// True for queues kept as sorted sets and drained by descending score.
    pub const fn is_scored(self) -> bool {
        matches!(self, RouterQueue::Liquidation | RouterQueue::Arbitrage)
    }

    /// True for the four urgency fast lanes.
    pub const fn is_fast_lane(self) -> bool {
        matches!(
            self,
            RouterQueue::Liquidation
                | RouterQueue::MarketClose
                | RouterQueue::Arbitrage
                | RouterQueue::StopLoss
        )
    }

    /// Fast lane for an urgency, if it has one.
    pub const fn for_urgency(urgency: Urgency) -> Option<Self> {
        match urgency {
            Urgency::Liquidation => Some(RouterQueue::Liquidation),
            Urgency::MarketClose => Some(RouterQueue::MarketClose),
            Urgency::Arbitrage => Some(RouterQueue::Arbitrage),
            Urgency::StopLoss => Some(RouterQueue::StopLoss),
            Urgency::Normal => None,
        }
    }

    /// Generic tier for a priority.
    pub const fn for_priority(priority: Priority) -> Self {
        match priority {
            Priority::Critical => RouterQueue::Critical,
            Priority::Urgent => RouterQueue::Urgent,
            Priority::High => RouterQueue::High,
            Priority::Normal => RouterQueue::Normal,
            Priority::Low => RouterQueue::Low,
        }
    }
}

impl fmt::Display for RouterQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binds a routed job to the worker processing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerAssignment {
    pub worker_id: String,
    pub assigned_at: DateTime<Utc>,
    pub status: JobStatus,
    /// Sub-queue the job came from.
    pub queue: String,
}

/// Stored form of a routed job. The metadata travels with the job so a failed
/// attempt can be re-routed to the same lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedEntry {
    pub job: Job,
    #[serde(default)]
    pub metadata: PriorityMetadata,
}

/// Jobs moved by one rebalancing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceReport {
    pub normal_to_high: u64,
    pub low_to_normal: u64,
}

impl RebalanceReport {
    /// Total promotions.
    pub fn total(&self) -> u64 {
        self.normal_to_high + self.low_to_normal
    }
}

/// Priority router over nine sub-queues.
pub struct PriorityRouter {
    store: Arc<dyn KeyValueStore>,
    keys: QueueKeys,
    config: RouterConfig,
}

impl PriorityRouter {
    /// Create a router over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, keys: QueueKeys, config: RouterConfig) -> Self {
        Self {
            store,
            keys,
            config,
        }
    }

    fn queue_key(&self, queue: RouterQueue) -> String {
        self.keys.router_queue(queue.name())
    }

    /// Composite priority score of a job right now.
    pub fn score(&self, job: &Job, metadata: &PriorityMetadata) -> f64 {
        self.score_at(job, metadata, Utc::now())
    }

    /// Composite priority score of a job at `now`.
    pub fn score_at(&self, job: &Job, metadata: &PriorityMetadata, now: DateTime<Utc>) -> f64 {
        priority_score_at(job, metadata, now)
    }

    /// Urgency fast lanes win over the generic tiers.
    pub fn select_queue(&self, job: &Job, metadata: &PriorityMetadata) -> RouterQueue {
        RouterQueue::for_urgency(metadata.urgency)
            .unwrap_or_else(|| RouterQueue::for_priority(job.priority))
    }

    /// Score, route and store a job.
    pub async fn enqueue_priority(&self, job: &Job, metadata: &PriorityMetadata) -> bool {
        let queue = self.select_queue(job, metadata);
        let score = self.score(job, metadata);

        match self.try_enqueue(job, metadata, queue, score).await {
            Ok(()) => {
                debug!(job_id = %job.id, queue = %queue, score = score, "Routed job");
                true
            }
            Err(e) => {
                error!(job_id = %job.id, queue = %queue, error = %e, "Failed to route job");
                false
            }
        }
    }

    async fn try_enqueue(
        &self,
        job: &Job,
        metadata: &PriorityMetadata,
        queue: RouterQueue,
        score: f64,
    ) -> StoreResult<()> {
        let payload = serde_json::to_string(&RoutedEntry {
            job: job.clone(),
            metadata: metadata.clone(),
        })?;
        let key = self.queue_key(queue);

        if queue.is_scored() {
            self.store.zadd(&key, &payload, score).await?;
        } else {
            self.store.rpush(&key, &payload).await?;
        }

        self.count("enqueued", queue).await;
        JobMetrics::job_enqueued(queue.name(), job.priority.as_u8());
        Ok(())
    }

    /// Pop the most urgent job and record the assignment.
    pub async fn dequeue_priority(&self, worker_id: &str) -> Option<Job> {
        self.dequeue_routed(worker_id).await.map(|entry| entry.job)
    }

    /// Like [`PriorityRouter::dequeue_priority`], keeping the routing metadata.
    pub async fn dequeue_routed(&self, worker_id: &str) -> Option<RoutedEntry> {
        for queue in RouterQueue::DEQUEUE_ORDER {
            let entry = match self.pop_entry(queue).await {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(e) => {
                    error!(queue = %queue, error = %e, "Failed to pop from router queue");
                    return None;
                }
            };

            self.assign(&entry.job, worker_id, queue).await;
            self.count("dequeued", queue).await;
            JobMetrics::job_dequeued(queue.name());
            debug!(job_id = %entry.job.id, worker_id = %worker_id, queue = %queue, "Dequeued routed job");

            return Some(entry);
        }

        None
    }

    /// Pop the first parseable entry of one sub-queue, dropping corrupt entries ahead of it.
    async fn pop_entry(&self, queue: RouterQueue) -> StoreResult<Option<RoutedEntry>> {
        while let Some(payload) = self.pop(queue).await? {
            match serde_json::from_str::<RoutedEntry>(&payload) {
                Ok(entry) => return Ok(Some(entry)),
                Err(e) => error!(queue = %queue, error = %e, "Dropping unparseable routed job"),
            }
        }
        Ok(None)
    }

    async fn pop(&self, queue: RouterQueue) -> StoreResult<Option<String>> {
        let key = self.queue_key(queue);
        if queue.is_scored() {
            Ok(self.store.zpopmax(&key).await?.map(|(member, _)| member))
        } else {
            self.store.lpop(&key).await
        }
    }

    async fn assign(&self, job: &Job, worker_id: &str, queue: RouterQueue) {
        let assignment = WorkerAssignment {
            worker_id: worker_id.to_string(),
            assigned_at: Utc::now(),
            status: JobStatus::Processing,
            queue: queue.name().to_string(),
        };
        let result = match serde_json::to_string(&assignment) {
            Ok(payload) => {
                self.store
                    .hset(&self.keys.assignments(), job.id.as_str(), &payload)
                    .await
            }
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!(job_id = %job.id, error = %e, "Failed to record worker assignment");
        }
    }

    /// Drop the assignment of a finished or rescheduled job.
    pub async fn release_assignment(&self, job_id: &str) -> bool {
        match self.store.hdel(&self.keys.assignments(), job_id).await {
            Ok(_) => true,
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Failed to release assignment");
                false
            }
        }
    }

    /// Promote the oldest jobs of oversized `normal` and `low` tiers.
    pub async fn rebalance(&self) -> RebalanceReport {
        let normal_to_high = self
            .promote(
                RouterQueue::Normal,
                RouterQueue::High,
                self.config.normal_rebalance_threshold,
                self.config.normal_promotion_cap,
            )
            .await;
        let low_to_normal = self
            .promote(
                RouterQueue::Low,
                RouterQueue::Normal,
                self.config.low_rebalance_threshold,
                self.config.low_promotion_cap,
            )
            .await;

        RebalanceReport {
            normal_to_high,
            low_to_normal,
        }
    }

    async fn promote(&self, from: RouterQueue, to: RouterQueue, threshold: u64, cap: u64) -> u64 {
        match self.try_promote(from, to, threshold, cap).await {
            Ok(moved) => moved,
            Err(e) => {
                error!(from = %from, to = %to, error = %e, "Rebalancing failed");
                0
            }
        }
    }

    async fn try_promote(
        &self,
        from: RouterQueue,
        to: RouterQueue,
        threshold: u64,
        cap: u64,
    ) -> StoreResult<u64> {
        let source = self.queue_key(from);
        let len = self.store.llen(&source).await?;
        if len <= threshold {
            return Ok(0);
        }

        let target = self.queue_key(to);
        let count = cap.min(len / self.config.promotion_divisor.max(1));
        let mut moved = 0;
        while moved < count {
            if self.store.lmove(&source, &target).await?.is_none() {
                break;
            }
            moved += 1;
        }

        if moved > 0 {
            JobMetrics::jobs_promoted(from.name(), to.name(), moved);
            info!(from = %from, to = %to, moved = moved, backlog = len, "Promoted jobs");
        }
        Ok(moved)
    }

    /// Remove assignments older than `max_age_minutes`.
    ///
    /// The underlying jobs are not requeued. Returns the removed job ids.
    pub async fn cleanup_expired_assignments(&self, max_age_minutes: i64) -> Vec<String> {
        self.cleanup_expired_assignments_at(max_age_minutes, Utc::now())
            .await
    }

    /// Remove assignments older than `max_age_minutes` as of `now`.
    pub async fn cleanup_expired_assignments_at(
        &self,
        max_age_minutes: i64,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let key = self.keys.assignments();
        let entries = match self.store.hgetall(&key).await {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "Failed to scan worker assignments");
                return Vec::new();
            }
        };

        let mut removed = Vec::new();
        for (job_id, raw) in entries {
            let expired = match serde_json::from_str::<WorkerAssignment>(&raw) {
                Ok(assignment) => {
                    let age = now - assignment.assigned_at;
                    if age.num_seconds() > max_age_minutes.saturating_mul(60) {
                        warn!(
                            job_id = %job_id,
                            worker_id = %assignment.worker_id,
                            age_minutes = age.num_minutes(),
                            "Removing stale worker assignment"
                        );
                        true
                    } else {
                        false
                    }
                }
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "Removing corrupted worker assignment");
                    true
                }
            };

            if expired {
                match self.store.hdel(&key, &job_id).await {
                    Ok(_) => removed.push(job_id),
                    Err(e) => error!(job_id = %job_id, error = %e, "Failed to remove assignment"),
                }
            }
        }

        removed.sort();
        removed
    }

    /// Jobs waiting in any sub-queue.
    pub async fn pending(&self) -> StoreResult<u64> {
        let mut total = 0;
        for queue in RouterQueue::DEQUEUE_ORDER {
            total += self.len(queue).await?;
        }
        Ok(total)
    }

    async fn len(&self, queue: RouterQueue) -> StoreResult<u64> {
        let key = self.queue_key(queue);
        if queue.is_scored() {
            self.store.zcard(&key).await
        } else {
            self.store.llen(&key).await
        }
    }

    /// Per-queue lengths, counters and health.
    pub async fn get_stats(&self) -> Option<RouterStats> {
        match self.try_stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                error!(error = %e, "Failed to read router stats");
                None
            }
        }
    }

    async fn try_stats(&self) -> StoreResult<RouterStats> {
        let mut queues = BTreeMap::new();
        let mut total_pending = 0;
        let mut urgent_pending = 0;

        for queue in RouterQueue::DEQUEUE_ORDER {
            let len = self.len(queue).await?;
            total_pending += len;
            if queue.is_fast_lane() {
                urgent_pending += len;
            }
            queues.insert(queue.name().to_string(), len);
        }

        let processing = self.store.hlen(&self.keys.assignments()).await?;
        let counters = self
            .store
            .hgetall(&self.keys.router_stats())
            .await?
            .into_iter()
            .filter_map(|(field, value)| value.parse::<u64>().ok().map(|v| (field, v)))
            .collect();

        let health = if urgent_pending > self.config.urgent_critical_threshold {
            HealthStatus::Critical
        } else if total_pending > self.config.pending_warning_threshold {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        };

        Ok(RouterStats {
            queues,
            total_pending,
            urgent_pending,
            processing,
            counters,
            health,
        })
    }

    async fn count(&self, action: &str, queue: RouterQueue) {
        let field = format!("{}:{}", action, queue.name());
        if let Err(e) = self.store.hincr(&self.keys.router_stats(), &field, 1).await {
            warn!(field = %field, error = %e, "Failed to update router stats");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::OrderSide;
    use crate::store::{InMemoryStore, MockKeyValueStore, StoreError};
    use chrono::Duration;

    fn router(store: Arc<dyn KeyValueStore>, config: RouterConfig) -> PriorityRouter {
        PriorityRouter::new(store, QueueKeys::new("test"), config)
    }

    fn job(priority: Priority) -> Job {
        Job::new("CL", OrderSide::Buy, 5.0).with_priority(priority)
    }

    #[test]
    fn test_select_queue_prefers_fast_lane() {
        let r = router(Arc::new(InMemoryStore::new()), RouterConfig::default());
        let low = job(Priority::Low);

        assert_eq!(
            r.select_queue(&low, &PriorityMetadata::with_urgency(Urgency::StopLoss)),
            RouterQueue::StopLoss
        );
        assert_eq!(
            r.select_queue(&job(Priority::Critical), &PriorityMetadata::default()),
            RouterQueue::Critical
        );
        assert_eq!(
            r.select_queue(&low, &PriorityMetadata::default()),
            RouterQueue::Low
        );
    }

    #[test]
    fn test_only_two_lanes_are_scored() {
        let scored: Vec<_> = RouterQueue::DEQUEUE_ORDER
            .into_iter()
            .filter(|q| q.is_scored())
            .collect();
        assert_eq!(scored, vec![RouterQueue::Liquidation, RouterQueue::Arbitrage]);
    }

    #[tokio::test]
    async fn test_liquidation_jumps_ahead() {
        let r = router(Arc::new(InMemoryStore::new()), RouterConfig::default());
        let normal = job(Priority::Normal);
        let liquidation = job(Priority::Low);

        assert!(r.enqueue_priority(&normal, &PriorityMetadata::default()).await);
        assert!(
            r.enqueue_priority(&liquidation, &PriorityMetadata::with_urgency(Urgency::Liquidation))
                .await
        );

        assert_eq!(r.dequeue_priority("w1").await.unwrap().id, liquidation.id);
        assert_eq!(r.dequeue_priority("w1").await.unwrap().id, normal.id);
        assert!(r.dequeue_priority("w1").await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_fast_lane_head_keeps_precedence() {
        let store = Arc::new(InMemoryStore::new());
        let r = router(store.clone(), RouterConfig::default());
        let low = job(Priority::Low);
        let liquidation = job(Priority::Normal);

        store
            .zadd("test:router:liquidation", "garbage", 1e9)
            .await
            .unwrap();
        r.enqueue_priority(&low, &PriorityMetadata::default()).await;
        r.enqueue_priority(&liquidation, &PriorityMetadata::with_urgency(Urgency::Liquidation))
            .await;

        assert_eq!(r.dequeue_priority("w1").await.unwrap().id, liquidation.id);
        assert_eq!(r.dequeue_priority("w1").await.unwrap().id, low.id);
        assert_eq!(store.zcard("test:router:liquidation").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_arbitrage_drains_by_score() {
        let r = router(Arc::new(InMemoryStore::new()), RouterConfig::default());
        let meta = PriorityMetadata::with_urgency(Urgency::Arbitrage);
        let small = job(Priority::Low);
        let big = job(Priority::Critical);

        r.enqueue_priority(&small, &meta).await;
        r.enqueue_priority(&big, &meta).await;

        assert_eq!(r.dequeue_priority("w1").await.unwrap().id, big.id);
        assert_eq!(r.dequeue_priority("w1").await.unwrap().id, small.id);
    }

    #[tokio::test]
    async fn test_dequeue_records_assignment() {
        let store = Arc::new(InMemoryStore::new());
        let r = router(store.clone(), RouterConfig::default());
        let j = job(Priority::Urgent);
        r.enqueue_priority(&j, &PriorityMetadata::default()).await;

        r.dequeue_priority("worker-2").await.unwrap();

        let raw = store
            .hget("test:router:assignments", j.id.as_str())
            .await
            .unwrap()
            .unwrap();
        let assignment: WorkerAssignment = serde_json::from_str(&raw).unwrap();
        assert_eq!(assignment.worker_id, "worker-2");
        assert_eq!(assignment.status, JobStatus::Processing);
        assert_eq!(assignment.queue, "urgent");

        assert!(r.release_assignment(j.id.as_str()).await);
        assert_eq!(store.hlen("test:router:assignments").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dequeue_routed_keeps_metadata() {
        let r = router(Arc::new(InMemoryStore::new()), RouterConfig::default());
        let j = job(Priority::Normal);
        let metadata = PriorityMetadata::with_urgency(Urgency::StopLoss).estimated_profit(120.0);
        r.enqueue_priority(&j, &metadata).await;

        let entry = r.dequeue_routed("w1").await.unwrap();
        assert_eq!(entry.job.id, j.id);
        assert_eq!(entry.metadata, metadata);
    }

    #[tokio::test]
    async fn test_rebalance_below_threshold_is_noop() {
        let config = RouterConfig {
            normal_rebalance_threshold: 5,
            ..RouterConfig::default()
        };
        let r = router(Arc::new(InMemoryStore::new()), config);
        for _ in 0..5 {
            r.enqueue_priority(&job(Priority::Normal), &PriorityMetadata::default())
                .await;
        }

        assert_eq!(r.rebalance().await, RebalanceReport::default());
    }

    #[tokio::test]
    async fn test_rebalance_moves_oldest_first() {
        let store = Arc::new(InMemoryStore::new());
        let config = RouterConfig {
            low_rebalance_threshold: 10,
            low_promotion_cap: 200,
            ..RouterConfig::default()
        };
        let r = router(store.clone(), config);
        let mut ids = Vec::new();
        for _ in 0..25 {
            let j = job(Priority::Low);
            ids.push(j.id.clone());
            r.enqueue_priority(&j, &PriorityMetadata::default()).await;
        }

        let report = r.rebalance().await;
        assert_eq!(report.low_to_normal, 2);
        assert_eq!(report.total(), 2);

        let promoted = store.lrange("test:router:normal", 0, -1).await.unwrap();
        let first: RoutedEntry = serde_json::from_str(&promoted[0]).unwrap();
        let second: RoutedEntry = serde_json::from_str(&promoted[1]).unwrap();
        assert_eq!(first.job.id, ids[0]);
        assert_eq!(second.job.id, ids[1]);
        assert_eq!(store.llen("test:router:low").await.unwrap(), 23);
    }

    #[tokio::test]
    async fn test_cleanup_removes_corrupted_and_stale() {
        let store = Arc::new(InMemoryStore::new());
        let r = router(store.clone(), RouterConfig::default());
        let now = Utc::now();

        let fresh = WorkerAssignment {
            worker_id: "w1".into(),
            assigned_at: now - Duration::minutes(5),
            status: JobStatus::Processing,
            queue: "high".into(),
        };
        let stale = WorkerAssignment {
            assigned_at: now - Duration::minutes(45),
            ..fresh.clone()
        };
        let key = "test:router:assignments";
        store
            .hset(key, "fresh", &serde_json::to_string(&fresh).unwrap())
            .await
            .unwrap();
        store
            .hset(key, "stale", &serde_json::to_string(&stale).unwrap())
            .await
            .unwrap();
        store.hset(key, "broken", "{").await.unwrap();

        let removed = r.cleanup_expired_assignments_at(30, now).await;
        assert_eq!(removed, vec!["broken".to_string(), "stale".to_string()]);
        assert_eq!(store.hlen(key).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stats_health_classification() {
        let config = RouterConfig {
            urgent_critical_threshold: 2,
            pending_warning_threshold: 4,
            ..RouterConfig::default()
        };
        let r = router(Arc::new(InMemoryStore::new()), config);
        let stop = PriorityMetadata::with_urgency(Urgency::StopLoss);

        assert_eq!(r.get_stats().await.unwrap().health, HealthStatus::Healthy);

        for _ in 0..5 {
            r.enqueue_priority(&job(Priority::Low), &PriorityMetadata::default())
                .await;
        }
        assert_eq!(r.get_stats().await.unwrap().health, HealthStatus::Warning);

        for _ in 0..3 {
            r.enqueue_priority(&job(Priority::Low), &stop).await;
        }
        let stats = r.get_stats().await.unwrap();
        assert_eq!(stats.health, HealthStatus::Critical);
        assert_eq!(stats.urgent_pending, 3);
        assert_eq!(stats.total_pending, 8);
        assert_eq!(stats.queues["stop_loss"], 3);
        assert_eq!(stats.counters["enqueued:low"], 5);
    }

    #[tokio::test]
    async fn test_store_failure_is_non_fatal() {
        let mut mock = MockKeyValueStore::new();
        mock.expect_rpush()
            .returning(|_, _| Err(StoreError::Unavailable("down".into())));
        mock.expect_zpopmax()
            .returning(|_| Err(StoreError::Unavailable("down".into())));
        mock.expect_hgetall()
            .returning(|_| Err(StoreError::Unavailable("down".into())));
        mock.expect_llen()
            .returning(|_| Err(StoreError::Unavailable("down".into())));

        let r = router(Arc::new(mock), RouterConfig::default());

        assert!(!r.enqueue_priority(&job(Priority::Normal), &PriorityMetadata::default()).await);
        assert!(r.dequeue_priority("w1").await.is_none());
        assert!(r.cleanup_expired_assignments(30).await.is_empty());
        assert_eq!(r.rebalance().await.total(), 0);
    }
}
