//! FIFO work queue with a priority split, retry schedule and dead-letter queue.
//!
//! Layout in the store:
//!
//! | Key                | Type       | Contents                         |
//! |--------------------|------------|----------------------------------|
//! | `queue:priority`   | list       | serialized [`Job`], FIFO         |
//! | `queue:normal`     | list       | serialized [`Job`], FIFO         |
//! | `processing`       | hash       | job id -> [`ProcessingRecord`]   |
//! | `retry`            | sorted set | [`RetryRecord`] scored by ready_at ms |
//! | `failed`           | list       | [`FailedRecord`], oldest first   |
//! | `stats`            | hash       | action counters + `last_updated` |
//!
//! Store failures never escape: they are logged and reported as `false`,
//! `None` or an empty collection so the caller can try again later.
//!
//! A retry record keeps the routing metadata of a job that came from the
//! priority router. When a router is attached, due retries of such jobs go
//! back through it instead of onto the lists above.

use crate::job::{FailedRecord, Job, JobOutcome, ProcessingRecord, RetryRecord};
use crate::keys::QueueKeys;
use crate::metrics::JobMetrics;
use crate::priority::PriorityMetadata;
use crate::retry::RetryPolicy;
use crate::router::PriorityRouter;
use crate::stats::{HealthStatus, QueueCounters, WorkQueueStats};
use crate::store::{KeyValueStore, StoreError, StoreResult};
use chrono::{DateTime, Utc};
use meridian_config::QueueConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const NORMAL: &str = "normal";
const PRIORITY: &str = "priority";

/// What `retry` did with a job.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDisposition {
    /// The job is on the retry schedule with its incremented retry count.
    Scheduled {
        job: Job,
        ready_at: DateTime<Utc>,
        delay_seconds: u64,
    },
    /// The retry budget was exhausted; the job is in the dead-letter queue.
    DeadLettered { reason: String },
    /// The store call failed; nothing was written and the processing
    /// record is left in place.
    Unavailable,
}

/// FIFO + priority work queue.
pub struct WorkQueue {
    store: Arc<dyn KeyValueStore>,
    keys: QueueKeys,
    config: QueueConfig,
    retry_policy: RetryPolicy,
    router: Option<Arc<PriorityRouter>>,
}

impl WorkQueue {
    /// Create a work queue over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, keys: QueueKeys, config: QueueConfig) -> Self {
        let retry_policy = RetryPolicy::from(&config);
        Self {
            store,
            keys,
            config,
            retry_policy,
            router: None,
        }
    }

    /// Re-route due retries of routed jobs through `router`.
    pub fn with_router(mut self, router: Arc<PriorityRouter>) -> Self {
        self.router = Some(router);
        self
    }

    /// Returns the retry policy in use.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Push a job onto the priority or normal list.
    pub async fn enqueue(&self, job: &Job) -> bool {
        match self.try_enqueue(job).await {
            Ok(queue) => {
                debug!(job_id = %job.id, queue = queue, priority = %job.priority, "Enqueued job");
                true
            }
            Err(e) => {
                error!(job_id = %job.id, error = %e, "Failed to enqueue job");
                false
            }
        }
    }

    async fn try_enqueue(&self, job: &Job) -> StoreResult<&'static str> {
        let payload = job.to_json()?;
        let (key, queue) = if job.priority.as_u8() >= self.config.high_priority_threshold {
            (self.keys.priority(), PRIORITY)
        } else {
            (self.keys.normal(), NORMAL)
        };

        self.store.rpush(&key, &payload).await?;
        self.record("enqueued").await;
        JobMetrics::job_enqueued(queue, job.priority.as_u8());

        Ok(queue)
    }

    /// Pop the next job, priority list first. Never blocks.
    pub async fn dequeue(&self, worker_id: &str) -> Option<Job> {
        match self.try_dequeue(worker_id).await {
            Ok(job) => job,
            Err(e) => {
                error!(worker_id = %worker_id, error = %e, "Failed to dequeue job");
                None
            }
        }
    }

    async fn try_dequeue(&self, worker_id: &str) -> StoreResult<Option<Job>> {
        for (key, queue) in [(self.keys.priority(), PRIORITY), (self.keys.normal(), NORMAL)] {
            let Some(job) = self.pop_job(&key, queue).await? else {
                continue;
            };

            let record = ProcessingRecord {
                job: job.clone(),
                started_at: Utc::now(),
                worker_id: worker_id.to_string(),
                source_queue: queue.to_string(),
            };
            // The job is already popped; losing the record only hurts observability.
            if let Err(e) = self.write_processing(&record).await {
                warn!(job_id = %job.id, error = %e, "Failed to record processing job");
            }

            self.record("dequeued").await;
            JobMetrics::job_dequeued(queue);
            debug!(job_id = %job.id, worker_id = %worker_id, queue = queue, "Dequeued job");

            return Ok(Some(job));
        }

        Ok(None)
    }

    /// Pop the first parseable job of one list, dropping corrupt entries ahead of it.
    async fn pop_job(&self, key: &str, queue: &str) -> StoreResult<Option<Job>> {
        while let Some(payload) = self.store.lpop(key).await? {
            match Job::from_json(&payload) {
                Ok(job) => return Ok(Some(job)),
                Err(e) => error!(queue = queue, error = %e, "Dropping unparseable job"),
            }
        }
        Ok(None)
    }

    async fn write_processing(&self, record: &ProcessingRecord) -> StoreResult<()> {
        let payload = serde_json::to_string(record)?;
        self.store
            .hset(&self.keys.processing(), record.job.id.as_str(), &payload)
            .await
    }

    /// Clear the processing record and count the outcome.
    pub async fn complete(&self, job_id: &str, outcome: &JobOutcome) -> bool {
        if let Err(e) = self.store.hdel(&self.keys.processing(), job_id).await {
            error!(job_id = %job_id, error = %e, "Failed to complete job");
            return false;
        }

        if outcome.success {
            self.record("completed").await;
            debug!(job_id = %job_id, "Job completed");
        } else {
            self.record("failed").await;
            debug!(job_id = %job_id, reason = ?outcome.message, "Job failed");
        }
        true
    }

    /// Count a failed attempt and hand the job to the retry schedule.
    ///
    /// Unlike [`WorkQueue::complete`] the processing record is only cleared
    /// once the retry or dead-letter entry is written.
    pub async fn fail(
        &self,
        job: &Job,
        outcome: &JobOutcome,
        metadata: Option<&PriorityMetadata>,
    ) -> RetryDisposition {
        self.record("failed").await;
        debug!(job_id = %job.id, reason = ?outcome.message, "Job failed");
        self.retry_with_metadata(job, metadata).await
    }

    /// Schedule another attempt or dead-letter the job once its budget is spent.
    pub async fn retry(&self, job: &Job) -> RetryDisposition {
        self.retry_with_metadata(job, None).await
    }

    /// Like [`WorkQueue::retry`], remembering where the router placed the job.
    pub async fn retry_with_metadata(
        &self,
        job: &Job,
        metadata: Option<&PriorityMetadata>,
    ) -> RetryDisposition {
        let result = if job.can_retry() {
            self.schedule_retry(job, metadata).await
        } else {
            self.dead_letter(job).await
        };

        result.unwrap_or_else(|e| {
            error!(job_id = %job.id, error = %e, "Failed to retry job");
            RetryDisposition::Unavailable
        })
    }

    async fn schedule_retry(
        &self,
        job: &Job,
        metadata: Option<&PriorityMetadata>,
    ) -> StoreResult<RetryDisposition> {
        let mut next = job.clone();
        next.retry_count += 1;

        let delay_seconds = self.retry_policy.delay_secs(next.retry_count);
        let now = Utc::now();
        let ready_at = i64::try_from(delay_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|delay| now.checked_add_signed(delay))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let record = RetryRecord {
            job: next.clone(),
            ready_at,
            delay_seconds,
            metadata: metadata.cloned(),
        };
        let payload = serde_json::to_string(&record)?;

        self.store
            .zadd(&self.keys.retry(), &payload, ready_at.timestamp_millis() as f64)
            .await?;
        self.clear_processing(job).await;

        self.record("retried").await;
        JobMetrics::job_retried(next.retry_count);
        debug!(
            job_id = %job.id,
            retry_count = next.retry_count,
            delay_seconds = delay_seconds,
            "Scheduled retry"
        );

        Ok(RetryDisposition::Scheduled {
            job: next,
            ready_at,
            delay_seconds,
        })
    }

    async fn dead_letter(&self, job: &Job) -> StoreResult<RetryDisposition> {
        let reason = format!("Max retries ({}) exceeded", job.max_retries);
        let record = FailedRecord {
            job: job.clone(),
            failed_at: Utc::now(),
            reason: reason.clone(),
        };
        let payload = serde_json::to_string(&record)?;

        self.store.rpush(&self.keys.failed(), &payload).await?;
        self.clear_processing(job).await;

        self.record("dead_lettered").await;
        JobMetrics::job_dead_lettered();
        warn!(job_id = %job.id, reason = %reason, "Job moved to dead-letter queue");

        Ok(RetryDisposition::DeadLettered { reason })
    }

    // The job already sits in its next state; a leftover record only shows up in `stuck_jobs`.
    async fn clear_processing(&self, job: &Job) {
        if let Err(e) = self
            .store
            .hdel(&self.keys.processing(), job.id.as_str())
            .await
        {
            warn!(job_id = %job.id, error = %e, "Failed to clear processing record");
        }
    }

    /// Re-enqueue every retry whose `ready_at` has passed.
    pub async fn process_retry_queue(&self) -> Vec<Job> {
        self.process_retry_queue_at(Utc::now()).await
    }

    /// Re-enqueue every retry with `ready_at <= now`.
    ///
    /// Due records are removed from the schedule in one atomic step. Records
    /// that fail to parse are dropped. Records that cannot be re-enqueued go
    /// back on the schedule.
    pub async fn process_retry_queue_at(&self, now: DateTime<Utc>) -> Vec<Job> {
        let retry_key = self.keys.retry();
        let due = match self
            .store
            .zpop_range_by_score(&retry_key, 0.0, now.timestamp_millis() as f64)
            .await
        {
            Ok(due) => due,
            Err(e) => {
                error!(error = %e, "Failed to read retry schedule");
                return Vec::new();
            }
        };

        let mut requeued = Vec::with_capacity(due.len());
        for member in due {
            let record: RetryRecord = match serde_json::from_str(&member) {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "Dropping unparseable retry record");
                    continue;
                }
            };

            let requeued_ok = match (&self.router, &record.metadata) {
                (Some(router), Some(metadata)) => {
                    router.enqueue_priority(&record.job, metadata).await
                }
                _ => self.enqueue(&record.job).await,
            };
            if requeued_ok {
                requeued.push(record.job);
            } else if let Err(e) = self
                .store
                .zadd(&retry_key, &member, record.ready_at.timestamp_millis() as f64)
                .await
            {
                error!(job_id = %record.job.id, error = %e, "Lost retry while restoring schedule");
            }
        }

        if !requeued.is_empty() {
            info!(count = requeued.len(), "Re-enqueued ready retries");
        }
        requeued
    }

    /// Jobs waiting in either list.
    pub async fn pending(&self) -> StoreResult<u64> {
        let normal = self.store.llen(&self.keys.normal()).await?;
        let priority = self.store.llen(&self.keys.priority()).await?;
        Ok(normal + priority)
    }

    /// Queue lengths, counters and health.
    pub async fn get_stats(&self) -> Option<WorkQueueStats> {
        match self.try_stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                error!(error = %e, "Failed to read work queue stats");
                None
            }
        }
    }

    async fn try_stats(&self) -> StoreResult<WorkQueueStats> {
        let processing = self.store.hlen(&self.keys.processing()).await?;
        let health = if processing > self.config.processing_warning_threshold {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        };

        Ok(WorkQueueStats {
            normal: self.store.llen(&self.keys.normal()).await?,
            priority: self.store.llen(&self.keys.priority()).await?,
            processing,
            failed: self.store.llen(&self.keys.failed()).await?,
            retry: self.store.zcard(&self.keys.retry()).await?,
            counters: QueueCounters::from_hash(&self.store.hgetall(&self.keys.stats()).await?),
            health,
        })
    }

    /// Up to `limit` dead-letter records, newest last.
    pub async fn list_failed(&self, limit: usize) -> Vec<FailedRecord> {
        if limit == 0 {
            return Vec::new();
        }
        let start = -i64::try_from(limit).unwrap_or(i64::MAX);
        match self.store.lrange(&self.keys.failed(), start, -1).await {
            Ok(entries) => entries
                .iter()
                .filter_map(|entry| serde_json::from_str(entry).ok())
                .collect(),
            Err(e) => {
                error!(error = %e, "Failed to list dead-letter queue");
                Vec::new()
            }
        }
    }

    /// Move a dead-lettered job back to pending with a fresh retry budget.
    pub async fn requeue_failed(&self, job_id: &str) -> bool {
        let record = match self.take_failed(job_id).await {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                debug!(job_id = %job_id, "Job not in dead-letter queue");
                return false;
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Failed to requeue dead-lettered job");
                return false;
            }
        };

        let mut job = record.job;
        job.retry_count = 0;
        let requeued = self.enqueue(&job).await;
        if requeued {
            info!(job_id = %job_id, "Requeued dead-lettered job");
        }
        requeued
    }

    async fn take_failed(&self, job_id: &str) -> StoreResult<FailedRecord> {
        let key = self.keys.failed();
        for entry in self.store.lrange(&key, 0, -1).await? {
            match serde_json::from_str::<FailedRecord>(&entry) {
                Ok(record) if record.job.id.as_str() == job_id => {
                    if self.store.lrem(&key, &entry).await? > 0 {
                        return Ok(record);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Removing unparseable dead-letter entry");
                    self.store.lrem(&key, &entry).await?;
                }
            }
        }
        Err(StoreError::NotFound(job_id.to_string()))
    }

    /// Processing records that started more than `older_than` ago.
    pub async fn stuck_jobs(&self, older_than: Duration) -> Vec<ProcessingRecord> {
        let cutoff = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        match self.store.hgetall(&self.keys.processing()).await {
            Ok(entries) => {
                let mut stuck: Vec<ProcessingRecord> = entries
                    .values()
                    .filter_map(|v| serde_json::from_str::<ProcessingRecord>(v).ok())
                    .filter(|record| record.started_at <= cutoff)
                    .collect();
                stuck.sort_by_key(|record| record.started_at);
                stuck
            }
            Err(e) => {
                error!(error = %e, "Failed to scan processing records");
                Vec::new()
            }
        }
    }

    async fn record(&self, action: &str) {
        let key = self.keys.stats();
        if let Err(e) = self.store.hincr(&key, action, 1).await {
            warn!(action = action, error = %e, "Failed to update queue stats");
            return;
        }
        if let Err(e) = self
            .store
            .hset(&key, "last_updated", &Utc::now().to_rfc3339())
            .await
        {
            warn!(error = %e, "Failed to stamp queue stats");
        }
    }
}
