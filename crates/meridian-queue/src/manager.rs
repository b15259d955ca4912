//! Worker pool and background maintenance over the work queue and router.
//!
//! Per-job state machine:
//!
//! ```text
//! PENDING -> PROCESSING -> COMPLETED
//!                       -> RETRY_SCHEDULED -> PENDING (after backoff)
//!                       -> FAILED (retry budget exhausted)
//! ```
//!
//! Workers share nothing in process. Each one polls the store on its own and
//! relies on atomic pops for exclusion. Delivery is at-least-once.

use crate::error::{QueueError, QueueResult};
use crate::executor::JobExecutor;
use crate::job::{Job, JobOutcome};
use crate::keys::QueueKeys;
use crate::metrics::{register_metrics, JobMetrics, WorkerMetrics};
use crate::priority::PriorityMetadata;
use crate::router::PriorityRouter;
use crate::stats::{ComprehensiveStats, HealthStatus};
use crate::store::{KeyValueStore, StoreResult};
use crate::work_queue::{RetryDisposition, WorkQueue};
use crate::worker_registry::WorkerRegistry;
use futures::future::join_all;
use meridian_config::{AppConfig, MaintenanceConfig, QueueConfig, WorkerConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, info_span, warn, Instrument};

struct WorkerHandle {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// State shared between the manager, its workers and background tasks.
struct Shared {
    store: Arc<dyn KeyValueStore>,
    work_queue: WorkQueue,
    router: Arc<PriorityRouter>,
    executor: Arc<dyn JobExecutor>,
    registry: WorkerRegistry,
    workers: Mutex<HashMap<String, WorkerHandle>>,
    worker_config: WorkerConfig,
    queue_config: QueueConfig,
    maintenance: MaintenanceConfig,
    running: AtomicBool,
    started_at: Mutex<Option<Instant>>,
}

/// Owns the worker pool and the background maintenance tasks.
pub struct QueueManager {
    shared: Arc<Shared>,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl QueueManager {
    /// Build a manager. Nothing runs until [`QueueManager::start`].
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        executor: Arc<dyn JobExecutor>,
        config: &AppConfig,
    ) -> Self {
        let keys = QueueKeys::new(&config.redis.key_prefix);
        let router = Arc::new(PriorityRouter::new(
            store.clone(),
            keys.clone(),
            config.router.clone(),
        ));
        let work_queue = WorkQueue::new(store.clone(), keys, config.queue.clone())
            .with_router(router.clone());

        Self {
            shared: Arc::new(Shared {
                store,
                work_queue,
                router,
                executor,
                registry: WorkerRegistry::new(),
                workers: Mutex::new(HashMap::new()),
                worker_config: config.workers.clone(),
                queue_config: config.queue.clone(),
                maintenance: config.maintenance.clone(),
                running: AtomicBool::new(false),
                started_at: Mutex::new(None),
            }),
            background: Mutex::new(Vec::new()),
        }
    }

    /// The underlying work queue.
    pub fn work_queue(&self) -> &WorkQueue {
        &self.shared.work_queue
    }

    /// The underlying priority router.
    pub fn router(&self) -> &PriorityRouter {
        &self.shared.router
    }

    /// Per-worker counters.
    pub fn registry(&self) -> &WorkerRegistry {
        &self.shared.registry
    }

    /// Returns true between a successful `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// IDs of the worker execution units, sorted.
    pub fn worker_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.shared.workers.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Verify the store, spawn the workers and start background tasks.
    pub async fn start(&self) -> QueueResult<()> {
        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(QueueError::AlreadyRunning);
        }

        if let Err(e) = self.shared.store.ping().await {
            self.shared.running.store(false, Ordering::SeqCst);
            error!(error = %e, "Store unreachable, queue manager not started");
            return Err(e.into());
        }

        register_metrics();
        *self.shared.started_at.lock() = Some(Instant::now());

        let count = self.shared.worker_config.count;
        for i in 0..count {
            self.spawn_worker(format!("worker-{}", i));
        }

        let maintenance = &self.shared.maintenance;
        let tasks = vec![
            self.spawn_periodic("retry_processor", maintenance.retry_interval(), |shared| async move {
                shared.work_queue.process_retry_queue().await;
            }),
            self.spawn_periodic("rebalancer", maintenance.rebalance_interval(), |shared| async move {
                shared.router.rebalance().await;
                shared
                    .router
                    .cleanup_expired_assignments(shared.maintenance.assignment_max_age_minutes)
                    .await;
            }),
            self.spawn_periodic("health_monitor", maintenance.health_interval(), |shared| async move {
                shared.monitor_health().await;
            }),
        ];
        self.background.lock().extend(tasks);

        WorkerMetrics::update_workers(count);
        info!(workers = count, "Queue manager started");
        Ok(())
    }

    fn spawn_worker(&self, worker_id: String) {
        let (stop, stop_rx) = watch::channel(false);
        self.shared.registry.register(&worker_id);

        let span = info_span!("worker", worker_id = %worker_id);
        let handle = tokio::spawn(
            worker_loop(self.shared.clone(), worker_id.clone(), stop_rx).instrument(span),
        );

        self.shared
            .workers
            .lock()
            .insert(worker_id, WorkerHandle { stop, handle });
    }

    fn spawn_periodic<F, Fut>(&self, name: &'static str, period: Duration, tick: F) -> JoinHandle<()>
    where
        F: Fn(Arc<Shared>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let shared = self.shared.clone();
        tokio::spawn(
            async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    interval.tick().await;
                    tick(shared.clone()).await;
                }
            }
            .instrument(info_span!("maintenance", task = name)),
        )
    }

    /// Submit a job.
    ///
    /// Refused once the total backlog reaches `max_queue_size`. Jobs with
    /// metadata, or at or above the router threshold, go to the router.
    pub async fn enqueue(&self, job: &Job, metadata: Option<&PriorityMetadata>) -> bool {
        let shared = &self.shared;
        let pending = match shared.total_pending().await {
            Ok(pending) => pending,
            Err(e) => {
                error!(job_id = %job.id, error = %e, "Failed to read backlog, rejecting job");
                return false;
            }
        };

        if pending >= shared.queue_config.max_queue_size {
            warn!(
                job_id = %job.id,
                pending = pending,
                max_queue_size = shared.queue_config.max_queue_size,
                "Queue full, rejecting job"
            );
            JobMetrics::job_rejected();
            return false;
        }

        match metadata {
            Some(metadata) => shared.router.enqueue_priority(job, metadata).await,
            None if job.priority.as_u8() >= shared.queue_config.router_priority_threshold => {
                shared
                    .router
                    .enqueue_priority(job, &PriorityMetadata::default())
                    .await
            }
            None => shared.work_queue.enqueue(job).await,
        }
    }

    /// Stop workers at their next poll boundary and cancel background tasks.
    pub async fn stop(&self) -> QueueResult<()> {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return Err(QueueError::NotRunning);
        }
        info!("Stopping queue manager");

        for task in self.background.lock().drain(..) {
            task.abort();
        }

        let workers: Vec<(String, WorkerHandle)> = self.shared.workers.lock().drain().collect();
        let timeout = self.shared.worker_config.shutdown_timeout();
        let stopped = join_all(
            workers
                .into_iter()
                .map(|(id, worker)| stop_worker(id, worker, timeout)),
        )
        .await;

        for id in stopped {
            self.shared.registry.mark_stopped(&id);
        }
        *self.shared.started_at.lock() = None;
        WorkerMetrics::update_workers(0);

        info!("Queue manager stopped");
        Ok(())
    }

    /// Replace one worker's execution unit, keeping its id.
    pub async fn restart_worker(&self, worker_id: &str) -> QueueResult<()> {
        if !self.is_running() {
            return Err(QueueError::NotRunning);
        }

        let worker = self
            .shared
            .workers
            .lock()
            .remove(worker_id)
            .ok_or_else(|| QueueError::WorkerNotFound(worker_id.to_string()))?;

        let id = stop_worker(
            worker_id.to_string(),
            worker,
            self.shared.worker_config.shutdown_timeout(),
        )
        .await;
        self.shared.registry.mark_stopped(&id);
        self.spawn_worker(id);

        info!(
            worker_id = %worker_id,
            registrations = self.shared.registry.total_registrations(),
            "Worker restarted"
        );
        Ok(())
    }

    /// Aggregate queue, router and worker stats with an overall health flag.
    pub async fn get_comprehensive_stats(&self) -> ComprehensiveStats {
        self.shared.comprehensive_stats().await
    }
}

impl Drop for QueueManager {
    fn drop(&mut self) {
        for task in self.background.get_mut().drain(..) {
            task.abort();
        }
        for worker in self.shared.workers.lock().values() {
            let _ = worker.stop.send(true);
        }
    }
}

/// Signal a worker and wait up to `timeout` for it to exit. Returns its id.
async fn stop_worker(worker_id: String, mut worker: WorkerHandle, timeout: Duration) -> String {
    let _ = worker.stop.send(true);
    if tokio::time::timeout(timeout, &mut worker.handle).await.is_err() {
        warn!(
            worker_id = %worker_id,
            timeout_secs = timeout.as_secs(),
            "Worker did not stop in time, aborting"
        );
        worker.handle.abort();
    }
    worker_id
}

async fn worker_loop(shared: Arc<Shared>, worker_id: String, mut stop: watch::Receiver<bool>) {
    debug!("Worker started");
    let mut empty_polls: u32 = 0;

    loop {
        if *stop.borrow() {
            break;
        }

        shared.work_queue.process_retry_queue().await;

        if let Some((job, metadata)) = shared.next_job(&worker_id).await {
            empty_polls = 0;
            shared.run_job(&worker_id, job, metadata).await;
            continue;
        }

        empty_polls = empty_polls.saturating_add(1);
        let delay = shared.worker_config.poll_delay(empty_polls);
        let sender_gone = tokio::select! {
            () = tokio::time::sleep(delay) => false,
            changed = stop.changed() => changed.is_err(),
        };
        if sender_gone {
            break;
        }
    }

    shared.registry.mark_stopped(&worker_id);
    debug!("Worker stopped");
}

impl Shared {
    async fn total_pending(&self) -> StoreResult<u64> {
        Ok(self.work_queue.pending().await? + self.router.pending().await?)
    }

    /// Next job, router first. Routed jobs carry their metadata.
    async fn next_job(&self, worker_id: &str) -> Option<(Job, Option<PriorityMetadata>)> {
        if let Some(entry) = self.router.dequeue_routed(worker_id).await {
            return Some((entry.job, Some(entry.metadata)));
        }
        self.work_queue
            .dequeue(worker_id)
            .await
            .map(|job| (job, None))
    }

    async fn run_job(&self, worker_id: &str, job: Job, metadata: Option<PriorityMetadata>) {
        let job_timeout = self.worker_config.job_timeout();
        let started = Instant::now();

        let outcome = match tokio::time::timeout(job_timeout, self.executor.execute(&job)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(job_id = %job.id, timeout_secs = job_timeout.as_secs(), "Job timed out");
                JobOutcome::failure(format!("Timed out after {}s", job_timeout.as_secs()))
            }
        };

        JobMetrics::job_finished(outcome.success, started.elapsed());
        self.registry.record_outcome(worker_id, outcome.success);

        if outcome.success {
            self.work_queue.complete(job.id.as_str(), &outcome).await;
        } else {
            match self.work_queue.fail(&job, &outcome, metadata.as_ref()).await {
                RetryDisposition::Scheduled { delay_seconds, .. } => {
                    debug!(job_id = %job.id, delay_seconds = delay_seconds, "Job failed, retry scheduled");
                }
                RetryDisposition::DeadLettered { .. } => {}
                RetryDisposition::Unavailable => {
                    // Processing record and assignment stay so the job can still be found.
                    error!(job_id = %job.id, "Job failed and could not be rescheduled");
                    return;
                }
            }
        }

        if metadata.is_some() {
            self.router.release_assignment(job.id.as_str()).await;
        }
    }

    fn uptime(&self) -> Duration {
        self.started_at
            .lock()
            .map_or(Duration::ZERO, |started| started.elapsed())
    }

    async fn comprehensive_stats(&self) -> ComprehensiveStats {
        let work_queue = self.work_queue.get_stats().await;
        let router = self.router.get_stats().await;

        let total_pending = work_queue.as_ref().map_or(0, |s| s.pending())
            + router.as_ref().map_or(0, |s| s.total_pending);
        let configured_workers = self.worker_config.count;
        let active_workers = self.registry.active_worker_count();
        let max_queue_size = self.queue_config.max_queue_size;

        ComprehensiveStats {
            running: self.running.load(Ordering::SeqCst),
            uptime_secs: self.uptime().as_secs(),
            configured_workers,
            active_workers,
            total_pending,
            max_queue_size,
            health: classify_health(total_pending, max_queue_size, active_workers, configured_workers),
            work_queue,
            router,
            workers: self.registry.stats(),
        }
    }

    async fn monitor_health(&self) {
        self.reap_crashed_workers();

        let stats = self.comprehensive_stats().await;
        let processing = stats.work_queue.as_ref().map_or(0, |s| s.processing)
            + stats.router.as_ref().map_or(0, |s| s.processing);
        JobMetrics::update_backlog(stats.total_pending, processing);
        WorkerMetrics::update_workers(stats.active_workers);

        match stats.health {
            HealthStatus::Critical => error!(
                pending = stats.total_pending,
                active_workers = stats.active_workers,
                configured_workers = stats.configured_workers,
                "Queue health critical"
            ),
            HealthStatus::Warning => warn!(
                pending = stats.total_pending,
                active_workers = stats.active_workers,
                configured_workers = stats.configured_workers,
                "Queue health degraded"
            ),
            HealthStatus::Healthy => debug!(
                pending = stats.total_pending,
                active_workers = stats.active_workers,
                "Queue healthy"
            ),
        }
    }

    /// Mark workers whose task ended without being stopped.
    fn reap_crashed_workers(&self) {
        let workers = self.workers.lock();
        for (id, worker) in workers.iter() {
            let marked_running = self.registry.get_worker(id).is_some_and(|w| w.running);
            if worker.handle.is_finished() && marked_running {
                self.registry.mark_stopped(id);
                error!(worker_id = %id, "Worker exited unexpectedly");
            }
        }
    }
}

/// Overall health from backlog against capacity and live against configured workers.
///
/// Critical above 90% capacity or below half the workers; warning above 70%
/// or below 80% of the workers.
pub fn classify_health(
    pending: u64,
    capacity: u64,
    active_workers: usize,
    configured_workers: usize,
) -> HealthStatus {
    let load = pending as f64 / capacity.max(1) as f64;
    let availability = if configured_workers == 0 {
        1.0
    } else {
        active_workers as f64 / configured_workers as f64
    };

    if load > 0.9 || availability < 0.5 {
        HealthStatus::Critical
    } else if load > 0.7 || availability < 0.8 {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}
