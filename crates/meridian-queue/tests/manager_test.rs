//! End-to-end tests for the QueueManager worker pool.

mod common;

use async_trait::async_trait;
use common::{fast_config, order, wait_until};
use meridian_queue::{
    HealthStatus, InMemoryStore, Job, JobExecutor, JobOutcome, Priority, PriorityMetadata,
    QueueManager, Urgency,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Records every executed job id and answers with a fixed outcome.
struct RecordingExecutor {
    succeed: bool,
    seen: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    fn new(succeed: bool) -> Arc<Self> {
        Arc::new(Self {
            succeed,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn count(&self) -> usize {
        self.seen.lock().len()
    }
}

#[async_trait]
impl JobExecutor for RecordingExecutor {
    async fn execute(&self, job: &Job) -> JobOutcome {
        self.seen.lock().push(job.id.as_str().to_string());
        if self.succeed {
            JobOutcome::success()
        } else {
            JobOutcome::failure("broker rejected order")
        }
    }
}

struct SlowExecutor;

#[async_trait]
impl JobExecutor for SlowExecutor {
    async fn execute(&self, _job: &Job) -> JobOutcome {
        tokio::time::sleep(Duration::from_secs(30)).await;
        JobOutcome::success()
    }
}

#[tokio::test]
async fn test_workers_drain_both_paths() {
    let executor = RecordingExecutor::new(true);
    let manager = QueueManager::new(
        Arc::new(InMemoryStore::new()),
        executor.clone(),
        &fast_config(2),
    );
    manager.start().await.unwrap();
    let (manager, executor) = (&manager, &executor);

    assert!(manager.enqueue(&order(Priority::Normal), None).await);
    assert!(manager.enqueue(&order(Priority::Critical), None).await);
    assert!(
        manager
            .enqueue(
                &order(Priority::Low),
                Some(&PriorityMetadata::with_urgency(Urgency::MarketClose))
            )
            .await
    );

    assert!(wait_until(|| async move { executor.count() == 3 }).await);
    assert!(
        wait_until(|| async move {
            manager
                .work_queue()
                .get_stats()
                .await
                .is_some_and(|s| s.counters.completed == 3)
        })
        .await
    );

    let stats = manager.get_comprehensive_stats().await;
    assert!(stats.running);
    assert_eq!(stats.total_pending, 0);
    assert_eq!(stats.active_workers, 2);
    assert_eq!(stats.health, HealthStatus::Healthy);
    assert_eq!(stats.router.unwrap().processing, 0);
    let processed: u64 = stats.workers.iter().map(|w| w.processed).sum();
    assert_eq!(processed, 3);

    manager.stop().await.unwrap();
}

#[tokio::test]
async fn test_failing_job_ends_in_dead_letter_queue() {
    let executor = RecordingExecutor::new(false);
    let manager = QueueManager::new(
        Arc::new(InMemoryStore::new()),
        executor.clone(),
        &fast_config(1),
    );
    manager.start().await.unwrap();
    let (manager, executor) = (&manager, &executor);

    let job = order(Priority::Normal).with_max_retries(2);
    assert!(manager.enqueue(&job, None).await);

    assert!(
        wait_until(|| async move { !manager.work_queue().list_failed(10).await.is_empty() })
            .await
    );

    let failed = manager.work_queue().list_failed(10).await;
    assert_eq!(failed[0].job.id, job.id);
    assert_eq!(failed[0].reason, "Max retries (2) exceeded");
    assert_eq!(executor.count(), 3);

    let worker = manager.registry().get_worker("worker-0").unwrap();
    assert_eq!(worker.jobs_failed, 3);

    manager.stop().await.unwrap();
}

#[tokio::test]
async fn test_timed_out_job_counts_as_failure() {
    let manager = QueueManager::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(SlowExecutor),
        &fast_config(1),
    );
    manager.start().await.unwrap();
    let manager = &manager;

    let job = order(Priority::Normal).with_max_retries(0);
    manager.enqueue(&job, None).await;

    assert!(
        wait_until(|| async move { !manager.work_queue().list_failed(1).await.is_empty() })
            .await
    );
    assert_eq!(manager.registry().get_worker("worker-0").unwrap().jobs_failed, 1);

    manager.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_aborts_worker_stuck_past_shutdown_timeout() {
    let mut config = fast_config(1);
    config.workers.job_timeout_secs = 30;
    config.workers.shutdown_timeout_secs = 1;
    let manager = QueueManager::new(Arc::new(InMemoryStore::new()), Arc::new(SlowExecutor), &config);
    manager.start().await.unwrap();
    let manager = &manager;

    manager.enqueue(&order(Priority::Normal), None).await;
    assert!(
        wait_until(|| async move {
            manager
                .work_queue()
                .get_stats()
                .await
                .is_some_and(|s| s.processing == 1)
        })
        .await
    );

    let started = Instant::now();
    manager.stop().await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(900), "stopped after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "stopped after {elapsed:?}");
    assert!(!manager.is_running());
    assert!(manager.worker_ids().is_empty());
    assert!(!manager.registry().get_worker("worker-0").unwrap().running);
    assert_eq!(manager.registry().active_worker_count(), 0);

    // The interrupted job is still visible as processing.
    assert_eq!(manager.work_queue().stuck_jobs(Duration::ZERO).await.len(), 1);
}

#[tokio::test]
async fn test_restart_worker_keeps_id_and_counters() {
    let executor = RecordingExecutor::new(true);
    let manager = QueueManager::new(
        Arc::new(InMemoryStore::new()),
        executor.clone(),
        &fast_config(1),
    );
    manager.start().await.unwrap();
    let (manager, executor) = (&manager, &executor);

    manager.enqueue(&order(Priority::Normal), None).await;
    assert!(wait_until(|| async move { executor.count() == 1 }).await);
    assert!(
        wait_until(|| async move {
            manager
                .registry()
                .get_worker("worker-0")
                .is_some_and(|w| w.jobs_processed == 1)
        })
        .await
    );

    manager.restart_worker("worker-0").await.unwrap();

    assert_eq!(manager.worker_ids(), vec!["worker-0"]);
    let worker = manager.registry().get_worker("worker-0").unwrap();
    assert!(worker.running);
    assert_eq!(worker.starts, 2);
    assert_eq!(worker.jobs_processed, 1);
    assert_eq!(manager.registry().total_registrations(), 2);

    manager.enqueue(&order(Priority::Normal), None).await;
    assert!(wait_until(|| async move { executor.count() == 2 }).await);

    manager.stop().await.unwrap();
    assert_eq!(manager.registry().active_worker_count(), 0);
}

#[tokio::test]
async fn test_stop_and_start_again() {
    let manager = QueueManager::new(
        Arc::new(InMemoryStore::new()),
        RecordingExecutor::new(true),
        &fast_config(3),
    );

    manager.start().await.unwrap();
    manager.stop().await.unwrap();
    assert!(!manager.get_comprehensive_stats().await.running);

    manager.start().await.unwrap();
    assert_eq!(manager.worker_ids().len(), 3);
    assert_eq!(manager.registry().active_worker_count(), 3);
    manager.stop().await.unwrap();
}
