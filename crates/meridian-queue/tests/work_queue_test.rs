//! Integration tests for the WorkQueue lifecycle against the in-memory store.

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::{order, TestQueues};
use meridian_config::{QueueConfig, RouterConfig};
use meridian_queue::{JobOutcome, Priority, RetryDisposition, RetryPolicy};

#[tokio::test]
async fn test_enqueue_dequeue_preserves_job() {
    let queues = TestQueues::new();
    let job = order(Priority::Normal)
        .with_max_retries(7)
        .with_extension("account", serde_json::json!("ACC-42"));

    assert!(queues.work_queue.enqueue(&job).await);
    let dequeued = queues
        .work_queue
        .dequeue("worker-0")
        .await
        .expect("job should be dequeued");

    assert_eq!(dequeued, job);
}

#[tokio::test]
async fn test_scenario_complete_updates_stats() {
    let queues = TestQueues::new();
    let job = order(Priority::Normal);

    assert!(queues.work_queue.enqueue(&job).await);
    let dequeued = queues.work_queue.dequeue("worker-0").await.unwrap();
    assert_eq!(dequeued.id, job.id);
    assert_eq!(queues.locations(job.id.as_str()).await, vec!["processing"]);

    assert!(
        queues
            .work_queue
            .complete(job.id.as_str(), &JobOutcome::success())
            .await
    );

    let stats = queues.work_queue.get_stats().await.unwrap();
    assert_eq!(stats.counters.completed, 1);
    assert_eq!(stats.processing, 0);
    assert!(queues.locations(job.id.as_str()).await.is_empty());
}

#[tokio::test]
async fn test_scenario_retry_budget_exhausted() {
    let queues = TestQueues::new();
    let job = order(Priority::Normal).with_max_retries(3);

    queues.work_queue.enqueue(&job).await;
    let mut current = queues.work_queue.dequeue("worker-0").await.unwrap();

    for attempt in 1..=3 {
        match queues.work_queue.retry(&current).await {
            RetryDisposition::Scheduled { job, .. } => {
                assert_eq!(job.retry_count, attempt);
                current = job;
            }
            other => panic!("attempt {attempt} should be scheduled, got {other:?}"),
        }
    }

    match queues.work_queue.retry(&current).await {
        RetryDisposition::DeadLettered { reason } => {
            assert_eq!(reason, "Max retries (3) exceeded");
        }
        other => panic!("expected dead-letter, got {other:?}"),
    }

    let failed = queues.work_queue.list_failed(10).await;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].job.id, job.id);
    assert_eq!(failed[0].reason, "Max retries (3) exceeded");
}

#[tokio::test]
async fn test_retry_at_budget_never_schedules() {
    for max_retries in [0, 1, 5] {
        let queues = TestQueues::new();
        let mut job = order(Priority::High).with_max_retries(max_retries);
        job.retry_count = max_retries;

        let disposition = queues.work_queue.retry(&job).await;

        assert!(matches!(disposition, RetryDisposition::DeadLettered { .. }));
        assert_eq!(queues.locations(job.id.as_str()).await, vec!["failed"]);
    }
}

#[tokio::test]
async fn test_backoff_bound() {
    let queues = TestQueues::new();
    let policy: RetryPolicy = queues.work_queue.retry_policy();

    for retry_count in 1..=10u32 {
        let expected = 300u64.min(2u64.pow(retry_count));
        assert_eq!(policy.delay_secs(retry_count), expected, "retry_count {retry_count}");
    }
}

#[tokio::test]
async fn test_retry_cycle_returns_job_to_pending() {
    let queues = TestQueues::new();
    let job = order(Priority::Normal).with_max_retries(2);

    queues.work_queue.enqueue(&job).await;
    let mut current = queues.work_queue.dequeue("worker-0").await.unwrap();

    for _ in 0..2 {
        let RetryDisposition::Scheduled { .. } = queues.work_queue.retry(&current).await else {
            panic!("retry should be scheduled");
        };
        assert_eq!(queues.locations(job.id.as_str()).await, vec!["retry"]);

        let far_future = Utc::now() + ChronoDuration::hours(1);
        let requeued = queues.work_queue.process_retry_queue_at(far_future).await;
        assert_eq!(requeued.len(), 1);
        assert_eq!(queues.locations(job.id.as_str()).await, vec!["normal"]);

        current = queues.work_queue.dequeue("worker-0").await.unwrap();
    }

    assert_eq!(current.retry_count, 2);
    assert!(matches!(
        queues.work_queue.retry(&current).await,
        RetryDisposition::DeadLettered { .. }
    ));
    assert_eq!(queues.locations(job.id.as_str()).await, vec!["failed"]);
}

#[tokio::test]
async fn test_process_retry_queue_skips_future_entries() {
    let queues = TestQueues::new();
    let soon = order(Priority::Normal);
    let mut later = order(Priority::Normal).with_max_retries(10);
    later.retry_count = 5;

    queues.work_queue.retry(&soon).await;
    queues.work_queue.retry(&later).await;

    // First retry waits 2s, the sixth waits 64s.
    let now = Utc::now() + ChronoDuration::seconds(10);
    let requeued = queues.work_queue.process_retry_queue_at(now).await;

    assert_eq!(requeued.len(), 1);
    assert_eq!(requeued[0].id, soon.id);
    assert_eq!(queues.locations(later.id.as_str()).await, vec!["retry"]);

    assert!(queues.work_queue.process_retry_queue().await.is_empty());
}

#[tokio::test]
async fn test_job_in_at_most_one_state() {
    let queues = TestQueues::new();
    let job = order(Priority::Urgent).with_max_retries(1);
    let id = job.id.as_str().to_string();

    queues.work_queue.enqueue(&job).await;
    assert_eq!(queues.locations(&id).await, vec!["priority"]);

    let dequeued = queues.work_queue.dequeue("worker-0").await.unwrap();
    assert_eq!(queues.locations(&id).await, vec!["processing"]);

    let RetryDisposition::Scheduled { job: scheduled, .. } =
        queues.work_queue.retry(&dequeued).await
    else {
        panic!("retry should be scheduled");
    };
    assert_eq!(queues.locations(&id).await, vec!["retry"]);

    queues
        .work_queue
        .process_retry_queue_at(Utc::now() + ChronoDuration::minutes(10))
        .await;
    assert_eq!(queues.locations(&id).await, vec!["priority"]);

    queues.work_queue.dequeue("worker-1").await.unwrap();
    queues.work_queue.retry(&scheduled).await;
    assert_eq!(queues.locations(&id).await, vec!["failed"]);
}

#[tokio::test]
async fn test_requeue_failed_job() {
    let queues = TestQueues::new();
    let mut job = order(Priority::Normal).with_max_retries(1);
    job.retry_count = 1;
    queues.work_queue.retry(&job).await;

    assert!(queues.work_queue.requeue_failed(job.id.as_str()).await);
    assert!(!queues.work_queue.requeue_failed(job.id.as_str()).await);

    let requeued = queues.work_queue.dequeue("worker-0").await.unwrap();
    assert_eq!(requeued.id, job.id);
    assert_eq!(requeued.retry_count, 0);
    assert!(queues.work_queue.list_failed(10).await.is_empty());
}

#[tokio::test]
async fn test_processing_threshold_drives_health() {
    let config = QueueConfig {
        processing_warning_threshold: 1,
        ..QueueConfig::default()
    };
    let queues = TestQueues::with_config(config, RouterConfig::default());

    for _ in 0..2 {
        queues.work_queue.enqueue(&order(Priority::Normal)).await;
        queues.work_queue.dequeue("worker-0").await;
    }

    let stats = queues.work_queue.get_stats().await.unwrap();
    assert_eq!(stats.processing, 2);
    assert_eq!(stats.health.to_string(), "warning");
}

#[tokio::test]
async fn test_store_outage_is_reported_not_raised() {
    let queues = TestQueues::new();
    let job = order(Priority::Normal);
    queues.store.set_offline(true);

    assert!(!queues.work_queue.enqueue(&job).await);
    assert!(queues.work_queue.dequeue("worker-0").await.is_none());
    assert!(!queues.work_queue.complete(job.id.as_str(), &JobOutcome::success()).await);
    assert_eq!(queues.work_queue.retry(&job).await, RetryDisposition::Unavailable);
    assert!(queues.work_queue.process_retry_queue().await.is_empty());
    assert!(queues.work_queue.get_stats().await.is_none());

    queues.store.set_offline(false);
    assert!(queues.work_queue.enqueue(&job).await);
}
