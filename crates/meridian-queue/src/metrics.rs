//! Prometheus metrics for queue monitoring.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! host process installs a recorder.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Metric names.
pub mod names {
    /// Total jobs enqueued.
    pub const JOBS_ENQUEUED_TOTAL: &str = "meridian_jobs_enqueued_total";
    /// Total jobs dequeued for processing.
    pub const JOBS_DEQUEUED_TOTAL: &str = "meridian_jobs_dequeued_total";
    /// Total jobs completed successfully.
    pub const JOBS_COMPLETED_TOTAL: &str = "meridian_jobs_completed_total";
    /// Total jobs whose execution failed.
    pub const JOBS_FAILED_TOTAL: &str = "meridian_jobs_failed_total";
    /// Total jobs put on the retry schedule.
    pub const JOBS_RETRIED_TOTAL: &str = "meridian_jobs_retried_total";
    /// Total jobs sent to the dead-letter queue.
    pub const JOBS_DEAD_LETTERED_TOTAL: &str = "meridian_jobs_dead_lettered_total";
    /// Total jobs promoted by rebalancing.
    pub const JOBS_PROMOTED_TOTAL: &str = "meridian_jobs_promoted_total";
    /// Total enqueue calls refused at capacity.
    pub const JOBS_REJECTED_TOTAL: &str = "meridian_jobs_rejected_total";

    /// Current pending jobs.
    pub const JOBS_PENDING: &str = "meridian_jobs_pending";
    /// Current jobs held by workers.
    pub const JOBS_PROCESSING: &str = "meridian_jobs_processing";

    /// Job execution duration in seconds.
    pub const JOB_DURATION_SECONDS: &str = "meridian_job_duration_seconds";

    /// Active workers count.
    pub const WORKERS_ACTIVE: &str = "meridian_workers_active";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::JOBS_ENQUEUED_TOTAL, "Total number of jobs enqueued");
    describe_counter!(
        names::JOBS_DEQUEUED_TOTAL,
        "Total number of jobs dequeued for processing"
    );
    describe_counter!(
        names::JOBS_COMPLETED_TOTAL,
        "Total number of jobs completed successfully"
    );
    describe_counter!(names::JOBS_FAILED_TOTAL, "Total number of failed job executions");
    describe_counter!(names::JOBS_RETRIED_TOTAL, "Total number of scheduled retries");
    describe_counter!(
        names::JOBS_DEAD_LETTERED_TOTAL,
        "Total number of jobs sent to the dead-letter queue"
    );
    describe_counter!(
        names::JOBS_PROMOTED_TOTAL,
        "Total number of jobs promoted to a higher tier"
    );
    describe_counter!(
        names::JOBS_REJECTED_TOTAL,
        "Total number of jobs refused because the queue was full"
    );

    describe_gauge!(names::JOBS_PENDING, "Current number of pending jobs");
    describe_gauge!(names::JOBS_PROCESSING, "Current number of jobs held by workers");

    describe_histogram!(
        names::JOB_DURATION_SECONDS,
        "Job execution duration in seconds"
    );

    describe_gauge!(names::WORKERS_ACTIVE, "Number of active workers");
}

/// Job metrics recorder.
#[derive(Clone)]
pub struct JobMetrics;

impl JobMetrics {
    /// Record a job enqueued.
    pub fn job_enqueued(queue: &str, priority: u8) {
        counter!(
            names::JOBS_ENQUEUED_TOTAL,
            "queue" => queue.to_string(),
            "priority" => priority.to_string()
        )
        .increment(1);
    }

    /// Record an enqueue refused at capacity.
    pub fn job_rejected() {
        counter!(names::JOBS_REJECTED_TOTAL).increment(1);
    }

    /// Record a job dequeued.
    pub fn job_dequeued(queue: &str) {
        counter!(names::JOBS_DEQUEUED_TOTAL, "queue" => queue.to_string()).increment(1);
    }

    /// Record a finished execution.
    pub fn job_finished(success: bool, duration: Duration) {
        let status = if success { "completed" } else { "failed" };
        if success {
            counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
        } else {
            counter!(names::JOBS_FAILED_TOTAL).increment(1);
        }

        histogram!(names::JOB_DURATION_SECONDS, "status" => status).record(duration.as_secs_f64());
    }

    /// Record a job put on the retry schedule.
    pub fn job_retried(retry_count: u32) {
        counter!(
            names::JOBS_RETRIED_TOTAL,
            "retry_count" => retry_count.to_string()
        )
        .increment(1);
    }

    /// Record a job sent to the dead-letter queue.
    pub fn job_dead_lettered() {
        counter!(names::JOBS_DEAD_LETTERED_TOTAL).increment(1);
    }

    /// Record jobs promoted between router tiers.
    pub fn jobs_promoted(from: &str, to: &str, count: u64) {
        counter!(
            names::JOBS_PROMOTED_TOTAL,
            "from" => from.to_string(),
            "to" => to.to_string()
        )
        .increment(count);
    }

    /// Update backlog gauges.
    pub fn update_backlog(pending: u64, processing: u64) {
        gauge!(names::JOBS_PENDING).set(pending as f64);
        gauge!(names::JOBS_PROCESSING).set(processing as f64);
    }
}

/// Worker metrics recorder.
#[derive(Clone)]
pub struct WorkerMetrics;

impl WorkerMetrics {
    /// Update worker count.
    pub fn update_workers(active: usize) {
        gauge!(names::WORKERS_ACTIVE).set(active as f64);
    }
}
