//! In-process registry of worker execution units.
//!
//! Tracks per-worker counters for operator reporting. Entries survive a
//! restart of the same worker id so counters stay cumulative.

use crate::stats::WorkerStats;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// State of one registered worker.
#[derive(Debug, Clone)]
pub struct WorkerInfo {
    /// Worker ID.
    pub id: String,
    /// When the current execution unit was spawned.
    pub started_at: DateTime<Utc>,
    /// Time of the last finished job.
    pub last_activity: Option<DateTime<Utc>>,
    /// Whether the worker loop is running.
    pub running: bool,
    /// Jobs finished, successful or not.
    pub jobs_processed: u64,
    /// Jobs that failed or timed out.
    pub jobs_failed: u64,
    /// Times this id has been (re)started.
    pub starts: u32,
}

impl WorkerInfo {
    fn new(id: String) -> Self {
        Self {
            id,
            started_at: Utc::now(),
            last_activity: None,
            running: true,
            jobs_processed: 0,
            jobs_failed: 0,
            starts: 1,
        }
    }

    /// Percentage of processed jobs that succeeded.
    pub fn success_rate(&self) -> f64 {
        if self.jobs_processed == 0 {
            return 100.0;
        }
        let succeeded = self.jobs_processed.saturating_sub(self.jobs_failed);
        succeeded as f64 / self.jobs_processed as f64 * 100.0
    }

    fn to_stats(&self) -> WorkerStats {
        WorkerStats {
            worker_id: self.id.clone(),
            processed: self.jobs_processed,
            errors: self.jobs_failed,
            success_rate: self.success_rate(),
            running: self.running,
            started_at: self.started_at,
            last_activity: self.last_activity,
        }
    }
}

/// Registry of worker execution units.
pub struct WorkerRegistry {
    workers: RwLock<HashMap<String, WorkerInfo>>,
    registration_count: AtomicU64,
}

impl WorkerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            workers: RwLock::new(HashMap::new()),
            registration_count: AtomicU64::new(0),
        }
    }

    /// Register a worker, or mark a known worker as restarted.
    ///
    /// Returns the registration sequence number.
    pub fn register(&self, worker_id: &str) -> u64 {
        let seq = self.registration_count.fetch_add(1, Ordering::Relaxed) + 1;

        let mut workers = self.workers.write();
        match workers.get_mut(worker_id) {
            Some(worker) => {
                worker.running = true;
                worker.started_at = Utc::now();
                worker.starts += 1;
                info!(worker_id = %worker_id, starts = worker.starts, "Worker restarted");
            }
            None => {
                workers.insert(worker_id.to_string(), WorkerInfo::new(worker_id.to_string()));
                info!(worker_id = %worker_id, registration_seq = seq, "Worker registered");
            }
        }

        seq
    }

    /// Mark a worker as stopped. Returns false for unknown ids.
    pub fn mark_stopped(&self, worker_id: &str) -> bool {
        match self.workers.write().get_mut(worker_id) {
            Some(worker) => {
                worker.running = false;
                debug!(worker_id = %worker_id, "Worker marked stopped");
                true
            }
            None => false,
        }
    }

    /// Record a finished job.
    pub fn record_outcome(&self, worker_id: &str, success: bool) {
        if let Some(worker) = self.workers.write().get_mut(worker_id) {
            worker.jobs_processed += 1;
            if !success {
                worker.jobs_failed += 1;
            }
            worker.last_activity = Some(Utc::now());
        }
    }

    /// Get information about a specific worker.
    pub fn get_worker(&self, worker_id: &str) -> Option<WorkerInfo> {
        self.workers.read().get(worker_id).cloned()
    }

    /// Count of workers whose loop is running.
    pub fn active_worker_count(&self) -> usize {
        self.workers.read().values().filter(|w| w.running).count()
    }

    /// Get total registration count.
    pub fn total_registrations(&self) -> u64 {
        self.registration_count.load(Ordering::Relaxed)
    }

    /// Per-worker stats ordered by worker id.
    pub fn stats(&self) -> Vec<WorkerStats> {
        let mut stats: Vec<WorkerStats> =
            self.workers.read().values().map(WorkerInfo::to_stats).collect();
        stats.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));
        stats
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_registration() {
        let registry = WorkerRegistry::new();

        assert_eq!(registry.register("worker-1"), 1);
        assert_eq!(registry.register("worker-2"), 2);

        assert_eq!(registry.active_worker_count(), 2);
        assert!(registry.get_worker("worker-3").is_none());
    }

    #[test]
    fn test_restart_keeps_counters() {
        let registry = WorkerRegistry::new();
        registry.register("worker-1");
        registry.record_outcome("worker-1", true);

        assert!(registry.mark_stopped("worker-1"));
        assert_eq!(registry.active_worker_count(), 0);

        registry.register("worker-1");
        let worker = registry.get_worker("worker-1").unwrap();
        assert!(worker.running);
        assert_eq!(worker.starts, 2);
        assert_eq!(worker.jobs_processed, 1);
        assert_eq!(registry.total_registrations(), 2);
    }

    #[test]
    fn test_success_rate() {
        let registry = WorkerRegistry::new();
        registry.register("worker-1");
        assert_eq!(registry.get_worker("worker-1").unwrap().success_rate(), 100.0);

        registry.record_outcome("worker-1", true);
        registry.record_outcome("worker-1", true);
        registry.record_outcome("worker-1", true);
        registry.record_outcome("worker-1", false);

        let worker = registry.get_worker("worker-1").unwrap();
        assert_eq!(worker.jobs_processed, 4);
        assert_eq!(worker.jobs_failed, 1);
        assert_eq!(worker.success_rate(), 75.0);
        assert!(worker.last_activity.is_some());
    }

    #[test]
    fn test_mark_stopped_unknown_worker() {
        let registry = WorkerRegistry::new();
        registry.register("worker-1");

        assert!(!registry.mark_stopped("worker-9"));
        assert_eq!(registry.active_worker_count(), 1);
    }

    #[test]
    fn test_stats_sorted_by_id() {
        let registry = WorkerRegistry::new();
        registry.register("worker-2");
        registry.register("worker-0");
        registry.register("worker-1");

        let ids: Vec<String> = registry.stats().into_iter().map(|s| s.worker_id).collect();
        assert_eq!(ids, vec!["worker-0", "worker-1", "worker-2"]);
    }
}
