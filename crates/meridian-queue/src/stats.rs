//! Statistics documents for monitoring layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Coarse health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Warning => write!(f, "warning"),
            HealthStatus::Critical => write!(f, "critical"),
        }
    }
}

/// Per-action counters kept in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounters {
    pub enqueued: u64,
    pub dequeued: u64,
    pub completed: u64,
    pub failed: u64,
    pub retried: u64,
    pub dead_lettered: u64,
    /// RFC 3339 time of the last counter update.
    pub last_updated: Option<String>,
}

impl QueueCounters {
    /// Build counters from a stats hash. Missing or malformed fields read as 0.
    pub fn from_hash(hash: &HashMap<String, String>) -> Self {
        let read = |field: &str| {
            hash.get(field)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0)
        };
        Self {
            enqueued: read("enqueued"),
            dequeued: read("dequeued"),
            completed: read("completed"),
            failed: read("failed"),
            retried: read("retried"),
            dead_lettered: read("dead_lettered"),
            last_updated: hash.get("last_updated").cloned(),
        }
    }
}

/// WorkQueue snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkQueueStats {
    pub normal: u64,
    pub priority: u64,
    pub processing: u64,
    pub failed: u64,
    pub retry: u64,
    pub counters: QueueCounters,
    pub health: HealthStatus,
}

impl WorkQueueStats {
    /// Jobs waiting to be dequeued.
    pub fn pending(&self) -> u64 {
        self.normal + self.priority
    }
}

/// PriorityRouter snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterStats {
    /// Length of each sub-queue by name.
    pub queues: BTreeMap<String, u64>,
    pub total_pending: u64,
    /// Jobs waiting in the four fast lanes.
    pub urgent_pending: u64,
    /// Live worker assignments.
    pub processing: u64,
    /// Enqueue/dequeue counters per sub-queue, e.g. `enqueued:liquidation`.
    pub counters: BTreeMap<String, u64>,
    pub health: HealthStatus,
}

/// Per-worker counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerStats {
    pub worker_id: String,
    pub processed: u64,
    pub errors: u64,
    /// Percentage of processed jobs that succeeded; 100 before the first job.
    pub success_rate: f64,
    pub running: bool,
    pub started_at: DateTime<Utc>,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Aggregated view across the manager, both queues and all workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveStats {
    pub running: bool,
    pub uptime_secs: u64,
    pub configured_workers: usize,
    pub active_workers: usize,
    pub total_pending: u64,
    pub max_queue_size: u64,
    pub work_queue: Option<WorkQueueStats>,
    pub router: Option<RouterStats>,
    pub workers: Vec<WorkerStats>,
    pub health: HealthStatus,
}
