//! Meridian Queue - prioritized job processing over a key-value store
//!
//! A Redis-backed job queue with:
//! - A two-list work queue (priority and normal) with processing records
//! - Exponential-backoff retries held in a time-ordered retry set
//! - A dead-letter list for jobs that exhaust their retry budget
//! - A nine-tier priority router with urgency fast lanes
//! - Periodic rebalancing that promotes starving backlog one tier up
//! - A worker pool with graduated idle backoff and per-job timeouts
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        QueueManager                          │
//! │                                                              │
//! │  enqueue(job, meta?)                                         │
//! │     │                                                        │
//! │     ├── meta or priority >= 4 ──► PriorityRouter             │
//! │     │                             ┌───────────────────────┐  │
//! │     │                             │ liquidation (zset)    │  │
//! │     │                             │ market_close          │  │
//! │     │                             │ arbitrage   (zset)    │  │
//! │     │                             │ stop_loss             │  │
//! │     │                             │ critical .. low       │  │
//! │     │                             └──────────┬────────────┘  │
//! │     └── otherwise ──────────────► WorkQueue  │               │
//! │                                   ┌──────────┴───────────┐   │
//! │                                   │ priority │ normal    │   │
//! │                                   └──────────┬───────────┘   │
//! │                                              ▼               │
//! │  ┌──────────┐ ┌──────────┐       ┌──────────────────────┐    │
//! │  │ worker-0 │ │ worker-N │ ────► │ JobExecutor          │    │
//! │  └──────────┘ └──────────┘       └──────────┬───────────┘    │
//! │                                    ok ◄─────┴────► failed    │
//! │                                                  │           │
//! │                               retry set ◄────────┤           │
//! │                               (backoff)          ▼           │
//! │                                           dead-letter list   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use meridian_queue::prelude::*;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let manager = QueueManager::new(store, Arc::new(MyExecutor), &AppConfig::default());
//! manager.start().await?;
//!
//! let job = Job::new("AAPL", OrderSide::Buy, 100.0).with_priority(Priority::High);
//! manager.enqueue(&job, None).await;
//! ```

pub mod error;
pub mod executor;
pub mod job;
pub mod keys;
pub mod manager;
pub mod metrics;
pub mod priority;
pub mod retry;
pub mod router;
pub mod stats;
pub mod store;
pub mod work_queue;
pub mod worker_registry;

pub use error::{QueueError, QueueResult};
pub use executor::JobExecutor;
pub use job::{
    FailedRecord, Job, JobId, JobOutcome, JobStatus, OrderSide, ProcessingRecord, RetryRecord,
    DEFAULT_MAX_RETRIES,
};
pub use keys::QueueKeys;
pub use manager::{classify_health, QueueManager};
pub use metrics::{register_metrics, JobMetrics, WorkerMetrics};
pub use priority::{
    priority_score, priority_score_at, MarketImpact, Priority, PriorityMetadata, RiskLevel,
    Urgency,
};
pub use retry::RetryPolicy;
pub use router::{PriorityRouter, RebalanceReport, RoutedEntry, RouterQueue, WorkerAssignment};
pub use stats::{
    ComprehensiveStats, HealthStatus, QueueCounters, RouterStats, WorkQueueStats, WorkerStats,
};
pub use store::{create_pool, InMemoryStore, KeyValueStore, RedisStore, StoreError, StoreResult};
pub use work_queue::{RetryDisposition, WorkQueue};
pub use worker_registry::{WorkerInfo, WorkerRegistry};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::executor::JobExecutor;
    pub use crate::job::{Job, JobOutcome, OrderSide};
    pub use crate::manager::QueueManager;
    pub use crate::priority::{Priority, PriorityMetadata, Urgency};
    pub use crate::store::{InMemoryStore, KeyValueStore, RedisStore};
    pub use crate::{QueueError, QueueResult};
    pub use meridian_config::AppConfig;
}
