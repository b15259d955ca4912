//! Application configuration structures.

use meridian_core::TelemetryConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Key-value store connection.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Worker pool settings.
    #[serde(default)]
    pub workers: WorkerConfig,

    /// WorkQueue settings and admission limits.
    #[serde(default)]
    pub queue: QueueConfig,

    /// PriorityRouter rebalancing and health thresholds.
    #[serde(default)]
    pub router: RouterConfig,

    /// Background task schedules.
    #[serde(default)]
    pub maintenance: MaintenanceConfig,

    /// Logging and metrics.
    #[serde(default)]
    pub observability: TelemetryConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "meridian".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Redis connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL.
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size. Sized independently of the worker count.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Key prefix for every queue key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_pool_size(),
            connect_timeout_secs: default_connect_timeout(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl RedisConfig {
    /// Returns the connect timeout as a Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_pool_size() -> usize {
    20
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_key_prefix() -> String {
    "meridian".to_string()
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of worker tasks.
    pub count: usize,
    /// Job execution timeout in seconds.
    pub job_timeout_secs: u64,
    /// Sleep between polls while the queues have only just gone empty.
    pub poll_fast_ms: u64,
    /// Sleep between polls after a short idle streak.
    pub poll_medium_ms: u64,
    /// Sleep between polls once a worker has been idle for a while.
    pub poll_slow_ms: u64,
    /// Number of consecutive empty polls served with the fast interval.
    pub fast_poll_limit: u32,
    /// Number of consecutive empty polls (cumulative) served with the medium interval.
    pub medium_poll_limit: u32,
    /// Maximum time to wait for each worker to stop.
    pub shutdown_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
                .max(4),
            job_timeout_secs: 300,
            poll_fast_ms: 10,
            poll_medium_ms: 100,
            poll_slow_ms: 1000,
            fast_poll_limit: 10,
            medium_poll_limit: 50,
            shutdown_timeout_secs: 30,
        }
    }
}

impl WorkerConfig {
    /// Returns job timeout as Duration.
    #[must_use]
    pub const fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    /// Returns shutdown timeout as Duration.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Returns the sleep to use after `empty_polls` consecutive empty polls.
    #[must_use]
    pub const fn poll_delay(&self, empty_polls: u32) -> Duration {
        if empty_polls <= self.fast_poll_limit {
            Duration::from_millis(self.poll_fast_ms)
        } else if empty_polls <= self.medium_poll_limit {
            Duration::from_millis(self.poll_medium_ms)
        } else {
            Duration::from_millis(self.poll_slow_ms)
        }
    }
}

/// WorkQueue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Total pending jobs at which `enqueue` refuses new work.
    pub max_queue_size: u64,
    /// Jobs at or above this priority use the WorkQueue's priority list.
    pub high_priority_threshold: u8,
    /// Jobs at or above this priority are routed to the PriorityRouter.
    pub router_priority_threshold: u8,
    /// Processing count above which WorkQueue health reports `warning`.
    pub processing_warning_threshold: u64,
    /// Exponential backoff base.
    pub retry_backoff_base: u32,
    /// Upper bound on a single retry delay.
    pub max_retry_delay_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 10_000,
            high_priority_threshold: 3,
            router_priority_threshold: 4,
            processing_warning_threshold: 100,
            retry_backoff_base: 2,
            max_retry_delay_secs: 300,
        }
    }
}

/// PriorityRouter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Normal tier length above which jobs are promoted to high.
    pub normal_rebalance_threshold: u64,
    /// Maximum promotions from normal to high per pass.
    pub normal_promotion_cap: u64,
    /// Low tier length above which jobs are promoted to normal.
    pub low_rebalance_threshold: u64,
    /// Maximum promotions from low to normal per pass.
    pub low_promotion_cap: u64,
    /// Fraction of the tier promoted per pass, as a divisor.
    pub promotion_divisor: u64,
    /// Urgent backlog above which router health is `critical`.
    pub urgent_critical_threshold: u64,
    /// Total pending above which router health is `warning`.
    pub pending_warning_threshold: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            normal_rebalance_threshold: 1_000,
            normal_promotion_cap: 100,
            low_rebalance_threshold: 2_000,
            low_promotion_cap: 200,
            promotion_divisor: 10,
            urgent_critical_threshold: 100,
            pending_warning_threshold: 5_000,
        }
    }
}

/// Background task schedules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Interval of the retry processor.
    pub retry_interval_secs: u64,
    /// Interval of the rebalancer and stale-assignment cleanup.
    pub rebalance_interval_secs: u64,
    /// Interval of the health monitor.
    pub health_interval_secs: u64,
    /// Age after which a worker assignment is considered stale.
    pub assignment_max_age_minutes: i64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            retry_interval_secs: 5,
            rebalance_interval_secs: 30,
            health_interval_secs: 60,
            assignment_max_age_minutes: 30,
        }
    }
}

impl MaintenanceConfig {
    /// Returns the retry processor interval.
    #[must_use]
    pub const fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    /// Returns the rebalancer interval.
    #[must_use]
    pub const fn rebalance_interval(&self) -> Duration {
        Duration::from_secs(self.rebalance_interval_secs)
    }

    /// Returns the health monitor interval.
    #[must_use]
    pub const fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs)
    }
}
