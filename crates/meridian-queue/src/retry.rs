//! Retry backoff policy.

use meridian_config::QueueConfig;
use serde::{Deserialize, Serialize};

/// Exponential backoff: `delay = min(max_delay_secs, base ^ retry_count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Backoff base.
    pub base: u32,
    /// Upper bound on a single delay, in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: 2,
            max_delay_secs: 300,
        }
    }
}

impl From<&QueueConfig> for RetryPolicy {
    fn from(config: &QueueConfig) -> Self {
        Self {
            base: config.retry_backoff_base,
            max_delay_secs: config.max_retry_delay_secs,
        }
    }
}

impl RetryPolicy {
    /// Delay in seconds before retry number `retry_count` runs.
    pub fn delay_secs(&self, retry_count: u32) -> u64 {
        u64::from(self.base)
            .checked_pow(retry_count)
            .map_or(self.max_delay_secs, |delay| delay.min(self.max_delay_secs))
    }
}
