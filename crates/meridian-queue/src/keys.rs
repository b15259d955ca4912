//! Store key layout.

/// Builds every store key from a shared prefix.
#[derive(Debug, Clone)]
pub struct QueueKeys {
    prefix: String,
}

impl QueueKeys {
    /// Create a new key builder with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Work queue list for jobs below the high-priority threshold.
    pub fn normal(&self) -> String {
        format!("{}:queue:normal", self.prefix)
    }

    /// Work queue list for high-priority jobs.
    pub fn priority(&self) -> String {
        format!("{}:queue:priority", self.prefix)
    }

    /// Processing records (hash: job_id -> ProcessingRecord).
    pub fn processing(&self) -> String {
        format!("{}:processing", self.prefix)
    }

    /// Retry schedule (sorted set scored by ready_at).
    pub fn retry(&self) -> String {
        format!("{}:retry", self.prefix)
    }

    /// Dead-letter list.
    pub fn failed(&self) -> String {
        format!("{}:failed", self.prefix)
    }

    /// Work queue counters (hash).
    pub fn stats(&self) -> String {
        format!("{}:stats", self.prefix)
    }

    /// One of the router sub-queues.
    pub fn router_queue(&self, name: &str) -> String {
        format!("{}:router:{}", self.prefix, name)
    }

    /// Worker assignments (hash: job_id -> WorkerAssignment).
    pub fn assignments(&self) -> String {
        format!("{}:router:assignments", self.prefix)
    }

    /// Router counters (hash).
    pub fn router_stats(&self) -> String {
        format!("{}:router:stats", self.prefix)
    }
}

impl Default for QueueKeys {
    fn default() -> Self {
        Self::new("meridian")
    }
}
