//! Job model and the records that track a job through the queue.

use crate::priority::{Priority, PriorityMetadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Retry budget given to jobs built without an explicit one.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Unique job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Creates a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the job ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Direction of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// A unit of work, modeled as an order to be executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique ID.
    pub id: JobId,
    /// Instrument symbol.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Order quantity.
    pub quantity: f64,
    /// Limit price. `None` for market orders.
    #[serde(default)]
    pub price: Option<f64>,
    /// Priority, 1 (low) to 5 (critical).
    pub priority: Priority,
    /// Retries consumed so far.
    #[serde(default)]
    pub retry_count: u32,
    /// Retries allowed before the job is dead-lettered.
    pub max_retries: u32,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Opaque metadata carried with the job. Never read by the queue.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl Job {
    /// Creates a normal-priority job with a fresh ID.
    pub fn new(symbol: impl Into<String>, side: OrderSide, quantity: f64) -> Self {
        Self {
            id: JobId::new(),
            symbol: symbol.into(),
            side,
            quantity,
            price: None,
            priority: Priority::Normal,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            created_at: Utc::now(),
            extensions: BTreeMap::new(),
        }
    }

    /// Replace the generated ID.
    pub fn with_id(mut self, id: impl Into<JobId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set a limit price.
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Attach an opaque extension value.
    pub fn with_extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    /// Returns true while the retry budget is not exhausted.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Result reported by the execution logic for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    /// Whether the job succeeded.
    pub success: bool,
    /// Optional detail, usually the failure reason.
    pub message: Option<String>,
}

impl JobOutcome {
    /// A successful outcome.
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// A failed outcome with a reason.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in a queue.
    Pending,
    /// Held by a worker.
    Processing,
    /// Waiting in the retry schedule.
    RetryScheduled,
    /// Finished successfully.
    Completed,
    /// Retry budget exhausted; parked in the dead-letter queue.
    Failed,
}

impl JobStatus {
    /// Returns true if no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::RetryScheduled => write!(f, "retry_scheduled"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A job held by a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingRecord {
    pub job: Job,
    pub started_at: DateTime<Utc>,
    pub worker_id: String,
    /// Name of the list the job was popped from.
    pub source_queue: String,
}

/// A job waiting in the retry schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryRecord {
    pub job: Job,
    pub ready_at: DateTime<Utc>,
    pub delay_seconds: u64,
    /// Routing metadata of a job that came from the priority router.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PriorityMetadata>,
}

/// A dead-lettered job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRecord {
    pub job: Job,
    pub failed_at: DateTime<Utc>,
    pub reason: String,
}
