//! Queue error types.

use crate::store::StoreError;
use meridian_core::MeridianError;
use thiserror::Error;

/// Result type for queue control operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors raised by the queue control surface.
///
/// Data-path calls (`enqueue`, `dequeue`, `complete`, `retry`) never return
/// these; they log the failure and report `false` or `None` instead.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The key-value store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// `start` was called on a running manager.
    #[error("Queue manager is already running")]
    AlreadyRunning,

    /// The operation needs a running manager.
    #[error("Queue manager is not running")]
    NotRunning,

    /// No worker with the given id exists.
    #[error("Worker not found: {0}")]
    WorkerNotFound(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl QueueError {
    /// Returns true if retrying the operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            QueueError::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<QueueError> for MeridianError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Store(StoreError::Unavailable(msg)) => MeridianError::StoreUnavailable(msg),
            QueueError::Configuration(msg) => MeridianError::Configuration(msg),
            other => MeridianError::Internal(other.to_string()),
        }
    }
}
