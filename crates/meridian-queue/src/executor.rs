//! Seam to the logic that actually runs a job.

use crate::job::{Job, JobOutcome};
use async_trait::async_trait;

/// Runs one dequeued job.
///
/// Failures are reported through [`JobOutcome`]; the worker then hands the
/// job to the retry schedule. Implementations should not panic: a panicking
/// executor takes its worker down until an operator restarts it.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Execute the job and report the outcome.
    async fn execute(&self, job: &Job) -> JobOutcome;
}
