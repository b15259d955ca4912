//! Executor used when no broker integration is linked in.

use async_trait::async_trait;
use meridian_queue::{Job, JobExecutor, JobOutcome};
use tracing::info;

/// Logs each order instead of sending it anywhere.
///
/// Orders carrying a `dry_run_fail` extension set to `true` are reported as
/// failed, which lets an operator watch the retry and dead-letter path on a
/// live store.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunExecutor;

#[async_trait]
impl JobExecutor for DryRunExecutor {
    async fn execute(&self, job: &Job) -> JobOutcome {
        info!(
            job_id = %job.id,
            symbol = %job.symbol,
            side = %job.side,
            quantity = job.quantity,
            price = ?job.price,
            priority = %job.priority,
            retry_count = job.retry_count,
            "Dry-run execution"
        );

        let fail = job
            .extensions
            .get("dry_run_fail")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        if fail {
            JobOutcome::failure("dry-run failure requested")
        } else {
            JobOutcome::success()
        }
    }
}
