//! Interval jobs spawned by the server.
//!
//! Each job checks `sync_status` before running so a restart does not repeat
//! work that finished recently. The tasks live as long as the runtime.

pub mod execution_sync_job;
pub mod invoice_reminder_job;
pub mod workflow_health_job;

use std::time::Duration;

use sea_orm::DatabaseConnection;

use crate::services::sync_status;

/// How often a job wakes up to ask `sync_status` whether it is due.
/// Several checks per interval, at most a minute apart.
pub(crate) fn check_period(interval: Duration) -> Duration {
    (interval / 4).clamp(Duration::from_secs(1), Duration::from_secs(60))
}

/// Record the outcome of one run; bookkeeping failures are only logged.
pub(crate) async fn record_run(
    db: &DatabaseConnection,
    job_name: &str,
    interval_secs: i32,
    outcome: Result<(), String>,
) {
    let recorded = match &outcome {
        Ok(()) => sync_status::record_success(db, job_name, interval_secs).await,
        Err(e) => {
            tracing::error!("[{}] Run failed: {}", job_name, e);
            sync_status::record_failure(db, job_name, e, interval_secs).await
        }
    };
    if let Err(e) = recorded {
        tracing::warn!("[{}] Failed to record run status: {}", job_name, e);
    }
}

/// `should_sync`, treating a bookkeeping error as "run anyway"
pub(crate) async fn due(db: &DatabaseConnection, job_name: &str) -> bool {
    match sync_status::should_sync(db, job_name).await {
        Ok(due) => due,
        Err(e) => {
            tracing::warn!("[{}] Failed to check sync status, running anyway: {}", job_name, e);
            true
        }
    }
}
