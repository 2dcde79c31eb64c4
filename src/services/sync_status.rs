//! Bookkeeping for the scheduled jobs
//!
//! Each job records when it last succeeded so a restart does not immediately
//! hit n8n (or re-send reminders) again.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};

use crate::entities::sync_status::{self, Entity as SyncStatus};

/// Job names
pub mod jobs {
    pub const EXECUTION_SYNC: &str = "execution_sync";
    pub const WORKFLOW_HEALTH: &str = "workflow_health";
    pub const INVOICE_REMINDERS: &str = "invoice_reminders";
}

/// Default minimum intervals between runs (in seconds)
pub mod intervals {
    pub const WORKFLOW_HEALTH: i32 = 3600; // 1 hour
    pub const INVOICE_REMINDERS: i32 = 86400; // once a day
}

/// Upper bound on how early a run may start relative to its minimum interval
const MAX_SCHEDULE_SLACK_SECS: i64 = 30;

/// Tolerance for a tick that lands just short of the interval because the
/// previous run's success was stamped when it finished, not when it started.
fn schedule_slack(min_interval_secs: i32) -> Duration {
    Duration::seconds((min_interval_secs as i64 / 10).min(MAX_SCHEDULE_SLACK_SECS))
}

/// Whether a job whose last success was at `last_success` may run at `now`
pub fn is_due(
    last_success: DateTime<FixedOffset>,
    now: DateTime<FixedOffset>,
    min_interval_secs: i32,
) -> bool {
    let interval = Duration::seconds(min_interval_secs as i64);
    now - last_success + schedule_slack(min_interval_secs) >= interval
}

async fn find_job(
    db: &DatabaseConnection,
    job_name: &str,
) -> Result<Option<sync_status::Model>, DbErr> {
    SyncStatus::find()
        .filter(sync_status::Column::JobName.eq(job_name))
        .one(db)
        .await
}

/// True on first run, when the job never succeeded, or when the last
/// success is (about) `min_interval_secs` old. See [`is_due`].
pub async fn should_sync(db: &DatabaseConnection, job_name: &str) -> Result<bool, DbErr> {
    let Some(record) = find_job(db, job_name).await? else {
        tracing::info!("[{}] First run detected, will sync", job_name);
        return Ok(true);
    };

    let Some(last_success) = record.last_success_at else {
        tracing::info!("[{}] No previous successful run, will sync", job_name);
        return Ok(true);
    };

    let now = Utc::now().fixed_offset();
    let elapsed = now - last_success;
    let interval = Duration::seconds(record.min_interval_secs as i64);

    if is_due(last_success, now, record.min_interval_secs) {
        tracing::info!(
            "[{}] Last run was {}s ago (min: {}s), will sync",
            job_name,
            elapsed.num_seconds(),
            record.min_interval_secs
        );
        Ok(true)
    } else {
        tracing::info!(
            "[{}] Skipping - last run was {}s ago, next run in {}s",
            job_name,
            elapsed.num_seconds(),
            (interval - elapsed).num_seconds().max(0)
        );
        Ok(false)
    }
}

pub async fn record_success(
    db: &DatabaseConnection,
    job_name: &str,
    default_interval_secs: i32,
) -> Result<(), DbErr> {
    let now = Utc::now().fixed_offset();

    match find_job(db, job_name).await? {
        Some(record) => {
            let success_count = record.success_count + 1;
            let mut active_model: sync_status::ActiveModel = record.into();
            active_model.last_success_at = Set(Some(now));
            active_model.last_attempt_at = Set(Some(now));
            active_model.last_error = Set(None);
            active_model.success_count = Set(success_count);
            active_model.update(db).await?;
        }
        None => {
            sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_success_at: Set(Some(now)),
                last_attempt_at: Set(Some(now)),
                last_error: Set(None),
                success_count: Set(1),
                error_count: Set(0),
                min_interval_secs: Set(default_interval_secs),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    tracing::debug!("[{}] Recorded successful run", job_name);
    Ok(())
}

pub async fn record_failure(
    db: &DatabaseConnection,
    job_name: &str,
    error: &str,
    default_interval_secs: i32,
) -> Result<(), DbErr> {
    let now = Utc::now().fixed_offset();

    match find_job(db, job_name).await? {
        Some(record) => {
            let error_count = record.error_count + 1;
            let mut active_model: sync_status::ActiveModel = record.into();
            active_model.last_attempt_at = Set(Some(now));
            active_model.last_error = Set(Some(error.to_string()));
            active_model.error_count = Set(error_count);
            active_model.update(db).await?;
        }
        None => {
            sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_success_at: Set(None),
                last_attempt_at: Set(Some(now)),
                last_error: Set(Some(error.to_string())),
                success_count: Set(0),
                error_count: Set(1),
                min_interval_secs: Set(default_interval_secs),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    tracing::debug!("[{}] Recorded failed run: {}", job_name, error);
    Ok(())
}

/// Keep the stored interval in line with configuration (e.g. `SYNC_INTERVAL_MINUTES`)
pub async fn set_min_interval(
    db: &DatabaseConnection,
    job_name: &str,
    interval_secs: i32,
) -> Result<(), DbErr> {
    match find_job(db, job_name).await? {
        Some(record) if record.min_interval_secs == interval_secs => return Ok(()),
        Some(record) => {
            let mut active_model: sync_status::ActiveModel = record.into();
            active_model.min_interval_secs = Set(interval_secs);
            active_model.update(db).await?;
        }
        None => {
            sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                success_count: Set(0),
                error_count: Set(0),
                min_interval_secs: Set(interval_secs),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    tracing::info!("[{}] Set min interval to {}s", job_name, interval_secs);
    Ok(())
}

/// All job rows, for the admin dashboard
pub async fn all_jobs(db: &DatabaseConnection) -> Result<Vec<sync_status::Model>, DbErr> {
    SyncStatus::find().all(db).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(millis: i64) -> DateTime<FixedOffset> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + millis)
            .unwrap()
            .fixed_offset()
    }

    #[test]
    fn test_due_after_full_interval() {
        assert!(is_due(at(0), at(3_600_000), 3600));
        assert!(!is_due(at(0), at(1_800_000), 3600));
    }

    #[test]
    fn test_tick_just_short_of_interval_is_due() {
        // Success stamped 100ms after the tick that started the run
        assert!(is_due(at(100), at(2_000), 2));
        assert!(is_due(at(250), at(900_000), 900));
    }

    #[test]
    fn test_slack_is_capped() {
        // 10% of a day would be 2.4h; the cap keeps it to 30s
        let day: i64 = 86_400;
        assert!(is_due(at(0), at((day - 30) * 1000), day as i32));
        assert!(!is_due(at(0), at((day - 31) * 1000), day as i32));
    }

    #[test]
    fn test_runs_on_every_tick_of_its_interval() {
        // Ticks every 2s, each run takes 100ms and stamps success when it ends
        let mut last_success = None;
        let mut ran = Vec::new();
        for tick in 0..4 {
            let now = at(tick * 2_000);
            let due = last_success.map_or(true, |last| is_due(last, now, 2));
            if due {
                last_success = Some(at(tick * 2_000 + 100));
            }
            ran.push(due);
        }
        assert_eq!(ran, vec![true, true, true, true]);
    }
}
