//! Execution sync
//!
//! Pulls raw executions from n8n and folds them into one `executions` row per
//! (workflow, calendar day). Counts are recomputed from the fetched set and
//! overwrite the stored row, so re-running over the same data is a no-op apart
//! from `updated` bumps.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DbErr, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::entities::{executions, prelude::*, workflows};
use crate::models::execution::{ExecutionStatus, RawExecution};
use crate::services::n8n::N8nService;

/// Parse an n8n timestamp.
///
/// Accepts RFC 3339 with `Z` or a numeric offset; offset-less values are read
/// as UTC. Anything else yields `None`.
pub fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<FixedOffset>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed);
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().fixed_offset());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc().fixed_offset());
    }

    tracing::debug!(value = raw, "Unparseable n8n timestamp");
    None
}

/// Timestamp that decides which day a record belongs to: `startedAt`, else `stoppedAt`.
pub fn effective_timestamp(record: &RawExecution) -> Option<DateTime<FixedOffset>> {
    parse_timestamp(record.started_at_str()).or_else(|| parse_timestamp(record.stopped_at_str()))
}

/// Calendar date in the timestamp's own offset
pub fn execution_date(record: &RawExecution) -> Option<NaiveDate> {
    effective_timestamp(record).map(|ts| ts.date_naive())
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub workflow_key: String,
    pub date: NaiveDate,
}

/// All fetched runs of one workflow on one day
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionGroup {
    pub statuses: Vec<ExecutionStatus>,
    pub latest: DateTime<FixedOffset>,
}

#[derive(Debug, Default)]
pub struct GroupedExecutions {
    pub groups: BTreeMap<GroupKey, ExecutionGroup>,
    /// Records without a workflow id or a usable timestamp
    pub dropped: u32,
}

/// Partition records by (workflow id, day). The result does not depend on input order.
pub fn group_executions(records: &[RawExecution]) -> GroupedExecutions {
    let mut grouped = GroupedExecutions::default();

    for record in records {
        let (Some(workflow_key), Some(timestamp)) =
            (record.workflow_key(), effective_timestamp(record))
        else {
            tracing::debug!(
                execution_id = ?record.execution_id(),
                "Dropping execution without workflow id or timestamp"
            );
            grouped.dropped += 1;
            continue;
        };

        let key = GroupKey {
            workflow_key,
            date: timestamp.date_naive(),
        };
        let status = record.normalized_status();

        grouped
            .groups
            .entry(key)
            .and_modify(|group| {
                group.statuses.push(status);
                if timestamp > group.latest {
                    group.latest = timestamp;
                }
            })
            .or_insert_with(|| ExecutionGroup {
                statuses: vec![status],
                latest: timestamp,
            });
    }

    grouped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DailyTally {
    pub total: i32,
    pub success: i32,
    pub error: i32,
}

/// `error` is everything that is not a success
pub fn tally(statuses: &[ExecutionStatus]) -> DailyTally {
    let total = statuses.len() as i32;
    let success = statuses.iter().filter(|s| s.counts_as_success()).count() as i32;
    DailyTally {
        total,
        success,
        error: total - success,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

pub async fn find_workflow_by_n8n_id<C: ConnectionTrait>(
    conn: &C,
    n8n_workflow_id: &str,
) -> Result<Option<workflows::Model>, DbErr> {
    Workflows::find()
        .filter(workflows::Column::N8nWorkflowId.eq(n8n_workflow_id))
        .one(conn)
        .await
}

/// Insert the (workflow, date) row, or overwrite its counts when it exists.
///
/// A single `INSERT .. ON CONFLICT DO UPDATE`, so a concurrent run that
/// created the row first turns this into an update instead of a unique
/// violation.
pub async fn write_daily_tally<C: ConnectionTrait>(
    conn: &C,
    workflow: &workflows::Model,
    date: NaiveDate,
    counts: DailyTally,
) -> Result<(), DbErr> {
    let row = executions::ActiveModel {
        id: Set(Uuid::new_v4()),
        client_id: Set(workflow.client_id),
        workflow_id: Set(workflow.id),
        execution_date: Set(date),
        total_count: Set(counts.total),
        success_count: Set(counts.success),
        error_count: Set(counts.error),
        created_at: Set(Utc::now().fixed_offset()),
    };

    Executions::insert(row)
        .on_conflict(
            OnConflict::columns([
                executions::Column::WorkflowId,
                executions::Column::ExecutionDate,
            ])
            .update_columns([
                executions::Column::ClientId,
                executions::Column::TotalCount,
                executions::Column::SuccessCount,
                executions::Column::ErrorCount,
            ])
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Write one daily aggregate and refresh the workflow's cached counters.
///
/// Runs in its own transaction; on error nothing of this group is kept.
pub async fn upsert_daily_execution(
    db: &DatabaseConnection,
    workflow: &workflows::Model,
    date: NaiveDate,
    group: &ExecutionGroup,
) -> Result<UpsertOutcome, DbErr> {
    let counts = tally(&group.statuses);
    let txn = db.begin().await?;

    let existing = Executions::find()
        .filter(executions::Column::WorkflowId.eq(workflow.id))
        .filter(executions::Column::ExecutionDate.eq(date))
        .one(&txn)
        .await?;

    let outcome = if existing.is_some() {
        UpsertOutcome::Updated
    } else {
        UpsertOutcome::Created
    };
    write_daily_tally(&txn, workflow, date, counts).await?;

    let execution_count: i64 = Executions::find()
        .filter(executions::Column::WorkflowId.eq(workflow.id))
        .all(&txn)
        .await?
        .iter()
        .map(|row| row.total_count as i64)
        .sum();

    // Re-read inside the transaction so a concurrent status change is not clobbered
    let current = Workflows::find_by_id(workflow.id)
        .one(&txn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("workflow {}", workflow.id)))?;

    let last_execution = match current.last_execution {
        Some(stored) if stored >= group.latest => stored,
        _ => group.latest,
    };

    let mut active: workflows::ActiveModel = current.into();
    active.execution_count = Set(execution_count);
    active.last_execution = Set(Some(last_execution));
    active.updated_at = Set(Utc::now().fixed_offset());
    active.update(&txn).await?;

    txn.commit().await?;
    Ok(outcome)
}

/// Tally returned by every sync run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub errors: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
}

impl SyncStats {
    pub fn processed(&self) -> u32 {
        self.created + self.updated
    }

    pub fn is_clean(&self) -> bool {
        self.errors == 0 && self.fetch_error.is_none()
    }
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created={} updated={} skipped={} errors={}",
            self.created, self.updated, self.skipped, self.errors
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Fetching,
    Grouping,
    Upserting,
    Done,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Fetching => "fetching",
            SyncPhase::Grouping => "grouping",
            SyncPhase::Upserting => "upserting",
            SyncPhase::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Clone)]
pub struct ExecutionSyncService {
    db: DatabaseConnection,
    n8n: N8nService,
}

impl ExecutionSyncService {
    pub fn new(db: DatabaseConnection, n8n: N8nService) -> Self {
        Self { db, n8n }
    }

    /// Sync the most recent `limit` executions across every workflow.
    pub async fn sync_all(&self, limit: u32) -> SyncStats {
        self.run(None, limit).await
    }

    /// Sync the most recent `limit` executions of one n8n workflow.
    pub async fn sync_workflow(&self, n8n_workflow_id: &str, limit: u32) -> SyncStats {
        self.run(Some(n8n_workflow_id), limit).await
    }

    async fn run(&self, n8n_workflow_id: Option<&str>, limit: u32) -> SyncStats {
        let mut stats = SyncStats::default();
        let mut phase = SyncPhase::Idle;
        tracing::debug!(%phase, workflow = ?n8n_workflow_id, limit, "Execution sync starting");

        phase = SyncPhase::Fetching;
        tracing::debug!(%phase, "Execution sync phase");
        let records = match self.n8n.fetch_executions(n8n_workflow_id, limit).await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "Execution sync aborted: fetch failed");
                stats.errors += 1;
                stats.fetch_error = Some(e.to_string());
                return stats;
            }
        };
        tracing::info!("Fetched {} executions from n8n", records.len());

        phase = SyncPhase::Grouping;
        tracing::debug!(%phase, "Execution sync phase");
        let grouped = group_executions(&records);
        stats.skipped += grouped.dropped;

        phase = SyncPhase::Upserting;
        tracing::debug!(%phase, groups = grouped.groups.len(), "Execution sync phase");
        for (key, group) in &grouped.groups {
            match self.sync_group(key, group).await {
                Ok(Some(UpsertOutcome::Created)) => stats.created += 1,
                Ok(Some(UpsertOutcome::Updated)) => stats.updated += 1,
                Ok(None) => stats.skipped += 1,
                Err(e) => {
                    tracing::error!(
                        workflow = %key.workflow_key,
                        date = %key.date,
                        error = %e,
                        "Failed to sync execution group"
                    );
                    stats.errors += 1;
                }
            }
        }

        phase = SyncPhase::Done;
        tracing::info!(%phase, %stats, "Execution sync complete");
        stats
    }

    async fn sync_group(
        &self,
        key: &GroupKey,
        group: &ExecutionGroup,
    ) -> Result<Option<UpsertOutcome>, DbErr> {
        let Some(workflow) = find_workflow_by_n8n_id(&self.db, &key.workflow_key).await? else {
            tracing::warn!(workflow = %key.workflow_key, "Workflow not found in database, skipping");
            return Ok(None);
        };

        upsert_daily_execution(&self.db, &workflow, key.date, group)
            .await
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(workflow: &str, status: &str, started_at: &str) -> RawExecution {
        serde_json::from_value(json!({
            "id": format!("{}-{}", workflow, started_at),
            "workflowId": workflow,
            "status": status,
            "startedAt": started_at,
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_timestamp_z_and_offset_are_same_instant() {
        let z = parse_timestamp(Some("2024-01-20T10:00:00.000Z")).unwrap();
        let offset = parse_timestamp(Some("2024-01-20T10:00:00+00:00")).unwrap();
        assert_eq!(z, offset);
        assert_eq!(z.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp(Some("invalid-date")).is_none());
        assert!(parse_timestamp(Some("")).is_none());
        assert!(parse_timestamp(None).is_none());
    }

    #[test]
    fn test_parse_timestamp_naive_is_utc() {
        let parsed = parse_timestamp(Some("2024-01-20T23:30:00")).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 0);
        assert_eq!(parsed.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());
    }

    #[test]
    fn test_date_uses_timestamp_offset() {
        // 23:30 at +02:00 is still the 20th locally even though it is 21:30 UTC
        let record = raw("wf", "success", "2024-01-20T23:30:00+02:00");
        assert_eq!(
            execution_date(&record),
            Some(NaiveDate::from_ymd_opt(2024, 1, 20).unwrap())
        );
    }

    #[test]
    fn test_stopped_at_fallback() {
        let record: RawExecution = serde_json::from_value(json!({
            "workflowId": "wf",
            "status": "success",
            "startedAt": "not a date",
            "stoppedAt": "2024-01-21T01:00:00Z"
        }))
        .unwrap();
        assert_eq!(
            execution_date(&record),
            Some(NaiveDate::from_ymd_opt(2024, 1, 21).unwrap())
        );
    }

    #[test]
    fn test_tally_folds_non_success_into_error() {
        let statuses: Vec<ExecutionStatus> = ["success", "success", "error", "running", "canceled"]
            .iter()
            .map(|s| ExecutionStatus::from_n8n(Some(s)))
            .collect();
        let counts = tally(&statuses);
        assert_eq!(counts, DailyTally { total: 5, success: 2, error: 3 });
        assert_eq!(counts.total, counts.success + counts.error);
    }

    #[test]
    fn test_grouping_by_workflow_and_day() {
        let records = vec![
            raw("wf-1", "success", "2024-01-20T10:00:00Z"),
            raw("wf-1", "error", "2024-01-20T18:00:00Z"),
            raw("wf-1", "success", "2024-01-21T09:00:00Z"),
            raw("wf-2", "success", "2024-01-20T11:00:00Z"),
        ];
        let grouped = group_executions(&records);
        assert_eq!(grouped.groups.len(), 3);
        assert_eq!(grouped.dropped, 0);

        let key = GroupKey {
            workflow_key: "wf-1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
        };
        let group = &grouped.groups[&key];
        assert_eq!(group.statuses.len(), 2);
        assert_eq!(
            group.latest,
            parse_timestamp(Some("2024-01-20T18:00:00Z")).unwrap()
        );
    }

    #[test]
    fn test_grouping_is_order_independent() {
        let mut records = vec![
            raw("wf-1", "success", "2024-01-20T10:00:00Z"),
            raw("wf-2", "error", "2024-01-20T12:00:00Z"),
            raw("wf-1", "crashed", "2024-01-21T10:00:00Z"),
            raw("wf-1", "error", "2024-01-20T11:00:00Z"),
        ];
        let forward = group_executions(&records);
        records.reverse();
        let backward = group_executions(&records);

        assert_eq!(forward.groups.len(), backward.groups.len());
        for (key, group) in &forward.groups {
            let other = &backward.groups[key];
            assert_eq!(tally(&group.statuses), tally(&other.statuses));
            assert_eq!(group.latest, other.latest);
        }
    }

    #[test]
    fn test_grouping_counts_dropped_records() {
        let records: Vec<RawExecution> = vec![
            serde_json::from_value(json!({"status": "success", "startedAt": "2024-01-20T10:00:00Z"}))
                .unwrap(),
            serde_json::from_value(json!({"workflowId": "wf", "status": "success"})).unwrap(),
            raw("wf", "success", "invalid-date"),
            raw("wf", "success", "2024-01-20T10:00:00Z"),
        ];
        let grouped = group_executions(&records);
        assert_eq!(grouped.dropped, 3);
        assert_eq!(grouped.groups.len(), 1);
    }

    #[test]
    fn test_stats_display() {
        let stats = SyncStats {
            created: 2,
            updated: 1,
            skipped: 0,
            errors: 0,
            fetch_error: None,
        };
        assert_eq!(stats.to_string(), "created=2 updated=1 skipped=0 errors=0");
        assert!(stats.is_clean());
        assert_eq!(stats.processed(), 3);
    }
}
