//! Workflow health check
//!
//! Looks at every workflow that is supposed to run (active or in error) and
//! reports error states, poor success rates over the last week and workflows
//! that stopped executing.

use chrono::{Duration, NaiveDate};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::entities::{executions, prelude::*, workflows};
use crate::models::execution::success_rate;
use crate::models::workflow::WorkflowStatus;
use crate::services::notifier::DomainEvent;

/// Window for success-rate and staleness checks
const LOOKBACK_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    ErrorStatus,
    LowSuccessRate,
    NoRecentExecutions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthIssue {
    pub workflow_id: Uuid,
    pub workflow_name: String,
    pub client_name: String,
    pub n8n_workflow_id: String,
    pub severity: Severity,
    pub kind: IssueKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub workflows_checked: usize,
    pub issues: Vec<HealthIssue>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }

    /// One summary alert, or nothing when all is well
    pub fn into_events(self) -> Vec<DomainEvent> {
        if self.issues.is_empty() {
            return vec![];
        }
        vec![DomainEvent::HealthAlert {
            issues: self.issues,
            workflows_checked: self.workflows_checked,
        }]
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct WeekTotals {
    total: i64,
    success: i64,
}

/// Issues for one workflow given its last-week totals
fn assess(
    workflow: &workflows::Model,
    client_name: &str,
    week: WeekTotals,
    threshold: u32,
    today: NaiveDate,
) -> Vec<HealthIssue> {
    let issue = |severity, kind, message: String| HealthIssue {
        workflow_id: workflow.id,
        workflow_name: workflow.workflow_name.clone(),
        client_name: client_name.to_string(),
        n8n_workflow_id: workflow.n8n_workflow_id.clone(),
        severity,
        kind,
        message,
    };
    let mut issues = Vec::new();

    if workflow.status == WorkflowStatus::Error.as_str() {
        issues.push(issue(
            Severity::High,
            IssueKind::ErrorStatus,
            "Workflow is in ERROR state".to_string(),
        ));
    }

    // Exact integer comparison; the rounded rate is only for the message
    if week.total > 0 && week.success * 100 < threshold as i64 * week.total {
        let rate = success_rate(week.success, week.total);
        issues.push(issue(
            Severity::Medium,
            IssueKind::LowSuccessRate,
            format!(
                "Success rate is {:.1}% (below {}% threshold): {} success / {} errors / {} total",
                rate,
                threshold,
                week.success,
                week.total - week.success,
                week.total
            ),
        ));
    }

    if let Some(last) = workflow.last_execution {
        let idle_days = (today - last.date_naive()).num_days();
        if idle_days > LOOKBACK_DAYS {
            issues.push(issue(
                Severity::Low,
                IssueKind::NoRecentExecutions,
                format!("No executions in the last {} days", idle_days),
            ));
        }
    }

    issues
}

pub async fn check_workflow_health(
    db: &DatabaseConnection,
    threshold: u32,
    today: NaiveDate,
) -> Result<HealthReport, DbErr> {
    let monitored = Workflows::find()
        .filter(workflows::Column::Status.is_in([
            WorkflowStatus::Active.as_str(),
            WorkflowStatus::Error.as_str(),
        ]))
        .find_also_related(Clients)
        .all(db)
        .await?;

    let since = today - Duration::days(LOOKBACK_DAYS);
    let recent = Executions::find()
        .filter(executions::Column::ExecutionDate.gte(since))
        .all(db)
        .await?;

    let mut weeks: HashMap<Uuid, WeekTotals> = HashMap::new();
    for row in &recent {
        let entry = weeks.entry(row.workflow_id).or_default();
        entry.total += row.total_count as i64;
        entry.success += row.success_count as i64;
    }

    let mut issues = Vec::new();
    for (workflow, client) in &monitored {
        let client_name = client
            .as_ref()
            .map(|c| c.company_name.as_str())
            .unwrap_or("unknown client");
        let week = weeks.get(&workflow.id).copied().unwrap_or_default();

        for found in assess(workflow, client_name, week, threshold, today) {
            match found.severity {
                Severity::High => tracing::error!(
                    workflow = %found.workflow_name,
                    client = %found.client_name,
                    "{}",
                    found.message
                ),
                _ => tracing::warn!(
                    workflow = %found.workflow_name,
                    client = %found.client_name,
                    "{}",
                    found.message
                ),
            }
            issues.push(found);
        }
    }

    tracing::info!(
        checked = monitored.len(),
        issues = issues.len(),
        threshold,
        "Workflow health check complete"
    );

    Ok(HealthReport {
        workflows_checked: monitored.len(),
        issues,
    })
}
