//! n8n execution records and the daily aggregate views built from them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::entities::executions;

string_enum! {
    /// Normalized execution status.
    ///
    /// n8n reports an open-ended vocabulary; everything is folded into these five.
    pub enum ExecutionStatus {
        Success => "success",
        Error => "error",
        Running => "running",
        Waiting => "waiting",
        Canceled => "canceled",
    }
}

/// n8n status → normalized status. Anything not listed maps to `Error`.
const STATUS_MAP: &[(&str, ExecutionStatus)] = &[
    ("success", ExecutionStatus::Success),
    ("error", ExecutionStatus::Error),
    ("running", ExecutionStatus::Running),
    ("waiting", ExecutionStatus::Waiting),
    ("canceled", ExecutionStatus::Canceled),
    ("crashed", ExecutionStatus::Error),
    ("new", ExecutionStatus::Running),
    ("unknown", ExecutionStatus::Error),
];

impl ExecutionStatus {
    /// Map a raw n8n status. Total: missing or unrecognized statuses become `Error`.
    pub fn from_n8n(raw: Option<&str>) -> Self {
        raw.and_then(|s| {
            STATUS_MAP
                .iter()
                .find(|(name, _)| *name == s)
                .map(|(_, status)| *status)
        })
        .unwrap_or(ExecutionStatus::Error)
    }

    /// Daily aggregates only have success and error buckets; every
    /// non-success status (running, waiting, canceled) is counted as an error.
    pub fn counts_as_success(&self) -> bool {
        matches!(self, ExecutionStatus::Success)
    }
}

/// One execution as returned by `GET /executions`.
///
/// Fields are kept loosely typed: ids arrive as numbers or strings depending on
/// the n8n version, and timestamps are parsed later so a bad value only drops
/// that record instead of failing the whole page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExecution {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub workflow_id: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub started_at: Option<Value>,
    #[serde(default)]
    pub stopped_at: Option<Value>,
}

fn value_as_key(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl RawExecution {
    pub fn execution_id(&self) -> Option<String> {
        value_as_key(self.id.as_ref())
    }

    /// The n8n workflow id as a string, if present and non-empty
    pub fn workflow_key(&self) -> Option<String> {
        value_as_key(self.workflow_id.as_ref())
    }

    pub fn status_str(&self) -> Option<&str> {
        self.status.as_ref().and_then(Value::as_str)
    }

    pub fn normalized_status(&self) -> ExecutionStatus {
        ExecutionStatus::from_n8n(self.status_str())
    }

    pub fn started_at_str(&self) -> Option<&str> {
        self.started_at.as_ref().and_then(Value::as_str)
    }

    pub fn stopped_at_str(&self) -> Option<&str> {
        self.stopped_at.as_ref().and_then(Value::as_str)
    }
}

/// `{data: [...], nextCursor?}` envelope used by the n8n list endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct N8nPage<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Query parameters for `GET /api/executions`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutionListQuery {
    pub workflow_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionStatsQuery {
    pub days: Option<i64>,
}

/// Query parameters for `GET /api/admin/executions/chart`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutionChartQuery {
    pub days: Option<i64>,
    /// n8n workflow id
    pub workflow: Option<String>,
    pub client: Option<Uuid>,
}

/// Per-day series, oldest first; the three vectors line up index by index
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecutionChartResponse {
    pub labels: Vec<String>,
    pub success: Vec<i64>,
    pub errors: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub id: Uuid,
    pub client_id: Uuid,
    pub workflow_id: Uuid,
    pub execution_date: NaiveDate,
    pub total_count: i32,
    pub success_count: i32,
    pub error_count: i32,
    pub success_rate: f64,
    pub created_at: String,
}

impl From<executions::Model> for ExecutionResponse {
    fn from(model: executions::Model) -> Self {
        let success_rate = success_rate(model.success_count as i64, model.total_count as i64);
        Self {
            id: model.id,
            client_id: model.client_id,
            workflow_id: model.workflow_id,
            execution_date: model.execution_date,
            total_count: model.total_count,
            success_count: model.success_count,
            error_count: model.error_count,
            success_rate,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionStatsResponse {
    pub total_executions: i64,
    pub total_successes: i64,
    pub total_errors: i64,
    pub success_rate: f64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

/// Body of `POST /api/admin/sync`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncRequest {
    pub workflow_id: Option<String>,
    pub limit: Option<u32>,
}

/// Percentage rounded to two decimals; 0 when there is nothing to divide.
pub fn success_rate(success: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let rate = success as f64 / total as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}
