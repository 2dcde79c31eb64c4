//! Back-office endpoints: dashboard, manual sync and n8n operations.
//! All staff only.

use axum::{
    extract::{Path, Query, State},
    http::header::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::{authenticate_staff, ApiError, ApiResult};
use crate::entities::sync_status;
use crate::models::dashboard::AdminDashboardResponse;
use crate::models::execution::{ExecutionChartQuery, ExecutionChartResponse, SyncRequest};
use crate::models::workflow::RemoteWorkflowActionResponse;
use crate::services::execution_sync::{ExecutionSyncService, SyncStats};
use crate::services::n8n::{ConnectionCheck, N8nWorkflow};
use crate::services::{stats, sync_status as job_status};
use crate::AppState;

/// Upper bound for a manual sync
const MAX_SYNC_LIMIT: u32 = 10_000;

/// One point per day, so keep the series to about a year
const MAX_CHART_DAYS: i64 = 366;

pub async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<AdminDashboardResponse> {
    authenticate_staff(&state, &headers).await?;
    let today = Utc::now().date_naive();
    Ok(Json(stats::admin_dashboard(&state.db, today).await?))
}

/// Daily success/error series for the back-office execution chart
pub async fn execution_chart(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ExecutionChartQuery>,
) -> ApiResult<ExecutionChartResponse> {
    authenticate_staff(&state, &headers).await?;

    let days = query.days.unwrap_or(stats::DEFAULT_CHART_DAYS);
    if !(0..=MAX_CHART_DAYS).contains(&days) {
        return Err(ApiError::bad_request(format!(
            "days must be between 0 and {}",
            MAX_CHART_DAYS
        )));
    }
    let workflow = query
        .workflow
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let today = Utc::now().date_naive();
    Ok(Json(
        stats::execution_chart(&state.db, days, workflow, query.client, today).await?,
    ))
}

pub async fn job_statuses(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Vec<sync_status::Model>> {
    authenticate_staff(&state, &headers).await?;
    Ok(Json(job_status::all_jobs(&state.db).await?))
}

/// Run an execution sync now and return its tally
pub async fn trigger_sync(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Option<Json<SyncRequest>>,
) -> ApiResult<SyncStats> {
    authenticate_staff(&state, &headers).await?;

    let request = payload.map(|Json(body)| body).unwrap_or_default();
    let limit = request
        .limit
        .unwrap_or(state.settings.sync_limit)
        .clamp(1, MAX_SYNC_LIMIT);

    let service = ExecutionSyncService::new(state.db.clone(), state.n8n.clone());
    let stats = match request.workflow_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => {
            info!(workflow = id, limit, "Manual execution sync for one workflow");
            service.sync_workflow(id, limit).await
        }
        _ => {
            info!(limit, "Manual execution sync");
            service.sync_all(limit).await
        }
    };

    let interval = state.settings.sync_interval.as_secs() as i32;
    let recorded = match &stats.fetch_error {
        None => {
            job_status::record_success(&state.db, job_status::jobs::EXECUTION_SYNC, interval).await
        }
        Some(e) => {
            job_status::record_failure(&state.db, job_status::jobs::EXECUTION_SYNC, e, interval)
                .await
        }
    };
    if let Err(e) = recorded {
        warn!("Failed to record sync status: {}", e);
    }

    Ok(Json(stats))
}

pub async fn n8n_health(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<ConnectionCheck> {
    authenticate_staff(&state, &headers).await?;
    Ok(Json(state.n8n.test_connection().await))
}

#[derive(Serialize)]
pub struct RemoteWorkflow {
    #[serde(flatten)]
    pub workflow: N8nWorkflow,
    /// Set when the workflow is registered locally
    pub local_id: Option<uuid::Uuid>,
}

pub async fn n8n_workflows(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Vec<RemoteWorkflow>> {
    authenticate_staff(&state, &headers).await?;

    let remote = state.n8n.list_workflows().await?;
    let mut out = Vec::with_capacity(remote.len());
    for workflow in remote {
        let local = crate::services::execution_sync::find_workflow_by_n8n_id(
            &state.db,
            &workflow.id_string(),
        )
        .await?;
        out.push(RemoteWorkflow {
            local_id: local.map(|w| w.id),
            workflow,
        });
    }
    Ok(Json(out))
}

/// `POST /api/admin/n8n/workflows/{id}/{action}` with action `activate` or `deactivate`
pub async fn n8n_workflow_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((n8n_workflow_id, action)): Path<(String, String)>,
) -> ApiResult<RemoteWorkflowActionResponse> {
    authenticate_staff(&state, &headers).await?;

    let updated = match action.as_str() {
        "activate" => state.n8n.activate_workflow(&n8n_workflow_id).await?,
        "deactivate" => state.n8n.deactivate_workflow(&n8n_workflow_id).await?,
        other => {
            return Err(ApiError::bad_request(format!(
                "Unknown action '{}', expected activate or deactivate",
                other
            )))
        }
    };

    let active = updated
        .get("active")
        .and_then(|v| v.as_bool())
        .unwrap_or(action == "activate");

    info!(n8n_workflow_id = %n8n_workflow_id, action = %action, active, "n8n workflow action");
    Ok(Json(RemoteWorkflowActionResponse {
        n8n_workflow_id,
        action,
        active,
    }))
}
