//! Daily execution aggregates (read-only; rows are written by the sync)

use axum::{
    extract::{Query, State},
    http::header::HeaderMap,
    Json,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use super::{authenticate, ApiError, ApiResult};
use crate::entities::{executions, prelude::*};
use crate::models::execution::{
    ExecutionListQuery, ExecutionResponse, ExecutionStatsQuery, ExecutionStatsResponse,
};
use crate::services::stats::{self, DEFAULT_STATS_DAYS};
use crate::AppState;

/// Longest stats window accepted
const MAX_STATS_DAYS: i64 = 3650;

pub async fn list_executions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ExecutionListQuery>,
) -> ApiResult<Vec<ExecutionResponse>> {
    let principal = authenticate(&state, &headers).await?;

    let mut select = Executions::find().order_by_desc(executions::Column::ExecutionDate);
    if let Some(workflow_id) = query.workflow_id {
        select = select.filter(executions::Column::WorkflowId.eq(workflow_id));
    }
    if let Some(from) = query.from {
        select = select.filter(executions::Column::ExecutionDate.gte(from));
    }
    if let Some(to) = query.to {
        select = select.filter(executions::Column::ExecutionDate.lte(to));
    }

    let rows = match principal.scope().apply(select, executions::Column::ClientId) {
        Some(select) => select.all(&state.db).await?,
        None => vec![],
    };
    Ok(Json(rows.into_iter().map(ExecutionResponse::from).collect()))
}

pub async fn execution_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ExecutionStatsQuery>,
) -> ApiResult<ExecutionStatsResponse> {
    let principal = authenticate(&state, &headers).await?;

    let days = query.days.unwrap_or(DEFAULT_STATS_DAYS);
    if !(0..=MAX_STATS_DAYS).contains(&days) {
        return Err(ApiError::bad_request(format!(
            "days must be between 0 and {}",
            MAX_STATS_DAYS
        )));
    }

    let today = Utc::now().date_naive();
    let response = stats::execution_stats(&state.db, principal.scope(), days, today).await?;
    Ok(Json(response))
}
