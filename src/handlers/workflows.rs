use axum::{
    extract::{Path, Query, State},
    http::header::HeaderMap,
    Json,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{authenticate, authenticate_staff, ApiError, ApiResult};
use crate::entities::{prelude::*, workflows};
use crate::models::workflow::{
    CreateWorkflowRequest, UpdateWorkflowStatusRequest, WorkflowResponse, WorkflowStatus,
};
use crate::services::authz::{Access, Resource};
use crate::services::notifier::DomainEvent;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WorkflowListQuery {
    pub status: Option<WorkflowStatus>,
    pub client_id: Option<Uuid>,
}

async fn load_workflow(state: &AppState, id: Uuid) -> Result<workflows::Model, ApiError> {
    Workflows::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Workflow"))
}

pub async fn list_workflows(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WorkflowListQuery>,
) -> ApiResult<Vec<WorkflowResponse>> {
    let principal = authenticate(&state, &headers).await?;

    let mut select = Workflows::find().order_by_desc(workflows::Column::CreatedAt);
    if let Some(status) = query.status {
        select = select.filter(workflows::Column::Status.eq(status.as_str()));
    }
    if let Some(client_id) = query.client_id {
        select = select.filter(workflows::Column::ClientId.eq(client_id));
    }

    let rows = match principal.scope().apply(select, workflows::Column::ClientId) {
        Some(select) => select.all(&state.db).await?,
        None => vec![],
    };
    Ok(Json(rows.into_iter().map(WorkflowResponse::from).collect()))
}

pub async fn get_workflow(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<WorkflowResponse> {
    let principal = authenticate(&state, &headers).await?;
    let workflow = load_workflow(&state, id).await?;
    principal.authorize(Resource::Workflow(&workflow), Access::Read)?;
    Ok(Json(workflow.into()))
}

pub async fn create_workflow(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateWorkflowRequest>,
) -> ApiResult<WorkflowResponse> {
    authenticate_staff(&state, &headers).await?;

    let n8n_workflow_id = payload.n8n_workflow_id.trim().to_string();
    if n8n_workflow_id.is_empty() || payload.workflow_name.trim().is_empty() {
        return Err(ApiError::bad_request("workflow_name and n8n_workflow_id are required"));
    }

    if Clients::find_by_id(payload.client_id).one(&state.db).await?.is_none() {
        return Err(ApiError::not_found("Client"));
    }

    let duplicate = Workflows::find()
        .filter(workflows::Column::N8nWorkflowId.eq(n8n_workflow_id.as_str()))
        .one(&state.db)
        .await?;
    if duplicate.is_some() {
        return Err(ApiError::bad_request(format!(
            "n8n workflow {} is already registered",
            n8n_workflow_id
        )));
    }

    let n8n_workflow_url = payload
        .n8n_workflow_url
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| state.settings.workflow_editor_url(&n8n_workflow_id));

    let now = Utc::now().fixed_offset();
    let workflow = workflows::ActiveModel {
        id: Set(Uuid::new_v4()),
        client_id: Set(payload.client_id),
        workflow_name: Set(payload.workflow_name.trim().to_string()),
        n8n_workflow_id: Set(n8n_workflow_id),
        n8n_workflow_url: Set(Some(n8n_workflow_url)),
        description: Set(payload.description),
        status: Set(payload.status.unwrap_or(WorkflowStatus::Active).as_str().to_string()),
        last_execution: Set(None),
        execution_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    info!(workflow = %workflow.workflow_name, n8n_id = %workflow.n8n_workflow_id, "Registered workflow");
    Ok(Json(workflow.into()))
}

/// Entering `error` alerts the operations team.
pub async fn update_workflow_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateWorkflowStatusRequest>,
) -> ApiResult<WorkflowResponse> {
    authenticate_staff(&state, &headers).await?;
    let workflow = load_workflow(&state, id).await?;

    let previous = workflow.status.clone();
    let mut active: workflows::ActiveModel = workflow.into();
    active.status = Set(payload.status.as_str().to_string());
    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active.update(&state.db).await?;

    info!(
        workflow = %updated.workflow_name,
        from = %previous,
        to = %updated.status,
        "Workflow status changed"
    );

    let entered_error =
        payload.status == WorkflowStatus::Error && previous != WorkflowStatus::Error.as_str();
    if entered_error {
        if let Some(client) = Clients::find_by_id(updated.client_id).one(&state.db).await? {
            state
                .notifier
                .notify(vec![DomainEvent::WorkflowEnteredError {
                    workflow: updated.clone(),
                    client,
                }])
                .await;
        }
    }

    Ok(Json(updated.into()))
}
