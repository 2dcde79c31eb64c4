//! Support tickets
//!
//! Anyone signed in may open a ticket (client users only for their own
//! client); only staff change them. Resolution is stamped once.

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
use crate::entities::{prelude::*, support_tickets};
use crate::models::support_ticket::{
    CreateTicketRequest, TicketPriority, TicketResponse, TicketStatus, UpdateTicketRequest,
};
use crate::services::notifier::DomainEvent;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TicketListQuery {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
}

pub async fn list_tickets(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TicketListQuery>,
) -> ApiResult<Vec<TicketResponse>> {
    let principal = authenticate(&state, &headers).await?;

    let mut select = SupportTickets::find().order_by_desc(support_tickets::Column::CreatedAt);
    if let Some(status) = query.status {
        select = select.filter(support_tickets::Column::Status.eq(status.as_str()));
    }
    if let Some(priority) = query.priority {
        select = select.filter(support_tickets::Column::Priority.eq(priority.as_str()));
    }

    let rows = match principal.scope().apply(select, support_tickets::Column::ClientId) {
        Some(select) => select.all(&state.db).await?,
        None => vec![],
    };

    let now = Utc::now().fixed_offset();
    Ok(Json(
        rows.into_iter()
            .map(|row| TicketResponse::from_model(row, now))
            .collect(),
    ))
}

pub async fn create_ticket(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateTicketRequest>,
) -> ApiResult<TicketResponse> {
    let principal = authenticate(&state, &headers).await?;
    let client_id = principal.ticket_client(payload.client_id)?;

    if payload.subject.trim().is_empty() {
        return Err(ApiError::bad_request("subject is required"));
    }

    let client = Clients::find_by_id(client_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Client"))?;

    let now = Utc::now().fixed_offset();
    let ticket = support_tickets::ActiveModel {
        id: Set(Uuid::new_v4()),
        client_id: Set(client.id),
        subject: Set(payload.subject.trim().to_string()),
        description: Set(payload.description),
        status: Set(TicketStatus::Open.as_str().to_string()),
        priority: Set(payload
            .priority
            .unwrap_or(TicketPriority::Medium)
            .as_str()
            .to_string()),
        resolved_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    info!(ticket_id = %ticket.id, client = %client.company_name, "Support ticket created");

    state
        .notifier
        .notify(vec![DomainEvent::TicketCreated {
            ticket: ticket.clone(),
            client,
        }])
        .await;

    Ok(Json(TicketResponse::from_model(ticket, now)))
}

pub async fn update_ticket(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTicketRequest>,
) -> ApiResult<TicketResponse> {
    authenticate_staff(&state, &headers).await?;

    let ticket = SupportTickets::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Support ticket"))?;

    let now = Utc::now().fixed_offset();
    let was_resolved = ticket.status == TicketStatus::Resolved.as_str();
    let already_stamped = ticket.resolved_at.is_some();

    let mut active: support_tickets::ActiveModel = ticket.into();
    if let Some(subject) = payload.subject {
        active.subject = Set(subject);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(priority) = payload.priority {
        active.priority = Set(priority.as_str().to_string());
    }
    if let Some(status) = payload.status {
        active.status = Set(status.as_str().to_string());
        if status == TicketStatus::Resolved && !already_stamped {
            active.resolved_at = Set(Some(now));
        }
    }
    active.updated_at = Set(now);
    let updated = active.update(&state.db).await?;

    let newly_resolved = !was_resolved && updated.status == TicketStatus::Resolved.as_str();
    if newly_resolved {
        info!(ticket_id = %updated.id, "Support ticket resolved");
        if let Some(client) = Clients::find_by_id(updated.client_id).one(&state.db).await? {
            state
                .notifier
                .notify(vec![DomainEvent::TicketResolved {
                    ticket: updated.clone(),
                    client,
                }])
                .await;
        }
    }

    Ok(Json(TicketResponse::from_model(updated, now)))
}
