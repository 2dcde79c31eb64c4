//! Client accounts
//!
//! Staff get the full record; client users get the limited view of their own
//! client (no fees, no internal notes).

use axum::{
    extract::{Path, State},
    http::header::HeaderMap,
    Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::info;
use uuid::Uuid;

use super::{authenticate, authenticate_staff, ApiError, ApiResult};
use crate::entities::{clients, prelude::*};
use crate::models::client::{
    BillingCycle, ClientLimitedResponse, ClientResponse, ClientStatus, ClientView,
    CreateClientRequest, UpdateClientRequest,
};
use crate::models::dashboard::ClientStatisticsResponse;
use crate::services::authz::{Access, Principal, Resource};
use crate::services::stats;
use crate::AppState;

fn view_for(principal: &Principal, model: clients::Model) -> ClientView {
    if principal.is_staff() {
        ClientView::Full(model.into())
    } else {
        ClientView::Limited(model.into())
    }
}

async fn load_client(state: &AppState, id: Uuid) -> Result<clients::Model, ApiError> {
    Clients::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Client"))
}

pub async fn list_clients(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Vec<ClientView>> {
    let principal = authenticate(&state, &headers).await?;

    let select = Clients::find().order_by_asc(clients::Column::CompanyName);
    let rows = match principal.scope().apply(select, clients::Column::Id) {
        Some(select) => select.all(&state.db).await?,
        None => vec![],
    };

    Ok(Json(
        rows.into_iter()
            .map(|row| view_for(&principal, row))
            .collect(),
    ))
}

/// The caller's own client
pub async fn my_client(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<ClientLimitedResponse> {
    let principal = authenticate(&state, &headers).await?;
    let client_id = principal
        .client_id()
        .ok_or_else(|| ApiError::not_found("Client for this user"))?;

    let client = load_client(&state, client_id).await?;
    Ok(Json(client.into()))
}

pub async fn get_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<ClientView> {
    let principal = authenticate(&state, &headers).await?;
    let client = load_client(&state, id).await?;
    principal.authorize(Resource::Client(&client), Access::Read)?;
    Ok(Json(view_for(&principal, client)))
}

pub async fn create_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateClientRequest>,
) -> ApiResult<ClientResponse> {
    authenticate_staff(&state, &headers).await?;

    if payload.company_name.trim().is_empty() || payload.email.trim().is_empty() {
        return Err(ApiError::bad_request("company_name and email are required"));
    }
    if payload.setup_fee < Decimal::ZERO || payload.monthly_fee < Decimal::ZERO {
        return Err(ApiError::bad_request("fees must not be negative"));
    }

    let email = payload.email.trim().to_lowercase();
    let taken = Clients::find()
        .filter(clients::Column::Email.eq(email.as_str()))
        .one(&state.db)
        .await?;
    if taken.is_some() {
        return Err(ApiError::bad_request(format!("A client with email {} already exists", email)));
    }

    let now = Utc::now().fixed_offset();
    let client = clients::ActiveModel {
        id: Set(Uuid::new_v4()),
        company_name: Set(payload.company_name.trim().to_string()),
        contact_name: Set(payload.contact_name),
        email: Set(email),
        phone: Set(payload.phone),
        status: Set(payload.status.unwrap_or(ClientStatus::Active).as_str().to_string()),
        plan_tier: Set(payload.plan_tier),
        setup_fee: Set(payload.setup_fee),
        monthly_fee: Set(payload.monthly_fee),
        billing_cycle: Set(payload
            .billing_cycle
            .unwrap_or(BillingCycle::Monthly)
            .as_str()
            .to_string()),
        next_billing_date: Set(payload.next_billing_date),
        notes: Set(payload.notes),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    info!(client = %client.company_name, "Created client");
    Ok(Json(client.into()))
}

pub async fn update_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClientRequest>,
) -> ApiResult<ClientResponse> {
    authenticate_staff(&state, &headers).await?;
    let client = load_client(&state, id).await?;

    if matches!(payload.monthly_fee, Some(fee) if fee < Decimal::ZERO) {
        return Err(ApiError::bad_request("monthly_fee must not be negative"));
    }

    let mut active: clients::ActiveModel = client.into();
    if let Some(company_name) = payload.company_name {
        active.company_name = Set(company_name);
    }
    if let Some(contact_name) = payload.contact_name {
        active.contact_name = Set(contact_name);
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(status) = payload.status {
        active.status = Set(status.as_str().to_string());
    }
    if let Some(plan_tier) = payload.plan_tier {
        active.plan_tier = Set(plan_tier);
    }
    if let Some(monthly_fee) = payload.monthly_fee {
        active.monthly_fee = Set(monthly_fee);
    }
    if let Some(billing_cycle) = payload.billing_cycle {
        active.billing_cycle = Set(billing_cycle.as_str().to_string());
    }
    if let Some(next_billing_date) = payload.next_billing_date {
        active.next_billing_date = Set(next_billing_date);
    }
    if let Some(notes) = payload.notes {
        active.notes = Set(notes);
    }
    active.updated_at = Set(Utc::now().fixed_offset());

    let updated = active.update(&state.db).await?;
    Ok(Json(updated.into()))
}

pub async fn client_statistics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<ClientStatisticsResponse> {
    let principal = authenticate(&state, &headers).await?;
    let client = load_client(&state, id).await?;
    principal.authorize(Resource::Client(&client), Access::Read)?;

    let statistics = stats::client_statistics(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Client"))?;
    Ok(Json(statistics))
}
