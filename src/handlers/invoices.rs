use axum::{
    extract::{Path, Query, State},
    http::header::HeaderMap,
    Json,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use uuid::Uuid;

use super::{authenticate, authenticate_staff, ApiResult};
use crate::entities::{invoices, prelude::*};
use crate::models::invoice::{CreateInvoiceRequest, InvoiceResponse, InvoiceStatus};
use crate::services::billing;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceListQuery {
    pub status: Option<InvoiceStatus>,
}

pub async fn list_invoices(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<InvoiceListQuery>,
) -> ApiResult<Vec<InvoiceResponse>> {
    let principal = authenticate(&state, &headers).await?;

    let mut select = Invoices::find().order_by_desc(invoices::Column::CreatedAt);
    if let Some(status) = query.status {
        select = select.filter(invoices::Column::Status.eq(status.as_str()));
    }

    let rows = match principal.scope().apply(select, invoices::Column::ClientId) {
        Some(select) => select.all(&state.db).await?,
        None => vec![],
    };

    let today = Utc::now().date_naive();
    Ok(Json(
        rows.into_iter()
            .map(|row| InvoiceResponse::from_model(row, today))
            .collect(),
    ))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateInvoiceRequest>,
) -> ApiResult<InvoiceResponse> {
    authenticate_staff(&state, &headers).await?;

    let today = Utc::now().date_naive();
    let (invoice, events) = billing::create_invoice(&state.db, payload, today).await?;
    state.notifier.notify(events).await;

    Ok(Json(InvoiceResponse::from_model(invoice, today)))
}

pub async fn mark_invoice_paid(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<InvoiceResponse> {
    authenticate_staff(&state, &headers).await?;

    let today = Utc::now().date_naive();
    let invoice = billing::mark_paid(&state.db, id, today).await?;
    Ok(Json(InvoiceResponse::from_model(invoice, today)))
}
