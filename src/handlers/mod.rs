//! HTTP handlers
//!
//! Every handler authenticates from the request headers first:
//! `x-api-key` matching `ADMIN_API_KEY` is staff, otherwise
//! `Authorization: Token <token>` resolves a portal user.

use axum::{
    http::{header::HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, EntityTrait, ColumnTrait, QueryFilter};
use subtle::ConstantTimeEq;
use tracing::{error, warn};

use crate::entities::{prelude::*, users};
use crate::models::error::ErrorResponse;
use crate::services::authz::{AuthzError, Principal};
use crate::services::billing::BillingError;
use crate::services::crypto::CryptoError;
use crate::services::n8n::N8nError;
use crate::AppState;

pub mod admin;
pub mod clients;
pub mod credentials;
pub mod executions;
pub mod health;
pub mod invoices;
pub mod support_tickets;
pub mod workflows;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: message.into(),
                code: Some(code.to_string()),
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "Authentication credentials were not provided or are invalid",
        )
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", format!("{} not found", what))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        error!("Database error: {}", err);
        ApiError::internal("Database error")
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::forbidden(err.to_string())
    }
}

impl From<N8nError> for ApiError {
    fn from(err: N8nError) -> Self {
        if err.is_not_found() {
            return ApiError::new(StatusCode::NOT_FOUND, "N8N_NOT_FOUND", err.to_string());
        }
        warn!("n8n call failed: {}", err);
        ApiError::new(StatusCode::BAD_GATEWAY, "N8N_ERROR", err.to_string())
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::Db(db) => db.into(),
            BillingError::ClientNotFound(_) => ApiError::not_found("Client"),
            BillingError::InvoiceNotFound(_) => ApiError::not_found("Invoice"),
            BillingError::NegativeAmount | BillingError::AlreadyPaid(_) => {
                ApiError::bad_request(err.to_string())
            }
        }
    }
}

impl From<CryptoError> for ApiError {
    fn from(err: CryptoError) -> Self {
        error!("Credential encryption failed: {}", err);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR", err.to_string())
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Resolve the caller. No or unknown credentials → 401.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Principal, ApiError> {
    if let (Some(provided), Some(admin_key)) =
        (header_str(headers, "x-api-key"), state.settings.admin_api_key.as_deref())
    {
        if keys_match(provided, admin_key) {
            return Ok(Principal::Staff { user_id: None });
        }
        warn!("Invalid admin API key");
        return Err(ApiError::unauthorized());
    }

    let Some(token) = header_str(headers, "authorization")
        .and_then(|value| value.strip_prefix("Token "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
    else {
        return Err(ApiError::unauthorized());
    };

    let Some((user, profile)) = Users::find()
        .filter(users::Column::ApiToken.eq(token))
        .find_also_related(ClientProfiles)
        .one(&state.db)
        .await?
    else {
        warn!("Unknown API token");
        return Err(ApiError::unauthorized());
    };

    if user.is_staff {
        return Ok(Principal::Staff {
            user_id: Some(user.id),
        });
    }

    Ok(Principal::ClientUser {
        user_id: user.id,
        client_id: profile.and_then(|p| p.client_id),
    })
}

/// Constant-time comparison of a presented key against the configured one
fn keys_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Authenticate and require staff
pub async fn authenticate_staff(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Principal, ApiError> {
    let principal = authenticate(state, headers).await?;
    principal.require_staff()?;
    Ok(principal)
}
