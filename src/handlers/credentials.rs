use axum::{extract::State, http::header::HeaderMap, Json};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use tracing::info;
use uuid::Uuid;

use super::{authenticate, authenticate_staff, ApiError, ApiResult};
use crate::entities::{api_credentials, prelude::*};
use crate::models::credential::{
    CreateCredentialRequest, CredentialResponse, CredentialStatus, CredentialView,
};
use crate::services::crypto::CredentialCipher;
use crate::AppState;

/// Client users never see ciphertext
pub async fn list_credentials(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Vec<CredentialView>> {
    let principal = authenticate(&state, &headers).await?;

    let select = ApiCredentials::find().order_by_desc(api_credentials::Column::CreatedAt);
    let rows = match principal.scope().apply(select, api_credentials::Column::ClientId) {
        Some(select) => select.all(&state.db).await?,
        None => vec![],
    };

    let staff = principal.is_staff();
    Ok(Json(
        rows.into_iter()
            .map(|row| {
                if staff {
                    CredentialView::Full(row.into())
                } else {
                    CredentialView::Limited(row.into())
                }
            })
            .collect(),
    ))
}

pub async fn create_credential(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateCredentialRequest>,
) -> ApiResult<CredentialResponse> {
    authenticate_staff(&state, &headers).await?;

    if payload.service_name.trim().is_empty() {
        return Err(ApiError::bad_request("service_name is required"));
    }
    if Clients::find_by_id(payload.client_id).one(&state.db).await?.is_none() {
        return Err(ApiError::not_found("Client"));
    }

    let cipher = CredentialCipher::from_settings(state.settings.encryption_key.as_deref())?;
    let encrypted_data = cipher.encrypt(&payload.data)?;

    let now = Utc::now().fixed_offset();
    let credential = api_credentials::ActiveModel {
        id: Set(Uuid::new_v4()),
        client_id: Set(payload.client_id),
        service_name: Set(payload.service_name.trim().to_string()),
        credential_type: Set(payload.credential_type.as_str().to_string()),
        encrypted_data: Set(encrypted_data),
        status: Set(CredentialStatus::Active.as_str().to_string()),
        last_verified: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    info!(service = %credential.service_name, client_id = %credential.client_id, "Stored API credential");
    Ok(Json(credential.into()))
}
