use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::api_credentials;

string_enum! {
    pub enum CredentialType {
        OAuth => "oauth",
        ApiKey => "api_key",
        BasicAuth => "basic_auth",
    }
}

string_enum! {
    pub enum CredentialStatus {
        Active => "active",
        Expired => "expired",
        Invalid => "invalid",
    }
}

/// `data` is the plaintext secret; it is encrypted before it reaches the database.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCredentialRequest {
    pub client_id: Uuid,
    pub service_name: String,
    pub credential_type: CredentialType,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialResponse {
    pub id: Uuid,
    pub client_id: Uuid,
    pub service_name: String,
    pub credential_type: String,
    pub encrypted_data: String,
    pub status: String,
    pub last_verified: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// What a client user sees: no ciphertext
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialLimitedResponse {
    pub id: Uuid,
    pub service_name: String,
    pub credential_type: String,
    pub status: String,
    pub last_verified: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CredentialView {
    Full(CredentialResponse),
    Limited(CredentialLimitedResponse),
}

impl From<api_credentials::Model> for CredentialResponse {
    fn from(model: api_credentials::Model) -> Self {
        Self {
            id: model.id,
            client_id: model.client_id,
            service_name: model.service_name,
            credential_type: model.credential_type,
            encrypted_data: model.encrypted_data,
            status: model.status,
            last_verified: model.last_verified.map(|dt| dt.to_rfc3339()),
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

impl From<api_credentials::Model> for CredentialLimitedResponse {
    fn from(model: api_credentials::Model) -> Self {
        Self {
            id: model.id,
            service_name: model.service_name,
            credential_type: model.credential_type,
            status: model.status,
            last_verified: model.last_verified.map(|dt| dt.to_rfc3339()),
            created_at: model.created_at.to_rfc3339(),
        }
    }
}
