#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{NaiveDate, Utc};
use http_body_util::BodyExt;
use migration::MigratorTrait;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use monoliet_portal::config::PortalSettings;
use monoliet_portal::entities::{client_profiles, clients, invoices, users, workflows};
use monoliet_portal::services::n8n::N8nService;
use monoliet_portal::{build_router, AppState};

pub const ADMIN_KEY: &str = "test-admin-key";

/// Fresh in-memory SQLite database with every migration applied.
///
/// A single pooled connection keeps the in-memory database alive for the whole test.
pub async fn setup_test_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub fn test_settings(n8n_url: &str) -> Arc<PortalSettings> {
    let n8n_url = n8n_url.to_string();
    let settings = PortalSettings::from_lookup(|key| match key {
        "DATABASE_URL" => Some("sqlite::memory:".to_string()),
        "N8N_URL" => Some(n8n_url.clone()),
        "N8N_API_KEY" => Some("test-n8n-key".to_string()),
        "ADMIN_API_KEY" => Some(ADMIN_KEY.to_string()),
        "ENCRYPTION_KEY" => Some("MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=".to_string()),
        "ENABLE_AUTO_SYNC" => Some("false".to_string()),
        _ => None,
    })
    .expect("test settings");
    Arc::new(settings)
}

pub fn n8n_service(n8n_url: &str) -> N8nService {
    N8nService::new(n8n_url, "test-n8n-key".to_string()).expect("n8n client")
}

/// App state whose n8n client points at `n8n_url` (usually a wiremock server)
pub fn test_state(db: DatabaseConnection, n8n_url: &str) -> AppState {
    AppState::new(db, n8n_service(n8n_url), test_settings(n8n_url))
}

pub fn test_app(db: DatabaseConnection, n8n_url: &str) -> Router {
    build_router(test_state(db, n8n_url))
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub async fn create_client(db: &DatabaseConnection, company_name: &str) -> clients::Model {
    let now = Utc::now().fixed_offset();
    clients::ActiveModel {
        id: Set(Uuid::new_v4()),
        company_name: Set(company_name.to_string()),
        contact_name: Set("Jan de Vries".to_string()),
        email: Set(format!(
            "{}@example.com",
            company_name.to_lowercase().replace(' ', "-")
        )),
        phone: Set(None),
        status: Set("active".to_string()),
        plan_tier: Set("Business Process".to_string()),
        setup_fee: Set(Decimal::new(150000, 2)),
        monthly_fee: Set(Decimal::new(49900, 2)),
        billing_cycle: Set("monthly".to_string()),
        next_billing_date: Set(date(2024, 2, 1)),
        notes: Set("Pays late".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("insert client")
}

pub async fn create_workflow(
    db: &DatabaseConnection,
    client: &clients::Model,
    n8n_workflow_id: &str,
    status: &str,
) -> workflows::Model {
    let now = Utc::now().fixed_offset();
    workflows::ActiveModel {
        id: Set(Uuid::new_v4()),
        client_id: Set(client.id),
        workflow_name: Set(format!("Workflow {}", n8n_workflow_id)),
        n8n_workflow_id: Set(n8n_workflow_id.to_string()),
        n8n_workflow_url: Set(None),
        description: Set(None),
        status: Set(status.to_string()),
        last_execution: Set(None),
        execution_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("insert workflow")
}

/// A portal user; `client` links it through a profile row.
pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    is_staff: bool,
    client: Option<&clients::Model>,
) -> users::Model {
    let user = users::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{}@example.com", username)),
        is_staff: Set(is_staff),
        api_token: Set(format!("token-{}", username)),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert user");

    if let Some(client) = client {
        client_profiles::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            client_id: Set(Some(client.id)),
        }
        .insert(db)
        .await
        .expect("insert profile");
    }

    user
}

pub async fn create_invoice(
    db: &DatabaseConnection,
    client: &clients::Model,
    invoice_number: &str,
    status: &str,
    due_date: NaiveDate,
) -> invoices::Model {
    let now = Utc::now().fixed_offset();
    invoices::ActiveModel {
        id: Set(Uuid::new_v4()),
        client_id: Set(client.id),
        invoice_number: Set(invoice_number.to_string()),
        amount: Set(Decimal::new(49900, 2)),
        invoice_type: Set("monthly".to_string()),
        status: Set(status.to_string()),
        due_date: Set(due_date),
        paid_date: Set(None),
        stripe_invoice_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("insert invoice")
}

pub fn auth_token(user: &users::Model) -> String {
    format!("Token {}", user.api_token)
}

/// Send one request through the router; returns status and parsed JSON body
/// (`Value::Null` for an empty body).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<(&str, String)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((header, value)) = auth {
        builder = builder.header(header, value);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
