// src/lib.rs

use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::PortalSettings;
use services::{n8n::N8nService, notifier::Notifier};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub n8n: N8nService,
    pub settings: Arc<PortalSettings>,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(db: DatabaseConnection, n8n: N8nService, settings: Arc<PortalSettings>) -> Self {
        let notifier = Notifier::from_settings(settings.clone());
        Self {
            db,
            n8n,
            settings,
            notifier,
        }
    }
}

pub mod config;

pub mod entities {
    pub mod prelude;
    pub mod api_credentials;
    pub mod client_profiles;
    pub mod clients;
    pub mod executions;
    pub mod invoices;
    pub mod support_tickets;
    pub mod sync_status;
    pub mod users;
    pub mod workflows;
}

pub mod services {
    pub mod authz;
    pub mod billing;
    pub mod crypto;
    pub mod execution_sync;
    pub mod health;
    pub mod n8n;
    pub mod notifier;
    pub mod stats;
    pub mod sync_status;
}

pub mod models;
pub mod handlers;
pub mod jobs;

pub fn build_router(state: AppState) -> Router {
    use handlers::{
        admin, clients, credentials, executions, health, invoices, support_tickets, workflows,
    };

    Router::new()
        .route("/health", get(health::health))
        // Clients
        .route("/api/clients", get(clients::list_clients).post(clients::create_client))
        .route("/api/clients/me", get(clients::my_client))
        .route(
            "/api/clients/{id}",
            get(clients::get_client).patch(clients::update_client),
        )
        .route("/api/clients/{id}/statistics", get(clients::client_statistics))
        // Workflows
        .route(
            "/api/workflows",
            get(workflows::list_workflows).post(workflows::create_workflow),
        )
        .route("/api/workflows/{id}", get(workflows::get_workflow))
        .route(
            "/api/workflows/{id}/status",
            patch(workflows::update_workflow_status),
        )
        // Credentials
        .route(
            "/api/credentials",
            get(credentials::list_credentials).post(credentials::create_credential),
        )
        // Executions
        .route("/api/executions", get(executions::list_executions))
        .route("/api/executions/stats", get(executions::execution_stats))
        // Invoices
        .route(
            "/api/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route("/api/invoices/{id}/mark-paid", post(invoices::mark_invoice_paid))
        // Support tickets
        .route(
            "/api/support-tickets",
            get(support_tickets::list_tickets).post(support_tickets::create_ticket),
        )
        .route("/api/support-tickets/{id}", patch(support_tickets::update_ticket))
        // Admin
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route("/api/admin/jobs", get(admin::job_statuses))
        .route("/api/admin/executions/chart", get(admin::execution_chart))
        .route("/api/admin/sync", post(admin::trigger_sync))
        .route("/api/admin/n8n/health", get(admin::n8n_health))
        .route("/api/admin/n8n/workflows", get(admin::n8n_workflows))
        .route(
            "/api/admin/n8n/workflows/{id}/{action}",
            post(admin::n8n_workflow_action),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
