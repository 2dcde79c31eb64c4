use std::sync::Arc;

use anyhow::Context;
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use monoliet_portal::config::PortalSettings;
use monoliet_portal::jobs::{
    execution_sync_job::start_execution_sync_job, invoice_reminder_job::start_invoice_reminder_job,
    workflow_health_job::start_workflow_health_job,
};
use monoliet_portal::services::n8n::N8nService;
use monoliet_portal::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,monoliet_portal=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let settings = Arc::new(PortalSettings::from_env()?);

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = Database::connect(&settings.database_url)
        .await
        .context("Failed to connect to database")?;

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .context("Failed to run migrations")?;

    if settings.n8n_api_key.is_empty() {
        tracing::warn!("N8N_API_KEY is not set; n8n calls will be rejected");
    }
    let n8n = N8nService::new(&settings.n8n_url, settings.n8n_api_key.clone())?;

    let state = AppState::new(db.clone(), n8n.clone(), settings.clone());

    // Background jobs
    start_execution_sync_job(db.clone(), n8n, settings.clone()).await;
    start_workflow_health_job(db.clone(), state.notifier.clone(), settings.clone()).await;
    start_invoice_reminder_job(db, state.notifier.clone()).await;

    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
