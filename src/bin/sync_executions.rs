use std::sync::Arc;

use clap::Parser;
use sea_orm::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use monoliet_portal::config::PortalSettings;
use monoliet_portal::services::execution_sync::ExecutionSyncService;
use monoliet_portal::services::n8n::N8nService;
use monoliet_portal::services::sync_status::{self, jobs};

/// Sync n8n executions into the daily aggregates
#[derive(Debug, Parser)]
#[command(name = "sync_executions")]
struct Args {
    /// Only sync this n8n workflow id
    #[arg(long)]
    workflow_id: Option<String>,

    /// Maximum executions to fetch (defaults to SYNC_LIMIT)
    #[arg(long)]
    limit: Option<u32>,

    /// List the workflows known to n8n and exit
    #[arg(long)]
    list_workflows: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,monoliet_portal=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let settings = Arc::new(PortalSettings::from_env()?);

    let n8n = N8nService::new(&settings.n8n_url, settings.n8n_api_key.clone())?;

    if args.list_workflows {
        let workflows = n8n.list_workflows().await?;
        println!("{} workflow(s) in n8n:", workflows.len());
        for workflow in workflows {
            println!(
                "  {:<24} {:<8} {}",
                workflow.id_string(),
                if workflow.active { "active" } else { "inactive" },
                workflow.name
            );
        }
        return Ok(());
    }

    tracing::info!("Connecting to database...");
    let db = Database::connect(&settings.database_url).await?;

    let limit = args.limit.unwrap_or(settings.sync_limit).max(1);
    let service = ExecutionSyncService::new(db.clone(), n8n);

    let stats = match &args.workflow_id {
        Some(workflow_id) => {
            tracing::info!("Syncing executions for workflow {} (limit {})", workflow_id, limit);
            service.sync_workflow(workflow_id, limit).await
        }
        None => {
            tracing::info!("Syncing all recent executions (limit {})", limit);
            service.sync_all(limit).await
        }
    };

    let interval_secs = settings.sync_interval.as_secs() as i32;
    match &stats.fetch_error {
        None => sync_status::record_success(&db, jobs::EXECUTION_SYNC, interval_secs).await?,
        Some(e) => sync_status::record_failure(&db, jobs::EXECUTION_SYNC, e, interval_secs).await?,
    }

    println!("Sync complete:");
    println!("  Created: {}", stats.created);
    println!("  Updated: {}", stats.updated);
    println!("  Skipped: {}", stats.skipped);
    println!("  Errors:  {}", stats.errors);

    if let Some(e) = stats.fetch_error {
        anyhow::bail!("fetching executions from n8n failed: {}", e);
    }
    Ok(())
}
