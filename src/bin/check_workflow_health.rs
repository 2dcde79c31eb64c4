use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use sea_orm::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use monoliet_portal::config::PortalSettings;
use monoliet_portal::services::health::check_workflow_health;
use monoliet_portal::services::notifier::Notifier;
use monoliet_portal::services::sync_status::{self, intervals, jobs};

/// Check workflow health and alert on problems
#[derive(Debug, Parser)]
#[command(name = "check_workflow_health")]
struct Args {
    /// Success rate threshold in percent (defaults to HEALTH_SUCCESS_THRESHOLD)
    #[arg(long)]
    threshold: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,monoliet_portal=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();
    let settings = Arc::new(PortalSettings::from_env()?);
    let threshold = args.threshold.unwrap_or(settings.health_success_threshold);

    let db = Database::connect(&settings.database_url).await?;
    let notifier = Notifier::from_settings(settings.clone());

    println!("Checking workflow health (success rate threshold: {}%)...", threshold);
    let report = check_workflow_health(&db, threshold, Utc::now().date_naive()).await?;

    for issue in &report.issues {
        println!(
            "[{}] {} (Client: {}): {}",
            issue.severity.as_str().to_uppercase(),
            issue.workflow_name,
            issue.client_name,
            issue.message
        );
    }

    if report.is_healthy() {
        println!("All {} workflows are healthy!", report.workflows_checked);
    } else {
        println!(
            "Found {} issue(s) across {} workflows. Alert sent.",
            report.issues.len(),
            report.workflows_checked
        );
    }

    notifier.notify(report.into_events()).await;
    sync_status::record_success(&db, jobs::WORKFLOW_HEALTH, intervals::WORKFLOW_HEALTH).await?;
    Ok(())
}
