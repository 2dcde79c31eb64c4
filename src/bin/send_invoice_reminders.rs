use std::sync::Arc;

use chrono::Utc;
use sea_orm::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use monoliet_portal::config::PortalSettings;
use monoliet_portal::services::billing::send_invoice_reminders;
use monoliet_portal::services::notifier::Notifier;
use monoliet_portal::services::sync_status::{self, intervals, jobs};

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
    let settings = Arc::new(PortalSettings::from_env()?);

    let db = Database::connect(&settings.database_url).await?;
    let notifier = Notifier::from_settings(settings);

    println!("Checking for invoices requiring reminders...");
    let run = send_invoice_reminders(&db, &notifier, Utc::now().date_naive()).await?;
    sync_status::record_success(&db, jobs::INVOICE_REMINDERS, intervals::INVOICE_REMINDERS).await?;

    println!(
        "Reminder sending complete! Checked {}, sent {}, marked overdue {}, errors {}",
        run.checked, run.sent, run.marked_overdue, run.errors
    );
    Ok(())
}
