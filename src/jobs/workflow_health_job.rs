use chrono::Utc;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::time::{interval, Duration};

use crate::config::PortalSettings;
use crate::services::health::check_workflow_health;
use crate::services::notifier::Notifier;
use crate::services::sync_status::{intervals, jobs};

pub async fn start_workflow_health_job(
    db: DatabaseConnection,
    notifier: Notifier,
    settings: Arc<PortalSettings>,
) {
    tokio::spawn(async move {
        let mut ticker = interval(super::check_period(Duration::from_secs(
            intervals::WORKFLOW_HEALTH as u64,
        )));

        loop {
            ticker.tick().await;

            if !super::due(&db, jobs::WORKFLOW_HEALTH).await {
                continue;
            }

            let today = Utc::now().date_naive();
            let outcome =
                match check_workflow_health(&db, settings.health_success_threshold, today).await {
                    Ok(report) => {
                        notifier.notify(report.into_events()).await;
                        Ok(())
                    }
                    Err(e) => Err(e.to_string()),
                };
            super::record_run(&db, jobs::WORKFLOW_HEALTH, intervals::WORKFLOW_HEALTH, outcome)
                .await;
        }
    });
}
