use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::time::interval;

use crate::config::PortalSettings;
use crate::services::execution_sync::ExecutionSyncService;
use crate::services::n8n::N8nService;
use crate::services::sync_status::{self, jobs};

/// Pull recent executions from n8n every `SYNC_INTERVAL_MINUTES`.
pub async fn start_execution_sync_job(
    db: DatabaseConnection,
    n8n: N8nService,
    settings: Arc<PortalSettings>,
) {
    if !settings.enable_auto_sync {
        tracing::info!("Automatic execution sync disabled (ENABLE_AUTO_SYNC=false)");
        return;
    }

    let interval_secs = settings.sync_interval.as_secs() as i32;
    if let Err(e) = sync_status::set_min_interval(&db, jobs::EXECUTION_SYNC, interval_secs).await {
        tracing::warn!("Failed to store execution sync interval: {}", e);
    }

    let service = ExecutionSyncService::new(db.clone(), n8n);
    let limit = settings.sync_limit;

    tokio::spawn(async move {
        let mut ticker = interval(super::check_period(settings.sync_interval));

        loop {
            ticker.tick().await;

            if !super::due(&db, jobs::EXECUTION_SYNC).await {
                continue;
            }

            tracing::info!("Starting scheduled execution sync (limit {})", limit);
            let stats = service.sync_all(limit).await;
            let outcome = match stats.fetch_error {
                Some(e) => Err(e),
                None => Ok(()),
            };
            super::record_run(&db, jobs::EXECUTION_SYNC, interval_secs, outcome).await;
        }
    });
}
