use chrono::Utc;
use sea_orm::DatabaseConnection;
use tokio::time::{interval, Duration};

use crate::services::billing::send_invoice_reminders;
use crate::services::notifier::Notifier;
use crate::services::sync_status::{intervals, jobs};

/// Daily payment reminders; the run stamp keeps restarts from re-sending them.
pub async fn start_invoice_reminder_job(db: DatabaseConnection, notifier: Notifier) {
    tokio::spawn(async move {
        // `sync_status` lets it through once a day
        let mut ticker = interval(super::check_period(Duration::from_secs(
            intervals::INVOICE_REMINDERS as u64,
        )));

        loop {
            ticker.tick().await;

            if !super::due(&db, jobs::INVOICE_REMINDERS).await {
                continue;
            }

            let today = Utc::now().date_naive();
            let outcome = match send_invoice_reminders(&db, &notifier, today).await {
                Ok(run) => {
                    tracing::info!(
                        "Invoice reminders: sent {}, errors {}, marked overdue {}",
                        run.sent,
                        run.errors,
                        run.marked_overdue
                    );
                    Ok(())
                }
                Err(e) => Err(e.to_string()),
            };
            super::record_run(&db, jobs::INVOICE_REMINDERS, intervals::INVOICE_REMINDERS, outcome)
                .await;
        }
    });
}
