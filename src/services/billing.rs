//! Invoices: numbering, creation, payment and reminders

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{clients, invoices, prelude::*};
use crate::models::client::ClientStatus;
use crate::models::invoice::{CreateInvoiceRequest, InvoiceStatus};
use crate::services::notifier::{DomainEvent, Notifier};

/// Reminders start this many days before the due date
const UPCOMING_WINDOW_DAYS: i64 = 3;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error(transparent)]
    Db(#[from] DbErr),
    #[error("client {0} not found")]
    ClientNotFound(Uuid),
    #[error("invoice {0} not found")]
    InvoiceNotFound(Uuid),
    #[error("amount must not be negative")]
    NegativeAmount,
    #[error("invoice {0} is already paid")]
    AlreadyPaid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    Overdue(i64),
    DueToday,
    Upcoming(i64),
}

impl ReminderKind {
    pub fn label(&self) -> &'static str {
        match self {
            ReminderKind::Overdue(_) => "overdue",
            ReminderKind::DueToday => "due_today",
            ReminderKind::Upcoming(_) => "upcoming",
        }
    }

    pub fn subject_prefix(&self) -> &'static str {
        match self {
            ReminderKind::Overdue(_) => "OVERDUE: ",
            ReminderKind::DueToday => "DUE TODAY: ",
            ReminderKind::Upcoming(_) => "REMINDER: ",
        }
    }

    pub fn message(&self) -> String {
        match self {
            ReminderKind::Overdue(days) => format!("This invoice is {} day(s) overdue.", days),
            ReminderKind::DueToday => "This invoice is due today.".to_string(),
            ReminderKind::Upcoming(days) => format!("This invoice is due in {} day(s).", days),
        }
    }
}

/// `None` when the due date is more than three days away
pub fn reminder_kind(due_date: NaiveDate, today: NaiveDate) -> Option<ReminderKind> {
    let days_until_due = (due_date - today).num_days();
    match days_until_due {
        d if d < 0 => Some(ReminderKind::Overdue(-d)),
        0 => Some(ReminderKind::DueToday),
        d if d <= UPCOMING_WINDOW_DAYS => Some(ReminderKind::Upcoming(d)),
        _ => None,
    }
}

fn sequence_of(invoice_number: &str, prefix: &str) -> Option<u32> {
    invoice_number.strip_prefix(prefix)?.parse().ok()
}

/// Next free `INV-{year}-NNN`; numbering restarts at 001 each year.
pub async fn next_invoice_number<C: ConnectionTrait>(conn: &C, year: i32) -> Result<String, DbErr> {
    let prefix = format!("INV-{}-", year);

    let last = Invoices::find()
        .filter(invoices::Column::InvoiceNumber.starts_with(&prefix))
        .all(conn)
        .await?
        .iter()
        .filter_map(|invoice| sequence_of(&invoice.invoice_number, &prefix))
        .max()
        .unwrap_or(0);

    Ok(format!("{}{:03}", prefix, last + 1))
}

pub async fn create_invoice(
    db: &DatabaseConnection,
    request: CreateInvoiceRequest,
    today: NaiveDate,
) -> Result<(invoices::Model, Vec<DomainEvent>), BillingError> {
    if request.amount.is_sign_negative() {
        return Err(BillingError::NegativeAmount);
    }

    let client = Clients::find_by_id(request.client_id)
        .one(db)
        .await?
        .ok_or(BillingError::ClientNotFound(request.client_id))?;

    let invoice_number = next_invoice_number(db, today.year()).await?;

    // Backdated invoices start out overdue
    let status = if request.due_date < today {
        InvoiceStatus::Overdue
    } else {
        InvoiceStatus::Pending
    };

    let now = Utc::now().fixed_offset();
    let invoice = invoices::ActiveModel {
        id: Set(Uuid::new_v4()),
        client_id: Set(client.id),
        invoice_number: Set(invoice_number),
        amount: Set(request.amount),
        invoice_type: Set(request.invoice_type.as_str().to_string()),
        status: Set(status.as_str().to_string()),
        due_date: Set(request.due_date),
        paid_date: Set(None),
        stripe_invoice_id: Set(request.stripe_invoice_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    tracing::info!(
        invoice_number = %invoice.invoice_number,
        client = %client.company_name,
        amount = %invoice.amount,
        "Created invoice"
    );

    let events = vec![DomainEvent::InvoiceCreated {
        invoice: invoice.clone(),
        client,
    }];
    Ok((invoice, events))
}

pub async fn mark_paid(
    db: &DatabaseConnection,
    invoice_id: Uuid,
    paid_on: NaiveDate,
) -> Result<invoices::Model, BillingError> {
    let invoice = Invoices::find_by_id(invoice_id)
        .one(db)
        .await?
        .ok_or(BillingError::InvoiceNotFound(invoice_id))?;

    if invoice.status == InvoiceStatus::Paid.as_str() {
        return Err(BillingError::AlreadyPaid(invoice.invoice_number));
    }

    let mut active: invoices::ActiveModel = invoice.into();
    active.status = Set(InvoiceStatus::Paid.as_str().to_string());
    active.paid_date = Set(Some(paid_on));
    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active.update(db).await?;

    tracing::info!(invoice_number = %updated.invoice_number, "Invoice marked as paid");
    Ok(updated)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReminderRun {
    pub checked: u32,
    pub sent: u32,
    pub errors: u32,
    pub marked_overdue: u32,
}

/// Remind every pending invoice that is due within three days or past due,
/// and flip the past-due ones to `overdue`.
pub async fn send_invoice_reminders(
    db: &DatabaseConnection,
    notifier: &Notifier,
    today: NaiveDate,
) -> Result<ReminderRun, DbErr> {
    let pending = Invoices::find()
        .filter(invoices::Column::Status.eq(InvoiceStatus::Pending.as_str()))
        .find_also_related(Clients)
        .all(db)
        .await?;

    let mut run = ReminderRun::default();

    for (invoice, client) in pending {
        run.checked += 1;

        let Some(kind) = reminder_kind(invoice.due_date, today) else {
            continue;
        };
        let Some(client) = client else {
            tracing::warn!(invoice_number = %invoice.invoice_number, "Invoice without client");
            run.errors += 1;
            continue;
        };

        let event = DomainEvent::InvoiceReminder {
            invoice: invoice.clone(),
            client,
            kind,
        };
        match notifier.deliver(&event).await {
            Ok(_) => {
                run.sent += 1;
                tracing::info!(
                    invoice_number = %invoice.invoice_number,
                    kind = kind.label(),
                    "Sent invoice reminder"
                );
            }
            Err(e) => {
                run.errors += 1;
                tracing::error!(
                    invoice_number = %invoice.invoice_number,
                    error = %e,
                    "Failed to send invoice reminder"
                );
                continue;
            }
        }

        if matches!(kind, ReminderKind::Overdue(_)) {
            let invoice_number = invoice.invoice_number.clone();
            let mut active: invoices::ActiveModel = invoice.into();
            active.status = Set(InvoiceStatus::Overdue.as_str().to_string());
            active.updated_at = Set(Utc::now().fixed_offset());
            match active.update(db).await {
                Ok(_) => {
                    run.marked_overdue += 1;
                    tracing::info!(%invoice_number, "Invoice marked overdue");
                }
                Err(e) => {
                    run.errors += 1;
                    tracing::error!(%invoice_number, error = %e, "Failed to mark invoice overdue");
                }
            }
        }
    }

    tracing::info!(
        sent = run.sent,
        errors = run.errors,
        marked_overdue = run.marked_overdue,
        "Invoice reminders complete"
    );
    Ok(run)
}

/// Sum of `monthly_fee` over active clients
pub async fn monthly_recurring_revenue<C: ConnectionTrait>(conn: &C) -> Result<Decimal, DbErr> {
    let active = Clients::find()
        .filter(clients::Column::Status.eq(ClientStatus::Active.as_str()))
        .all(conn)
        .await?;

    Ok(active.iter().map(|client| client.monthly_fee).sum())
}
