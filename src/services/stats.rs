//! Read-side aggregates for the portal and the admin dashboard.
//!
//! Sums are computed in Rust over the scoped rows; the tables are small
//! (one execution row per workflow per day).

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::{clients, executions, invoices, prelude::*, support_tickets, workflows};
use crate::models::client::ClientStatus;
use crate::models::dashboard::{
    AdminDashboardResponse, ClientCounts, ClientStatisticsResponse, ExecutionTotals,
    InvoiceTotals, TicketTotals, WorkflowTotals,
};
use crate::models::execution::{success_rate, ExecutionChartResponse, ExecutionStatsResponse};
use crate::models::invoice::InvoiceStatus;
use crate::models::support_ticket::TicketStatus;
use crate::models::workflow::WorkflowStatus;
use crate::services::authz::Scope;
use crate::services::billing::monthly_recurring_revenue;

pub const DEFAULT_STATS_DAYS: i64 = 30;
pub const DEFAULT_CHART_DAYS: i64 = 7;

fn execution_totals(rows: &[executions::Model]) -> ExecutionTotals {
    rows.iter().fold(ExecutionTotals::default(), |mut acc, row| {
        acc.total += row.total_count as i64;
        acc.successes += row.success_count as i64;
        acc.errors += row.error_count as i64;
        acc
    })
}

/// Totals over `[today - days, today]` for the rows visible in `scope`.
pub async fn execution_stats(
    db: &DatabaseConnection,
    scope: Scope,
    days: i64,
    today: NaiveDate,
) -> Result<ExecutionStatsResponse, DbErr> {
    let period_start = today - Duration::days(days.max(0));
    let period_end = today;

    let select = Executions::find()
        .filter(executions::Column::ExecutionDate.gte(period_start))
        .filter(executions::Column::ExecutionDate.lte(period_end));

    let rows = match scope.apply(select, executions::Column::ClientId) {
        Some(select) => select.all(db).await?,
        None => vec![],
    };
    let totals = execution_totals(&rows);

    Ok(ExecutionStatsResponse {
        total_executions: totals.total,
        total_successes: totals.successes,
        total_errors: totals.errors,
        success_rate: success_rate(totals.successes, totals.total),
        period_start,
        period_end,
    })
}

/// Daily success/error series over `[today - days, today]`, one point per
/// day (zero when nothing ran). Optionally narrowed to one n8n workflow id
/// and/or one client; an unregistered workflow id gives an all-zero series.
pub async fn execution_chart(
    db: &DatabaseConnection,
    days: i64,
    n8n_workflow_id: Option<&str>,
    client_id: Option<Uuid>,
    today: NaiveDate,
) -> Result<ExecutionChartResponse, DbErr> {
    let start = today - Duration::days(days.max(0));

    let mut select = Executions::find()
        .filter(executions::Column::ExecutionDate.gte(start))
        .filter(executions::Column::ExecutionDate.lte(today));

    if let Some(n8n_id) = n8n_workflow_id {
        let workflow_ids: Vec<Uuid> = Workflows::find()
            .filter(workflows::Column::N8nWorkflowId.eq(n8n_id))
            .all(db)
            .await?
            .into_iter()
            .map(|w| w.id)
            .collect();
        select = select.filter(executions::Column::WorkflowId.is_in(workflow_ids));
    }
    if let Some(client_id) = client_id {
        select = select.filter(executions::Column::ClientId.eq(client_id));
    }

    Ok(daily_series(&select.all(db).await?, start, today))
}

fn daily_series(
    rows: &[executions::Model],
    start: NaiveDate,
    end: NaiveDate,
) -> ExecutionChartResponse {
    let mut chart = ExecutionChartResponse::default();
    for day in start.iter_days().take_while(|day| *day <= end) {
        let (success, errors) = rows
            .iter()
            .filter(|row| row.execution_date == day)
            .fold((0, 0), |(s, e), row| {
                (s + row.success_count as i64, e + row.error_count as i64)
            });
        chart.labels.push(day.format("%Y-%m-%d").to_string());
        chart.success.push(success);
        chart.errors.push(errors);
    }
    chart
}

/// `None` when the client does not exist
pub async fn client_statistics(
    db: &DatabaseConnection,
    client_id: Uuid,
) -> Result<Option<ClientStatisticsResponse>, DbErr> {
    let Some(client) = Clients::find_by_id(client_id).one(db).await? else {
        return Ok(None);
    };

    let client_workflows = Workflows::find()
        .filter(workflows::Column::ClientId.eq(client_id))
        .all(db)
        .await?;
    let client_executions = Executions::find()
        .filter(executions::Column::ClientId.eq(client_id))
        .all(db)
        .await?;
    let client_invoices = Invoices::find()
        .filter(invoices::Column::ClientId.eq(client_id))
        .all(db)
        .await?;
    let client_tickets = SupportTickets::find()
        .filter(support_tickets::Column::ClientId.eq(client_id))
        .all(db)
        .await?;

    let workflows = WorkflowTotals {
        total: client_workflows.len() as u64,
        active: client_workflows
            .iter()
            .filter(|w| w.status == WorkflowStatus::Active.as_str())
            .count() as u64,
    };

    let invoices = client_invoices
        .iter()
        .fold(InvoiceTotals::default(), |mut acc, invoice| {
            acc.total_amount += invoice.amount;
            if invoice.status == InvoiceStatus::Pending.as_str() {
                acc.pending_amount += invoice.amount;
            }
            acc
        });

    let support_tickets = TicketTotals {
        total: client_tickets.len() as u64,
        open: client_tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Open.as_str())
            .count() as u64,
    };

    Ok(Some(ClientStatisticsResponse {
        client_id,
        company_name: client.company_name,
        workflows,
        executions: execution_totals(&client_executions),
        invoices,
        support_tickets,
    }))
}

pub async fn admin_dashboard(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<AdminDashboardResponse, DbErr> {
    let all_clients: Vec<clients::Model> = Clients::find().all(db).await?;
    let mut counts = ClientCounts {
        total: all_clients.len() as u64,
        ..Default::default()
    };
    for client in &all_clients {
        match client.status.parse::<ClientStatus>() {
            Ok(ClientStatus::Active) => counts.active += 1,
            Ok(ClientStatus::Paused) => counts.paused += 1,
            Ok(ClientStatus::Churned) => counts.churned += 1,
            Err(_) => {}
        }
    }

    let mrr: Decimal = monthly_recurring_revenue(db).await?;

    let open_tickets = SupportTickets::find()
        .filter(support_tickets::Column::Status.ne(TicketStatus::Resolved.as_str()))
        .all(db)
        .await?
        .len() as u64;

    // Pending invoices past due count too; the reminder job may not have flipped them yet
    let overdue_invoices = Invoices::find()
        .filter(invoices::Column::Status.ne(InvoiceStatus::Paid.as_str()))
        .all(db)
        .await?
        .iter()
        .filter(|invoice| {
            invoice.status == InvoiceStatus::Overdue.as_str() || invoice.due_date < today
        })
        .count() as u64;

    let workflows_in_error = Workflows::find()
        .filter(workflows::Column::Status.eq(WorkflowStatus::Error.as_str()))
        .all(db)
        .await?
        .len() as u64;

    let executions_last_7_days = execution_stats(db, Scope::All, 7, today).await?;

    Ok(AdminDashboardResponse {
        clients: counts,
        monthly_recurring_revenue: mrr,
        open_tickets,
        overdue_invoices,
        workflows_in_error,
        executions_last_7_days,
    })
}
