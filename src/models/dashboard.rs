//! Aggregated views for the admin dashboard and the client portal.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::execution::ExecutionStatsResponse;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkflowTotals {
    pub total: u64,
    pub active: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecutionTotals {
    pub total: i64,
    pub successes: i64,
    pub errors: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InvoiceTotals {
    pub total_amount: Decimal,
    pub pending_amount: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TicketTotals {
    pub total: u64,
    pub open: u64,
}

/// `GET /api/clients/{id}/statistics`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientStatisticsResponse {
    pub client_id: Uuid,
    pub company_name: String,
    pub workflows: WorkflowTotals,
    pub executions: ExecutionTotals,
    pub invoices: InvoiceTotals,
    pub support_tickets: TicketTotals,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientCounts {
    pub total: u64,
    pub active: u64,
    pub paused: u64,
    pub churned: u64,
}

/// `GET /api/admin/dashboard`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminDashboardResponse {
    pub clients: ClientCounts,
    pub monthly_recurring_revenue: Decimal,
    pub open_tickets: u64,
    pub overdue_invoices: u64,
    pub workflows_in_error: u64,
    pub executions_last_7_days: ExecutionStatsResponse,
}
