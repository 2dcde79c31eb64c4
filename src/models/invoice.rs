use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::invoices;

string_enum! {
    pub enum InvoiceStatus {
        Pending => "pending",
        Paid => "paid",
        Overdue => "overdue",
    }
}

string_enum! {
    pub enum InvoiceType {
        Setup => "setup",
        Monthly => "monthly",
        Additional => "additional",
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvoiceRequest {
    pub client_id: Uuid,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub invoice_type: InvoiceType,
    pub due_date: NaiveDate,
    pub stripe_invoice_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub client_id: Uuid,
    pub invoice_number: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub invoice_type: String,
    pub status: String,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub is_overdue: bool,
    pub stripe_invoice_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl InvoiceResponse {
    pub fn from_model(model: invoices::Model, today: NaiveDate) -> Self {
        let is_overdue = model.status == InvoiceStatus::Pending.as_str() && model.due_date < today;
        Self {
            id: model.id,
            client_id: model.client_id,
            invoice_number: model.invoice_number,
            amount: model.amount,
            invoice_type: model.invoice_type,
            status: model.status,
            due_date: model.due_date,
            paid_date: model.paid_date,
            is_overdue,
            stripe_invoice_id: model.stripe_invoice_id,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}
