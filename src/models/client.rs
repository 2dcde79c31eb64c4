use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::clients;

string_enum! {
    /// Lifecycle of a client account
    pub enum ClientStatus {
        Active => "active",
        Paused => "paused",
        Churned => "churned",
    }
}

string_enum! {
    pub enum BillingCycle {
        Monthly => "monthly",
        Yearly => "yearly",
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateClientRequest {
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: Option<ClientStatus>,
    pub plan_tier: String,
    pub setup_fee: Decimal,
    pub monthly_fee: Decimal,
    pub billing_cycle: Option<BillingCycle>,
    pub next_billing_date: NaiveDate,
    #[serde(default)]
    pub notes: String,
}

/// Partial update, staff only
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateClientRequest {
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub status: Option<ClientStatus>,
    pub plan_tier: Option<String>,
    pub monthly_fee: Option<Decimal>,
    pub billing_cycle: Option<BillingCycle>,
    pub next_billing_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Staff view: every column, fees and internal notes included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientResponse {
    pub id: Uuid,
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: String,
    pub plan_tier: String,
    pub setup_fee: Decimal,
    pub monthly_fee: Decimal,
    pub billing_cycle: String,
    pub next_billing_date: NaiveDate,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Client user view: no fees, no notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientLimitedResponse {
    pub id: Uuid,
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: String,
    pub plan_tier: String,
    pub billing_cycle: String,
    pub created_at: String,
}

/// Either view, chosen per principal
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ClientView {
    Full(ClientResponse),
    Limited(ClientLimitedResponse),
}

impl From<clients::Model> for ClientResponse {
    fn from(model: clients::Model) -> Self {
        Self {
            id: model.id,
            company_name: model.company_name,
            contact_name: model.contact_name,
            email: model.email,
            phone: model.phone,
            status: model.status,
            plan_tier: model.plan_tier,
            setup_fee: model.setup_fee,
            monthly_fee: model.monthly_fee,
            billing_cycle: model.billing_cycle,
            next_billing_date: model.next_billing_date,
            notes: model.notes,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

impl From<clients::Model> for ClientLimitedResponse {
    fn from(model: clients::Model) -> Self {
        Self {
            id: model.id,
            company_name: model.company_name,
            contact_name: model.contact_name,
            email: model.email,
            phone: model.phone,
            status: model.status,
            plan_tier: model.plan_tier,
            billing_cycle: model.billing_cycle,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}
