//! SeaORM Entity for clients table
//!
//! A client company subscribed to Monoliet's n8n automation services.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_name: String,
    pub contact_name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub phone: Option<String>,
    /// active | paused | churned
    pub status: String,
    /// e.g. "E-commerce Essentials", "Business Process"
    pub plan_tier: String,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub setup_fee: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub monthly_fee: Decimal,
    /// monthly | yearly
    pub billing_cycle: String,
    pub next_billing_date: Date,
    /// Internal notes, never serialized to client users
    #[sea_orm(column_type = "Text")]
    pub notes: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::workflows::Entity")]
    Workflows,
    #[sea_orm(has_many = "super::executions::Entity")]
    Executions,
    #[sea_orm(has_many = "super::invoices::Entity")]
    Invoices,
    #[sea_orm(has_many = "super::support_tickets::Entity")]
    SupportTickets,
    #[sea_orm(has_many = "super::api_credentials::Entity")]
    ApiCredentials,
}

impl Related<super::workflows::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Workflows.def()
    }
}

impl Related<super::executions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Executions.def()
    }
}

impl Related<super::invoices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl Related<super::support_tickets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SupportTickets.def()
    }
}

impl Related<super::api_credentials::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApiCredentials.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
