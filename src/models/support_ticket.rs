use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::support_tickets;

string_enum! {
    pub enum TicketStatus {
        Open => "open",
        InProgress => "in_progress",
        Resolved => "resolved",
    }
}

string_enum! {
    pub enum TicketPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

/// Client users may omit `client_id`; their own client is used.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTicketRequest {
    pub client_id: Option<Uuid>,
    pub subject: String,
    pub description: String,
    pub priority: Option<TicketPriority>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTicketRequest {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub subject: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketResponse {
    pub id: Uuid,
    pub client_id: Uuid,
    pub subject: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub days_open: i64,
    pub resolved_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TicketResponse {
    pub fn from_model(model: support_tickets::Model, now: DateTime<FixedOffset>) -> Self {
        let end = match (model.status.as_str(), model.resolved_at) {
            ("resolved", Some(resolved_at)) => resolved_at,
            _ => now,
        };
        let days_open = (end - model.created_at).num_days();
        Self {
            id: model.id,
            client_id: model.client_id,
            subject: model.subject,
            description: model.description,
            status: model.status,
            priority: model.priority,
            days_open,
            resolved_at: model.resolved_at.map(|dt| dt.to_rfc3339()),
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}
