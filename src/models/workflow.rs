use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::workflows;

string_enum! {
    pub enum WorkflowStatus {
        Active => "active",
        Paused => "paused",
        Error => "error",
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkflowRequest {
    pub client_id: Uuid,
    pub workflow_name: String,
    pub n8n_workflow_id: String,
    pub n8n_workflow_url: Option<String>,
    pub description: Option<String>,
    pub status: Option<WorkflowStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateWorkflowStatusRequest {
    pub status: WorkflowStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResponse {
    pub id: Uuid,
    pub client_id: Uuid,
    pub workflow_name: String,
    pub n8n_workflow_id: String,
    pub n8n_workflow_url: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub last_execution: Option<String>,
    pub execution_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<workflows::Model> for WorkflowResponse {
    fn from(model: workflows::Model) -> Self {
        Self {
            id: model.id,
            client_id: model.client_id,
            workflow_name: model.workflow_name,
            n8n_workflow_id: model.n8n_workflow_id,
            n8n_workflow_url: model.n8n_workflow_url,
            description: model.description,
            status: model.status,
            last_execution: model.last_execution.map(|dt| dt.to_rfc3339()),
            execution_count: model.execution_count,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

/// Result of a remote activate/deactivate call against n8n
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteWorkflowActionResponse {
    pub n8n_workflow_id: String,
    pub action: String,
    pub active: bool,
}
