//! n8n REST API client
//!
//! Thin wrapper over `/api/v1` authenticated with the `X-N8N-API-KEY` header.
//! Every call has a fixed 30 second timeout; there is no timeout for a sequence
//! of calls (cursor pagination can take as long as it takes).

use moka::future::Cache;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::models::execution::{N8nPage, RawExecution};

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// n8n rejects larger pages
pub const MAX_PAGE_SIZE: u32 = 250;

const API_KEY_HEADER: &str = "X-N8N-API-KEY";
const WORKFLOW_LIST_CACHE_KEY: &str = "workflows";

#[derive(Debug, Error)]
pub enum N8nError {
    #[error("n8n request timed out after {}s", REQUEST_TIMEOUT.as_secs())]
    Timeout,
    #[error("n8n request failed: {0}")]
    Transport(String),
    #[error("n8n API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed n8n response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for N8nError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            N8nError::Timeout
        } else {
            N8nError::Transport(err.to_string())
        }
    }
}

impl N8nError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, N8nError::Status { status: 404, .. })
    }
}

/// Workflow summary from `GET /workflows`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct N8nWorkflow {
    pub id: Value,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl N8nWorkflow {
    pub fn id_string(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Filters for `GET /executions`
#[derive(Debug, Clone, Default)]
pub struct ExecutionQuery {
    pub workflow_id: Option<String>,
    pub status: Option<String>,
    pub limit: u32,
    pub include_data: bool,
    pub cursor: Option<String>,
}

impl ExecutionQuery {
    fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("limit", self.limit.clamp(1, MAX_PAGE_SIZE).to_string()),
            ("includeData", self.include_data.to_string()),
        ];
        if let Some(workflow_id) = &self.workflow_id {
            params.push(("workflowId", workflow_id.clone()));
        }
        if let Some(status) = &self.status {
            params.push(("status", status.clone()));
        }
        if let Some(cursor) = &self.cursor {
            params.push(("cursor", cursor.clone()));
        }
        params
    }
}

/// Outcome of the admin "test connection" action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionCheck {
    /// connected | error
    pub status: String,
    pub connected: bool,
    pub message: String,
    pub latency_ms: u64,
    pub checked_at: String,
}

#[derive(Clone)]
pub struct N8nService {
    client: Client,
    api_key: String,
    base_url: String,
    workflow_cache: Arc<Cache<&'static str, Vec<N8nWorkflow>>>,
}

impl N8nService {
    /// `n8n_url` is the instance root; `/api/v1` is appended here.
    pub fn new(n8n_url: &str, api_key: String) -> Result<Self, N8nError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(60))
            .build();

        Ok(Self {
            client,
            api_key,
            base_url: format!("{}/api/v1", n8n_url.trim_end_matches('/')),
            workflow_cache: Arc::new(cache),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&'static str, String)],
        body: Option<&Value>,
    ) -> Result<T, N8nError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("accept", "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .query(params);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(%method, endpoint, status = status.as_u16(), "n8n API returned an error");
            return Err(N8nError::Status {
                status: status.as_u16(),
                body: truncate(&text, 500),
            });
        }

        serde_json::from_str(&text).map_err(|e| N8nError::Decode(e.to_string()))
    }

    /// `GET /workflows`, cached for a minute
    pub async fn list_workflows(&self) -> Result<Vec<N8nWorkflow>, N8nError> {
        if let Some(cached) = self.workflow_cache.get(WORKFLOW_LIST_CACHE_KEY).await {
            tracing::debug!("Cache hit for n8n workflow list");
            return Ok(cached);
        }

        let page: N8nPage<N8nWorkflow> =
            self.request(Method::GET, "workflows", &[], None).await?;

        tracing::info!("Fetched {} workflows from n8n", page.data.len());

        self.workflow_cache
            .insert(WORKFLOW_LIST_CACHE_KEY, page.data.clone())
            .await;

        Ok(page.data)
    }

    /// `GET /workflows/{id}` as raw JSON (the PUT body needs every field back)
    pub async fn get_workflow(&self, workflow_id: &str) -> Result<Value, N8nError> {
        self.request(Method::GET, &format!("workflows/{}", workflow_id), &[], None)
            .await
    }

    /// One page of `GET /executions`
    pub async fn get_executions(
        &self,
        query: &ExecutionQuery,
    ) -> Result<N8nPage<RawExecution>, N8nError> {
        self.request(Method::GET, "executions", &query.to_params(), None)
            .await
    }

    /// Fetch up to `cap` executions, following `nextCursor` across pages.
    pub async fn fetch_executions(
        &self,
        workflow_id: Option<&str>,
        cap: u32,
    ) -> Result<Vec<RawExecution>, N8nError> {
        let cap = cap.max(1) as usize;
        let mut collected: Vec<RawExecution> = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let remaining = cap - collected.len();
            let query = ExecutionQuery {
                workflow_id: workflow_id.map(str::to_string),
                limit: remaining.min(MAX_PAGE_SIZE as usize) as u32,
                include_data: false,
                cursor: cursor.take(),
                ..Default::default()
            };

            let page = self.get_executions(&query).await?;
            let page_len = page.data.len();
            collected.extend(page.data.into_iter().take(remaining));

            tracing::debug!(
                page_len,
                collected = collected.len(),
                has_more = page.next_cursor.is_some(),
                "Fetched n8n executions page"
            );

            match page.next_cursor {
                Some(next) if collected.len() < cap && page_len > 0 => cursor = Some(next),
                _ => break,
            }
        }

        Ok(collected)
    }

    /// `GET /executions/{id}`
    pub async fn get_execution(
        &self,
        execution_id: &str,
        include_data: bool,
    ) -> Result<Value, N8nError> {
        self.request(
            Method::GET,
            &format!("executions/{}", execution_id),
            &[("includeData", include_data.to_string())],
            None,
        )
        .await
    }

    /// Toggle `active` on a remote workflow (read, modify, `PUT` back)
    pub async fn set_workflow_active(
        &self,
        workflow_id: &str,
        active: bool,
    ) -> Result<Value, N8nError> {
        let mut workflow = self.get_workflow(workflow_id).await?;
        match workflow.as_object_mut() {
            Some(object) => {
                object.insert("active".to_string(), Value::Bool(active));
            }
            None => return Err(N8nError::Decode("workflow body is not an object".to_string())),
        }

        let updated: Value = self
            .request(
                Method::PUT,
                &format!("workflows/{}", workflow_id),
                &[],
                Some(&workflow),
            )
            .await?;

        self.workflow_cache.invalidate(WORKFLOW_LIST_CACHE_KEY).await;
        tracing::info!(workflow_id, active, "Updated n8n workflow activation");

        Ok(updated)
    }

    pub async fn activate_workflow(&self, workflow_id: &str) -> Result<Value, N8nError> {
        self.set_workflow_active(workflow_id, true).await
    }

    pub async fn deactivate_workflow(&self, workflow_id: &str) -> Result<Value, N8nError> {
        self.set_workflow_active(workflow_id, false).await
    }

    /// Cheap authenticated call used by the admin connection test
    pub async fn test_connection(&self) -> ConnectionCheck {
        let started = Instant::now();
        let result: Result<Value, N8nError> = self
            .request(Method::GET, "workflows", &[("limit", "1".to_string())], None)
            .await;
        let latency_ms = started.elapsed().as_millis() as u64;
        let checked_at = chrono::Utc::now().to_rfc3339();

        match result {
            Ok(_) => ConnectionCheck {
                status: "connected".to_string(),
                connected: true,
                message: "Connected to n8n".to_string(),
                latency_ms,
                checked_at,
            },
            Err(e) => {
                let message = match &e {
                    N8nError::Status { status, .. }
                        if *status == StatusCode::UNAUTHORIZED.as_u16() =>
                    {
                        "n8n rejected the API key".to_string()
                    }
                    other => other.to_string(),
                };
                tracing::warn!(error = %e, "n8n connection test failed");
                ConnectionCheck {
                    status: "error".to_string(),
                    connected: false,
                    message,
                    latency_ms,
                    checked_at,
                }
            }
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars).collect();
        cut.push('…');
        cut
    }
}
