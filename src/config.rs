//! Portal settings
//!
//! Loaded once from the environment at process start and shared through
//! `AppState` as an `Arc<PortalSettings>`. There is no settings table.

use std::env;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_N8N_URL: &str = "https://n8n.monoliet.cloud";
const DEFAULT_COMPANY_NAME: &str = "Monoliet";
const DEFAULT_SUPPORT_EMAIL: &str = "info@monoliet.cloud";
const DEFAULT_PORTAL_URL: &str = "https://portal.monoliet.cloud";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SYNC_INTERVAL_MINUTES: u64 = 15;
const DEFAULT_SYNC_LIMIT: u32 = 100;
const DEFAULT_HEALTH_THRESHOLD: u32 = 80;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct PortalSettings {
    pub database_url: String,
    /// n8n instance root, without the `/api/v1` suffix
    pub n8n_url: String,
    pub n8n_api_key: String,
    /// Base used for editor links (`{n8n_editor_url}/workflow/{id}`)
    pub n8n_editor_url: String,
    pub admin_api_key: Option<String>,
    /// Base64 AES-256 key for API credentials
    pub encryption_key: Option<String>,
    pub company_name: String,
    pub support_email: String,
    /// Recipient of admin notifications; falls back to the support address
    pub admin_email: String,
    pub portal_url: String,
    pub enable_auto_sync: bool,
    pub sync_interval: Duration,
    pub sync_limit: u32,
    pub slack_webhook_url: Option<String>,
    pub enable_email_notifications: bool,
    pub bind_addr: String,
    pub health_success_threshold: u32,
}

impl PortalSettings {
    /// Read settings from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honored.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let n8n_url = get("N8N_URL")
            .unwrap_or_else(|| DEFAULT_N8N_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let n8n_editor_url = get("N8N_EDITOR_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| n8n_url.clone());
        let support_email =
            get("SUPPORT_EMAIL").unwrap_or_else(|| DEFAULT_SUPPORT_EMAIL.to_string());

        let sync_interval_minutes =
            parse_or("SYNC_INTERVAL_MINUTES", get("SYNC_INTERVAL_MINUTES"), DEFAULT_SYNC_INTERVAL_MINUTES)?;
        if sync_interval_minutes == 0 {
            return Err(ConfigError::Invalid {
                name: "SYNC_INTERVAL_MINUTES",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            database_url,
            n8n_url,
            n8n_api_key: get("N8N_API_KEY").unwrap_or_default(),
            n8n_editor_url,
            admin_api_key: get("ADMIN_API_KEY"),
            encryption_key: get("ENCRYPTION_KEY"),
            company_name: get("COMPANY_NAME").unwrap_or_else(|| DEFAULT_COMPANY_NAME.to_string()),
            admin_email: get("ADMIN_EMAIL").unwrap_or_else(|| support_email.clone()),
            support_email,
            portal_url: get("PORTAL_URL").unwrap_or_else(|| DEFAULT_PORTAL_URL.to_string()),
            enable_auto_sync: parse_bool("ENABLE_AUTO_SYNC", get("ENABLE_AUTO_SYNC"), true)?,
            sync_interval: Duration::from_secs(sync_interval_minutes * 60),
            sync_limit: parse_or("SYNC_LIMIT", get("SYNC_LIMIT"), DEFAULT_SYNC_LIMIT)?,
            slack_webhook_url: get("SLACK_WEBHOOK_URL"),
            enable_email_notifications: parse_bool(
                "ENABLE_EMAIL_NOTIFICATIONS",
                get("ENABLE_EMAIL_NOTIFICATIONS"),
                true,
            )?,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            health_success_threshold: parse_or(
                "HEALTH_SUCCESS_THRESHOLD",
                get("HEALTH_SUCCESS_THRESHOLD"),
                DEFAULT_HEALTH_THRESHOLD,
            )?,
        })
    }

    /// Editor link for a workflow
    pub fn workflow_editor_url(&self, n8n_workflow_id: &str) -> String {
        format!("{}/workflow/{}", self.n8n_editor_url, n8n_workflow_id)
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}

fn parse_bool(name: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got '{}'", v),
        }),
    }
}
