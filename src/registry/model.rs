//! `RegistryEntry` and its status/health enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Starting,
    Running,
    Error,
    Stopping,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
    Unknown,
}

/// Includes an opaque `azureUrl` passthrough field — cloud-value
/// overlays remain an external collaborator's concern; this crate never
/// populates it itself beyond forwarding whatever the caller supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub name: String,
    #[serde(rename = "projectDir")]
    pub project_dir: String,
    pub port: u16,
    pub url: String,
    #[serde(rename = "azureUrl", skip_serializing_if = "Option::is_none")]
    pub azure_url: Option<String>,
    pub language: String,
    pub framework: String,
    pub status: ServiceStatus,
    pub health: HealthState,
    pub pid: Option<u32>,
    #[serde(rename = "startTime")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "lastCheckedAt")]
    pub last_checked_at: DateTime<Utc>,
}

impl RegistryEntry {
    pub fn starting(name: &str, project_dir: &str, port: u16, language: &str, framework: &str) -> Self {
        let now = Utc::now();
        Self {
            name: name.to_string(),
            project_dir: project_dir.to_string(),
            port,
            url: format!("http://localhost:{port}"),
            azure_url: None,
            language: language.to_string(),
            framework: framework.to_string(),
            status: ServiceStatus::Starting,
            health: HealthState::Unknown,
            pid: None,
            start_time: now,
            last_checked_at: now,
        }
    }
}
