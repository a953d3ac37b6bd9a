//! Agent-run DTOs and the backend runs client.

use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ApiConfig, ApiError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Lifecycle states reported for an agent run.
pub enum RunStatus {
    Pending,
    Running,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    /// True for states from which no further progress is expected.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Status endpoint payload for one agent run.
pub struct RunStatusReport {
    pub id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Wire form of one frame on the run event stream.
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RunStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl StreamEvent {
    /// Message text; older frames carry it under `content`.
    pub fn message_text(&self) -> Option<String> {
        self.message.clone().or_else(|| self.content.clone())
    }
}

#[derive(Debug, Clone)]
/// HTTP client for the agent-run endpoints.
pub struct RunsClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl RunsClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        // No client-wide timeout: it would also cap the long-lived stream
        // request. Request/response calls set one per call instead.
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn run_url(&self, run_id: &str) -> String {
        self.config.endpoint(&format!("agent-run/{run_id}"))
    }

    pub fn stream_url(&self, run_id: &str) -> String {
        self.config.endpoint(&format!("agent-run/{run_id}/stream"))
    }

    pub async fn fetch_status(
        &self,
        run_id: &str,
        token: &str,
    ) -> Result<RunStatusReport, ApiError> {
        let response = self
            .http
            .get(self.run_url(run_id))
            .timeout(self.config.request_timeout)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status.as_u16(), body));
        }

        Ok(response.json::<RunStatusReport>().await?)
    }

    /// Requests cancellation of a running execution. The caller reacts to
    /// the terminal status that eventually arrives through observation;
    /// a failure here means the run is presumed still active.
    pub async fn stop_run(&self, run_id: &str, token: &str) -> Result<(), ApiError> {
        let url = self.config.endpoint(&format!("agent-run/{run_id}/stop"));
        let response = self
            .http
            .post(url)
            .timeout(self.config.request_timeout)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status.as_u16(), body));
        }

        Ok(())
    }

    /// Builds the long-lived stream request. Bearer auth travels in the
    /// header; no per-request timeout so the feed can outlive slow runs.
    pub fn stream_request(&self, run_id: &str, token: &str) -> reqwest::RequestBuilder {
        self.http
            .get(self.stream_url(run_id))
            .bearer_auth(token)
            .header(ACCEPT, "text/event-stream")
    }
}
