use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::AgentRuntimeConfig;
use crate::models::{ExtractedRecord, HistoryTurn};

/// Input context assembled for one call to the hosted agent service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeRequest {
    /// Remote agent name (see `AgentRole::agent_name`).
    pub agent: String,
    pub instruction: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_content: Option<String>,
    /// Prior turns of this session, oldest first.
    pub history: Vec<HistoryTurn>,
    /// The session's previously extracted state, as context for the agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    /// Opaque state the runtime returned on the previous turn, handed back
    /// verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_state: Option<Value>,
    pub model: String,
}

/// What the hosted runtime returns: a natural-language reply, zero or more
/// extracted records, and opaque state stored on the session and handed
/// back on the next call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeResponse {
    pub reply: String,
    #[serde(default)]
    pub extracted: Vec<ExtractedRecord>,
    #[serde(default)]
    pub state: Option<Value>,
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("agent runtime unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("agent runtime returned a malformed response: {0}")]
    Protocol(String),

    #[error("agent runtime error ({status}): {detail}")]
    Remote { status: u16, detail: String },
}

/// Boundary to the external agent reasoning engine. The dispatcher only
/// talks through this trait so tests can substitute a stub runtime.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn run(&self, request: RuntimeRequest) -> Result<RuntimeResponse, RuntimeError>;
}

/// HTTP client for the hosted multi-agent service.
#[derive(Debug, Clone)]
pub struct HostedAgentClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HostedAgentClient {
    pub fn new(config: &AgentRuntimeConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl AgentRuntime for HostedAgentClient {
    async fn run(&self, request: RuntimeRequest) -> Result<RuntimeResponse, RuntimeError> {
        let url = format!("{}/agent/run", self.base_url);
        debug!(agent = %request.agent, "calling agent runtime at {}", url);

        let mut req = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| status.to_string());
            return Err(RuntimeError::Remote {
                status: status.as_u16(),
                detail,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| RuntimeError::Protocol(e.to_string()))
    }
}
