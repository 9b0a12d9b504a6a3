use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::agent::AgentRole;
use crate::handlers::{
    ChatRequest, ChatResponse, CustomersResponse, FinancialResponse, StatsResponse,
};

/// Failures surfaced by the API client, one descriptive message each.
/// The client never retries; callers decide what to do with a failure.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection refused, DNS, timeout - the server was never reached.
    #[error("network error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Server reachable but the success response was malformed
    /// (non-JSON body or unexpected content type).
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Non-2xx status; message is the server-provided detail, falling back
    /// to the status line.
    #[error("{0}")]
    Application(String),

    /// Rejected locally, before any network call.
    #[error("{0}")]
    Validation(String),
}

/// HTTP client for the backend, used by the dashboard pages and by
/// integration tests. Normalizes every failure into `ClientError`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await.map_err(ClientError::Transport)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Application(error_detail(status, &body)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("application/json") {
            return Err(ClientError::Protocol(format!(
                "expected application/json, got {content_type:?}"
            )));
        }

        let body = response.text().await.map_err(ClientError::Transport)?;
        serde_json::from_str(&body)
            .map_err(|e| ClientError::Protocol(format!("invalid JSON body: {e}")))
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        self.execute(self.client.get(self.url("/health"))).await
    }

    /// Send one chat turn to the endpoint for `role`.
    pub async fn chat(
        &self,
        role: AgentRole,
        request: &ChatRequest,
    ) -> Result<ChatResponse, ClientError> {
        let path = match role {
            AgentRole::General => "/api/agent/chat",
            AgentRole::Customer => "/api/agent/customer",
            AgentRole::Finance => "/api/agent/finance",
        };
        self.execute(self.client.post(self.url(path)).json(request))
            .await
    }

    pub async fn session_state(&self, session_id: &str) -> Result<Value, ClientError> {
        self.execute(
            self.client
                .get(self.url(&format!("/api/agent/session/{session_id}"))),
        )
        .await
    }

    pub async fn storage(&self) -> Result<Value, ClientError> {
        self.execute(self.client.get(self.url("/api/storage"))).await
    }

    pub async fn clear_storage(&self) -> Result<Value, ClientError> {
        self.execute(self.client.delete(self.url("/api/storage")))
            .await
    }

    pub async fn customers(
        &self,
        category: Option<&str>,
    ) -> Result<CustomersResponse, ClientError> {
        let mut builder = self.client.get(self.url("/api/customers"));
        if let Some(category) = category {
            builder = builder.query(&[("category", category)]);
        }
        self.execute(builder).await
    }

    pub async fn customer(&self, customer_id: &str) -> Result<Value, ClientError> {
        self.execute(
            self.client
                .get(self.url(&format!("/api/customers/{customer_id}"))),
        )
        .await
    }

    pub async fn customer_stats(&self) -> Result<StatsResponse, ClientError> {
        self.execute(self.client.get(self.url("/api/customers/stats")))
            .await
    }

    /// Bulk-reassign every customer's category. An empty category is a
    /// local validation error; no request is made.
    pub async fn update_category(&self, category: &str) -> Result<Value, ClientError> {
        if category.trim().is_empty() {
            return Err(ClientError::Validation(
                "category is required for a bulk update".to_string(),
            ));
        }
        self.execute(
            self.client
                .post(self.url("/api/customers/update-category"))
                .json(&serde_json::json!({"category": category})),
        )
        .await
    }

    pub async fn financial(
        &self,
        category: Option<&str>,
    ) -> Result<FinancialResponse, ClientError> {
        let mut builder = self.client.get(self.url("/api/financial"));
        if let Some(category) = category {
            builder = builder.query(&[("category", category)]);
        }
        self.execute(builder).await
    }
}

/// Prefer the server's JSON `error` field, then the raw body, then the
/// status line.
fn error_detail(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(detail) = value.get("error").and_then(|e| e.as_str()) {
            return detail.to_string();
        }
    }
    if !body.trim().is_empty() {
        return body.trim().to_string();
    }
    status.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentRuntime, RuntimeError, RuntimeRequest, RuntimeResponse};
    use crate::config::Config;
    use crate::models::{Customer, ExtractedRecord};
    use crate::routes::create_router;
    use crate::state::AppState;
    use async_trait::async_trait;
    use axum::routing::get;
    use axum::Router;
    use std::sync::Arc;

    struct EchoRuntime;

    #[async_trait]
    impl AgentRuntime for EchoRuntime {
        async fn run(&self, request: RuntimeRequest) -> Result<RuntimeResponse, RuntimeError> {
            let extracted = if request.message.contains("John Doe") {
                vec![ExtractedRecord::Customer(Customer {
                    name: Some("John Doe".to_string()),
                    email: Some("john@example.com".to_string()),
                    ..Default::default()
                })]
            } else {
                vec![]
            };
            Ok(RuntimeResponse {
                reply: format!("echo: {}", request.message),
                extracted,
                state: None,
            })
        }
    }

    async fn spawn_backend() -> String {
        let state = AppState::with_runtime(Config::default(), Arc::new(EchoRuntime));
        spawn(create_router(state)).await
    }

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn chat_flow_end_to_end() {
        let client = ApiClient::new(spawn_backend().await);

        let health = client.health().await.unwrap();
        assert_eq!(health["status"], "ok");

        let chat = client
            .chat(
                AgentRole::General,
                &ChatRequest {
                    message: "Add customer John Doe, email john@example.com".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!chat.session_id.is_empty());

        let session = client.session_state(&chat.session_id).await.unwrap();
        assert_eq!(session["customer_info"][0]["name"], "John Doe");

        let customers = client.customers(None).await.unwrap();
        assert_eq!(customers.count, 1);

        let stats = client.customer_stats().await.unwrap();
        assert_eq!(stats.stats.total, 1);
        assert_eq!(stats.stats.uncategorized, 1);

        client.update_category("Current").await.unwrap();
        let current = client.customers(Some("Current")).await.unwrap();
        assert_eq!(current.count, 1);

        client.clear_storage().await.unwrap();
        let storage = client.storage().await.unwrap();
        assert_eq!(storage["customer_info_count"], 0);
    }

    #[tokio::test]
    async fn empty_category_is_rejected_locally() {
        // Bogus base URL: a validation failure must not touch the network.
        let client = ApiClient::new("http://127.0.0.1:1");
        let err = client.update_category("  ").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let client = ApiClient::new("http://127.0.0.1:1");
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[tokio::test]
    async fn application_errors_carry_server_detail() {
        let client = ApiClient::new(spawn_backend().await);
        let err = client.session_state("missing").await.unwrap_err();
        match err {
            ClientError::Application(detail) => {
                assert!(detail.contains("session not found"), "got: {detail}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn non_json_success_body_is_a_protocol_violation() {
        let router = Router::new().route("/health", get(|| async { "plain text" }));
        let client = ApiClient::new(spawn(router).await);
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }
}
