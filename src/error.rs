use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the HTTP layer. Each variant maps to one status code
/// and a JSON body whose `error` text is what clients show verbatim.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("customer not found: {0}")]
    CustomerNotFound(String),

    /// The hosted agent runtime failed. Wraps the caller's message and the
    /// remote detail so the failure is diagnosable from the response alone.
    #[error("agent request failed for message {message:?}: {detail}")]
    AgentRuntime { message: String, detail: String },

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::SessionNotFound(_) | Self::CustomerNotFound(_) => StatusCode::NOT_FOUND,
            Self::AgentRuntime { .. } => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::debug!("request rejected: {}", self);
        }
        let body = Json(json!({
            "status": "error",
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}
