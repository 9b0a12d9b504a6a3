use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::models::UploadedFile;
use crate::storage::Store;

use super::roles::AgentRole;
use super::runtime::{AgentRuntime, RuntimeRequest};

/// One incoming chat call, as received by any of the three agent endpoints.
#[derive(Debug, Clone, Default)]
pub struct ChatTurn {
    pub message: String,
    pub session_id: Option<String>,
    pub file_content: Option<String>,
    pub user_id: Option<String>,
}

/// What a successful dispatch returns to the caller. `session_id` is always
/// present so the conversation can be continued.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub response: String,
    pub session_id: String,
}

/// Routes a chat message to an agent role, forwards it to the external
/// runtime with the session's prior context, and folds reported extractions
/// back into the store.
///
/// History append and extraction commit happen only after the runtime has
/// answered, so a remote failure leaves the session untouched.
pub struct Dispatcher {
    runtime: Arc<dyn AgentRuntime>,
    store: Arc<Store>,
    model: String,
}

impl Dispatcher {
    pub fn new(runtime: Arc<dyn AgentRuntime>, store: Arc<Store>, model: String) -> Self {
        Self {
            runtime,
            store,
            model,
        }
    }

    pub async fn dispatch(&self, role: AgentRole, turn: ChatTurn) -> Result<ChatOutcome, ApiError> {
        let file_content = turn
            .file_content
            .as_deref()
            .filter(|content| !content.is_empty());
        if turn.message.is_empty() && file_content.is_none() {
            return Err(ApiError::Validation(
                "message may be empty only when file_content is provided".to_string(),
            ));
        }

        let (session_id, existing) = self.store.resolve_session(turn.session_id.as_deref());
        debug!(role = %role, %session_id, user_id = ?turn.user_id, "dispatching chat turn");

        let (history, state) = match &existing {
            Some(session) => {
                let state = serde_json::json!({
                    "customer_info": session.customer_info,
                    "financial_data": session.financial_data,
                    "uploaded_files": session.uploaded_files,
                });
                (session.history.clone(), Some(state))
            }
            None => (Vec::new(), None),
        };

        let request = RuntimeRequest {
            agent: role.agent_name().to_string(),
            instruction: role.instruction().to_string(),
            message: turn.message.clone(),
            file_content: file_content.map(str::to_string),
            history,
            state,
            runtime_state: existing.as_ref().and_then(|s| s.runtime_state.clone()),
            model: self.model.clone(),
        };

        let response =
            self.runtime
                .run(request)
                .await
                .map_err(|err| ApiError::AgentRuntime {
                    message: turn.message.clone(),
                    detail: err.to_string(),
                })?;

        let uploaded = file_content.map(|content| UploadedFile::from_content(content, None));
        let extracted_count = response.extracted.len();
        self.store
            .commit_chat_turn(
                &session_id,
                &turn.message,
                &response.reply,
                response.extracted,
                uploaded,
                response.state,
            )
            .await;

        info!(role = %role, %session_id, extracted_count, "chat turn completed");
        Ok(ChatOutcome {
            response: response.reply,
            session_id,
        })
    }
}
