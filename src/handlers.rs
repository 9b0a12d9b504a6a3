use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::agent::{AgentRole, ChatTurn};
use crate::error::ApiError;
use crate::models::{Customer, CustomerCategory, CustomerStats, FinancialCategory, FinancialData};
use crate::state::AppState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomersResponse {
    pub status: String,
    pub count: usize,
    pub customers: Vec<Customer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub status: String,
    pub stats: CustomerStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialResponse {
    pub status: String,
    pub count: usize,
    pub records: Vec<FinancialData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCategoryRequest {
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    #[allow(dead_code)]
    pub user_id: Option<String>,
}

pub async fn root() -> Json<Value> {
    Json(json!({"status": "ok", "message": "Recordesk API is running"}))
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "message": "API is healthy"}))
}

impl From<ChatRequest> for ChatTurn {
    fn from(request: ChatRequest) -> Self {
        Self {
            message: request.message,
            session_id: request.session_id,
            file_content: request.file_content,
            user_id: request.user_id,
        }
    }
}

async fn chat(
    state: AppState,
    role: AgentRole,
    request: ChatRequest,
) -> Result<Json<ChatResponse>, ApiError> {
    let outcome = state.dispatcher.dispatch(role, request.into()).await?;
    Ok(Json(ChatResponse {
        response: outcome.response,
        session_id: outcome.session_id,
    }))
}

pub async fn chat_general(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    chat(state, AgentRole::General, request).await
}

pub async fn chat_customer(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    chat(state, AgentRole::Customer, request).await
}

pub async fn chat_finance(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    chat(state, AgentRole::Finance, request).await
}

pub async fn session_state(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(_query): Query<SessionQuery>,
) -> Result<Json<Value>, ApiError> {
    let session = state
        .store
        .session_snapshot(&session_id)
        .ok_or_else(|| ApiError::SessionNotFound(session_id.clone()))?;

    Ok(Json(json!({
        "session_id": session.id,
        "customer_info": session.customer_info,
        "financial_data": session.financial_data,
        "uploaded_files": session.uploaded_files,
        "full_state": session,
    })))
}

pub async fn get_storage(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.store.storage_snapshot().await;
    Json(json!({
        "status": "success",
        "session_count": snapshot.session_count,
        "customer_info_count": snapshot.customer_info.len(),
        "financial_data_count": snapshot.financial_data.len(),
        "uploaded_files_count": snapshot.uploaded_files.len(),
        "customer_info": snapshot.customer_info,
        "financial_data": snapshot.financial_data,
        "uploaded_files": snapshot.uploaded_files,
    }))
}

pub async fn clear_storage(State(state): State<AppState>) -> Json<Value> {
    let summary = state.store.clear_all().await;
    Json(json!({
        "status": "success",
        "message": format!(
            "Cleared {} sessions, {} customers, {} financial records, {} uploaded files",
            summary.cleared_session_count,
            summary.cleared_customer_count,
            summary.cleared_financial_count,
            summary.cleared_uploaded_file_count,
        ),
    }))
}

pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<CustomersResponse>, ApiError> {
    let category = parse_customer_category(query.category.as_deref())?;
    let customers = state.store.list_customers(category).await;
    Ok(Json(CustomersResponse {
        status: "success".to_string(),
        count: customers.len(),
        customers,
    }))
}

pub async fn customer_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.store.customer_stats().await;
    Json(StatsResponse {
        status: "success".to_string(),
        stats,
    })
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = Uuid::parse_str(&customer_id)
        .map_err(|_| ApiError::CustomerNotFound(customer_id.clone()))?;
    let customer = state
        .store
        .get_customer(id)
        .await
        .ok_or(ApiError::CustomerNotFound(customer_id))?;
    Ok(Json(json!({"status": "success", "customer": customer})))
}

pub async fn update_category(
    State(state): State<AppState>,
    Json(request): Json<UpdateCategoryRequest>,
) -> Result<Json<Value>, ApiError> {
    let raw = request
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("category is required".to_string()))?;
    let category = CustomerCategory::parse(raw).ok_or_else(|| {
        ApiError::Validation(format!(
            "invalid category {raw:?}; expected Prospective, Current, or Inactive"
        ))
    })?;

    let updated_count = state.store.bulk_set_category(category).await;
    Ok(Json(json!({
        "status": "success",
        "message": format!("Updated {} customers to category {}", updated_count, category),
        "updated_count": updated_count,
        "category": category,
    })))
}

pub async fn list_financial(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<FinancialResponse>, ApiError> {
    let category = match query.category.as_deref().filter(|c| !c.is_empty()) {
        Some(raw) => Some(FinancialCategory::parse(raw).ok_or_else(|| {
            ApiError::Validation(format!("invalid financial category {raw:?}"))
        })?),
        None => None,
    };
    let records = state.store.list_financial(category).await;
    Ok(Json(FinancialResponse {
        status: "success".to_string(),
        count: records.len(),
        records,
    }))
}

fn parse_customer_category(raw: Option<&str>) -> Result<Option<CustomerCategory>, ApiError> {
    match raw.filter(|c| !c.is_empty()) {
        Some(raw) => CustomerCategory::parse(raw).map(Some).ok_or_else(|| {
            ApiError::Validation(format!(
                "invalid category {raw:?}; expected Prospective, Current, or Inactive"
            ))
        }),
        None => Ok(None),
    }
}
