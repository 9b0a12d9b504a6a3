use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health checks
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Agent chat endpoints, one per dispatch role
        .route("/api/agent/chat", post(handlers::chat_general))
        .route("/api/agent/customer", post(handlers::chat_customer))
        .route("/api/agent/finance", post(handlers::chat_finance))
        .route("/api/agent/session/:session_id", get(handlers::session_state))
        // Storage management
        .route(
            "/api/storage",
            get(handlers::get_storage).delete(handlers::clear_storage),
        )
        // Record repository
        .route("/api/customers", get(handlers::list_customers))
        .route("/api/customers/stats", get(handlers::customer_stats))
        .route(
            "/api/customers/update-category",
            post(handlers::update_category),
        )
        .route("/api/customers/:customer_id", get(handlers::get_customer))
        .route("/api/financial", get(handlers::list_financial))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentRuntime, RuntimeError, RuntimeRequest, RuntimeResponse};
    use crate::config::Config;
    use crate::models::{Customer, ExtractedRecord};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Stub runtime: extracts a customer record whenever the message looks
    /// like a customer entry, so handler tests can exercise the full flow.
    struct ScriptedRuntime;

    #[async_trait]
    impl AgentRuntime for ScriptedRuntime {
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
                reply: format!("Processed: {}", request.message),
                extracted,
                state: None,
            })
        }
    }

    fn test_router() -> Router {
        let state = AppState::with_runtime(Config::default(), Arc::new(ScriptedRuntime));
        create_router(state)
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(
            content_type.starts_with("application/json"),
            "expected JSON body, got {content_type}"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
        send(
            router,
            Request::builder().uri(uri).body(Body::empty()).unwrap(),
        )
        .await
    }

    async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        send(
            router,
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    #[tokio::test]
    async fn health_endpoints_respond() {
        let router = test_router();
        for uri in ["/", "/health"] {
            let (status, body) = get_json(&router, uri).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], "ok");
            assert!(body["message"].is_string());
        }
    }

    #[tokio::test]
    async fn chat_then_session_state_reflects_extraction() {
        let router = test_router();

        let (status, body) = post_json(
            &router,
            "/api/agent/chat",
            json!({"message": "Add customer John Doe, email john@example.com"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let session_id = body["session_id"].as_str().unwrap().to_string();
        assert!(!session_id.is_empty());
        assert!(body["response"].as_str().unwrap().contains("Processed"));

        let (status, body) =
            get_json(&router, &format!("/api/agent/session/{session_id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session_id"], session_id.as_str());
        let customer = &body["customer_info"][0];
        assert_eq!(customer["name"], "John Doe");
        assert_eq!(customer["email"], "john@example.com");
        assert!(customer["phone"].is_null());
        assert_eq!(body["full_state"]["history"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_session_is_404() {
        let router = test_router();
        let (status, body) = get_json(&router, "/api/agent/session/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn empty_chat_is_rejected() {
        let router = test_router();
        let (status, body) = post_json(
            &router,
            "/api/agent/chat",
            json!({"message": "", "file_content": ""}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn customer_listing_filtering_and_stats() {
        let router = test_router();
        post_json(
            &router,
            "/api/agent/customer",
            json!({"message": "Add customer John Doe"}),
        )
        .await;

        let (status, body) = get_json(&router, "/api/customers").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        let customer_id = body["customers"][0]["id"].as_str().unwrap().to_string();

        // Case-insensitive filter; nothing is categorized yet.
        let (status, body) = get_json(&router, "/api/customers?category=current").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);

        let (_, body) = get_json(&router, "/api/customers/stats").await;
        assert_eq!(body["stats"]["total"], 1);
        assert_eq!(body["stats"]["uncategorized"], 1);

        let (status, body) = get_json(&router, &format!("/api/customers/{customer_id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["customer"]["name"], "John Doe");

        let (status, _) = get_json(&router, "/api/customers/not-a-real-id").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bulk_category_update_flow() {
        let router = test_router();
        post_json(
            &router,
            "/api/agent/customer",
            json!({"message": "Add customer John Doe"}),
        )
        .await;

        // Missing category is rejected before anything changes.
        let (status, _) = post_json(&router, "/api/customers/update-category", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_json(
            &router,
            "/api/customers/update-category",
            json!({"category": "Premium"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = post_json(
            &router,
            "/api/customers/update-category",
            json!({"category": "current"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated_count"], 1);
        assert_eq!(body["category"], "Current");

        let (_, body) = get_json(&router, "/api/customers?category=Current").await;
        assert_eq!(body["count"], 1);
        let (_, body) = get_json(&router, "/api/customers?category=Prospective").await;
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn storage_clear_zeroes_counts() {
        let router = test_router();
        post_json(
            &router,
            "/api/agent/chat",
            json!({"message": "Add customer John Doe", "file_content": "some,csv"}),
        )
        .await;

        let (_, body) = get_json(&router, "/api/storage").await;
        assert_eq!(body["customer_info_count"], 1);
        assert_eq!(body["uploaded_files_count"], 1);
        assert_eq!(body["session_count"], 1);

        let (status, body) = send(
            &router,
            Request::builder()
                .method("DELETE")
                .uri("/api/storage")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");

        let (_, body) = get_json(&router, "/api/storage").await;
        assert_eq!(body["customer_info_count"], 0);
        assert_eq!(body["financial_data_count"], 0);
        assert_eq!(body["uploaded_files_count"], 0);
        assert_eq!(body["session_count"], 0);
    }

    #[tokio::test]
    async fn financial_listing_is_exposed() {
        let router = test_router();
        let (status, body) = get_json(&router, "/api/financial").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);

        let (status, _) = get_json(&router, "/api/financial?category=banking").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = get_json(&router, "/api/financial?category=crypto").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
