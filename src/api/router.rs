//! API router.
//!
//! Layers (outermost → innermost):
//! 1. CORS → 2. `Cache-Control: no-store` → 3. Access log → Handler

use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the API router.
///
/// - `GET /` and `GET /health`: liveness
/// - `POST /analyze`: run one case
/// - `GET /audit`: full audit trail
pub fn api_router(ctx: ApiContext) -> Router {
    let cors = cors_layer(&ctx.cors_origins);

    Router::new()
        .route("/", get(endpoints::health::check))
        .route("/health", get(endpoints::health::check))
        .route("/analyze", post(endpoints::analyze::analyze))
        .route("/audit", get(endpoints::audit::list))
        .with_state(ctx)
        .layer(axum::middleware::from_fn(middleware::access_log::log_access))
        // Responses can carry clinical snapshots; never cache them.
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(cors)
}

/// Any origin when `origins` is empty, otherwise exactly the listed ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::audit::{AuditStore, InMemoryAuditStore, JsonFileAuditStore};
    use crate::pipeline::decision::{DecisionClient, MockDecisionClient};
    use crate::pipeline::{ConfidenceGate, DecisionPipeline};

    const POLICY: &str =
        "MRI Lumbar Spine requires: 1. Pain > 6 weeks. 2. Failed Physical Therapy (PT) > 4 weeks.";

    fn ctx_with(client: MockDecisionClient, store: Arc<dyn AuditStore>) -> ApiContext {
        let client: Arc<dyn DecisionClient> = Arc::new(client);
        let pipeline = DecisionPipeline::new(client, store, ConfidenceGate::default());
        ApiContext::new(Arc::new(pipeline))
    }

    fn test_ctx(client: MockDecisionClient) -> ApiContext {
        ctx_with(client, Arc::new(InMemoryAuditStore::new()))
    }

    fn denying_client() -> MockDecisionClient {
        MockDecisionClient::free_text(
            "DECISION: DENIED\nCONFIDENCE: 0.95\nREASON: Pain for 2 weeks, policy requires > 6 weeks.",
        )
    }

    fn analyze_request(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/analyze")
            .header("Content-Type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn case_body(note: &str) -> String {
        json!({
            "fhir_bundle": {"resourceType": "Bundle", "clinicalNote": note},
            "policy": POLICY
        })
        .to_string()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_online_and_model() {
        let app = api_router(test_ctx(denying_client()));
        let response = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "online");
        assert_eq!(json["model"], "mock-reviewer");
        assert!(json["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn root_is_also_health() {
        let app = api_router(test_ctx(denying_client()));
        let response = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "online");
    }

    #[tokio::test]
    async fn analyze_returns_audit_entry() {
        let app = api_router(test_ctx(denying_client()));
        let response = app
            .oneshot(analyze_request(case_body(
                "Patient: Alice Smith (DOB: 1990). Back pain for 2 weeks. Wants MRI.",
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["decision"], "DENIED");
        assert_eq!(json["status"], "COMPLETED");
        assert_eq!(json["schema_version"], "v1.0");
        assert_eq!(json["confidence"], 0.95);
        assert!(uuid::Uuid::parse_str(json["case_id"].as_str().unwrap()).is_ok());
        // Snapshot is the original, unredacted bundle.
        assert_eq!(
            json["input_snapshot"]["clinicalNote"],
            "Patient: Alice Smith (DOB: 1990). Back pain for 2 weeks. Wants MRI."
        );
    }

    #[tokio::test]
    async fn low_confidence_is_pending_review() {
        let app = api_router(test_ctx(MockDecisionClient::structured(
            r#"{"decision":"APPROVED","reason":"Duration is vague.","confidence":0.65}"#,
        )));
        let response = app
            .oneshot(analyze_request(case_body(
                "Patient: Charlie. Patient reports 'long-term' discomfort.",
            )))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["decision"], "PENDING_REVIEW");
        assert_eq!(json["status"], "PENDING_HUMAN_REVIEW");
    }

    #[tokio::test]
    async fn model_failure_is_500_pipeline_failure() {
        let store = Arc::new(InMemoryAuditStore::new());
        let app = api_router(ctx_with(
            MockDecisionClient::failing(401, "invalid api key"),
            store.clone(),
        ));
        let response = app.oneshot(analyze_request(case_body("note"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(json["detail"]
            .as_str()
            .unwrap()
            .starts_with("Pipeline Failure: "));
        assert!(store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_client_error() {
        let app = api_router(test_ctx(denying_client()));
        let response = app
            .oneshot(analyze_request("{not json".to_string()))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
        assert!(body_json(response).await["detail"].is_string());
    }

    #[tokio::test]
    async fn missing_policy_is_client_error() {
        let app = api_router(test_ctx(denying_client()));
        let body = json!({"fhir_bundle": {"clinicalNote": "x"}}).to_string();
        let response = app.oneshot(analyze_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn non_object_bundle_is_client_error() {
        let app = api_router(test_ctx(denying_client()));
        let body = json!({"fhir_bundle": [1, 2], "policy": POLICY}).to_string();
        let response = app.oneshot(analyze_request(body)).await.unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn audit_starts_empty() {
        let app = api_router(test_ctx(denying_client()));
        let response = app.oneshot(get_request("/audit")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn audit_lists_entries_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileAuditStore::open(dir.path().join("audit_log.json")).unwrap());
        let app = api_router(ctx_with(denying_client(), store));

        let mut case_ids = Vec::new();
        for note in ["first case", "second case", "third case"] {
            let response = app
                .clone()
                .oneshot(analyze_request(case_body(note)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            case_ids.push(body_json(response).await["case_id"].clone());
        }

        let response = app.oneshot(get_request("/audit")).await.unwrap();
        let listed: Vec<Value> = body_json(response)
            .await
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["case_id"].clone())
            .collect();
        assert_eq!(listed, case_ids);
    }

    #[tokio::test]
    async fn responses_are_not_cacheable() {
        let app = api_router(test_ctx(denying_client()));
        let response = app.oneshot(get_request("/audit")).await.unwrap();
        assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
    }

    #[tokio::test]
    async fn cors_allows_any_origin_by_default() {
        let app = api_router(test_ctx(denying_client()));
        let request = Request::builder()
            .uri("/health")
            .header("Origin", "http://dashboard.test")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn cors_restricts_to_configured_origins() {
        let ctx = test_ctx(denying_client())
            .with_cors_origins(vec!["http://allowed.test".to_string()]);
        let app = api_router(ctx);

        let allowed = Request::builder()
            .uri("/health")
            .header("Origin", "http://allowed.test")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(allowed).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://allowed.test"
        );

        let other = Request::builder()
            .uri("/health")
            .header("Origin", "http://other.test")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(other).await.unwrap();
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = api_router(test_ctx(denying_client()));
        let response = app.oneshot(get_request("/nonexistent")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
