use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aegis_agents::{TriageAgent, GREETING_REPLY};
use aegis_api::{build_app, build_router, ApiConfig};
use aegis_guidance::GuidanceRetriever;
use aegis_llm::LlmConfig;
use aegis_ml::TriageMlStack;
use aegis_observability::AppMetrics;
use aegis_store::MemoryStore;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

const TEST_API_KEY: &str = "test-aegis-key";

fn kb_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../kb")
}

/// Router wired to a generation endpoint that refuses connections, so every
/// remote call degrades to its deterministic fallback.
fn offline_app() -> Router {
    let llm = LlmConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        model: "llama3".to_string(),
        summary_timeout: Duration::from_millis(200),
        severity_timeout: Duration::from_millis(200),
        reply_timeout: Duration::from_millis(200),
    };

    let metrics = AppMetrics::shared();
    let ml_stack = TriageMlStack::load(Some(false));
    let retriever = Arc::new(GuidanceRetriever::from_kb_dir(
        kb_root(),
        Some(ml_stack.embedder.clone()),
    ));

    let agent = Arc::new(TriageAgent::new(
        ml_stack,
        retriever,
        &llm,
        Arc::new(MemoryStore::new()),
        metrics.clone(),
    ));

    build_router(
        agent,
        metrics,
        ApiConfig {
            api_key: TEST_API_KEY.to_string(),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 1000,
            allowed_origins: Vec::new(),
        },
    )
}

fn triage_request(payload: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/triage")
        .header("content-type", "application/json")
        .header("x-api-key", TEST_API_KEY)
        .body(Body::from(payload.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = build_app(kb_root()).await.expect("app should build");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    assert_eq!(parsed["status"], "ok");
    assert!(parsed.get("metrics").is_some());
}

#[tokio::test]
async fn triage_requires_api_key() {
    let app = offline_app();

    let request = Request::builder()
        .method("POST")
        .uri("/v1/triage")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "conversation_id": null,
                "messages": [{ "role": "user", "content": "there is a fire in my building" }]
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn triage_returns_structured_payload() {
    let app = offline_app();

    let request = triage_request(json!({
        "conversation_id": "it-flood-1",
        "messages": [
            { "role": "user", "content": "Heavy flooding on our street, water is rising into the house." }
        ]
    }));

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    assert_eq!(parsed["conversation_id"], "it-flood-1");
    assert_eq!(parsed["category"], "flood");
    assert!(parsed["severity"].is_string());
    assert!(!parsed["reply"].as_str().unwrap().is_empty());
    assert!(!parsed["guidance"].as_str().unwrap().is_empty());
    assert!(!parsed["summary"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn empty_conversation_is_a_bad_request() {
    let app = offline_app();

    let request = triage_request(json!({
        "conversation_id": null,
        "messages": []
    }));

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn greeting_gets_the_fixed_reply() {
    let app = offline_app();

    let request = triage_request(json!({
        "conversation_id": null,
        "messages": [{ "role": "user", "content": "hello" }]
    }));

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    assert_eq!(parsed["reply"], GREETING_REPLY);
}

#[tokio::test]
async fn repeated_evaluation_is_stable() {
    let app = offline_app();

    let payload = json!({
        "conversation_id": "it-stable-1",
        "messages": [
            { "role": "user", "content": "Earthquake, the building is shaking and walls cracked." }
        ]
    });

    let first = app.clone().oneshot(triage_request(payload.clone())).await.unwrap();
    let second = app.oneshot(triage_request(payload)).await.unwrap();

    let first = json_body(first).await;
    let second = json_body(second).await;

    assert_eq!(first["category"], second["category"]);
    assert_eq!(first["severity"], second["severity"]);
    assert_eq!(first["reply"], second["reply"]);
}
