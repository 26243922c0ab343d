mod rate_limit;

use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use aegis_agents::{ChatInput, TriageAgent};
use aegis_core::TriageError;
use aegis_guidance::GuidanceRetriever;
use aegis_llm::LlmConfig;
use aegis_ml::TriageMlStack;
use aegis_observability::AppMetrics;
use aegis_store::MemoryStore;
use anyhow::Result;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub use rate_limit::IpRateLimiter;

const MAX_BODY_BYTES: usize = 64 * 1024;
const DEFAULT_API_KEY: &str = "dev-aegis-key";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
    /// Exact origins allowed by CORS; empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: env::var("TRIAGE_API_KEY").unwrap_or_else(|_| DEFAULT_API_KEY.to_string()),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 120,
            allowed_origins: env::var("TRIAGE_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(ToString::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<TriageAgent>,
    pub metrics: Arc<AppMetrics>,
    api_key: String,
    limiter: IpRateLimiter,
}

/// Build the full application from the environment: ml stack, guidance kb,
/// generation endpoint, in-memory session store.
pub async fn build_app(kb_root: impl AsRef<Path>) -> Result<Router> {
    let metrics = AppMetrics::shared();
    let ml_stack = TriageMlStack::load_default();
    let retriever = Arc::new(GuidanceRetriever::from_kb_dir(
        kb_root,
        Some(ml_stack.embedder.clone()),
    ));

    let agent = Arc::new(TriageAgent::new(
        ml_stack,
        retriever,
        &LlmConfig::from_env(),
        Arc::new(MemoryStore::new()),
        metrics.clone(),
    ));

    let purge_agent = agent.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(3600));
        loop {
            ticker.tick().await;
            let removed = purge_agent.purge_expired_sessions();
            if removed > 0 {
                tracing::debug!(removed, "purged expired triage sessions");
            }
        }
    });

    Ok(build_router(agent, metrics, ApiConfig::default()))
}

/// Assemble the router from pre-built parts. Integration tests use this to
/// wire an agent against an unreachable generation endpoint.
pub fn build_router(agent: Arc<TriageAgent>, metrics: Arc<AppMetrics>, config: ApiConfig) -> Router {
    let cors = build_cors_layer(&config.allowed_origins);
    let state = ApiState {
        agent,
        metrics,
        api_key: config.api_key,
        limiter: IpRateLimiter::new(config.rate_limit_window, config.rate_limit_max),
    };

    let protected = Router::new()
        .route("/v1/triage", post(triage))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn require_api_key(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Response {
    let client_key = client_key(request.headers());
    if !state.limiter.allow(&client_key) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "rate limit exceeded" })),
        )
            .into_response();
    }

    let presented = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok());

    if presented != Some(state.api_key.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "missing or invalid api key" })),
        )
            .into_response();
    }

    next.run(request).await
}

fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| "local".to_string())
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp_utc": chrono::Utc::now().to_rfc3339(),
        "metrics": state.metrics.snapshot(),
    }))
}

async fn triage(State(state): State<ApiState>, Json(input): Json<ChatInput>) -> Response {
    match state.agent.run_chat(input).await {
        Ok(response) => Json(response).into_response(),
        Err(TriageError::EmptyConversation) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "conversation contains no messages" })),
        )
            .into_response(),
    }
}
