use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    ml_inference_total: AtomicU64,
    keyword_override_total: AtomicU64,
    llm_fallback_total: AtomicU64,
    guidance_fallback_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub ml_inference_total: u64,
    pub keyword_override_total: u64,
    pub llm_fallback_total: u64,
    pub guidance_fallback_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ml_inference(&self) {
        self.ml_inference_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_keyword_override(&self) {
        self.keyword_override_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_llm_fallback(&self) {
        self.llm_fallback_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_guidance_fallback(&self) {
        self.guidance_fallback_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            ml_inference_total: self.ml_inference_total.load(Ordering::Relaxed),
            keyword_override_total: self.keyword_override_total.load(Ordering::Relaxed),
            llm_fallback_total: self.llm_fallback_total.load(Ordering::Relaxed),
            guidance_fallback_total: self.guidance_fallback_total.load(Ordering::Relaxed),
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,aegis_api=info,aegis_agents=info,aegis_llm=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
