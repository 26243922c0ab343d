mod client;
mod reply;
mod severity;
mod summarizer;

use std::env;
use std::time::Duration;

pub use client::{GenerationFailure, GeneratorClient};
pub use reply::{build_prompt, ReplyGenerator, SUBMISSION_CONFIRMATION};
pub use severity::{SeverityEstimate, SeverityEstimator};
pub use summarizer::ChatSummarizer;

/// Connection settings for the Ollama-compatible generation endpoint. Each
/// outbound concern carries its own timeout so a slow summarizer cannot stall
/// the reply path.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub summary_timeout: Duration,
    pub severity_timeout: Duration,
    pub reply_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            summary_timeout: Duration::from_secs(2),
            severity_timeout: Duration::from_secs(2),
            reply_timeout: Duration::from_secs(20),
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = env::var("TRIAGE_OLLAMA_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = env::var("TRIAGE_OLLAMA_MODEL") {
            config.model = model;
        }
        config
    }
}
