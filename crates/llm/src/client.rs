use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::LlmConfig;

/// Soft failure of a remote generation call. Every variant is recoverable;
/// the orchestrator maps each to a deterministic local fallback.
#[derive(Debug, Error)]
pub enum GenerationFailure {
    #[error("generation request failed: {0}")]
    Transport(String),
    #[error("generation endpoint returned status {status}")]
    Status { status: u16 },
    #[error("generation response body was malformed")]
    MalformedBody,
    #[error("generated text too short ({chars} chars)")]
    TooShort { chars: usize },
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Thin client for the `/api/generate` contract: request is
/// `{model, prompt, stream: false}`, response carries the generated text.
/// Non-200 statuses and unparsable bodies are soft failures, never panics.
#[derive(Clone)]
pub struct GeneratorClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeneratorClient {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, GenerationFailure> {
        let url = format!("{}/api/generate", self.base_url);
        let payload = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .timeout(timeout)
            .send()
            .await
            .map_err(|error| {
                warn!(%error, "generation request failed");
                GenerationFailure::Transport(error.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "generation endpoint returned error status");
            return Err(GenerationFailure::Status {
                status: status.as_u16(),
            });
        }

        let body: GenerateResponse = response.json().await.map_err(|error| {
            warn!(%error, "generation response parse failed");
            GenerationFailure::MalformedBody
        })?;

        let text = body.response.trim().to_string();
        if text.is_empty() {
            return Err(GenerationFailure::TooShort { chars: 0 });
        }

        Ok(text)
    }
}
