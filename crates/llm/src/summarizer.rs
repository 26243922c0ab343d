use std::time::Duration;

use tracing::debug;

use crate::{GenerationFailure, GeneratorClient, LlmConfig};

const MIN_SUMMARY_CHARS: usize = 10;

/// Abstractive conversation summarizer over the remote generator. Degenerate
/// results (shorter than the minimum) are reported as failures so the caller
/// falls back to the deterministic transcript summary.
#[derive(Clone)]
pub struct ChatSummarizer {
    client: GeneratorClient,
    timeout: Duration,
}

impl ChatSummarizer {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: GeneratorClient::new(config),
            timeout: config.summary_timeout,
        }
    }

    pub async fn summarize(&self, user_texts: &[&str]) -> Result<String, GenerationFailure> {
        let transcript = user_texts
            .iter()
            .filter(|text| !text.trim().is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n");

        if transcript.is_empty() {
            return Err(GenerationFailure::TooShort { chars: 0 });
        }

        let prompt = format!(
            "You are an emergency triage assistant.\n\
             Read the user messages below and write a single 1-2 sentence summary of the \
             situation, focusing on what is happening, where, and how serious it sounds. \
             Do not mention \"severity\" labels. Do not talk about being an AI.\n\n\
             User messages:\n{transcript}\n\nSummary:\n"
        );

        let summary = self.client.generate(&prompt, self.timeout).await?;
        let chars = summary.chars().count();
        if chars < MIN_SUMMARY_CHARS {
            return Err(GenerationFailure::TooShort { chars });
        }

        debug!(chars, "abstractive summary produced");
        Ok(summary)
    }
}
