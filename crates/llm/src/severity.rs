use std::time::Duration;

use aegis_core::Severity;
use serde::Deserialize;
use tracing::debug;

use crate::{GenerationFailure, GeneratorClient, LlmConfig};

/// Independent severity estimate. Merged into the rule-based value by the
/// orchestrator with escalation-only semantics.
#[derive(Debug, Clone)]
pub struct SeverityEstimate {
    pub severity: Severity,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
struct EstimatePayload {
    severity: String,
    #[serde(default)]
    reason: String,
}

const OFFLINE_HIGH_CUES: &[&str] = &[
    "unconscious",
    "not breathing",
    "no pulse",
    "cpr",
    "gunshot",
    "shooting",
    "explosion",
    "trapped",
    "collapsed",
    "heavy bleeding",
    "bleeding heavily",
    "cant get out",
    "can't get out",
    "can\u{2019}t get out",
];

const OFFLINE_INJURY_CUES: &[&str] = &["people injured", "injured", "people collapsed"];

#[derive(Clone)]
pub struct SeverityEstimator {
    client: GeneratorClient,
    timeout: Duration,
}

impl SeverityEstimator {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: GeneratorClient::new(config),
            timeout: config.severity_timeout,
        }
    }

    pub async fn estimate(&self, text: &str) -> Result<SeverityEstimate, GenerationFailure> {
        let prompt = format!(
            "You are an emergency triage assistant.\n\
             You must classify the severity of this situation as \"low\", \"medium\", or \"high\".\n\n\
             Situation:\n{text}\n\n\
             Definitions:\n\
             - low: minor issue, no clear danger, no injuries or people trapped.\n\
             - medium: serious problem that may become dangerous but no clear life-threatening signs yet.\n\
             - high: likely or actual life-threatening emergency (injuries, unconscious, not breathing, \
             heavy bleeding, trapped, big fire in an occupied building, gunshots, explosion, active violence).\n\n\
             Answer in JSON ONLY:\n{{\"severity\": \"low|medium|high\", \"reason\": \"short explanation\"}}\n"
        );

        let raw = self.client.generate(&prompt, self.timeout).await?;
        let payload: EstimatePayload =
            serde_json::from_str(&raw).map_err(|_| GenerationFailure::MalformedBody)?;

        // Labels outside the closed set normalize to medium rather than
        // failing the whole estimate.
        let severity = Severity::normalize_label(&payload.severity);
        let reason = if payload.reason.is_empty() {
            "estimator provided no reason".to_string()
        } else {
            payload.reason
        };

        debug!(severity = %severity, "severity estimate produced");
        Ok(SeverityEstimate { severity, reason })
    }

    /// Deterministic estimate used when the remote estimator is unavailable.
    /// Defaults to medium; life-threatening cues, or fire/smoke combined with
    /// injury language, raise it to high.
    pub fn fallback_estimate(text: &str) -> SeverityEstimate {
        let lowered = text.to_lowercase();

        if OFFLINE_HIGH_CUES.iter().any(|cue| lowered.contains(cue)) {
            return SeverityEstimate {
                severity: Severity::High,
                reason: "rule-based escalation: life-threatening cue detected".to_string(),
            };
        }

        let burning = lowered.contains("fire") || lowered.contains("smoke");
        if burning && OFFLINE_INJURY_CUES.iter().any(|cue| lowered.contains(cue)) {
            return SeverityEstimate {
                severity: Severity::High,
                reason: "rule-based escalation: fire or smoke with injuries".to_string(),
            };
        }

        SeverityEstimate {
            severity: Severity::Medium,
            reason: "defaulted to medium".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explosion_estimates_high_without_the_remote_model() {
        let estimate =
            SeverityEstimator::fallback_estimate("An explosion happened at the factory nearby.");
        assert_eq!(estimate.severity, Severity::High);
    }

    #[test]
    fn fire_with_injuries_estimates_high() {
        let estimate =
            SeverityEstimator::fallback_estimate("smoke everywhere and two people injured");
        assert_eq!(estimate.severity, Severity::High);
    }

    #[test]
    fn calm_text_defaults_to_medium() {
        let estimate = SeverityEstimator::fallback_estimate("a tree fell in the garden");
        assert_eq!(estimate.severity, Severity::Medium);
    }
}
