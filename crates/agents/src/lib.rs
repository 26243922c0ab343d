use std::sync::Arc;
use std::time::Instant;

use aegis_core::{
    base_severity, conversation_text, derive_knowledge_flags, escalate_severity,
    extract_location, fallback_summary, is_bare_greeting, latest_user_text, merge_severity,
    next_question, normalize_text, resolve_category, user_texts, CategorySource,
    ClassificationResult, CrisisCategory, Message, Provenance, Severity, TriageContext,
    TriageError, TriageResult,
};
use aegis_guidance::{compose_guidance, GuidanceRetriever, LookupTier, GENERIC_GUIDANCE};
use aegis_llm::{ChatSummarizer, LlmConfig, ReplyGenerator, SeverityEstimator};
use aegis_ml::TriageMlStack;
use aegis_observability::AppMetrics;
use aegis_store::{SessionStore, TriageSession};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const GREETING_REPLY: &str = "Hi, I'm an emergency triage assistant. Please describe what \
     is happening and where you are, so I can help assess how urgent it is.";

pub const ALREADY_SUBMITTED_REPLY: &str =
    "Your report has already been submitted. Stay safe until responders arrive.";

#[derive(Debug, Clone, Deserialize)]
pub struct ChatInput {
    pub conversation_id: Option<String>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriageResponse {
    pub conversation_id: String,
    #[serde(flatten)]
    pub result: TriageResult,
}

/// Composes the whole decision pipeline into one stateless-per-call
/// evaluation. Every sub-component hands back a usable default on failure, so
/// the only error the caller can see is an empty conversation.
#[derive(Clone)]
pub struct TriageAgent {
    ml_stack: TriageMlStack,
    retriever: Arc<GuidanceRetriever>,
    summarizer: ChatSummarizer,
    estimator: SeverityEstimator,
    reply_generator: ReplyGenerator,
    store: Arc<dyn SessionStore>,
    metrics: Arc<AppMetrics>,
}

impl TriageAgent {
    pub fn new(
        ml_stack: TriageMlStack,
        retriever: Arc<GuidanceRetriever>,
        llm: &LlmConfig,
        store: Arc<dyn SessionStore>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            ml_stack,
            retriever,
            summarizer: ChatSummarizer::new(llm),
            estimator: SeverityEstimator::new(llm),
            reply_generator: ReplyGenerator::new(llm),
            store,
            metrics,
        }
    }

    #[instrument(skip_all)]
    pub async fn run_chat(&self, input: ChatInput) -> Result<TriageResponse, TriageError> {
        if input.messages.is_empty() {
            return Err(TriageError::EmptyConversation);
        }

        let started = Instant::now();
        self.metrics.inc_request();

        let conversation_id = input
            .conversation_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let messages = &input.messages;
        let texts = user_texts(messages);
        let conversation = conversation_text(messages);

        let summary = self.build_summary(&texts).await;
        let classification = self.classify(&summary).await;

        let location = {
            let from_conversation = extract_location(&conversation);
            if from_conversation.is_empty() {
                extract_location(&summary)
            } else {
                from_conversation
            }
        };

        let guidance = self.retrieve_guidance(&summary, &classification);

        let flags = derive_knowledge_flags(&conversation, &location);
        let ctx = TriageContext::assemble(
            classification.category,
            classification.severity,
            location.clone(),
            guidance.clone(),
            summary.clone(),
            &flags,
        );

        let reply = self.compose_reply(&conversation_id, messages, &ctx, &flags).await;

        self.metrics.observe_latency(started.elapsed());
        info!(
            conversation_id = %conversation_id,
            category = %ctx.category,
            severity = %ctx.severity,
            triage_complete = ctx.triage_complete,
            "triage evaluated"
        );

        Ok(TriageResponse {
            conversation_id,
            result: TriageResult {
                reply,
                category: ctx.category,
                severity: ctx.severity,
                location,
                guidance,
                summary,
            },
        })
    }

    pub fn purge_expired_sessions(&self) -> u64 {
        self.store.purge_expired(Utc::now())
    }

    /// Summarize via the remote model, degrading to the deterministic
    /// transcript summary. Always non-empty.
    async fn build_summary(&self, texts: &[&str]) -> String {
        if texts.is_empty() {
            return fallback_summary(texts);
        }

        match self.summarizer.summarize(texts).await {
            Ok(summary) => normalize_text(&summary),
            Err(failure) => {
                warn!(%failure, "summarizer unavailable, using transcript summary");
                self.metrics.inc_llm_fallback();
                fallback_summary(texts)
            }
        }
    }

    /// Category via model + override precedence, severity via the rule
    /// lexicons, escalation pass, and the escalation-only estimate merge.
    async fn classify(&self, summary: &str) -> ClassificationResult {
        let prediction = self.ml_stack.classifier.predict(summary);
        self.metrics.inc_ml_inference();

        let resolution = resolve_category(summary, &prediction.label);
        if resolution.source == CategorySource::KeywordOverride {
            self.metrics.inc_keyword_override();
        }

        let base = base_severity(summary);
        let mut severity = escalate_severity(resolution.category, base, summary);

        let estimate = match self.estimator.estimate(summary).await {
            Ok(estimate) => estimate,
            Err(failure) => {
                warn!(%failure, "severity estimator unavailable, using rule-based estimate");
                self.metrics.inc_llm_fallback();
                SeverityEstimator::fallback_estimate(summary)
            }
        };
        severity = merge_severity(severity, estimate.severity);

        ClassificationResult {
            category: resolution.category,
            severity,
            location: None,
            provenance: Provenance {
                model: prediction.model.to_string(),
                raw_label: prediction.label,
                source: resolution.source,
                rule: resolution.rule,
            },
        }
    }

    fn retrieve_guidance(&self, summary: &str, classification: &ClassificationResult) -> String {
        let lookup = self
            .retriever
            .lookup(summary, classification.category, classification.severity);
        if lookup.tier == LookupTier::Generic {
            self.metrics.inc_guidance_fallback();
        }
        compose_guidance(classification.category, classification.severity, &lookup.text)
    }

    /// Reply branches, in order: greeting short-circuit, already-submitted
    /// short-circuit, remote generation, deterministic template.
    async fn compose_reply(
        &self,
        conversation_id: &str,
        messages: &[Message],
        ctx: &TriageContext,
        flags: &aegis_core::KnowledgeFlags,
    ) -> String {
        let last_user = latest_user_text(messages).unwrap_or("");
        if is_bare_greeting(last_user) {
            return GREETING_REPLY.to_string();
        }

        let mut session = self
            .store
            .load(conversation_id)
            .unwrap_or_else(|| TriageSession::fresh(conversation_id));

        if session.report_submitted {
            return ALREADY_SUBMITTED_REPLY.to_string();
        }

        match self
            .reply_generator
            .generate(messages, ctx, next_question(flags))
            .await
        {
            Ok(text) => {
                if ctx.triage_complete {
                    session.report_submitted = true;
                    self.store.upsert(session);
                }
                text
            }
            Err(failure) => {
                warn!(%failure, "reply generation failed, using templated reply");
                self.metrics.inc_llm_fallback();
                fallback_reply(ctx.severity, ctx.category)
            }
        }
    }
}

/// Deterministic reply used whenever the remote generator fails. Restates the
/// computed severity and category and repeats the generic safety guidance.
pub fn fallback_reply(severity: Severity, category: CrisisCategory) -> String {
    format!(
        "Understood. This looks like a {severity} severity {category} situation. {GENERIC_GUIDANCE}"
    )
}
