use std::time::Duration;

use aegis_core::{Message, Role, TriageContext};
use tracing::debug;

use crate::{GenerationFailure, GeneratorClient, LlmConfig};

const MIN_REPLY_CHARS: usize = 20;
const RECENT_TURNS: usize = 6;

pub const SUBMISSION_CONFIRMATION: &str = "Thank you, your report has been submitted. A trained \
     responder is reviewing the information and help is on the way. Please stay safe and follow \
     any instructions from local authorities.";

/// Primary reply composer: a structured prompt constrained by the completion
/// policy's context, sent to the remote generator. Replies shorter than the
/// minimum count as failures so the orchestrator substitutes its template.
#[derive(Clone)]
pub struct ReplyGenerator {
    client: GeneratorClient,
    timeout: Duration,
}

impl ReplyGenerator {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: GeneratorClient::new(config),
            timeout: config.reply_timeout,
        }
    }

    pub async fn generate(
        &self,
        messages: &[Message],
        ctx: &TriageContext,
        followup: Option<&str>,
    ) -> Result<String, GenerationFailure> {
        let prompt = build_prompt(messages, ctx, followup);
        let reply = self.client.generate(&prompt, self.timeout).await?;

        let chars = reply.chars().count();
        if chars < MIN_REPLY_CHARS {
            return Err(GenerationFailure::TooShort { chars });
        }

        debug!(chars, triage_complete = ctx.triage_complete, "generated reply accepted");
        Ok(reply)
    }
}

/// Bundle category, severity, location, guidance, summary, the knowledge
/// flags, the chosen follow-up and the recent turns into one prompt.
pub fn build_prompt(messages: &[Message], ctx: &TriageContext, followup: Option<&str>) -> String {
    let recent_start = messages.len().saturating_sub(RECENT_TURNS);
    let convo_text = messages[recent_start..]
        .iter()
        .filter(|m| !m.content.trim().is_empty())
        .map(|m| {
            let prefix = match m.role {
                Role::Assistant => "Assistant: ",
                _ => "User: ",
            };
            format!("{prefix}{}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!(
        "You are an emergency triage assistant. You always base your answer on the category, \
         severity, location, guidance, summary below and the full user message history. You must \
         speak in short, focused paragraphs, no markdown lists.\n\n\
         Information-gathering phase:\n\
         - Ask at most the following follow-up questions, and each at most once:\n\
         \x20 Missing location: ask for address or nearby landmark.\n\
         \x20 Missing people affected: ask how many people are affected or injured.\n\
         \x20 Safety unknown: ask if they are currently in a safe place away from the immediate danger.\n\
         - Only ask a follow-up if that piece of info is clearly missing or ambiguous in the \
         conversation so far.\n\
         - Never repeat a follow-up question that was already asked or whose topic is already \
         resolved. If the user ignores a question, continue with guidance and gently suggest \
         contacting emergency services directly.\n\n\
         Context:\n\
         - Category: {category}\n\
         - Severity: {severity}\n\
         - Location: {location}\n\
         - Summary: {summary}\n\
         - Guidance hint: {guidance}\n\
         - Location known: {location_known}\n\
         - People known: {people_known}\n\
         - Safety known: {safety_known}\n\n\
         Recent conversation:\n{convo_text}\n\n",
        category = ctx.category,
        severity = ctx.severity,
        location = if ctx.location.is_empty() {
            "not provided"
        } else {
            &ctx.location
        },
        summary = ctx.summary,
        guidance = ctx.guidance,
        location_known = ctx.location_known,
        people_known = ctx.people_known,
        safety_known = ctx.safety_known,
    );

    if ctx.triage_complete {
        prompt.push_str(&format!(
            "All required details are present. Provide a concise guidance paragraph using the \
             guidance hint and end with this confirmation (plain sentences, no markdown lists): \
             {SUBMISSION_CONFIRMATION}\n"
        ));
    } else {
        prompt.push_str(
            "Write one concise reply in short paragraphs (no markdown lists). Acknowledge the \
             user briefly, provide tailored safety guidance using the guidance hint",
        );
        match followup {
            Some(question) => {
                prompt.push_str(&format!(
                    ", and ask exactly one follow-up question:\n{question}\n"
                ));
            }
            None => {
                prompt.push_str(
                    ", and do not ask any follow-up question; reassure them that a responder is \
                     reviewing the case and suggest contacting emergency services directly if \
                     needed.\n",
                );
            }
        }
    }

    prompt.push_str("\nAssistant reply:");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::{CrisisCategory, KnowledgeFlags, SafetyStatus, Severity};

    fn context(flags: KnowledgeFlags) -> TriageContext {
        TriageContext::assemble(
            CrisisCategory::Flood,
            Severity::High,
            "123 Main Street".to_string(),
            "Move to higher ground.".to_string(),
            "Basement flooding with two people trapped.".to_string(),
            &flags,
        )
    }

    #[test]
    fn prompt_carries_context_and_followup() {
        let ctx = context(KnowledgeFlags {
            location_known: true,
            people_known: false,
            safety: SafetyStatus::Unknown,
        });
        let messages = vec![Message::user("the basement is flooding")];
        let prompt = build_prompt(
            &messages,
            &ctx,
            Some("How many people, including you, are affected or injured?"),
        );

        assert!(prompt.contains("Category: flood"));
        assert!(prompt.contains("Severity: high"));
        assert!(prompt.contains("123 Main Street"));
        assert!(prompt.contains("How many people"));
        assert!(!prompt.contains("report has been submitted"));
    }

    #[test]
    fn complete_triage_requests_the_confirmation_closing() {
        let ctx = context(KnowledgeFlags {
            location_known: true,
            people_known: true,
            safety: SafetyStatus::Safe,
        });
        let messages = vec![Message::user("we are safe now")];
        let prompt = build_prompt(&messages, &ctx, None);

        assert!(ctx.triage_complete);
        assert!(prompt.contains("report has been submitted"));
    }

    #[test]
    fn only_recent_turns_are_included() {
        let ctx = context(KnowledgeFlags {
            location_known: false,
            people_known: false,
            safety: SafetyStatus::Unknown,
        });
        let messages = (0..10)
            .map(|i| Message::user(format!("turn {i}")))
            .collect::<Vec<_>>();
        let prompt = build_prompt(&messages, &ctx, None);

        assert!(!prompt.contains("turn 3"));
        assert!(prompt.contains("turn 4"));
        assert!(prompt.contains("turn 9"));
    }
}
