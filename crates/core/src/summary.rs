use crate::models::{Message, Role};

pub const GENERIC_SUMMARY: &str = "User reported an issue.";

/// Trailing window kept when the remote summarizer is unavailable.
const FALLBACK_SUMMARY_CHARS: usize = 400;

pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// All user-authored texts in chronological order.
pub fn user_texts(messages: &[Message]) -> Vec<&str> {
    messages
        .iter()
        .filter(|m| m.role == Role::User && !m.content.trim().is_empty())
        .map(|m| m.content.as_str())
        .collect()
}

/// The accumulated user transcript every derived fact is recomputed from.
pub fn conversation_text(messages: &[Message]) -> String {
    normalize_text(&user_texts(messages).join(" "))
}

pub fn latest_user_text(messages: &[Message]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
}

/// Deterministic summary used when the abstractive summarizer fails: the user
/// texts joined with single spaces, clipped to the trailing window. Always
/// returns non-empty text.
pub fn fallback_summary(texts: &[&str]) -> String {
    let joined = normalize_text(&texts.join(" "));
    if joined.is_empty() {
        return GENERIC_SUMMARY.to_string();
    }

    let total = joined.chars().count();
    if total <= FALLBACK_SUMMARY_CHARS {
        joined
    } else {
        joined.chars().skip(total - FALLBACK_SUMMARY_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_conversation_yields_generic_summary() {
        assert_eq!(fallback_summary(&[]), GENERIC_SUMMARY);
        assert_eq!(fallback_summary(&["   "]), GENERIC_SUMMARY);
    }

    #[test]
    fn keeps_only_the_trailing_window() {
        let long = "a".repeat(600);
        let summary = fallback_summary(&[&long]);
        assert_eq!(summary.chars().count(), 400);
    }

    #[test]
    fn joins_user_turns_with_single_spaces() {
        let messages = vec![
            Message::user("water in the  basement"),
            Message::assistant("how many people?"),
            Message::user("three of us"),
        ];
        assert_eq!(
            conversation_text(&messages),
            "water in the basement three of us"
        );
    }
}
