use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static PEOPLE_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d+\s+(people|persons|kids|children|adults|workers|passengers)\b")
        .expect("valid people count regex")
});

static SOLITUDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(alone|only me|by myself|just me)\b").expect("valid solitude regex")
});

const SAFE_CUES: &[&str] = &[
    "i'm safe",
    "im safe",
    "i am safe",
    "we are safe",
    "we're safe",
    "away from danger",
    "out of danger",
    "outside now",
    "safe now",
    "ok now",
];

const UNSAFE_CUES: &[&str] = &[
    "not safe",
    "still inside",
    "still in danger",
    "still here",
    "still trapped",
    "can't get out",
    "cannot get out",
    "trapped",
    "stuck",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyStatus {
    Safe,
    Unsafe,
    Unknown,
}

/// The three knowledge facts recomputed from the accumulated conversation
/// text on every call. Nothing here is stored between turns, which is what
/// makes re-evaluation idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeFlags {
    pub location_known: bool,
    pub people_known: bool,
    pub safety: SafetyStatus,
}

impl KnowledgeFlags {
    /// The safety topic is resolved by either a safe or an unsafe disclosure;
    /// a resolved topic is never asked about again.
    pub fn safety_resolved(&self) -> bool {
        self.safety != SafetyStatus::Unknown
    }

    /// Completion requires known-and-safe: an explicit unsafe disclosure
    /// resolves the topic but still blocks completion.
    pub fn triage_complete(&self) -> bool {
        self.location_known && self.people_known && self.safety == SafetyStatus::Safe
    }
}

pub fn people_known(text: &str) -> bool {
    !text.is_empty() && (PEOPLE_COUNT.is_match(text) || SOLITUDE.is_match(text))
}

pub fn safety_status(text: &str) -> SafetyStatus {
    if text.is_empty() {
        return SafetyStatus::Unknown;
    }
    let lowered = text.to_lowercase();
    if SAFE_CUES.iter().any(|cue| lowered.contains(cue)) {
        SafetyStatus::Safe
    } else if UNSAFE_CUES.iter().any(|cue| lowered.contains(cue)) {
        SafetyStatus::Unsafe
    } else {
        SafetyStatus::Unknown
    }
}

/// Derive all three flags from the conversation text plus the location the
/// extraction pipeline produced for this evaluation.
pub fn derive_knowledge_flags(conversation: &str, location: &str) -> KnowledgeFlags {
    KnowledgeFlags {
        location_known: !location.is_empty(),
        people_known: people_known(conversation),
        safety: safety_status(conversation),
    }
}

/// The single next follow-up, by fixed priority: location, then people count,
/// then safety. Returns `None` when every topic is resolved, even if triage
/// is still incomplete because the user reported being unsafe.
pub fn next_question(flags: &KnowledgeFlags) -> Option<&'static str> {
    if !flags.location_known {
        Some("Where exactly are you right now? Please give an address or nearby landmark.")
    } else if !flags.people_known {
        Some("How many people, including you, are affected or injured?")
    } else if !flags.safety_resolved() {
        Some("Are you currently in a safe place away from the immediate danger, or still close to the incident?")
    } else {
        None
    }
}
