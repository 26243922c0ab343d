use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::completion::KnowledgeFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One turn of the conversation supplied by the caller. Only user and
/// assistant turns carry triage-relevant content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrisisCategory {
    Flood,
    Fire,
    Earthquake,
    Storm,
    Landslide,
    Other,
}

impl CrisisCategory {
    /// Tolerant parse of an arbitrary model label. Anything outside the
    /// closed set yields `None` so callers can degrade to keyword rules.
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "flood" => Some(Self::Flood),
            "fire" => Some(Self::Fire),
            "earthquake" => Some(Self::Earthquake),
            "storm" => Some(Self::Storm),
            "landslide" => Some(Self::Landslide),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flood => "flood",
            Self::Fire => "fire",
            Self::Earthquake => "earthquake",
            Self::Storm => "storm",
            Self::Landslide => "landslide",
            Self::Other => "other",
        }
    }

    pub const ALL: [Self; 6] = [
        Self::Flood,
        Self::Fire,
        Self::Earthquake,
        Self::Storm,
        Self::Landslide,
        Self::Other,
    ];
}

impl std::fmt::Display for CrisisCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Totally ordered severity scale. The `Ord` derive encodes low < medium <
/// high, which is what makes escalation-only merging a plain `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    /// Labels outside the closed set normalize to medium rather than failing.
    pub fn normalize_label(value: &str) -> Self {
        Self::from_label(value).unwrap_or(Self::Medium)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySource {
    Model,
    KeywordOverride,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct Provenance {
    pub model: String,
    pub raw_label: String,
    pub source: CategorySource,
    /// Name of the override rule that fired, when `source` is an override.
    pub rule: Option<&'static str>,
}

/// Category/severity decision for one evaluation. Built once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    pub category: CrisisCategory,
    pub severity: Severity,
    pub location: Option<String>,
    pub provenance: Provenance,
}

/// Everything the reply generator needs about the current turn. Derived fresh
/// per call; `triage_complete` is a pure function of the knowledge flags and
/// can only be produced through [`TriageContext::assemble`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageContext {
    pub category: CrisisCategory,
    pub severity: Severity,
    pub location: String,
    pub guidance: String,
    pub summary: String,
    pub location_known: bool,
    pub people_known: bool,
    pub safety_known: bool,
    pub triage_complete: bool,
}

impl TriageContext {
    pub fn assemble(
        category: CrisisCategory,
        severity: Severity,
        location: String,
        guidance: String,
        summary: String,
        flags: &KnowledgeFlags,
    ) -> Self {
        Self {
            category,
            severity,
            location,
            guidance,
            summary,
            location_known: flags.location_known,
            people_known: flags.people_known,
            safety_known: flags.safety_resolved(),
            triage_complete: flags.triage_complete(),
        }
    }
}

/// Externally visible triage output. `location` is an empty string when
/// unknown so responses stay comparable across turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageResult {
    pub reply: String,
    pub category: CrisisCategory,
    pub severity: Severity,
    pub location: String,
    pub guidance: String,
    pub summary: String,
}

#[derive(Debug, Error)]
pub enum TriageError {
    #[error("conversation contains no messages")]
    EmptyConversation,
}
