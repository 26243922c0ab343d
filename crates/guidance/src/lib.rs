mod tokenize;

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use aegis_core::{CrisisCategory, Severity};
use serde::{Deserialize, Serialize};
use tracing::warn;
use walkdir::WalkDir;

pub use tokenize::tokenize;

/// Fixed safety sentence used whenever the knowledge base has nothing better.
pub const GENERIC_GUIDANCE: &str = "Stay safe, avoid unnecessary risk, follow instructions from \
     local authorities, and contact emergency services in urgent situations.";

pub trait EmbeddingModel: Send + Sync {
    fn model_name(&self) -> &'static str;
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// One playbook entry as stored in the kb JSON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceEntry {
    pub category: CrisisCategory,
    pub severity: Severity,
    #[serde(default)]
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone)]
struct IndexedEntry {
    entry: GuidanceEntry,
    keywords: HashSet<String>,
    embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupTier {
    ExactMatch,
    CategoryOnly,
    Generic,
}

#[derive(Debug, Clone)]
pub struct GuidanceLookup {
    pub text: String,
    pub tier: LookupTier,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuidanceStats {
    pub entries_loaded: usize,
    pub vector_enabled: bool,
}

/// Knowledge-base lookup by (category, severity). Several entries may share a
/// key; ties are broken by keyword/vector similarity against the situation
/// summary. A missing or unreadable kb directory degrades to the generic
/// sentence for every category instead of failing.
#[derive(Clone)]
pub struct GuidanceRetriever {
    entries: Vec<IndexedEntry>,
    embedder: Option<Arc<dyn EmbeddingModel>>,
}

impl GuidanceRetriever {
    pub fn from_kb_dir(path: impl AsRef<Path>, embedder: Option<Arc<dyn EmbeddingModel>>) -> Self {
        let mut loaded = Vec::new();

        for entry in WalkDir::new(path.as_ref())
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry.path().extension().and_then(|ext| ext.to_str()) == Some("json")
            })
        {
            let file = entry.path();
            let raw = match std::fs::read_to_string(file) {
                Ok(raw) => raw,
                Err(error) => {
                    warn!(path = %file.display(), %error, "skipping unreadable kb file");
                    continue;
                }
            };

            match serde_json::from_str::<Vec<GuidanceEntry>>(&raw) {
                Ok(entries) => loaded.extend(entries),
                Err(error) => {
                    warn!(path = %file.display(), %error, "skipping malformed kb file");
                }
            }
        }

        Self::from_entries(loaded, embedder)
    }

    pub fn from_entries(
        entries: Vec<GuidanceEntry>,
        embedder: Option<Arc<dyn EmbeddingModel>>,
    ) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| {
                let keywords = tokenize(&entry.text).into_iter().collect::<HashSet<_>>();
                let embedding = embedder.as_ref().map(|model| model.embed(&entry.text));
                IndexedEntry {
                    entry,
                    keywords,
                    embedding,
                }
            })
            .collect();

        Self { entries, embedder }
    }

    pub fn stats(&self) -> GuidanceStats {
        GuidanceStats {
            entries_loaded: self.entries.len(),
            vector_enabled: self.embedder.is_some(),
        }
    }

    /// Two-tier lookup: exact (category, severity) first, then the entry for
    /// the category whose severity sits closest to the requested one, then
    /// the generic sentence. Never empty, never errors.
    pub fn lookup(&self, summary: &str, category: CrisisCategory, severity: Severity) -> GuidanceLookup {
        let exact = self
            .entries
            .iter()
            .filter(|indexed| {
                indexed.entry.category == category && indexed.entry.severity == severity
            })
            .collect::<Vec<_>>();

        if !exact.is_empty() {
            let best = self.best_by_similarity(summary, exact);
            return GuidanceLookup {
                text: best.entry.text.clone(),
                tier: LookupTier::ExactMatch,
            };
        }

        let by_category = self
            .entries
            .iter()
            .filter(|indexed| indexed.entry.category == category)
            .min_by_key(|indexed| {
                let distance =
                    (indexed.entry.severity as i8 - severity as i8).unsigned_abs();
                // equal distance resolves to the higher-severity entry
                (distance, std::cmp::Reverse(indexed.entry.severity))
            });

        if let Some(indexed) = by_category {
            return GuidanceLookup {
                text: indexed.entry.text.clone(),
                tier: LookupTier::CategoryOnly,
            };
        }

        GuidanceLookup {
            text: GENERIC_GUIDANCE.to_string(),
            tier: LookupTier::Generic,
        }
    }

    /// Lead sentence stating the inferred severity and category, followed by
    /// the retrieved (or generic) guidance text.
    pub fn guidance(&self, summary: &str, category: CrisisCategory, severity: Severity) -> String {
        let lookup = self.lookup(summary, category, severity);
        compose_guidance(category, severity, &lookup.text)
    }

    fn best_by_similarity<'a>(
        &self,
        summary: &str,
        candidates: Vec<&'a IndexedEntry>,
    ) -> &'a IndexedEntry {
        let query_tokens = tokenize(summary).into_iter().collect::<HashSet<_>>();
        let query_embedding = self.embedder.as_ref().map(|model| model.embed(summary));

        candidates
            .into_iter()
            .map(|indexed| {
                let keyword = keyword_score(&query_tokens, &indexed.keywords);
                let vector = match (&query_embedding, &indexed.embedding) {
                    (Some(q), Some(c)) => cosine_similarity(q, c).max(0.0),
                    _ => 0.0,
                };
                let score = if query_embedding.is_some() {
                    (0.65 * keyword) + (0.35 * vector)
                } else {
                    keyword
                };
                (score, indexed)
            })
            .max_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
            .map(|(_, indexed)| indexed)
            .expect("candidates checked non-empty")
    }
}

pub fn compose_guidance(category: CrisisCategory, severity: Severity, text: &str) -> String {
    format!(
        "This looks like a {severity} severity {category} situation. {text}"
    )
}

fn keyword_score(query_tokens: &HashSet<String>, doc_tokens: &HashSet<String>) -> f32 {
    if query_tokens.is_empty() || doc_tokens.is_empty() {
        return 0.0;
    }

    let overlap = query_tokens
        .iter()
        .filter(|token| doc_tokens.contains(*token))
        .count() as f32;

    overlap / query_tokens.len() as f32
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut a_norm = 0.0;
    let mut b_norm = 0.0;

    for (lhs, rhs) in a.iter().zip(b.iter()) {
        dot += lhs * rhs;
        a_norm += lhs * lhs;
        b_norm += rhs * rhs;
    }

    if a_norm == 0.0 || b_norm == 0.0 {
        0.0
    } else {
        dot / (a_norm.sqrt() * b_norm.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retriever() -> GuidanceRetriever {
        GuidanceRetriever::from_entries(
            vec![
                GuidanceEntry {
                    category: CrisisCategory::Flood,
                    severity: Severity::High,
                    title: "flood high".into(),
                    text: "Move to the highest floor and signal for rescue.".into(),
                },
                GuidanceEntry {
                    category: CrisisCategory::Flood,
                    severity: Severity::Medium,
                    title: "flood medium".into(),
                    text: "Avoid walking or driving through flood water.".into(),
                },
                GuidanceEntry {
                    category: CrisisCategory::Fire,
                    severity: Severity::High,
                    title: "fire high".into(),
                    text: "Stay low under the smoke and evacuate immediately.".into(),
                },
            ],
            None,
        )
    }

    #[test]
    fn exact_pair_is_preferred() {
        let lookup = retriever().lookup("flooding", CrisisCategory::Flood, Severity::Medium);
        assert_eq!(lookup.tier, LookupTier::ExactMatch);
        assert!(lookup.text.contains("flood water"));
    }

    #[test]
    fn category_match_picks_closest_severity() {
        let lookup = retriever().lookup("flooding", CrisisCategory::Flood, Severity::Low);
        assert_eq!(lookup.tier, LookupTier::CategoryOnly);
        assert!(lookup.text.contains("flood water"));
    }

    #[test]
    fn unknown_category_degrades_to_generic() {
        let lookup = retriever().lookup("shaking", CrisisCategory::Earthquake, Severity::Low);
        assert_eq!(lookup.tier, LookupTier::Generic);
        assert_eq!(lookup.text, GENERIC_GUIDANCE);
    }

    #[test]
    fn missing_kb_dir_degrades_silently() {
        let retriever = GuidanceRetriever::from_kb_dir("/nonexistent/kb", None);
        let guidance = retriever.guidance("anything", CrisisCategory::Fire, Severity::High);
        assert!(guidance.contains("high severity fire situation"));
        assert!(guidance.contains("local authorities"));
    }

    #[test]
    fn composed_guidance_states_severity_and_category() {
        let guidance = retriever().guidance("flooding", CrisisCategory::Flood, Severity::High);
        assert!(guidance.starts_with("This looks like a high severity flood situation."));
        assert!(guidance.contains("highest floor"));
    }
}
