mod centroid;
mod fallback;

use std::env;
use std::path::Path;
use std::sync::Arc;

use aegis_core::category::POST_MODEL_RULES;
use aegis_guidance::EmbeddingModel;

pub use centroid::CentroidCategoryClassifier;
pub use fallback::HashEmbeddingModel;

const DEFAULT_DATASET_ENV: &str = "TRIAGE_CATEGORY_DATASET";
const EMBEDDING_TOGGLE_ENV: &str = "TRIAGE_EMBEDDING_CLASSIFIER";
const DEFAULT_DATASET_PATH: &str = "kb/training/categories.jsonl";

/// A raw label prediction. The pipeline tolerates any label outside the
/// closed category set, so `label` stays an untyped string here and the
/// override layer decides what to trust.
#[derive(Debug, Clone)]
pub struct CategoryPrediction {
    pub label: String,
    pub confidence: f32,
    pub model: &'static str,
}

pub trait CategoryClassifier: Send + Sync {
    fn predict(&self, text: &str) -> CategoryPrediction;
}

/// Keyword-sweep classifier reusing the same post-model rule table the
/// override layer consults. Zero artifacts, always available.
#[derive(Debug, Default)]
pub struct RuleCategoryClassifier;

impl CategoryClassifier for RuleCategoryClassifier {
    fn predict(&self, text: &str) -> CategoryPrediction {
        let lowered = text.to_lowercase();
        let label = POST_MODEL_RULES
            .iter()
            .find(|rule| (rule.applies)(&lowered))
            .map(|rule| rule.category.as_str())
            .unwrap_or("other");

        CategoryPrediction {
            label: label.to_string(),
            confidence: 0.62,
            model: "rules",
        }
    }
}

/// The loaded prediction stack: an embedding model plus whichever category
/// backend the toggle selected.
#[derive(Clone)]
pub struct TriageMlStack {
    pub embedder: Arc<dyn EmbeddingModel>,
    pub classifier: Arc<dyn CategoryClassifier>,
    pub embedding_backend: bool,
}

impl TriageMlStack {
    /// Backend selection defaulted from the environment.
    pub fn load_default() -> Self {
        Self::load(None)
    }

    /// `use_embedding` overrides the `TRIAGE_EMBEDDING_CLASSIFIER` env toggle
    /// when provided. The centroid backend additionally needs the training
    /// dataset on disk; otherwise the rule classifier serves.
    pub fn load(use_embedding: Option<bool>) -> Self {
        let embedder = Arc::new(HashEmbeddingModel::new(192));

        let toggle = use_embedding.unwrap_or_else(|| {
            env::var(EMBEDDING_TOGGLE_ENV)
                .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
                .unwrap_or(false)
        });

        let dataset_path = env::var(DEFAULT_DATASET_ENV)
            .unwrap_or_else(|_| DEFAULT_DATASET_PATH.to_string());

        if toggle && Path::new(&dataset_path).exists() {
            if let Ok(classifier) = CentroidCategoryClassifier::from_jsonl(
                &dataset_path,
                embedder.clone(),
                "centroid-category",
            ) {
                return Self {
                    embedder,
                    classifier: Arc::new(classifier),
                    embedding_backend: true,
                };
            }
        }

        Self {
            embedder,
            classifier: Arc::new(RuleCategoryClassifier),
            embedding_backend: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_classifier_labels_obvious_categories() {
        let classifier = RuleCategoryClassifier;
        assert_eq!(classifier.predict("the street is flooding").label, "flood");
        assert_eq!(
            classifier.predict("strong shaking woke us up").label,
            "earthquake"
        );
        assert_eq!(classifier.predict("nothing much happened").label, "other");
    }

    #[test]
    fn explicit_toggle_false_selects_rule_backend() {
        let stack = TriageMlStack::load(Some(false));
        assert!(!stack.embedding_backend);
        assert_eq!(stack.classifier.predict("wildfire nearby").model, "rules");
    }
}
