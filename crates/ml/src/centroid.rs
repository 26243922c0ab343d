use std::fs;
use std::path::Path;
use std::sync::Arc;

use aegis_core::CrisisCategory;
use aegis_guidance::{cosine_similarity, EmbeddingModel};
use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{CategoryClassifier, CategoryPrediction};

#[derive(Debug, Deserialize)]
struct LabeledExample {
    text: String,
    category: String,
}

/// Nearest-centroid category classifier trained from a JSONL dataset of
/// `{text, category}` examples through whatever embedding model is active.
#[derive(Clone)]
pub struct CentroidCategoryClassifier {
    model_name: &'static str,
    centroids: Vec<(CrisisCategory, Vec<f32>)>,
    embedder: Arc<dyn EmbeddingModel>,
}

impl CentroidCategoryClassifier {
    pub fn from_jsonl(
        path: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingModel>,
        model_name: &'static str,
    ) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "failed reading category training dataset at {}",
                path.as_ref().display()
            )
        })?;

        let mut by_category: std::collections::HashMap<CrisisCategory, Vec<Vec<f32>>> =
            std::collections::HashMap::new();

        for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let example: LabeledExample =
                serde_json::from_str(line).context("invalid jsonl training line")?;
            if let Some(category) = CrisisCategory::from_label(&example.category) {
                by_category
                    .entry(category)
                    .or_default()
                    .push(embedder.embed(&example.text));
            }
        }

        let mut centroids = Vec::new();
        for (category, vectors) in by_category {
            if vectors.is_empty() {
                continue;
            }
            centroids.push((category, centroid(&vectors)));
        }

        if centroids.is_empty() {
            anyhow::bail!("training dataset produced zero category centroids");
        }

        Ok(Self {
            model_name,
            centroids,
            embedder,
        })
    }
}

impl CategoryClassifier for CentroidCategoryClassifier {
    fn predict(&self, text: &str) -> CategoryPrediction {
        let query = self.embedder.embed(text);
        let mut best_category = CrisisCategory::Other;
        let mut best_score = -1.0_f32;

        for (category, center) in &self.centroids {
            let score = cosine_similarity(&query, center);
            if score > best_score {
                best_score = score;
                best_category = *category;
            }
        }

        CategoryPrediction {
            label: best_category.as_str().to_string(),
            confidence: ((best_score + 1.0) / 2.0).clamp(0.0, 1.0),
            model: self.model_name,
        }
    }
}

fn centroid(vectors: &[Vec<f32>]) -> Vec<f32> {
    let dims = vectors.first().map(Vec::len).unwrap_or(0);
    let mut acc = vec![0.0_f32; dims];

    for vector in vectors {
        for (idx, value) in vector.iter().enumerate() {
            acc[idx] += value;
        }
    }

    for value in &mut acc {
        *value /= vectors.len() as f32;
    }
    normalize(&mut acc);
    acc
}

fn normalize(values: &mut [f32]) {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in values.iter_mut() {
            *value /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HashEmbeddingModel;
    use std::io::Write;

    #[test]
    fn learns_centroids_from_jsonl() {
        let file = tempfile_path();
        let examples = [
            r#"{"text": "the river flooded our street", "category": "flood"}"#,
            r#"{"text": "water is rising in the basement", "category": "flood"}"#,
            r#"{"text": "flames and smoke from the roof", "category": "fire"}"#,
            r#"{"text": "the building is burning", "category": "fire"}"#,
        ];
        {
            let mut handle = std::fs::File::create(&file).unwrap();
            for line in examples {
                writeln!(handle, "{line}").unwrap();
            }
        }

        let embedder = Arc::new(HashEmbeddingModel::new(64));
        let classifier =
            CentroidCategoryClassifier::from_jsonl(&file, embedder, "test-centroid").unwrap();

        let prediction = classifier.predict("water is rising in our street");
        assert_eq!(prediction.label, "flood");

        std::fs::remove_file(&file).ok();
    }

    #[test]
    fn empty_dataset_is_an_error() {
        let file = tempfile_path();
        std::fs::write(&file, "").unwrap();

        let embedder = Arc::new(HashEmbeddingModel::new(64));
        let result = CentroidCategoryClassifier::from_jsonl(&file, embedder, "test-centroid");
        assert!(result.is_err());

        std::fs::remove_file(&file).ok();
    }

    fn tempfile_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "aegis-centroid-test-{}-{:?}.jsonl",
            std::process::id(),
            std::thread::current().id()
        ))
    }
}
