use aegis_guidance::{tokenize, EmbeddingModel};

/// Deterministic hashed text embedding over the same tokenizer the guidance
/// index uses. Single tokens carry full weight; adjacent-token pairs are
/// hashed at half weight so short phrases like "water rising" or "heavy
/// smoke" stay distinguishable from their words in isolation. No model
/// artifacts required, which keeps classification available on a cold
/// machine.
#[derive(Debug, Clone)]
pub struct HashEmbeddingModel {
    dims: usize,
}

const BIGRAM_WEIGHT: f32 = 0.5;

impl HashEmbeddingModel {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(32) }
    }
}

impl EmbeddingModel for HashEmbeddingModel {
    fn model_name(&self) -> &'static str {
        "hashed-bow"
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        let mut values = vec![0.0_f32; self.dims];

        for token in &tokens {
            bump(&mut values, token, 1.0);
        }
        for pair in tokens.windows(2) {
            bump(&mut values, &format!("{} {}", pair[0], pair[1]), BIGRAM_WEIGHT);
        }

        normalize(&mut values);
        values
    }
}

fn bump(values: &mut [f32], feature: &str, weight: f32) {
    let hash = fnv1a(feature.as_bytes());
    let index = (hash >> 1) as usize % values.len();
    if hash & 1 == 0 {
        values[index] += weight;
    } else {
        values[index] -= weight;
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
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
    use aegis_guidance::cosine_similarity;

    #[test]
    fn embedding_is_deterministic_and_normalized() {
        let model = HashEmbeddingModel::new(64);
        let a = model.embed("water in the basement");
        let b = model.embed("water in the basement");
        assert_eq!(a, b);

        let norm = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn punctuation_does_not_change_the_embedding() {
        let model = HashEmbeddingModel::new(64);
        let plain = model.embed("water is rising in the basement");
        let noisy = model.embed("Water is rising, in the BASEMENT!");
        assert_eq!(plain, noisy);
    }

    #[test]
    fn related_reports_score_closer_than_unrelated_ones() {
        let model = HashEmbeddingModel::new(256);
        let flood = model.embed("water is rising in the basement");
        let flood_rephrased = model.embed("the basement is filling with rising water");
        let unrelated = model.embed("sunny picnic with music in the park");

        assert!(
            cosine_similarity(&flood, &flood_rephrased)
                > cosine_similarity(&flood, &unrelated)
        );
    }

    #[test]
    fn empty_text_embeds_to_the_zero_vector() {
        let model = HashEmbeddingModel::new(64);
        let empty = model.embed("");
        assert!(empty.iter().all(|v| *v == 0.0));
    }
}
