pub const DEFAULT_DIMENSION: usize = 384;

/// Offline embeddings provider built on feature hashing.
///
/// Every lowercase alphanumeric token is hashed into one of `embedding_dim`
/// buckets and the resulting bag-of-words vector is L2-normalised. Texts that
/// share words end up close under cosine similarity, which is enough for
/// development and tests without an embedding API.
pub struct FallbackEmbeddingProvider {
    embedding_dim: usize,
}

impl FallbackEmbeddingProvider {
    pub fn new(embedding_dim: usize) -> Self {
        Self {
            embedding_dim: embedding_dim.max(1),
        }
    }

    pub fn with_standard_dimension() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }

    pub fn embed_texts(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts.iter().map(|text| self.embed_text(text)).collect()
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.embedding_dim];

        for token in tokens(text) {
            let bucket = (fnv1a(&token) % self.embedding_dim as u64) as usize;
            embedding[bucket] += 1.0;
        }

        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        embedding
    }

    pub fn embedding_dimension(&self) -> usize {
        self.embedding_dim
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

// Stable across runs and platforms, unlike std's RandomState.
fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf29ce484222325_u64, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn should_create_fallback_provider_with_custom_dimension() {
        let provider = FallbackEmbeddingProvider::new(512);
        assert_eq!(provider.embedding_dimension(), 512);
    }

    #[test]
    fn should_create_fallback_provider_with_standard_dimension() {
        let provider = FallbackEmbeddingProvider::with_standard_dimension();
        assert_eq!(provider.embedding_dimension(), 384);
    }

    #[test]
    fn should_return_empty_embeddings_for_empty_input() {
        let provider = FallbackEmbeddingProvider::new(8);
        assert!(provider.embed_texts(&[]).is_empty());
    }

    #[test]
    fn should_be_deterministic() {
        let provider = FallbackEmbeddingProvider::new(32);
        let texts = vec!["same text".to_string()];

        assert_eq!(provider.embed_texts(&texts), provider.embed_texts(&texts));
    }

    #[test]
    fn should_return_unit_vectors() {
        let provider = FallbackEmbeddingProvider::new(64);
        let embedding = provider.embed_texts(&["The sky is blue.".to_string()]);

        let norm = embedding[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn should_return_zero_vector_for_text_without_tokens() {
        let provider = FallbackEmbeddingProvider::new(8);
        let embedding = provider.embed_texts(&["  ... !!".to_string()]);
        assert!(embedding[0].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn should_ignore_case_and_punctuation() {
        let provider = FallbackEmbeddingProvider::new(64);
        let result = provider.embed_texts(&["Blue SKY!".to_string(), "blue sky".to_string()]);
        assert_eq!(result[0], result[1]);
    }

    #[test]
    fn should_rank_texts_sharing_words_higher() {
        let provider = FallbackEmbeddingProvider::new(256);
        let result = provider.embed_texts(&[
            "what color is the grass".to_string(),
            "grass is green".to_string(),
            "the moon orbits earth".to_string(),
        ]);

        assert!(cosine(&result[0], &result[1]) > cosine(&result[0], &result[2]));
    }
}
