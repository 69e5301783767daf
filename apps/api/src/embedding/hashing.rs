//! Offline feature-hashing encoder.
//!
//! Unigrams (weight 1.0) and bigrams (weight 0.5) of the stopword-filtered
//! token stream are hashed with CRC32 into a fixed number of buckets. Vectors
//! are non-negative, so cosine similarity between them lies in `[0, 1]`.
//! Same text, same vector, on every platform and release.

use async_trait::async_trait;
use crc32fast::Hasher as Crc32;

use super::{EmbedError, TextEncoder};
use crate::text::tokenize_and_remove_stopwords;

pub const DEFAULT_DIMENSION: usize = 384;

const UNIGRAM_WEIGHT: f32 = 1.0;
const BIGRAM_WEIGHT: f32 = 0.5;

pub struct HashingEncoder {
    dimension: usize,
}

impl HashingEncoder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, feature: &str) -> usize {
        let mut hasher = Crc32::new();
        hasher.update(feature.as_bytes());
        hasher.finalize() as usize % self.dimension
    }

    fn encode_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let tokens = tokenize_and_remove_stopwords(text);

        for token in &tokens {
            vector[self.bucket(token)] += UNIGRAM_WEIGHT;
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            vector[self.bucket(&bigram)] += BIGRAM_WEIGHT;
        }
        vector
    }
}

impl Default for HashingEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl TextEncoder for HashingEncoder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| self.encode_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hashing_encoder_is_deterministic() {
        let encoder = HashingEncoder::default();
        let texts = vec!["python sql machine learning".to_string()];
        let a = encoder.encode(&texts).await.unwrap();
        let b = encoder.encode(&texts).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), DEFAULT_DIMENSION);
    }

    #[tokio::test]
    async fn test_hashing_encoder_weights_unigrams_and_bigrams() {
        let encoder = HashingEncoder::new(1);
        // tokens: python, sql → 2 unigrams + 1 bigram, all in the single bucket
        let v = encoder
            .encode(&["python and sql".to_string()])
            .await
            .unwrap();
        assert_eq!(v[0], vec![2.5]);
    }

    #[tokio::test]
    async fn test_hashing_encoder_ignores_stopwords_only_text() {
        let encoder = HashingEncoder::new(16);
        let v = encoder.encode(&["the and of".to_string()]).await.unwrap();
        assert!(v[0].iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_hashing_encoder_vectors_are_non_negative() {
        let encoder = HashingEncoder::new(32);
        let v = encoder
            .encode(&["rust tokio axum serde tracing".to_string()])
            .await
            .unwrap();
        assert!(v[0].iter().all(|x| *x >= 0.0));
        assert_eq!(v[0].iter().sum::<f32>(), 5.0 + 4.0 * BIGRAM_WEIGHT);
    }
}
