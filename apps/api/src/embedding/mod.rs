//! Embedder: turns normalized text into unit-length document vectors.
//!
//! The encoder model itself sits behind the `TextEncoder` trait so the backend
//! can be swapped without touching the pipeline:
//! - `HttpEncoder`: OpenAI-compatible `/embeddings` endpoint (hosted or a local
//!   sentence-transformer server).
//! - `HashingEncoder`: deterministic offline feature hashing (default when no
//!   endpoint is configured, and in tests).
//!
//! One encoder is built at startup and shared read-only as `Arc<dyn TextEncoder>`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::errors::AnalysisError;
use crate::text::chunk;

pub mod hashing;
pub mod http;

pub use hashing::HashingEncoder;
pub use http::HttpEncoder;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Embedding request failed after {retries} retries: {last}")]
    RetriesExhausted { retries: u32, last: Box<EmbedError> },

    #[error("Encoder returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("Encoder returned a {got}-dimensional vector, expected {expected}")]
    InvalidDimension { expected: usize, got: usize },

    #[error("Embedding timed out after {0:?}")]
    Timeout(Duration),
}

/// The encoder trait. Implement this to plug in another embedding backend.
///
/// `encode` returns one raw (not necessarily normalized) vector per input, in
/// input order, each of length `dimension()`.
#[async_trait]
pub trait TextEncoder: Send + Sync {
    fn name(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

/// Element-wise strategy for combining chunk vectors into one document vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pooling {
    #[default]
    Mean,
    Max,
}

impl FromStr for Pooling {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Pooling::Mean),
            "max" => Ok(Pooling::Max),
            _ => Err(AnalysisError::UnknownPooling(s.to_string())),
        }
    }
}

impl fmt::Display for Pooling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pooling::Mean => f.write_str("mean"),
            Pooling::Max => f.write_str("max"),
        }
    }
}

/// Chunk / pool / normalize wrapper around the shared encoder.
#[derive(Clone)]
pub struct Embedder {
    encoder: Arc<dyn TextEncoder>,
}

impl Embedder {
    pub fn new(encoder: Arc<dyn TextEncoder>) -> Self {
        Self { encoder }
    }

    pub fn encoder_name(&self) -> &str {
        self.encoder.name()
    }

    pub fn dimension(&self) -> usize {
        self.encoder.dimension()
    }

    pub fn zero_vector(&self) -> Vec<f32> {
        vec![0.0; self.dimension()]
    }

    /// Embeds a short text as a single unit. Empty text gives the zero vector.
    #[allow(dead_code)]
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.trim().is_empty() {
            return Ok(self.zero_vector());
        }
        let mut vectors = self.encode_checked(&[text.to_string()]).await?;
        let mut vector = vectors.pop().unwrap_or_else(|| self.zero_vector());
        l2_normalize(&mut vector);
        Ok(vector)
    }

    /// Embeds several short texts in one encoder call. Empty texts map to the
    /// zero vector without being sent to the encoder.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let pending: Vec<String> = texts
            .iter()
            .filter(|t| !t.trim().is_empty())
            .cloned()
            .collect();
        let mut encoded = self.encode_checked(&pending).await?.into_iter();

        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            if text.trim().is_empty() {
                out.push(self.zero_vector());
                continue;
            }
            let mut vector = encoded.next().unwrap_or_else(|| self.zero_vector());
            l2_normalize(&mut vector);
            out.push(vector);
        }
        Ok(out)
    }

    /// Embeds a long document: chunk by sentences, encode every chunk, pool,
    /// then L2-normalize. Empty text (no chunks) gives the zero vector.
    pub async fn embed_document(
        &self,
        text: &str,
        max_chunk_len: usize,
        pooling: Pooling,
    ) -> Result<Vec<f32>, EmbedError> {
        let chunks = chunk(text, max_chunk_len);
        if chunks.is_empty() {
            return Ok(self.zero_vector());
        }

        let vectors = self.encode_checked(&chunks).await?;
        debug!(
            chunks = chunks.len(),
            pooling = %pooling,
            encoder = self.encoder.name(),
            "Embedded document chunks"
        );

        let mut pooled = pool(&vectors, pooling, self.dimension());
        l2_normalize(&mut pooled);
        Ok(pooled)
    }

    async fn encode_checked(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.encoder.encode(texts).await?;
        if vectors.len() != texts.len() {
            return Err(EmbedError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }
        let expected = self.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(EmbedError::InvalidDimension {
                expected,
                got: bad.len(),
            });
        }
        Ok(vectors)
    }
}

/// Element-wise mean or max over equal-length vectors. No vectors gives zeros.
pub fn pool(vectors: &[Vec<f32>], pooling: Pooling, dimension: usize) -> Vec<f32> {
    if vectors.is_empty() {
        return vec![0.0; dimension];
    }
    match pooling {
        Pooling::Mean => {
            let mut sum = vec![0.0f32; dimension];
            for vector in vectors {
                for (acc, x) in sum.iter_mut().zip(vector) {
                    *acc += x;
                }
            }
            let n = vectors.len() as f32;
            sum.iter_mut().for_each(|x| *x /= n);
            sum
        }
        Pooling::Max => {
            let mut max = vec![f32::NEG_INFINITY; dimension];
            for vector in vectors {
                for (acc, x) in max.iter_mut().zip(vector) {
                    *acc = acc.max(*x);
                }
            }
            max
        }
    }
}

/// Scales `vector` to unit L2 norm in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}
