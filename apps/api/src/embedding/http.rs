//! HTTP encoder: talks to any OpenAI-compatible `/embeddings` endpoint.
//!
//! Retries on 429 and 5xx responses and on transport failures with exponential
//! backoff. Other 4xx responses are returned immediately: they are
//! deterministic input errors and would fail again.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{EmbedError, TextEncoder};
use crate::config::EmbeddingSettings;

const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct HttpEncoder {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    max_retries: u32,
    batch_size: usize,
    retry_base_delay: Duration,
}

impl HttpEncoder {
    pub fn new(base_url: &str, settings: &EmbeddingSettings) -> Result<Self> {
        anyhow::ensure!(!base_url.trim().is_empty(), "missing embedding API URL");
        anyhow::ensure!(
            !settings.model.trim().is_empty(),
            "missing embedding model name"
        );
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("failed to build embedding HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key: settings
                .api_key
                .as_ref()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            model: settings.model.clone(),
            dimension: settings.dimension,
            max_retries: settings.max_retries,
            batch_size: settings.batch_size.max(1),
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
        })
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Sends one batch, retrying transient failures up to `max_retries` times
    /// after the first attempt.
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut attempt: u32 = 0;
        loop {
            let error = match self.send_batch(inputs).await {
                Ok(vectors) => return Ok(vectors),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Transient(e)) => e,
            };

            if attempt >= self.max_retries {
                if self.max_retries == 0 {
                    return Err(error);
                }
                return Err(EmbedError::RetriesExhausted {
                    retries: self.max_retries,
                    last: Box::new(error),
                });
            }

            attempt += 1;
            let delay = backoff_delay(self.retry_base_delay, attempt);
            warn!(
                "Embedding attempt {} failed ({}), retrying after {}ms...",
                attempt,
                error,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, Attempt> {
        let request_body = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };
        let mut request = self.client.post(&self.endpoint).json(&request_body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Attempt::Transient(EmbedError::Http(e)))?;
        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("Embedding API returned {}: {}", status, body);
            return Err(Attempt::Transient(EmbedError::Api {
                status: status.as_u16(),
                message: body,
            }));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(Attempt::Fatal(EmbedError::Api {
                status: status.as_u16(),
                message,
            }));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Attempt::Fatal(EmbedError::Http(e)))?;
        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != inputs.len() {
            return Err(Attempt::Fatal(EmbedError::CountMismatch {
                expected: inputs.len(),
                got: parsed.data.len(),
            }));
        }

        debug!(inputs = inputs.len(), model = %self.model, "Embedding batch succeeded");
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Outcome of one failed request: retry it or give up.
enum Attempt {
    Transient(EmbedError),
    Fatal(EmbedError),
}

/// `base * 2^(retry - 1)`, saturating instead of overflowing.
fn backoff_delay(base: Duration, retry: u32) -> Duration {
    let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

#[async_trait]
impl TextEncoder for HttpEncoder {
    fn name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            out.extend(self.embed_batch(batch).await?);
        }
        Ok(out)
    }
}
