//! Embedding service client.
//!
//! Embeds a text query into a fixed-length vector for safety-index
//! similarity search. Like the generative service, this dependency is
//! unreliable by assumption: the retriever degrades to substring
//! matching when a call fails.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors from the embedding service.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Cannot reach embedding service at {0}")]
    Connection(String),
    #[error("Embedding request timed out")]
    Timeout,
    #[error("Embedding service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Malformed embedding response: {0}")]
    MalformedResponse(String),
    #[error("Cannot embed an empty query")]
    EmptyQuery,
}

/// Seam for the text-embedding service.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed one text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

// ═══════════════════════════════════════════════════════════
// HTTP client
// ═══════════════════════════════════════════════════════════

/// HTTP embedding client with bearer-token auth.
pub struct HttpEmbeddingClient {
    api_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpEmbeddingClient {
    pub fn new(
        api_url: &str,
        api_key: &str,
        timeout: std::time::Duration,
    ) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::Connection(e.to_string()))?;
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResultEnvelope {
    embedding: Option<Vec<f32>>,
}

/// Reply envelope. Deployments differ on where the vector lives:
/// `result.embedding`, `embedding`, or `embeddings`.
#[derive(Deserialize)]
struct EmbedReply {
    result: Option<EmbedResultEnvelope>,
    embedding: Option<Vec<f32>>,
    embeddings: Option<Vec<f32>>,
}

impl EmbedReply {
    fn into_vector(self) -> Option<Vec<f32>> {
        self.result
            .and_then(|r| r.embedding)
            .or(self.embedding)
            .or(self.embeddings)
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyQuery);
        }

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&EmbedRequest { text })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout
                } else if e.is_connect() {
                    EmbeddingError::Connection(self.api_url.clone())
                } else {
                    EmbeddingError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let reply: EmbedReply = response
            .json()
            .await
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;

        reply
            .into_vector()
            .ok_or_else(|| EmbeddingError::MalformedResponse("reply carries no vector".into()))
    }
}

// ═══════════════════════════════════════════════════════════
// Mock client for tests
// ═══════════════════════════════════════════════════════════

/// Deterministic mock: hashes the text into an L2-normalized vector of
/// a fixed dimension, so identical queries embed identically. Can be
/// switched into a failing mode to exercise the substring fallback.
pub struct MockEmbeddingClient {
    dimension: usize,
    fail: bool,
    calls: AtomicUsize,
}

impl MockEmbeddingClient {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// A client whose every call fails.
    pub fn failing(dimension: usize) -> Self {
        Self {
            dimension,
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingClient for MockEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EmbeddingError::Connection("mock embedding offline".into()));
        }
        Ok(deterministic_vector(text, self.dimension))
    }
}

/// Deterministic unit vector derived from the text bytes.
pub fn deterministic_vector(text: &str, dim: usize) -> Vec<f32> {
    let bytes = text.as_bytes();
    let mut vec = vec![0.0f32; dim];

    for (i, slot) in vec.iter_mut().enumerate() {
        let byte_idx = i % bytes.len().max(1);
        *slot = (bytes.get(byte_idx).copied().unwrap_or(0) as f32 + i as f32) / 255.0;
    }

    // L2 normalize
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in &mut vec {
            *val /= norm;
        }
    }

    vec
}
