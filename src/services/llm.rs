//! Generative text service client.
//!
//! The enrichment cascade's last tier sends batches of unresolved
//! ingredient names to a hosted chat-completion service with a
//! structured-JSON response hint. The service is treated as unreliable:
//! every call carries a bounded timeout upstream, and any failure here
//! is converted into deterministic fallback records by the caller —
//! never surfaced to the end user.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors from the generative text service.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Cannot reach generative service at {0}")]
    Connection(String),
    #[error("Generative service request timed out")]
    Timeout,
    #[error("Generative service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Malformed generative service response: {0}")]
    MalformedResponse(String),
}

/// Chat-completion seam for the generative text service.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one system + user instruction pair, return the raw text
    /// content of the reply.
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

// ═══════════════════════════════════════════════════════════
// HTTP client
// ═══════════════════════════════════════════════════════════

/// HTTP chat-completion client with bearer-token auth.
pub struct HttpLlmClient {
    api_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpLlmClient {
    pub fn new(api_url: &str, api_key: &str, timeout: std::time::Duration) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Connection(e.to_string()))?;
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

/// Request body for the chat-completion endpoint. Field casing follows
/// the service's wire contract.
#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat<'a>,
    #[serde(rename = "maxTokens")]
    max_tokens: u32,
    temperature: f64,
    #[serde(rename = "topP")]
    top_p: f64,
    #[serde(rename = "repeatPenalty")]
    repeat_penalty: f64,
}

#[derive(Deserialize)]
struct ChatReplyMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatReplyResult {
    message: ChatReplyMessage,
}

/// Reply envelope. Some deployments nest the message under `result`,
/// others return it at the top level; accept both.
#[derive(Deserialize)]
struct ChatReply {
    result: Option<ChatReplyResult>,
    message: Option<ChatReplyMessage>,
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let body = ChatRequest {
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            response_format: ResponseFormat { kind: "json_object" },
            max_tokens: 1500,
            temperature: 0.3,
            top_p: 0.8,
            repeat_penalty: 1.2,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else if e.is_connect() {
                    LlmError::Connection(self.api_url.clone())
                } else {
                    LlmError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatReply = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        reply
            .result
            .map(|r| r.message.content)
            .or(reply.message.map(|m| m.content))
            .ok_or_else(|| LlmError::MalformedResponse("reply carries no message content".into()))
    }
}

// ═══════════════════════════════════════════════════════════
// Mock client for tests
// ═══════════════════════════════════════════════════════════

/// Scriptable mock. Replies are consumed in order; when the script runs
/// out the last reply repeats. Counts calls so tests can assert how
/// often the service was hit.
pub struct MockLlmClient {
    replies: Mutex<Vec<Result<String, String>>>,
    calls: AtomicUsize,
}

impl MockLlmClient {
    pub fn new(reply: &str) -> Self {
        Self {
            replies: Mutex::new(vec![Ok(reply.to_string())]),
            calls: AtomicUsize::new(0),
        }
    }

    /// A client whose every call fails with a connection error.
    pub fn failing() -> Self {
        Self {
            replies: Mutex::new(vec![Err("mock connection refused".to_string())]),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn push_reply(self, reply: &str) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Ok(reply.to_string()));
        self
    }

    /// Total calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        let reply = replies.get(n).or_else(|| replies.last());
        match reply {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(msg)) => Err(LlmError::Connection(msg.clone())),
            None => Err(LlmError::MalformedResponse("mock has no reply".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_scripted_replies_in_order() {
        let client = MockLlmClient::new("first").push_reply("second");
        assert_eq!(client.generate("s", "u").await.unwrap(), "first");
        assert_eq!(client.generate("s", "u").await.unwrap(), "second");
        // Script exhausted: last reply repeats.
        assert_eq!(client.generate("s", "u").await.unwrap(), "second");
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn failing_mock_errors_every_call() {
        let client = MockLlmClient::failing();
        assert!(client.generate("s", "u").await.is_err());
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn http_client_trims_trailing_slash() {
        let client =
            HttpLlmClient::new("https://api.example.test/v1/chat/", "key", std::time::Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.api_url, "https://api.example.test/v1/chat");
    }

    #[test]
    fn request_body_uses_service_field_casing() {
        let body = ChatRequest {
            messages: vec![ChatMessage { role: "system", content: "sys" }],
            response_format: ResponseFormat { kind: "json_object" },
            max_tokens: 1500,
            temperature: 0.3,
            top_p: 0.8,
            repeat_penalty: 1.2,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["maxTokens"], 1500);
        assert_eq!(json["topP"], 0.8);
        assert_eq!(json["response_format"]["type"], "json_object");
    }

    #[test]
    fn reply_parses_nested_and_flat_envelopes() {
        let nested: ChatReply =
            serde_json::from_str(r#"{"result":{"message":{"content":"hello"}}}"#).unwrap();
        assert_eq!(nested.result.unwrap().message.content, "hello");

        let flat: ChatReply = serde_json::from_str(r#"{"message":{"content":"hi"}}"#).unwrap();
        assert_eq!(flat.message.unwrap().content, "hi");
    }
}
