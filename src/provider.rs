//! Model backend abstraction and implementations.
//!
//! Defines the [`Provider`] trait — one implementation per backend family —
//! bundling a chat model, an embedding model, and a streaming completion
//! operation behind a stable name. Concrete implementations:
//!
//! - **[`OllamaProvider`]** — a local/remote Ollama instance
//!   (`/api/generate` for streamed completion, `/api/embed` for embeddings).
//! - **[`mock::MockProvider`]** — deterministic in-process backend for tests.
//!
//! A provider is immutable once constructed and safe to share across
//! concurrent sessions behind an `Arc`. Construction performs no network I/O;
//! the backend handshake is deferred to the first call.
//!
//! # Streaming contract
//!
//! [`Provider::stream_complete`] returns a bounded channel receiver of text
//! deltas in backend order. A mid-stream backend failure is delivered as a
//! single `Err` item after which the stream closes — callers can always
//! distinguish "answer complete" from "answer interrupted". Dropping the
//! receiver stops the producer, which stops pulling from the backend.
//!
//! # Retry strategy
//!
//! The embedding path retries transient errors (HTTP 429/5xx, network) with
//! exponential backoff: 1s, 2s, 4s, ... capped at 2^5. Completion calls are
//! never retried; retry policy for interrupted answers belongs to the caller.

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use std::time::Duration;

use crate::config::OllamaConfig;
use crate::error::ChatError;

pub mod mock;

/// Capacity of fragment channels. Bounded so a slow consumer exerts
/// backpressure on the backend pull instead of buffering the whole answer.
pub(crate) const STREAM_BUFFER: usize = 32;

/// A lazily produced, finite, non-restartable sequence of answer fragments.
pub type CompletionStream = mpsc::Receiver<Result<String, ChatError>>;

/// A model backend: chat model + embedding model + streamed completion.
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Stable backend name (e.g. `"Ollama"`).
    fn name(&self) -> &str;

    /// Identifier of the chat model this provider completes with.
    fn chat_model(&self) -> &str;

    /// Identifier of the embedding model this provider embeds with.
    fn embedding_model(&self) -> &str;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChatError>;

    /// Stream a completion for `prompt` as incremental text deltas.
    ///
    /// Each call re-issues the request; the returned stream cannot be
    /// restarted.
    async fn stream_complete(&self, prompt: &str) -> Result<CompletionStream, ChatError>;
}

// ============ Ollama ============

/// Provider backed by an Ollama instance.
#[derive(Debug)]
pub struct OllamaProvider {
    host: String,
    chat_model: String,
    embedding_model: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Canonical registry name for this backend family.
    pub const NAME: &'static str = "Ollama";

    /// Construct from configuration. Fails with
    /// [`ChatError::Configuration`] if the host or model identifiers cannot
    /// be resolved to usable values. No network I/O happens here.
    pub fn new(config: &OllamaConfig) -> Result<Self, ChatError> {
        let host = config.host.trim().trim_end_matches('/').to_string();
        if !host.starts_with("http://") && !host.starts_with("https://") {
            return Err(ChatError::Configuration(format!(
                "ollama.host must be an http(s) URL, got '{}'",
                config.host
            )));
        }
        if config.chat_model.trim().is_empty() {
            return Err(ChatError::Configuration(
                "ollama.chat_model must not be empty".to_string(),
            ));
        }
        if config.embedding_model.trim().is_empty() {
            return Err(ChatError::Configuration(
                "ollama.embedding_model must not be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            host,
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn chat_model(&self) -> &str {
        &self.chat_model
    }

    fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChatError> {
        let body = serde_json::json!({
            "model": self.embedding_model,
            "input": texts,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(format!("{}/api/embed", self.host))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await.map_err(|e| {
                            ChatError::BackendUnavailable(format!(
                                "invalid embedding response: {}",
                                e
                            ))
                        })?;
                        return parse_embed_response(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = ChatError::BackendUnavailable(format!(
                        "ollama embed error {}: {}",
                        status, body_text
                    ));

                    // Rate limited or server error: retry. Other client errors: fail now.
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    last_err = Some(ChatError::BackendUnavailable(format!(
                        "ollama connection error (is Ollama running at {}?): {}",
                        self.host, e
                    )));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            ChatError::BackendUnavailable("embedding failed after retries".to_string())
        }))
    }

    async fn stream_complete(&self, prompt: &str) -> Result<CompletionStream, ChatError> {
        let body = serde_json::json!({
            "model": self.chat_model,
            "prompt": prompt,
            "stream": true,
        });

        let resp = self
            .client
            .post(format!("{}/api/generate", self.host))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                ChatError::BackendUnavailable(format!(
                    "ollama connection error (is Ollama running at {}?): {}",
                    self.host, e
                ))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(ChatError::BackendUnavailable(format!(
                "ollama generate error {}: {}",
                status, body_text
            )));
        }

        let (mut tx, rx) = mpsc::channel(STREAM_BUFFER);

        // Producer task: parse NDJSON lines off the wire and forward deltas.
        // A failed send means the receiver is gone; stop pulling from the
        // backend and let the connection drop.
        tokio::spawn(async move {
            let mut upstream = resp.bytes_stream();
            let mut buf: Vec<u8> = Vec::new();

            while let Some(next) = upstream.next().await {
                let bytes = match next {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ChatError::BackendUnavailable(format!(
                                "ollama stream aborted: {}",
                                e
                            ))))
                            .await;
                        return;
                    }
                };

                buf.extend_from_slice(&bytes);

                while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    match parse_generate_line(&line) {
                        Ok(None) => {}
                        Ok(Some(GenerateEvent { delta, done })) => {
                            if !delta.is_empty() && tx.send(Ok(delta)).await.is_err() {
                                return;
                            }
                            if done {
                                return;
                            }
                        }
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}

fn parse_embed_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, ChatError> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            ChatError::BackendUnavailable(
                "invalid embedding response: missing embeddings array".to_string(),
            )
        })?;

    let mut result = Vec::with_capacity(embeddings.len());

    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| {
                ChatError::BackendUnavailable(
                    "invalid embedding response: embedding is not an array".to_string(),
                )
            })?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }

    Ok(result)
}

#[derive(Debug)]
struct GenerateEvent {
    delta: String,
    done: bool,
}

/// Parse one NDJSON line from `/api/generate`. Blank lines yield `None`.
/// Ollama reports mid-stream failures as `{"error": "..."}` lines.
fn parse_generate_line(line: &[u8]) -> Result<Option<GenerateEvent>, ChatError> {
    let trimmed = line
        .iter()
        .copied()
        .filter(|&b| b != b'\n' && b != b'\r')
        .collect::<Vec<u8>>();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: serde_json::Value = serde_json::from_slice(&trimmed).map_err(|e| {
        ChatError::BackendUnavailable(format!("malformed ollama stream line: {}", e))
    })?;

    if let Some(err) = value.get("error").and_then(|e| e.as_str()) {
        return Err(ChatError::BackendUnavailable(format!(
            "ollama reported an error mid-stream: {}",
            err
        )));
    }

    let delta = value
        .get("response")
        .and_then(|r| r.as_str())
        .unwrap_or("")
        .to_string();
    let done = value.get("done").and_then(|d| d.as_bool()).unwrap_or(false);

    Ok(Some(GenerateEvent { delta, done }))
}
