//! Deterministic in-process provider for tests and local development.
//!
//! Embeddings are a hashed bag-of-bytes projection, so identical texts embed
//! identically and retrieval behaves deterministically. Completions replay a
//! fixed fragment script through the same bounded-channel contract as the
//! real backends, optionally ending in a mid-stream failure.

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::SinkExt;

use super::{CompletionStream, Provider, STREAM_BUFFER};
use crate::error::ChatError;

#[derive(Debug)]
pub struct MockProvider {
    dims: usize,
    fragments: Vec<String>,
    fail_mid_stream: bool,
}

impl MockProvider {
    pub const NAME: &'static str = "Mock";

    /// Provider that answers every prompt with the given fragment script.
    pub fn with_fragments(fragments: Vec<&str>) -> Self {
        Self {
            dims: 16,
            fragments: fragments.into_iter().map(str::to_string).collect(),
            fail_mid_stream: false,
        }
    }

    /// Emit the fragment script, then a backend error instead of a clean close.
    pub fn failing_after(fragments: Vec<&str>) -> Self {
        Self {
            fail_mid_stream: true,
            ..Self::with_fragments(fragments)
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dims];
        for (i, b) in text.bytes().enumerate() {
            vec[(b as usize + i) % self.dims] += 1.0;
        }
        vec
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn chat_model(&self) -> &str {
        "mock-chat"
    }

    fn embedding_model(&self) -> &str {
        "mock-embed"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChatError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    async fn stream_complete(&self, _prompt: &str) -> Result<CompletionStream, ChatError> {
        let fragments = self.fragments.clone();
        let fail = self.fail_mid_stream;
        let (mut tx, rx) = mpsc::channel(STREAM_BUFFER);

        tokio::spawn(async move {
            for fragment in fragments {
                if tx.send(Ok(fragment)).await.is_err() {
                    return;
                }
            }
            if fail {
                let _ = tx
                    .send(Err(ChatError::BackendUnavailable(
                        "mock backend failed mid-stream".to_string(),
                    )))
                    .await;
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn replays_fragment_script_in_order() {
        let provider = MockProvider::with_fragments(vec!["Nel", "son", " Mandela"]);
        let stream = provider.stream_complete("who?").await.unwrap();
        let items: Vec<_> = stream.collect().await;
        let fragments: Vec<String> = items.into_iter().map(|i| i.unwrap()).collect();
        assert_eq!(fragments, vec!["Nel", "son", " Mandela"]);
    }

    #[tokio::test]
    async fn embeddings_are_deterministic() {
        let provider = MockProvider::with_fragments(vec![]);
        let a = provider.embed(&["hello".to_string()]).await.unwrap();
        let b = provider.embed(&["hello".to_string()]).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 16);
    }
}
