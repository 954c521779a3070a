//! In-memory vector index and query engine.
//!
//! [`VectorIndex`] holds a session's chunks and their embedding vectors and
//! answers nearest-neighbor queries by cosine similarity. [`QueryEngine`]
//! wraps an index with the session's provider: embed the question, retrieve
//! the top-k chunks, and stream a completion of a context-grounded prompt.

use std::sync::Arc;

use crate::error::ChatError;
use crate::models::Chunk;
use crate::provider::{CompletionStream, Provider};

/// Immutable cosine-similarity index over one document's chunks.
#[derive(Debug)]
pub struct VectorIndex {
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    dims: usize,
}

impl VectorIndex {
    /// Build an index from chunks and their vectors, in matching order.
    pub fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self, ChatError> {
        if chunks.len() != vectors.len() {
            return Err(ChatError::Internal(format!(
                "chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        if chunks.is_empty() {
            return Err(ChatError::Internal(
                "cannot build an index over zero chunks".to_string(),
            ));
        }
        let dims = vectors[0].len();
        if dims == 0 || vectors.iter().any(|v| v.len() != dims) {
            return Err(ChatError::Internal(
                "embedding vectors have inconsistent dimensions".to_string(),
            ));
        }

        Ok(Self {
            chunks,
            vectors,
            dims,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// The `k` chunks most similar to `query`, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(&Chunk, f32)> {
        let mut scored: Vec<(&Chunk, f32)> = self
            .chunks
            .iter()
            .zip(self.vectors.iter())
            .map(|(chunk, vec)| (chunk, cosine_similarity(query, vec)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty or
/// mismatched-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Answers questions against a built index, streaming the answer through the
/// session's provider.
pub struct QueryEngine {
    index: VectorIndex,
    provider: Arc<dyn Provider>,
    top_k: usize,
}

impl QueryEngine {
    pub fn new(index: VectorIndex, provider: Arc<dyn Provider>, top_k: usize) -> Self {
        Self {
            index,
            provider,
            top_k,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    /// Embed the question, retrieve context, and stream a grounded answer.
    pub async fn query(&self, question: &str) -> Result<CompletionStream, ChatError> {
        let question_owned = question.to_string();
        let vectors = self
            .provider
            .embed(std::slice::from_ref(&question_owned))
            .await?;
        let query_vec = vectors.into_iter().next().ok_or_else(|| {
            ChatError::BackendUnavailable("empty embedding response for query".to_string())
        })?;

        let hits = self.index.search(&query_vec, self.top_k);
        let prompt = build_prompt(question, &hits);

        self.provider.stream_complete(&prompt).await
    }
}

fn build_prompt(question: &str, hits: &[(&Chunk, f32)]) -> String {
    let context = hits
        .iter()
        .map(|(chunk, _)| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Answer the question using only the context below. \
         If the context does not contain the answer, say so.\n\n\
         Context:\n---------------------\n{}\n---------------------\n\n\
         Question: {}\nAnswer:",
        context, question
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            document_id: "doc".to_string(),
            chunk_index: 0,
            text: text.to_string(),
            hash: String::new(),
        }
    }

    #[test]
    fn cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn build_rejects_count_mismatch() {
        let err = VectorIndex::build(vec![chunk("a", "x")], vec![]).unwrap_err();
        assert!(matches!(err, ChatError::Internal(_)));
    }

    #[test]
    fn build_rejects_inconsistent_dims() {
        let err = VectorIndex::build(
            vec![chunk("a", "x"), chunk("b", "y")],
            vec![vec![1.0, 0.0], vec![1.0]],
        )
        .unwrap_err();
        assert!(matches!(err, ChatError::Internal(_)));
    }

    #[test]
    fn search_ranks_by_similarity() {
        let index = VectorIndex::build(
            vec![chunk("a", "east"), chunk("b", "north"), chunk("c", "northeast")],
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
        )
        .unwrap();

        let hits = index.search(&[0.0, 1.0], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.id, "b");
        assert_eq!(hits[1].0.id, "c");
    }

    #[test]
    fn search_k_larger_than_index() {
        let index = VectorIndex::build(vec![chunk("a", "x")], vec![vec![1.0]]).unwrap();
        assert_eq!(index.search(&[1.0], 10).len(), 1);
    }

    #[test]
    fn prompt_contains_context_and_question() {
        let c = chunk("a", "Mandela was born in 1918.");
        let prompt = build_prompt("When was Mandela born?", &[(&c, 0.9)]);
        assert!(prompt.contains("Mandela was born in 1918."));
        assert!(prompt.contains("Question: When was Mandela born?"));
    }
}
