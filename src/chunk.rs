//! Paragraph-boundary text chunker.
//!
//! Splits document body text into [`Chunk`]s that respect a configurable
//! token limit, splitting on paragraph boundaries (`\n\n`) to preserve
//! semantic coherence. A configurable overlap carries the tail of each chunk
//! into the next so retrieval does not lose context at chunk seams.
//!
//! Each chunk gets a random UUID and a SHA-256 hash of its text.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Approximate chars-per-token ratio used to interpret token budgets.
const CHARS_PER_TOKEN: usize = 4;

/// Split `text` into chunks of at most `max_tokens`, overlapping consecutive
/// chunks by roughly `overlap_tokens`. Indices are contiguous from 0.
pub fn chunk_text(
    document_id: &str,
    text: &str,
    max_tokens: usize,
    overlap_tokens: usize,
) -> Vec<Chunk> {
    let max_chars = max_tokens * CHARS_PER_TOKEN;
    let overlap_chars = overlap_tokens * CHARS_PER_TOKEN;

    if text.is_empty() {
        return vec![make_chunk(document_id, 0, text)];
    }

    let paragraphs: Vec<&str> = text.split("\n\n").collect();
    let mut chunks = Vec::new();
    let mut current_buf = String::new();
    let mut chunk_index: i64 = 0;

    for para in paragraphs {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        // Flush the buffer if this paragraph would push it past the limit,
        // seeding the next buffer with the overlap tail.
        let would_be = if current_buf.is_empty() {
            trimmed.len()
        } else {
            current_buf.len() + 2 + trimmed.len()
        };

        if would_be > max_chars && !current_buf.is_empty() {
            let tail = overlap_tail(&current_buf, overlap_chars);
            chunks.push(make_chunk(document_id, chunk_index, &current_buf));
            chunk_index += 1;
            current_buf = tail;
        }

        // A single paragraph over the limit gets hard-split.
        if trimmed.len() > max_chars {
            if !current_buf.is_empty() {
                chunks.push(make_chunk(document_id, chunk_index, &current_buf));
                chunk_index += 1;
                current_buf.clear();
            }
            let mut remaining = trimmed;
            while !remaining.is_empty() {
                let split_at = char_floor(remaining, remaining.len().min(max_chars));
                // Prefer a newline or space boundary when not at the end
                let actual_split = if split_at < remaining.len() {
                    remaining[..split_at]
                        .rfind('\n')
                        .or_else(|| remaining[..split_at].rfind(' '))
                        .map(|pos| pos + 1)
                        .unwrap_or(split_at)
                } else {
                    split_at
                };
                let piece = &remaining[..actual_split];
                chunks.push(make_chunk(document_id, chunk_index, piece.trim()));
                chunk_index += 1;
                remaining = &remaining[actual_split..];
            }
        } else {
            if !current_buf.is_empty() {
                current_buf.push_str("\n\n");
            }
            current_buf.push_str(trimmed);
        }
    }

    if !current_buf.is_empty() {
        chunks.push(make_chunk(document_id, chunk_index, &current_buf));
    }

    // Guarantee at least one chunk
    if chunks.is_empty() {
        chunks.push(make_chunk(document_id, 0, text.trim()));
    }

    chunks
}

/// Last `overlap_chars` of `text`, trimmed forward to a char boundary and
/// then to the next word boundary.
fn overlap_tail(text: &str, overlap_chars: usize) -> String {
    if overlap_chars == 0 {
        return String::new();
    }
    if text.len() <= overlap_chars {
        return text.to_string();
    }
    let mut start = text.len() - overlap_chars;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    let tail = &text[start..];
    match tail.find(' ') {
        Some(pos) => tail[pos + 1..].to_string(),
        None => tail.to_string(),
    }
}

/// Largest char boundary in `text` that is <= `at`.
fn char_floor(text: &str, at: usize) -> usize {
    let mut pos = at.min(text.len());
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

fn make_chunk(document_id: &str, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_text_single_chunk() {
        let chunks = chunk_text("doc1", "Hello, world!", 1000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn empty_text() {
        let chunks = chunk_text("doc1", "", 1000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn multiple_paragraphs_under_limit() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunk_text("doc1", text, 1000, 0);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("First paragraph."));
        assert!(chunks[0].text.contains("Third paragraph."));
    }

    #[test]
    fn multiple_paragraphs_exceed_limit() {
        // max_tokens=5 => max_chars=20
        let text = "This is paragraph one.\n\nThis is paragraph two.\n\nThis is paragraph three.";
        let chunks = chunk_text("doc1", text, 5, 0);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
        }
    }

    #[test]
    fn chunk_indices_contiguous() {
        let text = (0..50)
            .map(|i| format!("Paragraph number {}.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunk_text("doc1", &text, 10, 2);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64, "Index mismatch at position {}", i);
        }
    }

    #[test]
    fn overlap_carries_tail_into_next_chunk() {
        // Two paragraphs that cannot share a chunk; overlap must carry the
        // end of the first into the second.
        let text = "alpha beta gamma delta\n\nepsilon zeta eta theta";
        let chunks = chunk_text("doc1", text, 6, 3); // 24 max chars, 12 overlap chars
        assert!(chunks.len() >= 2);
        let first_tail = chunks[0].text.split(' ').last().unwrap();
        assert!(
            chunks[1].text.contains(first_tail),
            "second chunk {:?} should contain tail of first {:?}",
            chunks[1].text,
            chunks[0].text
        );
    }

    #[test]
    fn zero_overlap_has_no_duplication() {
        let text = "one two three four\n\nfive six seven eight";
        let chunks = chunk_text("doc1", text, 5, 0);
        if chunks.len() >= 2 {
            assert!(!chunks[1].text.contains("four"));
        }
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        let text = "héllo wörld ünïcode tëxt ".repeat(40);
        let chunks = chunk_text("doc1", &text, 10, 3);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn hashes_are_deterministic() {
        let text = "Alpha\n\nBeta\n\nGamma\n\nDelta";
        let c1 = chunk_text("doc1", text, 5, 1);
        let c2 = chunk_text("doc1", text, 5, 1);
        assert_eq!(c1.len(), c2.len());
        for (a, b) in c1.iter().zip(c2.iter()) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.hash, b.hash);
        }
    }
}
