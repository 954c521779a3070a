//! Ingestion orchestration.
//!
//! Turns an upload batch into a queryable index bound to a session:
//! validate content types → write to a transient directory → parse →
//! chunk → embed via the session's provider → build the index → attach the
//! query engine to the session.
//!
//! Validation is all-or-nothing: if any upload in the batch is invalid,
//! nothing is ingested. When the batch is valid, only the **last** upload is
//! ingested — single-document sessions are the documented policy.
//!
//! Transient storage is a `TempDir` scoped to this call; it is removed on
//! every exit path when the guard drops. No session mutation is visible to
//! other callers until the final engine attachment.

use std::sync::Arc;
use tracing::{debug, info};

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::error::ChatError;
use crate::extract::MIME_PDF;
use crate::index::{QueryEngine, VectorIndex};
use crate::loader;
use crate::models::{IngestReport, Upload};
use crate::session::SessionStore;

/// Ingest `uploads` into the session's index.
pub async fn ingest(
    config: &Config,
    store: &SessionStore,
    session_id: &str,
    uploads: &[Upload],
) -> Result<IngestReport, ChatError> {
    let session = store
        .get(session_id)
        .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))?;
    let provider = session.provider.clone();

    if uploads.is_empty() {
        return Err(ChatError::InvalidRequest(
            "upload batch contained no files".to_string(),
        ));
    }

    // All-or-nothing validation, before any I/O.
    for upload in uploads {
        match upload.content_type.as_deref() {
            None => {
                return Err(ChatError::InvalidRequest(
                    "file content type is required".to_string(),
                ))
            }
            Some(ct) if ct != MIME_PDF => {
                return Err(ChatError::UnsupportedContentType(ct.to_string()))
            }
            Some(_) => {}
        }
    }

    // Single-document policy: only the last upload in the batch is ingested.
    let upload = &uploads[uploads.len() - 1];
    let filename = sanitize_filename(upload.filename.as_deref().unwrap_or("upload.pdf"));

    let dir = tempfile::tempdir()
        .map_err(|e| ChatError::Internal(format!("failed to create transient storage: {}", e)))?;
    tokio::fs::write(dir.path().join(&filename), &upload.bytes)
        .await
        .map_err(|e| ChatError::Internal(format!("failed to write upload: {}", e)))?;

    // Parsing is CPU-bound (PDF extraction), keep it off the async workers.
    let dir_path = dir.path().to_path_buf();
    let documents = tokio::task::spawn_blocking(move || loader::load_from_directory(&dir_path))
        .await
        .map_err(|e| ChatError::Internal(format!("document loading task failed: {}", e)))??;

    if documents.is_empty() {
        return Err(ChatError::InvalidRequest(format!(
            "no parseable content in upload '{}'",
            filename
        )));
    }

    let mut chunks = Vec::new();
    for document in &documents {
        chunks.extend(chunk_text(
            &document.id,
            &document.text,
            config.chunking.chunk_tokens,
            config.chunking.overlap_tokens,
        ));
    }
    debug!(
        session = session_id,
        documents = documents.len(),
        chunks = chunks.len(),
        "chunked upload"
    );

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = provider.embed(&texts).await?;

    let index = VectorIndex::build(chunks, vectors)?;
    let chunk_count = index.len();
    let engine = QueryEngine::new(index, provider, config.retrieval.top_k);

    // The session could in principle have vanished since the lookup; surface
    // that rather than dropping the engine silently.
    store.attach_engine(session_id, Arc::new(engine))?;

    info!(
        session = session_id,
        file = %filename,
        chunks = chunk_count,
        "ingestion complete"
    );

    Ok(IngestReport {
        filename,
        documents: documents.len(),
        chunks: chunk_count,
    })
    // `dir` drops here: transient storage is gone on success and failure alike.
}

/// Strip any path components from a client-supplied filename.
fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim()
        .to_string();
    if base.is_empty() {
        "upload.pdf".to_string()
    } else {
        base
    }
}
