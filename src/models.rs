//! Core data types flowing through the ingestion and query pipeline.

use std::path::PathBuf;

/// A parsed document produced by the loader before chunking.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub path: PathBuf,
    pub text: String,
}

/// A chunk of a document's body text, the unit of retrieval.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// One file from a multipart upload request. Ephemeral: lives only for the
/// duration of a single ingestion call.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Summary of a completed ingestion, reported back to the caller.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub filename: String,
    pub documents: usize,
    pub chunks: usize,
}
