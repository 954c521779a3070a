//! # docq
//!
//! A document question-answering server with streamed answers over local
//! LLM backends.
//!
//! docq lets a caller pick a model backend, upload a PDF, and then ask
//! questions answered by retrieval over that document. Answers are streamed
//! back as incremental text fragments (SSE), paced so that downstream
//! renderers are never flooded.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌────────────┐   ┌─────────────┐
//! │  HTTP     │──▶│ Sessions  │──▶│ Ingestion   │──▶│ VectorIndex  │
//! │ (axum)    │   │  store    │   │ chunk+embed │   │ QueryEngine  │
//! └────┬─────┘   └───────────┘   └────────────┘   └──────┬──────┘
//!      │                                                  │
//!      └────────────── SSE fragment stream ◀──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docq serve                              # start the HTTP server
//! docq ask "Who is Nelson Mandela?"       # one-shot streamed completion
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with env-var overrides |
//! | [`error`] | Client-visible error taxonomy |
//! | [`models`] | Core data types |
//! | [`provider`] | Model backend abstraction (chat + embeddings) |
//! | [`registry`] | Name-keyed provider factory |
//! | [`session`] | Concurrent session store |
//! | [`extract`] | PDF text extraction |
//! | [`loader`] | Directory document loading |
//! | [`chunk`] | Text chunking |
//! | [`index`] | In-memory vector index and query engine |
//! | [`ingest`] | Upload validation and index construction |
//! | [`pipeline`] | Paced, cancellable answer streaming |
//! | [`server`] | HTTP server |

pub mod chunk;
pub mod config;
pub mod error;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod provider;
pub mod registry;
pub mod server;
pub mod session;
