//! HTTP server.
//!
//! Exposes the session/provider orchestration over a JSON API with SSE
//! streaming for answers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/v1/healthcheck` | Health check (status + version) |
//! | `POST` | `/api/v1/provider` | Choose a backend, get a session id |
//! | `POST` | `/api/v1/files/{session_id}` | Upload document(s) for the session |
//! | `POST` | `/api/v1/chat` | Ask a question, answer streamed as SSE |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "session_not_found", "message": "unknown session id: ..." } }
//! ```
//!
//! Codes and statuses come from [`ChatError`]: `unknown_provider` (422),
//! `session_not_found` (400), `engine_not_ready` (404),
//! `unsupported_content_type` (400), `bad_request` (400),
//! `backend_unavailable` (502), `configuration_error`/`internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! chat frontends.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    response::sse::{Event, KeepAlive, KeepAliveStream, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::ChatError;
use crate::ingest;
use crate::models::Upload;
use crate::pipeline;
use crate::registry::ProviderRegistry;
use crate::session::SessionStore;

/// Upper bound on request bodies; uploaded PDFs are routinely larger than
/// axum's 2 MB default.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ProviderRegistry>,
    pub sessions: SessionStore,
}

/// Build the application router around explicit state. Split out from
/// [`run_server`] so tests can drive the full HTTP surface with their own
/// registry and store.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/healthcheck", get(handle_healthcheck))
        .route("/provider", post(handle_choose_provider))
        .route("/files/{session_id}", post(handle_upload_files))
        .route("/chat", post(handle_chat))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    Router::new().nest("/api/v1", api).layer(cors).with_state(state)
}

/// Start the HTTP server with the built-in provider registry and a fresh
/// session store. Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState {
        config: Arc::new(config.clone()),
        registry: Arc::new(ProviderRegistry::with_builtins()),
        sessions: SessionStore::new(),
    };

    let router = app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(bind = %bind_addr, "docq listening");
    axum::serve(listener, router).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g. `"session_not_found"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

// ============ GET /api/v1/healthcheck ============

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    version: String,
}

async fn handle_healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/v1/provider ============

#[derive(Deserialize)]
struct ProviderRequest {
    /// Backend identifier, e.g. `"Ollama"`.
    name: String,
}

#[derive(Serialize)]
struct SessionResponse {
    id: String,
    status: String,
}

/// Construct the requested provider and allocate a session bound to it.
async fn handle_choose_provider(
    State(state): State<AppState>,
    Json(req): Json<ProviderRequest>,
) -> Result<Json<SessionResponse>, ChatError> {
    let provider = state.registry.create(&req.name, &state.config)?;
    let name = provider.name().to_string();
    let id = state.sessions.create(provider);

    info!(session = %id, provider = %name, "session created");
    Ok(Json(SessionResponse {
        id,
        status: format!("session created with provider {}", name),
    }))
}

// ============ POST /api/v1/files/{session_id} ============

/// Collect the multipart upload batch and hand it to the ingestion
/// orchestrator.
async fn handle_upload_files(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<SessionResponse>, ChatError> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ChatError::InvalidRequest(format!("malformed multipart body: {}", e)))?
    {
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ChatError::InvalidRequest(format!("failed to read upload: {}", e)))?
            .to_vec();
        uploads.push(Upload {
            filename,
            content_type,
            bytes,
        });
    }

    let report = ingest::ingest(&state.config, &state.sessions, &session_id, &uploads)
        .await
        .inspect_err(|e| warn!(session = %session_id, error = %e, "ingestion failed"))?;

    Ok(Json(SessionResponse {
        id: session_id,
        status: format!(
            "ingested {} chunks from {}",
            report.chunks, report.filename
        ),
    }))
}

// ============ POST /api/v1/chat ============

#[derive(Deserialize)]
struct ChatRequest {
    /// Session identifier returned by `POST /provider`.
    id: String,
    /// Question text.
    query: String,
}

/// Stream the answer as `text/event-stream`, one fragment per event.
/// A mid-stream backend failure terminates the stream abnormally instead of
/// emitting a malformed fragment.
async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Sse<KeepAliveStream<BoxStream<'static, Result<Event, ChatError>>>>, ChatError> {
    let stream = pipeline::query(&state.sessions, &req.id, &req.query)
        .await
        .inspect_err(|e| warn!(session = %req.id, error = %e, "chat rejected"))?;

    let paced = pipeline::pace(stream, Duration::from_millis(state.config.server.pace_ms));
    let session_id = req.id.clone();

    let events = paced
        .map(move |item| match item {
            Ok(fragment) => Ok(Event::default().data(fragment)),
            Err(e) => {
                warn!(session = %session_id, error = %e, "answer stream aborted");
                Err(e)
            }
        })
        .boxed();

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
