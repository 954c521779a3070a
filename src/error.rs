//! Client-visible error taxonomy.
//!
//! Every failure a caller can observe maps to one [`ChatError`] variant with
//! a stable machine-readable code and an HTTP status. Validation errors are
//! raised before any side-effecting I/O; backend failures are surfaced, never
//! swallowed.

use axum::http::StatusCode;

/// Errors surfaced by the session, ingestion, and query paths.
#[derive(Debug, Clone)]
pub enum ChatError {
    /// Backend configuration is missing or invalid (fatal at provider construction).
    Configuration(String),
    /// No provider registered under the requested name.
    UnknownProvider(String),
    /// The session identifier does not exist.
    SessionNotFound(String),
    /// The session has no query engine yet (ingestion not completed).
    EngineNotReady(String),
    /// An upload declared a content type outside the allow-list.
    UnsupportedContentType(String),
    /// The request was structurally invalid (empty batch, missing content type, bad multipart).
    InvalidRequest(String),
    /// The model backend could not be reached or failed mid-call.
    BackendUnavailable(String),
    /// Unexpected internal failure (extraction, I/O, index construction).
    Internal(String),
}

impl std::fmt::Display for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatError::Configuration(m) => write!(f, "configuration error: {}", m),
            ChatError::UnknownProvider(name) => {
                write!(f, "provider '{}' is not registered", name)
            }
            ChatError::SessionNotFound(id) => write!(f, "unknown session id: {}", id),
            ChatError::EngineNotReady(id) => {
                write!(f, "session {} has no indexed document yet", id)
            }
            ChatError::UnsupportedContentType(ct) => {
                write!(f, "unsupported file content type: {}. Supported: application/pdf", ct)
            }
            ChatError::InvalidRequest(m) => write!(f, "{}", m),
            ChatError::BackendUnavailable(m) => write!(f, "backend unavailable: {}", m),
            ChatError::Internal(m) => write!(f, "internal error: {}", m),
        }
    }
}

impl std::error::Error for ChatError {}

impl ChatError {
    /// Machine-readable error code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Configuration(_) => "configuration_error",
            ChatError::UnknownProvider(_) => "unknown_provider",
            ChatError::SessionNotFound(_) => "session_not_found",
            ChatError::EngineNotReady(_) => "engine_not_ready",
            ChatError::UnsupportedContentType(_) => "unsupported_content_type",
            ChatError::InvalidRequest(_) => "bad_request",
            ChatError::BackendUnavailable(_) => "backend_unavailable",
            ChatError::Internal(_) => "internal",
        }
    }

    /// HTTP status this error maps to.
    ///
    /// `SessionNotFound` is a 400 and `EngineNotReady` a 404: an unknown id is
    /// a malformed request, while a known-but-not-ready session is a missing
    /// resource (the index).
    pub fn status(&self) -> StatusCode {
        match self {
            ChatError::Configuration(_) | ChatError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ChatError::UnknownProvider(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ChatError::SessionNotFound(_)
            | ChatError::UnsupportedContentType(_)
            | ChatError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ChatError::EngineNotReady(_) => StatusCode::NOT_FOUND,
            ChatError::BackendUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ChatError::UnknownProvider("x".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ChatError::SessionNotFound("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ChatError::EngineNotReady("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ChatError::UnsupportedContentType("text/plain".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ChatError::BackendUnavailable("down".into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ChatError::EngineNotReady("s".into()).code(), "engine_not_ready");
        assert_eq!(ChatError::InvalidRequest("m".into()).code(), "bad_request");
    }

    #[test]
    fn display_names_the_offending_type() {
        let msg = ChatError::UnsupportedContentType("image/png".into()).to_string();
        assert!(msg.contains("image/png"));
    }
}
