//! Streaming query pipeline.
//!
//! Resolves a session, gates on engine readiness, and relays the engine's
//! answer fragments to the caller with a minimum inter-fragment interval.
//! A query never waits for a not-yet-ready session; it fails with
//! [`ChatError::EngineNotReady`] immediately, and it never mutates session
//! state.
//!
//! Pacing is a relay task feeding a bounded channel: pull a fragment, sleep
//! the interval, forward it. When the caller disconnects the receiver drops,
//! the next forward fails, and the relay stops pulling from the backend —
//! cancellation costs nothing beyond the fragment in flight. Memory stays
//! bounded regardless of answer length.

use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tracing::debug;

use crate::error::ChatError;
use crate::provider::{CompletionStream, STREAM_BUFFER};
use crate::session::SessionStore;

/// Resolve the session and start a streamed answer for `question`.
///
/// The returned stream is unpaced; wrap it with [`pace`] before handing it
/// to a consumer that renders incrementally.
pub async fn query(
    store: &SessionStore,
    session_id: &str,
    question: &str,
) -> Result<CompletionStream, ChatError> {
    let session = store
        .get(session_id)
        .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))?;

    let engine = session
        .engine
        .clone()
        .ok_or_else(|| ChatError::EngineNotReady(session_id.to_string()))?;

    debug!(session = session_id, "starting streamed query");
    engine.query(question).await
}

/// Impose a minimum interval between fragments of `upstream`.
///
/// Fragment order is preserved. An `Err` item is forwarded and closes the
/// stream; exhaustion of `upstream` closes it cleanly.
pub fn pace(mut upstream: CompletionStream, min_interval: Duration) -> CompletionStream {
    let (mut tx, rx) = mpsc::channel(STREAM_BUFFER);

    tokio::spawn(async move {
        while let Some(item) = upstream.next().await {
            tokio::time::sleep(min_interval).await;
            let is_err = item.is_err();
            if tx.send(item).await.is_err() {
                // Receiver dropped: caller disconnected. Dropping `upstream`
                // here stops the backend pull as well.
                return;
            }
            if is_err {
                return;
            }
        }
    });

    rx
}
