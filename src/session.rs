//! Process-wide session store.
//!
//! A session binds one caller to a chosen provider and, once ingestion
//! completes, to a query engine over their document. The store is the single
//! structure mutated by concurrent request tasks, so the map sits behind a
//! lock that is held only for the map operation itself — never across I/O.
//!
//! Sessions are retained for the life of the process; there is no eviction
//! or deletion API.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::error::ChatError;
use crate::index::QueryEngine;
use crate::provider::Provider;

/// One caller's interaction: a bound provider, and a query engine once a
/// document has been ingested. A session never reverts to engine-less;
/// re-ingestion replaces the engine.
#[derive(Clone)]
pub struct Session {
    pub id: String,
    pub provider: Arc<dyn Provider>,
    pub engine: Option<Arc<QueryEngine>>,
}

/// Shared, synchronized map of session id → session.
///
/// `Clone` hands out another handle to the same store. Reads proceed
/// concurrently; writes (creation, engine attachment) are serialized.
/// A read racing a write observes either the pre- or post-write session,
/// never a torn one.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh session bound to `provider` and return its
    /// identifier: 128 random bits, hex-encoded. Identifiers are never
    /// reused.
    pub fn create(&self, provider: Arc<dyn Provider>) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let session = Session {
            id: id.clone(),
            provider,
            engine: None,
        };
        let mut map = self.inner.write().expect("session store lock poisoned");
        map.insert(id.clone(), session);
        id
    }

    /// Snapshot of the session, if it exists. The clone is cheap: id string
    /// plus `Arc` handles.
    pub fn get(&self, id: &str) -> Option<Session> {
        let map = self.inner.read().expect("session store lock poisoned");
        map.get(id).cloned()
    }

    /// Attach (or replace) the query engine of an existing session.
    pub fn attach_engine(&self, id: &str, engine: Arc<QueryEngine>) -> Result<(), ChatError> {
        let mut map = self.inner.write().expect("session store lock poisoned");
        match map.get_mut(id) {
            Some(session) => {
                session.engine = Some(engine);
                Ok(())
            }
            None => Err(ChatError::SessionNotFound(id.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("session store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;

    fn mock() -> Arc<dyn Provider> {
        Arc::new(MockProvider::with_fragments(vec!["hi"]))
    }

    #[test]
    fn identifiers_are_unique() {
        let store = SessionStore::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(store.create(mock())));
        }
        assert_eq!(store.len(), 1000);
    }

    #[test]
    fn identifiers_are_hex_128_bit() {
        let store = SessionStore::new();
        let id = store.create(mock());
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn read_after_write() {
        let store = SessionStore::new();
        let id = store.create(mock());
        let session = store.get(&id).unwrap();
        assert_eq!(session.id, id);
        assert_eq!(session.provider.name(), "Mock");
        assert!(session.engine.is_none());
    }

    #[test]
    fn get_unknown_is_none() {
        let store = SessionStore::new();
        store.create(mock());
        assert!(store.get("deadbeef").is_none());
    }

    #[test]
    fn attach_engine_to_unknown_session_fails() {
        use crate::index::{QueryEngine, VectorIndex};
        use crate::models::Chunk;

        let store = SessionStore::new();
        let index = VectorIndex::build(
            vec![Chunk {
                id: "c".into(),
                document_id: "d".into(),
                chunk_index: 0,
                text: "t".into(),
                hash: "h".into(),
            }],
            vec![vec![1.0, 0.0]],
        )
        .unwrap();
        let engine = Arc::new(QueryEngine::new(index, mock(), 1));
        let err = store.attach_engine("missing", engine).unwrap_err();
        assert!(matches!(err, ChatError::SessionNotFound(_)));
    }

    #[test]
    fn concurrent_creation_loses_no_entries() {
        let store = SessionStore::new();
        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || store.create(mock())));
        }
        let ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(store.len(), 32);
        for id in ids {
            let session = store.get(&id).unwrap();
            assert_eq!(session.provider.name(), "Mock");
        }
    }
}
