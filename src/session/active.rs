use crate::error::Result;
use crate::traits::session::{SessionData, SessionHandle, SessionStore};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

struct State {
    id: String,
    data: SessionData,
}

/// A client session loaded for the duration of one request.
///
/// Reads and writes go to the in-memory record; call
/// [`persist`](ActiveSession::persist) once the request is done to write it
/// back to the store.
pub struct ActiveSession {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
    state: Mutex<State>,
}

impl ActiveSession {
    /// Start a brand new, empty session.
    pub fn start(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            state: Mutex::new(State {
                id: new_session_id(),
                data: SessionData::new(ttl),
            }),
        }
    }

    /// Load the session for `session_id`.
    ///
    /// Unknown or expired ids start a fresh session under a newly issued id,
    /// so a client can never choose its own session id.
    pub async fn load(
        store: Arc<dyn SessionStore>,
        session_id: Option<&str>,
        ttl: Duration,
    ) -> Result<Self> {
        let existing = match session_id {
            Some(id) if !id.is_empty() => store.load(id).await?.map(|data| (id.to_string(), data)),
            _ => None,
        };

        match existing {
            Some((id, data)) => Ok(Self {
                store,
                ttl,
                state: Mutex::new(State { id, data }),
            }),
            None => Ok(Self::start(store, ttl)),
        }
    }

    /// Write the session back to the store, refreshing its expiry.
    pub async fn persist(&self) -> Result<()> {
        let (id, data) = {
            let mut state = self.lock();
            state.data.extend(self.ttl);
            (state.id.clone(), state.data.clone())
        };
        self.store.save(&id, data).await
    }

    /// Copy of the current record.
    pub fn snapshot(&self) -> SessionData {
        self.lock().data.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SessionHandle for ActiveSession {
    fn id(&self) -> String {
        self.lock().id.clone()
    }

    fn get(&self, key: &str) -> Option<String> {
        self.lock().data.get(key).cloned()
    }

    fn put(&self, key: &str, value: String) {
        self.lock().data.set(key.to_string(), value);
    }

    fn forget(&self, key: &str) {
        self.lock().data.remove(key);
    }

    fn has(&self, key: &str) -> bool {
        self.lock().data.contains(key)
    }

    async fn invalidate_and_regenerate(&self) -> Result<()> {
        let old_id = self.id();

        // Local state changes only once the old record is gone.
        self.store.delete(&old_id).await?;

        let new_id = new_session_id();
        {
            let mut state = self.lock();
            state.id = new_id.clone();
            state.data = SessionData::new(self.ttl);
        }

        tracing::debug!(
            target: "possession.session",
            old_session = %old_id,
            new_session = %new_id,
            "Session invalidated and regenerated"
        );

        Ok(())
    }
}

impl std::fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSession")
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}

fn new_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
