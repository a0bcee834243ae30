//! Session storage traits
//!
//! [`SessionStore`] is the backend that persists session records by id.
//! [`SessionHandle`] is the view of one client session that the possession
//! engine reads and writes during a request.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

/// Session data stored in the session store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    /// Session data as key-value pairs
    pub data: HashMap<String, String>,

    /// When the session was created
    pub created_at: SystemTime,

    /// When the session expires
    pub expires_at: SystemTime,
}

impl SessionData {
    /// Create a new session with expiration
    pub fn new(ttl: Duration) -> Self {
        let now = SystemTime::now();
        Self {
            data: HashMap::new(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        SystemTime::now() > self.expires_at
    }

    /// Get a value from the session
    pub fn get(&self, key: &str) -> Option<&String> {
        self.data.get(key)
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Set a value in the session
    pub fn set(&mut self, key: String, value: String) {
        self.data.insert(key, value);
    }

    /// Remove a value from the session
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.data.remove(key)
    }

    /// Extend the session expiration
    pub fn extend(&mut self, ttl: Duration) {
        self.expires_at = SystemTime::now() + ttl;
    }
}

/// Session storage backend
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load session data by session ID
    ///
    /// Returns `Ok(None)` if the session doesn't exist or has expired.
    async fn load(&self, session_id: &str) -> Result<Option<SessionData>>;

    /// Save session data with a session ID
    async fn save(&self, session_id: &str, data: SessionData) -> Result<()>;

    /// Delete a session
    async fn delete(&self, session_id: &str) -> Result<()>;

    /// Clean up expired sessions
    async fn cleanup_expired(&self) -> Result<usize>;

    /// Check if the session store is healthy
    fn is_healthy(&self) -> bool;
}

/// Key-value view of a single client session.
///
/// Reads and writes operate on the record loaded for the current request.
/// [`invalidate_and_regenerate`](SessionHandle::invalidate_and_regenerate)
/// is all-or-nothing: either the old record is destroyed, every key is
/// cleared and a fresh id is issued, or an error is returned and the session
/// is left untouched.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// Current session identifier.
    fn id(&self) -> String;

    fn get(&self, key: &str) -> Option<String>;

    fn put(&self, key: &str, value: String);

    fn forget(&self, key: &str);

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Destroy the current session and start a fresh, empty one under a new id.
    async fn invalidate_and_regenerate(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_data_accessors() {
        let mut data = SessionData::new(Duration::from_secs(60));
        assert!(!data.contains("k"));

        data.set("k".to_string(), "v".to_string());
        assert!(data.contains("k"));
        assert_eq!(data.get("k"), Some(&"v".to_string()));

        assert_eq!(data.remove("k"), Some("v".to_string()));
        assert!(!data.contains("k"));
        assert!(!data.is_expired());
    }

    #[test]
    fn test_session_data_expiry() {
        let mut data = SessionData::new(Duration::from_secs(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(data.is_expired());

        data.extend(Duration::from_secs(60));
        assert!(!data.is_expired());
    }
}
