//! Test fixtures for principals and listeners.

use crate::auth::{PossessionEvent, PossessionListener};
use crate::capability::Possessable;
use crate::error::Result;
use crate::principal::{Principal, PrincipalId};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Helper functions for generating fake test data
pub mod fake {
    use super::*;

    /// Generate a fake email address
    pub fn email() -> String {
        format!("test-{}@example.com", Uuid::new_v4().simple())
    }

    /// Generate a fake non-numeric identifier
    pub fn identifier() -> String {
        format!("id_{}", &Uuid::new_v4().simple().to_string()[..8])
    }
}

/// Principal for tests.
///
/// Capabilities can be flipped after the principal has been handed to an
/// identity provider, which is how tests revoke an admin mid-possession.
#[derive(Debug)]
pub struct TestPrincipal {
    id: PrincipalId,
    kind: String,
    email: Option<String>,
    can_possess: AtomicBool,
    can_be_possessed: AtomicBool,
}

impl TestPrincipal {
    /// A regular principal: may be possessed, may not possess.
    pub fn new(id: u64, kind: &str) -> Self {
        Self {
            id: PrincipalId::from(id),
            kind: kind.to_string(),
            email: None,
            can_possess: AtomicBool::new(false),
            can_be_possessed: AtomicBool::new(true),
        }
    }

    /// A principal allowed to possess others.
    pub fn admin(id: u64, kind: &str) -> Self {
        Self::new(id, kind).with_can_possess(true)
    }

    /// A principal with a non-numeric id.
    pub fn with_id(id: impl Into<PrincipalId>, kind: &str) -> Self {
        Self {
            id: id.into(),
            ..Self::new(0, kind)
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Give the principal a generated email address.
    pub fn with_fake_email(self) -> Self {
        self.with_email(fake::email())
    }

    pub fn with_can_possess(self, allowed: bool) -> Self {
        self.set_can_possess(allowed);
        self
    }

    pub fn with_can_be_possessed(self, allowed: bool) -> Self {
        self.set_can_be_possessed(allowed);
        self
    }

    pub fn set_can_possess(&self, allowed: bool) {
        self.can_possess.store(allowed, Ordering::SeqCst);
    }

    pub fn set_can_be_possessed(&self, allowed: bool) {
        self.can_be_possessed.store(allowed, Ordering::SeqCst);
    }
}

impl Possessable for TestPrincipal {
    fn can_possess(&self) -> bool {
        self.can_possess.load(Ordering::SeqCst)
    }

    fn can_be_possessed(&self) -> bool {
        self.can_be_possessed.load(Ordering::SeqCst)
    }
}

impl Principal for TestPrincipal {
    fn id(&self) -> PrincipalId {
        self.id.clone()
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

/// Listener that keeps every event it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<PossessionEvent>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, oldest first.
    pub fn events(&self) -> Vec<PossessionEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Names of the events received so far.
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(PossessionEvent::name).collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl PossessionListener for RecordingListener {
    async fn on_event(&self, event: &PossessionEvent) -> Result<()> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}
