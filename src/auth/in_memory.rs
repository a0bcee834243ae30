use crate::error::Result;
use crate::principal::{Principal, PrincipalId, PrincipalRef};
use crate::traits::IdentityProvider;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// In-memory identity provider
///
/// Suitable for development and testing. Email lookups are case-insensitive.
#[derive(Clone, Default)]
pub struct InMemoryIdentityProvider {
    principals: Arc<RwLock<HashMap<PrincipalId, PrincipalRef>>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a principal, replacing any existing one with the same id.
    ///
    /// Returns the shared handle so callers can keep a typed reference.
    pub fn insert<P>(&self, principal: P) -> Arc<P>
    where
        P: Principal + 'static,
    {
        let principal = Arc::new(principal);
        self.insert_ref(principal.clone());
        principal
    }

    pub fn insert_ref(&self, principal: PrincipalRef) {
        self.principals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(principal.id(), principal);
    }

    /// Remove a principal; returns whether it existed.
    pub fn remove(&self, id: &PrincipalId) -> bool {
        self.principals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.principals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn find_by_id(&self, id: &PrincipalId) -> Result<Option<PrincipalRef>> {
        Ok(self
            .principals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<PrincipalRef>> {
        Ok(self
            .principals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|p| p.email().is_some_and(|e| e.eq_ignore_ascii_case(email)))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Possessable;
    use crate::principal::Lookup;
    use crate::testing::TestPrincipal;

    #[tokio::test]
    async fn test_find_by_id_and_email() {
        let provider = InMemoryIdentityProvider::new();
        provider.insert(TestPrincipal::new(2, "web").with_email("User@Example.com"));

        let by_id = provider
            .find_by_id(&PrincipalId::from(2u64))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id.kind(), "web");

        let by_email = provider
            .find(&Lookup::parse("user@example.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id(), PrincipalId::from(2u64));

        assert!(
            provider
                .find_by_email("nobody@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_insert_returns_live_handle() {
        let provider = InMemoryIdentityProvider::new();
        let admin = provider.insert(TestPrincipal::admin(1, "web"));

        admin.set_can_possess(false);

        let stored = provider
            .find_by_id(&PrincipalId::from(1u64))
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.can_possess());
    }

    #[tokio::test]
    async fn test_remove() {
        let provider = InMemoryIdentityProvider::new();
        provider.insert(TestPrincipal::new(1, "web"));
        assert_eq!(provider.len(), 1);

        assert!(provider.remove(&PrincipalId::from(1u64)));
        assert!(!provider.remove(&PrincipalId::from(1u64)));
        assert!(provider.is_empty());
    }
}
