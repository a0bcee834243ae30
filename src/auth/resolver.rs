//! Realm-to-identity-provider mapping.
//!
//! Each realm may register its own [`IdentityProvider`]. A default provider
//! covers realms that have none, and is also the fallback when a target
//! cannot be found in its own realm's provider. This is what lets an admin
//! logged into one realm impersonate a principal that lives in a
//! structurally different identity store.

use crate::error::Result;
use crate::principal::{Lookup, PrincipalRef};
use crate::traits::IdentityProvider;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Explicit realm name to identity provider mapping, configured at startup.
#[derive(Clone, Default)]
pub struct RealmResolver {
    providers: HashMap<String, Arc<dyn IdentityProvider>>,
    default_provider: Option<Arc<dyn IdentityProvider>>,
}

impl RealmResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the identity provider for `realm`.
    pub fn with_realm<P>(self, realm: impl Into<String>, provider: P) -> Self
    where
        P: IdentityProvider + 'static,
    {
        self.with_realm_arc(realm, Arc::new(provider))
    }

    /// Register an already shared identity provider for `realm`.
    pub fn with_realm_arc(
        mut self,
        realm: impl Into<String>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        self.providers.insert(realm.into(), provider);
        self
    }

    /// Set the provider used for realms without their own provider.
    pub fn with_default_provider<P>(self, provider: P) -> Self
    where
        P: IdentityProvider + 'static,
    {
        self.with_default_provider_arc(Arc::new(provider))
    }

    pub fn with_default_provider_arc(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.default_provider = Some(provider);
        self
    }

    /// Whether `realm` has its own provider.
    pub fn has_realm(&self, realm: &str) -> bool {
        self.providers.contains_key(realm)
    }

    /// Names of realms with their own provider, sorted.
    pub fn realms(&self) -> Vec<&str> {
        let mut realms: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        realms.sort_unstable();
        realms
    }

    /// The provider that owns `realm`: its own, else the default provider.
    pub fn provider_for(&self, realm: &str) -> Option<&Arc<dyn IdentityProvider>> {
        self.providers
            .get(realm)
            .or(self.default_provider.as_ref())
    }

    /// Providers to ask for `realm`, in order: its own, then the default.
    pub fn candidates(&self, realm: &str) -> Vec<&Arc<dyn IdentityProvider>> {
        let mut candidates = Vec::with_capacity(2);
        if let Some(own) = self.providers.get(realm) {
            candidates.push(own);
        }
        if let Some(fallback) = &self.default_provider {
            // The realm's provider may be the default one; ask it only once.
            if !candidates.iter().any(|p| Arc::ptr_eq(p, fallback)) {
                candidates.push(fallback);
            }
        }
        candidates
    }

    /// Resolve a target identifier for `realm`.
    ///
    /// Tries the realm's own provider first. If the realm has no provider,
    /// or its provider does not know the identifier, the default provider is
    /// asked. Backend errors are returned as-is and do not trigger the
    /// fallback.
    ///
    /// Returns `Ok(None)` when neither provider knows the identifier, or when
    /// no provider is configured at all.
    pub async fn resolve(&self, realm: &str, lookup: &Lookup) -> Result<Option<PrincipalRef>> {
        for (attempt, provider) in self.candidates(realm).into_iter().enumerate() {
            if attempt > 0 {
                tracing::debug!(
                    target: "possession.resolver",
                    realm = %realm,
                    lookup = %lookup,
                    "Falling back to default identity provider"
                );
            }
            if let Some(principal) = provider.find(lookup).await? {
                return Ok(Some(principal));
            }
        }
        Ok(None)
    }
}

impl fmt::Debug for RealmResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealmResolver")
            .field("realms", &self.realms())
            .field("has_default_provider", &self.default_provider.is_some())
            .finish()
    }
}
