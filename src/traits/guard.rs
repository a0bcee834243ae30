//! Authentication context trait
//!
//! Tracks the current principal of each realm ("guard") independently:
//! logging out of one realm never affects another.

use crate::error::Result;
use crate::principal::PrincipalRef;
use async_trait::async_trait;

/// Per-realm current-principal tracker for one client session.
#[async_trait]
pub trait AuthContext: Send + Sync {
    /// Realm used when the caller does not name one.
    fn default_realm(&self) -> &str;

    /// The principal currently logged into `realm`, if any.
    async fn user(&self, realm: &str) -> Result<Option<PrincipalRef>>;

    async fn login(&self, realm: &str, principal: &PrincipalRef) -> Result<()>;

    async fn logout(&self, realm: &str) -> Result<()>;

    /// Whether `realm` has a current principal.
    async fn check(&self, realm: &str) -> Result<bool> {
        Ok(self.user(realm).await?.is_some())
    }
}
