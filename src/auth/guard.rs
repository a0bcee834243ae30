use crate::auth::RealmResolver;
use crate::error::Result;
use crate::principal::{PrincipalId, PrincipalRef};
use crate::traits::{AuthContext, SessionHandle};
use async_trait::async_trait;
use std::sync::Arc;

const AUTH_KEY_PREFIX: &str = "auth.";

/// Session-backed authentication guard.
///
/// The current principal of realm `R` is the id stored under the session key
/// `auth.R` (with its kind under `auth.R.kind`), resolved through the
/// identity providers that serve `R`. Logins therefore live exactly as long
/// as the client session: invalidating the session logs out of every realm
/// at once.
pub struct SessionGuard {
    session: Arc<dyn SessionHandle>,
    resolver: Arc<RealmResolver>,
    default_realm: String,
}

impl SessionGuard {
    pub fn new(
        session: Arc<dyn SessionHandle>,
        resolver: Arc<RealmResolver>,
        default_realm: impl Into<String>,
    ) -> Self {
        Self {
            session,
            resolver,
            default_realm: default_realm.into(),
        }
    }

    /// Session key that holds the login for `realm`.
    pub fn session_key(realm: &str) -> String {
        format!("{AUTH_KEY_PREFIX}{realm}")
    }

    fn kind_key(realm: &str) -> String {
        format!("{AUTH_KEY_PREFIX}{realm}.kind")
    }

    /// Id logged into `realm`, without resolving it.
    pub fn id(&self, realm: &str) -> Option<PrincipalId> {
        self.session
            .get(&Self::session_key(realm))
            .map(PrincipalId::from)
    }
}

#[async_trait]
impl AuthContext for SessionGuard {
    fn default_realm(&self) -> &str {
        &self.default_realm
    }

    async fn user(&self, realm: &str) -> Result<Option<PrincipalRef>> {
        let Some(id) = self.id(realm) else {
            return Ok(None);
        };
        let kind = self.session.get(&Self::kind_key(realm));

        let candidates = self.resolver.candidates(realm);
        if candidates.is_empty() {
            tracing::warn!(
                target: "possession.guard",
                realm = %realm,
                "No identity provider for realm with an active login"
            );
            return Ok(None);
        }

        // Same order as target resolution, so a principal found through the
        // default provider can be read back. The recorded kind keeps an equal
        // id from another identity space from matching.
        for provider in candidates {
            if let Some(principal) = provider.find_by_id(&id).await? {
                if kind.as_deref().is_none_or(|k| k == principal.kind()) {
                    return Ok(Some(principal));
                }
            }
        }

        // A login whose principal has since disappeared counts as logged out.
        Ok(None)
    }

    async fn login(&self, realm: &str, principal: &PrincipalRef) -> Result<()> {
        self.session
            .put(&Self::session_key(realm), principal.id().to_string());
        self.session
            .put(&Self::kind_key(realm), principal.kind().to_string());
        Ok(())
    }

    async fn logout(&self, realm: &str) -> Result<()> {
        self.session.forget(&Self::session_key(realm));
        self.session.forget(&Self::kind_key(realm));
        Ok(())
    }
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("session", &self.session.id())
            .field("default_realm", &self.default_realm)
            .finish()
    }
}
