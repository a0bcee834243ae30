//! Session-based impersonation ("possession").
//!
//! Lets an authorized admin temporarily become another principal within
//! their own client session, then return to their own identity.
//!
//! # State
//!
//! A session is *possessing* exactly when it holds the original-principal
//! session key. There is no separate flag. The impersonated-realm key is
//! written and cleared together with it.
//!
//! # Rules
//!
//! - No nesting: `possess` is rejected while possessing.
//! - No self-impersonation: same kind and same id is the same identity.
//! - Every check runs before anything is mutated.
//! - The session is invalidated and regenerated on every transition, before
//!   the next principal is logged in.
//! - The admin's authorization is re-checked when leaving.
//!
//! # Example
//!
//! ```rust,ignore
//! use possession::{PossessionManager, RealmResolver, SessionGuard};
//!
//! let manager = Arc::new(PossessionManager::new(config, resolver));
//!
//! // Per request
//! let auth = manager.guard(session.clone());
//! let scope = manager.scope(session.as_ref(), &auth);
//!
//! scope.possess("user@example.com", None).await?;
//! assert!(scope.is_possessing());
//!
//! scope.unpossess().await?;
//! ```

use crate::auth::events::{PossessionEvent, PossessionListener};
use crate::auth::{RealmResolver, SessionGuard};
use crate::capability::Possessable;
use crate::config::PossessionConfig;
use crate::error::{PossessionError, Result};
use crate::principal::{Lookup, Principal, PrincipalId, PrincipalRef, Target, same_principal};
use crate::traits::{AuthContext, SessionHandle};
use std::sync::Arc;

/// Process-wide possession engine.
///
/// Build one at startup and share it (usually as `Arc<PossessionManager>`).
/// It holds no per-session state; bind it to a request's session and auth
/// context with [`scope`](PossessionManager::scope).
pub struct PossessionManager {
    config: PossessionConfig,
    resolver: Arc<RealmResolver>,
    listeners: Vec<Arc<dyn PossessionListener>>,
}

impl PossessionManager {
    #[must_use]
    pub fn new(config: PossessionConfig, resolver: RealmResolver) -> Self {
        Self {
            config,
            resolver: Arc::new(resolver),
            listeners: Vec::new(),
        }
    }

    /// Register a listener; listeners are notified in registration order.
    #[must_use]
    pub fn with_listener<L>(self, listener: L) -> Self
    where
        L: PossessionListener + 'static,
    {
        self.with_listener_arc(Arc::new(listener))
    }

    #[must_use]
    pub fn with_listener_arc(mut self, listener: Arc<dyn PossessionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    #[must_use]
    pub fn config(&self) -> &PossessionConfig {
        &self.config
    }

    #[must_use]
    pub fn resolver(&self) -> &Arc<RealmResolver> {
        &self.resolver
    }

    /// Session-backed auth context for `session`, using the configured default realm.
    pub fn guard(&self, session: Arc<dyn SessionHandle>) -> SessionGuard {
        SessionGuard::new(
            session,
            Arc::clone(&self.resolver),
            self.config.default_realm.clone(),
        )
    }

    /// Bind the engine to one request's collaborators.
    pub fn scope<'r>(
        &'r self,
        session: &'r dyn SessionHandle,
        auth: &'r dyn AuthContext,
    ) -> PossessionScope<'r> {
        PossessionScope {
            manager: self,
            session,
            auth,
        }
    }

    async fn dispatch(&self, event: PossessionEvent) {
        for listener in &self.listeners {
            if let Err(err) = listener.on_event(&event).await {
                tracing::warn!(
                    target: "possession.listener",
                    event = event.name(),
                    error = %err,
                    "Possession listener failed"
                );
            }
        }
    }

    /// Look up the recorded admin through the admin realm's candidate providers.
    ///
    /// Only a principal of the recorded `kind` matches, so an equal id from
    /// another identity space is never restored in its place.
    async fn find_admin(
        &self,
        id: &PrincipalId,
        kind: Option<&str>,
    ) -> Result<Option<PrincipalRef>> {
        let realm = &self.config.admin_realm;
        let candidates = self.resolver.candidates(realm);
        if candidates.is_empty() {
            return Err(PossessionError::config(format!(
                "No identity provider for admin realm '{realm}'"
            )));
        }

        for provider in candidates {
            if let Some(admin) = provider.find_by_id(id).await? {
                if kind.is_none_or(|k| k == admin.kind()) {
                    return Ok(Some(admin));
                }
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for PossessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PossessionManager")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// The possession engine bound to one client session.
pub struct PossessionScope<'r> {
    manager: &'r PossessionManager,
    session: &'r dyn SessionHandle,
    auth: &'r dyn AuthContext,
}

impl PossessionScope<'_> {
    fn config(&self) -> &PossessionConfig {
        &self.manager.config
    }

    /// Whether this session is currently possessing another principal.
    pub fn is_possessing(&self) -> bool {
        self.session
            .has(&self.config().session_keys.original_principal)
    }

    /// Realm the target was logged into; the default realm when unrecorded.
    pub fn impersonated_realm(&self) -> Option<String> {
        if !self.is_possessing() {
            return None;
        }
        Some(
            self.session
                .get(&self.config().session_keys.impersonated_realm)
                .unwrap_or_else(|| self.auth.default_realm().to_string()),
        )
    }

    /// The admin who started the current possession.
    ///
    /// `Ok(None)` when not possessing, and also when the recorded admin can
    /// no longer be found; the latter is only reported as an error by
    /// [`unpossess`](PossessionScope::unpossess).
    pub async fn original_principal(&self) -> Result<Option<PrincipalRef>> {
        let keys = &self.config().session_keys;
        let Some(id) = self.session.get(&keys.original_principal) else {
            return Ok(None);
        };
        let kind = self.session.get(&keys.original_kind());

        self.manager
            .find_admin(&PrincipalId::from(id), kind.as_deref())
            .await
    }

    /// Whether `principal` is the identity currently being possessed in this session.
    pub async fn is_possessed(&self, principal: &dyn Principal) -> Result<bool> {
        let Some(realm) = self.impersonated_realm() else {
            return Ok(false);
        };

        Ok(self
            .auth
            .user(&realm)
            .await?
            .is_some_and(|current| same_principal(current.as_ref(), principal)))
    }

    /// Start possessing `target`.
    ///
    /// `target` may be a resolved principal or a raw identifier (numeric id,
    /// email, or other id). The target is logged into `realm`, or the default
    /// realm when `None`. Returns the principal now logged in.
    pub async fn possess(
        &self,
        target: impl Into<Target>,
        realm: Option<&str>,
    ) -> Result<PrincipalRef> {
        let target = target.into();
        let config = self.config();
        let admin_realm = config.admin_realm.as_str();

        if self.is_possessing() {
            tracing::warn!(
                target: "possession.rejected",
                requested = %target.describe(),
                reason = "already_impersonating",
                "Possession rejected: session is already possessing"
            );
            return Err(PossessionError::AlreadyImpersonating);
        }

        let Some(admin) = self.auth.user(admin_realm).await? else {
            tracing::warn!(
                target: "possession.rejected",
                admin_realm = %admin_realm,
                reason = "not_authenticated",
                "Possession rejected: nobody is logged into the admin realm"
            );
            return Err(PossessionError::NotAuthenticated);
        };

        let target_realm = realm.unwrap_or(self.auth.default_realm()).to_string();
        let target = self.resolve_target(target, &target_realm).await?;

        if !admin.can_possess() {
            tracing::warn!(
                target: "possession.rejected",
                admin_id = %admin.id(),
                target_id = %target.id(),
                reason = "unauthorized",
                "Possession rejected: admin may not impersonate"
            );
            return Err(PossessionError::Unauthorized);
        }

        if !target.can_be_possessed() {
            tracing::warn!(
                target: "possession.rejected",
                admin_id = %admin.id(),
                target_id = %target.id(),
                reason = "target_protected",
                "Possession rejected: target may not be impersonated"
            );
            return Err(PossessionError::TargetProtected);
        }

        if same_principal(admin.as_ref(), target.as_ref()) {
            tracing::warn!(
                target: "possession.rejected",
                admin_id = %admin.id(),
                kind = %admin.kind(),
                reason = "self_impersonation",
                "Possession rejected: cannot impersonate self"
            );
            return Err(PossessionError::SelfImpersonation);
        }

        // All checks passed. Nothing has changed if regeneration fails.
        self.session.invalidate_and_regenerate().await?;
        self.auth.logout(admin_realm).await?;

        self.auth.login(&target_realm, &target).await?;

        let keys = &config.session_keys;
        self.session
            .put(&keys.original_principal, admin.id().to_string());
        self.session
            .put(&keys.original_kind(), admin.kind().to_string());
        self.session
            .put(&keys.impersonated_realm, target_realm.clone());

        tracing::info!(
            target: "possession.started",
            admin_id = %admin.id(),
            admin_kind = %admin.kind(),
            target_id = %target.id(),
            target_kind = %target.kind(),
            realm = %target_realm,
            "Possession started"
        );

        self.manager
            .dispatch(PossessionEvent::Started {
                admin,
                target: Arc::clone(&target),
            })
            .await;

        Ok(target)
    }

    /// Stop possessing and log the original admin back in.
    ///
    /// Returns the restored admin.
    pub async fn unpossess(&self) -> Result<PrincipalRef> {
        let config = self.config();
        let keys = &config.session_keys;
        let admin_realm = config.admin_realm.as_str();

        let Some(original_id) = self.session.get(&keys.original_principal) else {
            tracing::warn!(
                target: "possession.rejected",
                reason = "no_active_impersonation",
                "Unpossess rejected: session is not possessing"
            );
            return Err(PossessionError::NoActiveImpersonation);
        };
        let original_id = PrincipalId::from(original_id);
        let original_kind = self.session.get(&keys.original_kind());

        let realm = self
            .session
            .get(&keys.impersonated_realm)
            .unwrap_or_else(|| self.auth.default_realm().to_string());

        let Some(target) = self.auth.user(&realm).await? else {
            tracing::warn!(
                target: "possession.rejected",
                admin_id = %original_id,
                realm = %realm,
                reason = "no_active_impersonation",
                "Unpossess rejected: nobody is logged into the impersonated realm"
            );
            return Err(PossessionError::NoActiveImpersonation);
        };

        let Some(admin) = self
            .manager
            .find_admin(&original_id, original_kind.as_deref())
            .await?
        else {
            tracing::warn!(
                target: "possession.rejected",
                admin_id = %original_id,
                reason = "admin_not_found",
                "Unpossess rejected: original admin no longer exists"
            );
            return Err(PossessionError::AdminNotFound(original_id.to_string()));
        };

        if !admin.can_possess() {
            tracing::warn!(
                target: "possession.rejected",
                admin_id = %original_id,
                target_id = %target.id(),
                reason = "revoked_authorization",
                "Unpossess rejected: admin lost permission to possess"
            );
            return Err(PossessionError::RevokedAuthorization);
        }

        self.session.invalidate_and_regenerate().await?;
        self.auth.logout(&realm).await?;

        self.auth.login(admin_realm, &admin).await?;

        self.session.forget(&keys.original_principal);
        self.session.forget(&keys.original_kind());
        self.session.forget(&keys.impersonated_realm);

        tracing::info!(
            target: "possession.ended",
            admin_id = %admin.id(),
            target_id = %target.id(),
            target_kind = %target.kind(),
            realm = %realm,
            "Possession ended"
        );

        self.manager
            .dispatch(PossessionEvent::Ended {
                admin: Arc::clone(&admin),
                target,
            })
            .await;

        Ok(admin)
    }

    async fn resolve_target(&self, target: Target, realm: &str) -> Result<PrincipalRef> {
        let raw = match target {
            Target::Principal(principal) => return Ok(principal),
            Target::Identifier(raw) => raw,
        };

        let lookup = Lookup::parse(&raw);
        match self.manager.resolver.resolve(realm, &lookup).await? {
            Some(principal) => Ok(principal),
            None => {
                tracing::warn!(
                    target: "possession.rejected",
                    requested = %raw,
                    realm = %realm,
                    reason = "target_not_found",
                    "Possession rejected: target not found"
                );
                Err(PossessionError::TargetNotFound(raw))
            }
        }
    }
}
