use crate::error::{PossessionError, Result};
use crate::session::{ActiveSession, SessionConfig};
use crate::traits::{SessionHandle, SessionStore};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use cookie::{Cookie, SameSite};
use std::sync::Arc;

/// Cookie-backed session middleware.
///
/// Loads the client's session (or starts a new one) before the handler runs
/// and makes it available as an `Extension<Arc<ActiveSession>>`. Once the
/// handler returns, the session is written back to the store and the cookie
/// is updated whenever the session id changed, including after a
/// regeneration.
///
/// # Example
///
/// ```rust,ignore
/// use axum::{Router, middleware::from_fn_with_state};
/// use possession::http::SessionLayer;
///
/// let sessions = SessionLayer::new(store, config.session.clone());
///
/// let app = Router::new()
///     .merge(routes.router())
///     .layer(from_fn_with_state(sessions, SessionLayer::middleware));
/// ```
#[derive(Clone)]
pub struct SessionLayer {
    store: Arc<dyn SessionStore>,
    config: Arc<SessionConfig>,
}

impl SessionLayer {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether the backing session store reports itself healthy.
    pub fn is_healthy(&self) -> bool {
        self.store.is_healthy()
    }

    /// Middleware function for `axum::middleware::from_fn_with_state`.
    pub async fn middleware(
        State(layer): State<SessionLayer>,
        mut request: Request,
        next: Next,
    ) -> Result<Response> {
        let incoming = session_cookie(request.headers(), &layer.config.cookie_name);

        let session = Arc::new(
            ActiveSession::load(
                Arc::clone(&layer.store),
                incoming.as_deref(),
                layer.config.ttl(),
            )
            .await?,
        );
        request.extensions_mut().insert(Arc::clone(&session));

        let mut response = next.run(request).await;

        session.persist().await?;

        let current = session.id();
        if incoming.as_deref() != Some(current.as_str()) {
            let cookie = layer.build_cookie(current);
            let value = HeaderValue::from_str(&cookie.to_string()).map_err(|e| {
                PossessionError::internal(format!("Invalid session cookie header: {e}"))
            })?;
            response.headers_mut().append(header::SET_COOKIE, value);
        }

        Ok(response)
    }

    /// Build the session cookie for `session_id` with all attributes set.
    pub fn build_cookie(&self, session_id: String) -> Cookie<'static> {
        let mut builder = Cookie::build((self.config.cookie_name.clone(), session_id))
            .path(self.config.cookie_path.clone())
            .http_only(self.config.cookie_http_only)
            .secure(self.config.cookie_secure)
            .same_site(SameSite::Lax)
            .max_age(cookie::time::Duration::seconds(
                i64::try_from(self.config.ttl_seconds).unwrap_or(i64::MAX),
            ));

        if let Some(domain) = &self.config.cookie_domain {
            builder = builder.domain(domain.clone());
        }

        builder.build()
    }
}

impl std::fmt::Debug for SessionLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLayer")
            .field("config", &self.config)
            .finish()
    }
}

/// Value of the cookie named `name` in the request's `Cookie` headers.
fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(|cookie| cookie.ok())
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; possession_session=abc123"),
        );

        assert_eq!(
            session_cookie(&headers, "possession_session").as_deref(),
            Some("abc123")
        );
        assert!(session_cookie(&headers, "other").is_none());
        assert!(session_cookie(&HeaderMap::new(), "possession_session").is_none());
    }

    struct OfflineStore;

    #[async_trait::async_trait]
    impl SessionStore for OfflineStore {
        async fn load(&self, _session_id: &str) -> Result<Option<crate::SessionData>> {
            Err(PossessionError::backend("store offline"))
        }

        async fn save(&self, _session_id: &str, _data: crate::SessionData) -> Result<()> {
            Err(PossessionError::backend("store offline"))
        }

        async fn delete(&self, _session_id: &str) -> Result<()> {
            Err(PossessionError::backend("store offline"))
        }

        async fn cleanup_expired(&self) -> Result<usize> {
            Ok(0)
        }

        fn is_healthy(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_reports_store_health() {
        let layer = SessionLayer::new(
            Arc::new(crate::session::InMemorySessionStore::new()),
            SessionConfig::default(),
        );
        assert!(layer.is_healthy());

        let layer = SessionLayer::new(Arc::new(OfflineStore), SessionConfig::default());
        assert!(!layer.is_healthy());
    }

    #[test]
    fn test_build_cookie_attributes() {
        let config = SessionConfig {
            cookie_domain: Some("example.com".to_string()),
            ..SessionConfig::default()
        };
        let layer = SessionLayer::new(
            Arc::new(crate::session::InMemorySessionStore::new()),
            config,
        );

        let cookie = layer.build_cookie("abc".to_string());
        assert_eq!(cookie.name(), "possession_session");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.domain(), Some("example.com"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }
}
