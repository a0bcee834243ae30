use crate::auth::PossessionManager;
use crate::error::Result;
use crate::principal::PrincipalRef;
use crate::session::ActiveSession;
use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use std::sync::Arc;

const FORBIDDEN_MESSAGE: &str = "This action is not allowed while impersonating.";
const ACCESS_DENIED_MESSAGE: &str = "Access denied during impersonation.";

/// Possession status of the current request, for handlers and templates.
///
/// Inserted by [`share_possession_state`]; extract with
/// `Extension<PossessionState>`.
#[derive(Debug, Clone, Default)]
pub struct PossessionState {
    pub is_possessing: bool,
    /// The admin behind the current possession, when one is active.
    pub original: Option<PrincipalRef>,
}

fn is_possessing(manager: &PossessionManager, session: &Arc<ActiveSession>) -> bool {
    let auth = manager.guard(session.clone());
    manager.scope(session.as_ref(), &auth).is_possessing()
}

/// Whether the client asked for a JSON response.
fn wants_json(headers: &HeaderMap) -> bool {
    let accepts_json = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("/json") || accept.contains("+json"));

    let is_ajax = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));

    accepts_json || is_ajax
}

/// Block the wrapped routes while the session is possessing.
///
/// JSON clients get a 403 with a message; everyone else is redirected to
/// `forbidden_redirect`.
///
/// ```rust,ignore
/// let billing = Router::new()
///     .route("/billing", post(update_billing))
///     .layer(from_fn_with_state(manager.clone(), forbid_during_possession));
/// ```
pub async fn forbid_during_possession(
    State(manager): State<Arc<PossessionManager>>,
    Extension(session): Extension<Arc<ActiveSession>>,
    request: Request,
    next: Next,
) -> Response {
    if !is_possessing(&manager, &session) {
        return next.run(request).await;
    }

    tracing::debug!(
        target: "possession.rejected",
        path = %request.uri().path(),
        reason = "forbidden_during_possession",
        "Request blocked while possessing"
    );

    if wants_json(request.headers()) {
        (
            StatusCode::FORBIDDEN,
            Json(json!({ "message": FORBIDDEN_MESSAGE })),
        )
            .into_response()
    } else {
        Redirect::to(&manager.config().forbidden_redirect).into_response()
    }
}

/// Reject the wrapped routes with a plain 403 while the session is possessing.
pub async fn ensure_not_possessing(
    State(manager): State<Arc<PossessionManager>>,
    Extension(session): Extension<Arc<ActiveSession>>,
    request: Request,
    next: Next,
) -> Response {
    if is_possessing(&manager, &session) {
        return (StatusCode::FORBIDDEN, ACCESS_DENIED_MESSAGE).into_response();
    }
    next.run(request).await
}

/// Insert a [`PossessionState`] into the request extensions.
pub async fn share_possession_state(
    State(manager): State<Arc<PossessionManager>>,
    Extension(session): Extension<Arc<ActiveSession>>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let auth = manager.guard(session.clone());
    let scope = manager.scope(session.as_ref(), &auth);

    let state = PossessionState {
        is_possessing: scope.is_possessing(),
        original: scope.original_principal().await?,
    };
    request.extensions_mut().insert(state);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_wants_json() {
        let mut headers = HeaderMap::new();
        assert!(!wants_json(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html"));
        assert!(!wants_json(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        assert!(wants_json(&headers));

        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.api+json"),
        );
        assert!(wants_json(&headers));

        let mut ajax = HeaderMap::new();
        ajax.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        assert!(wants_json(&ajax));
    }
}
