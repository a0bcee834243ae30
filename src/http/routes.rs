use crate::auth::PossessionManager;
use crate::error::PossessionError;
use crate::session::ActiveSession;
use axum::{
    Extension, Form, Json, Router,
    extract::{FromRequest, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::post,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Mountable possession endpoints.
///
/// - `POST /{prefix}/possess` with `user` (id or email) and optional `realm`,
///   sent as JSON or as a form
/// - `POST /{prefix}/leave`
///
/// Both redirect (303) on success. Requires [`SessionLayer`](super::SessionLayer)
/// further out in the middleware stack.
///
/// # Example
///
/// ```rust,ignore
/// let routes = PossessionRoutes::new(manager.clone());
/// let app = Router::new().merge(routes.router());
/// ```
#[derive(Clone, Debug)]
pub struct PossessionRoutes {
    manager: Arc<PossessionManager>,
}

impl PossessionRoutes {
    pub fn new(manager: Arc<PossessionManager>) -> Self {
        Self { manager }
    }

    /// Router with state applied; empty when routes are disabled.
    pub fn router(&self) -> Router {
        let routes = &self.manager.config().routes;
        if !routes.enabled {
            return Router::new();
        }

        let prefix = routes.prefix.as_str();
        Router::new()
            .route(&format!("/{prefix}/possess"), post(possess))
            .route(&format!("/{prefix}/leave"), post(leave))
            .with_state(Arc::clone(&self.manager))
    }
}

/// Body of `POST /{prefix}/possess`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PossessRequest {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub realm: Option<String>,
}

/// Validated possess request: `user` is present and non-empty.
#[derive(Debug)]
struct PossessInput {
    user: String,
    realm: Option<String>,
}

impl<S> FromRequest<S> for PossessInput
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let body = if is_json {
            Json::<PossessRequest>::from_request(req, state)
                .await
                .map(|Json(body)| body)
                .map_err(|e| unprocessable(&e.body_text()))?
        } else {
            Form::<PossessRequest>::from_request(req, state)
                .await
                .map(|Form(body)| body)
                .map_err(|e| unprocessable(&e.body_text()))?
        };

        let user = body
            .user
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| unprocessable("The user field is required."))?;

        let realm = body
            .realm
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        Ok(Self { user, realm })
    }
}

fn unprocessable(message: &str) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": message, "code": "validation" })),
    )
        .into_response()
}

async fn possess(
    State(manager): State<Arc<PossessionManager>>,
    Extension(session): Extension<Arc<ActiveSession>>,
    input: PossessInput,
) -> Result<Redirect, PossessionError> {
    let auth = manager.guard(session.clone());
    manager
        .scope(session.as_ref(), &auth)
        .possess(input.user, input.realm.as_deref())
        .await?;

    Ok(Redirect::to(&manager.config().redirect_after_possess))
}

async fn leave(
    State(manager): State<Arc<PossessionManager>>,
    Extension(session): Extension<Arc<ActiveSession>>,
) -> Result<Redirect, PossessionError> {
    let auth = manager.guard(session.clone());
    manager.scope(session.as_ref(), &auth).unpossess().await?;

    Ok(Redirect::to(&manager.config().redirect_after_unpossess))
}
