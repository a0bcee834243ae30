#[cfg(feature = "http")]
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
#[cfg(feature = "http")]
use serde::Serialize;

/// Errors raised by possession operations and their collaborators.
///
/// The first nine variants are state or authorization decisions and are
/// never retried. `Backend` wraps a failure reported by a collaborator
/// (identity provider, session store, listener).
#[derive(Debug, thiserror::Error)]
pub enum PossessionError {
    #[error("Cannot impersonate while already impersonating")]
    AlreadyImpersonating,

    #[error("No authenticated user found")]
    NotAuthenticated,

    #[error("Target user not found: {0}")]
    TargetNotFound(String),

    #[error("Current user is not authorized to impersonate others")]
    Unauthorized,

    #[error("Target user cannot be possessed")]
    TargetProtected,

    #[error("Cannot impersonate yourself")]
    SelfImpersonation,

    #[error("No active impersonation session")]
    NoActiveImpersonation,

    #[error("Original admin user not found: {0}")]
    AdminNotFound(String),

    #[error("Original user no longer has permission to possess")]
    RevokedAuthorization,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PossessionError>;

impl PossessionError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Wrap a collaborator failure.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(anyhow::anyhow!("{err}"))
    }

    /// True for the rejections `possess` can produce.
    pub fn is_start_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyImpersonating
                | Self::NotAuthenticated
                | Self::TargetNotFound(_)
                | Self::Unauthorized
                | Self::TargetProtected
                | Self::SelfImpersonation
        )
    }

    /// True for the rejections `unpossess` can produce.
    pub fn is_stop_error(&self) -> bool {
        matches!(
            self,
            Self::NoActiveImpersonation | Self::AdminNotFound(_) | Self::RevokedAuthorization
        )
    }

    /// Stable machine-readable code for the error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyImpersonating => "already_impersonating",
            Self::NotAuthenticated => "not_authenticated",
            Self::TargetNotFound(_) => "target_not_found",
            Self::Unauthorized => "unauthorized",
            Self::TargetProtected => "target_protected",
            Self::SelfImpersonation => "self_impersonation",
            Self::NoActiveImpersonation => "no_active_impersonation",
            Self::AdminNotFound(_) => "admin_not_found",
            Self::RevokedAuthorization => "revoked_authorization",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
            Self::Backend(_) => "backend",
        }
    }

    #[cfg(feature = "http")]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::Unauthorized | Self::TargetProtected | Self::RevokedAuthorization => {
                StatusCode::FORBIDDEN
            }
            Self::TargetNotFound(_) | Self::AdminNotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyImpersonating | Self::NoActiveImpersonation => StatusCode::CONFLICT,
            Self::SelfImpersonation => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Internal(_) | Self::Backend(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message that is safe to show to clients.
    ///
    /// Server-side failures are replaced by a generic text; the full error is
    /// only written to the server log.
    fn safe_message(&self) -> String {
        match self {
            Self::Config(_) | Self::Internal(_) | Self::Backend(_) => {
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(feature = "http")]
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
    error_id: String,
}

#[cfg(feature = "http")]
impl IntoResponse for PossessionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                status = status.as_u16(),
                error_id = %error_id,
                error = %self,
                "Possession request failed"
            );
        } else {
            tracing::debug!(
                status = status.as_u16(),
                error_id = %error_id,
                code = self.code(),
                "Possession request rejected"
            );
        }

        let body = ErrorResponse {
            error: self.safe_message(),
            code: self.code(),
            error_id,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_and_stop_errors_are_disjoint() {
        let start = [
            PossessionError::AlreadyImpersonating,
            PossessionError::NotAuthenticated,
            PossessionError::TargetNotFound("9".into()),
            PossessionError::Unauthorized,
            PossessionError::TargetProtected,
            PossessionError::SelfImpersonation,
        ];
        for err in &start {
            assert!(err.is_start_error(), "{err:?}");
            assert!(!err.is_stop_error(), "{err:?}");
        }

        let stop = [
            PossessionError::NoActiveImpersonation,
            PossessionError::AdminNotFound("1".into()),
            PossessionError::RevokedAuthorization,
        ];
        for err in &stop {
            assert!(err.is_stop_error(), "{err:?}");
            assert!(!err.is_start_error(), "{err:?}");
        }
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            PossessionError::SelfImpersonation.to_string(),
            "Cannot impersonate yourself"
        );
        assert_eq!(
            PossessionError::RevokedAuthorization.to_string(),
            "Original user no longer has permission to possess"
        );
        assert_eq!(
            PossessionError::TargetNotFound("42".into()).to_string(),
            "Target user not found: 42"
        );
    }

    #[test]
    fn test_anyhow_error() {
        let err: PossessionError = anyhow::anyhow!("connection reset").into();
        assert!(matches!(err, PossessionError::Backend(_)));
        assert_eq!(err.code(), "backend");
        assert_eq!(err.safe_message(), "An internal error occurred");
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_status_codes() {
        assert_eq!(
            PossessionError::NotAuthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            PossessionError::TargetProtected.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            PossessionError::AdminNotFound("1".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PossessionError::AlreadyImpersonating.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            PossessionError::config("bad").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn test_into_response_hides_internal_details() {
        let response = PossessionError::internal("db password leaked").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "An internal error occurred");
        assert_eq!(body["code"], "internal");
        assert!(body["error_id"].is_string());
    }
}
