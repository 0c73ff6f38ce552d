//! HTTP mapping of auth failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fintrack_auth::error::AuthError;
use fintrack_auth::gate::GateRejection;
use tracing::error;

/// Error returned by handlers and the authentication middleware.
///
/// Bodies are short human-readable strings.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg).into_response(),
            Self::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if err.is_client_error() {
            Self::BadRequest(err.to_string())
        } else {
            error!(error = %err, "request failed");
            Self::Internal
        }
    }
}

impl From<GateRejection> for ApiError {
    fn from(rejection: GateRejection) -> Self {
        match rejection {
            GateRejection::Repository(e) => {
                error!(error = %e, "authentication lookup failed");
                Self::Internal
            }
            r if r.is_unauthorized() => Self::Unauthorized(r.to_string()),
            r @ GateRejection::StepUpRequired => Self::Forbidden(r.to_string()),
            _ => Self::Forbidden("Invalid or malformed JWT token".into()),
        }
    }
}
