//! Authentication middleware and the identity extractor.

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use fintrack_core::models::identity::AuthenticatedIdentity;

use crate::error::ApiError;
use crate::state::AppState;

/// Run the authentication gate for every request.
///
/// Requests without a bearer token pass through unauthenticated. A
/// revoked token is rejected with 401, any other bad token with 403.
/// On success the caller's [`AuthenticatedIdentity`] is placed in the
/// request extensions unless one is already there.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorization = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);

    let mut identity = req.extensions_mut().remove::<AuthenticatedIdentity>();
    state
        .gate
        .bind(&mut identity, authorization.as_deref())
        .await?;
    if let Some(identity) = identity {
        req.extensions_mut().insert(identity);
    }

    Ok(next.run(req).await)
}

/// The authenticated caller of a protected route.
///
/// Rejects with 401 when the gate bound no identity, and with 403 when
/// the identity holds a provisional token while step-up is required.
pub struct CurrentIdentity(pub AuthenticatedIdentity);

#[async_trait]
impl FromRequestParts<AppState> for CurrentIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = parts
            .extensions
            .get::<AuthenticatedIdentity>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;
        state.gate.admit(&identity)?;
        Ok(Self(identity))
    }
}
