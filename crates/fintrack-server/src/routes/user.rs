use axum::Json;
use fintrack_core::models::identity::AuthenticatedIdentity;

use crate::middleware::CurrentIdentity;

/// `GET /api/user/me`
pub(super) async fn me(CurrentIdentity(identity): CurrentIdentity) -> Json<AuthenticatedIdentity> {
    Json(identity)
}
