//! Request-scoped identity bound by the authentication gate.

use serde::Serialize;
use uuid::Uuid;

use super::principal::Principal;

/// Stateless capability view of an authenticated caller.
///
/// Unlike [`Principal`] it holds no credentials and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedIdentity {
    pub principal_id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
    /// Whether the presented token was issued after a completed OTP
    /// step-up.
    pub step_up: bool,
}

impl AuthenticatedIdentity {
    pub fn from_principal(principal: &Principal, step_up: bool) -> Self {
        Self {
            principal_id: principal.id,
            email: principal.email.clone(),
            roles: principal.roles.clone(),
            step_up,
        }
    }
}
