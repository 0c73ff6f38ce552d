//! Principal (user account) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Currency assigned to new accounts.
pub const DEFAULT_CURRENCY: &str = "USD";

/// A registered account as persisted by the principal repository.
///
/// Security-relevant views of a principal are derived from this type
/// (see [`AuthenticatedIdentity`](super::identity::AuthenticatedIdentity));
/// it carries no authentication behaviour itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub email_verified: bool,
    /// SHA-256 hex digest of the outstanding email verification token.
    pub verification_token_hash: Option<String>,
    pub verification_expires_at: Option<DateTime<Utc>>,
    /// Role names, e.g. `ROLE_USER`.
    pub roles: Vec<String>,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    /// Whether the outstanding verification token has passed its expiry.
    ///
    /// A principal without an expiry recorded is treated as not expired.
    pub fn verification_expired(&self, now: DateTime<Utc>) -> bool {
        self.verification_expires_at
            .is_some_and(|expires_at| expires_at <= now)
    }

    /// Flip to verified and drop the one-shot verification token.
    pub fn mark_email_verified(&mut self) {
        self.email_verified = true;
        self.clear_verification_token();
    }

    pub fn clear_verification_token(&mut self) {
        self.verification_token_hash = None;
        self.verification_expires_at = None;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrincipal {
    pub name: String,
    pub email: String,
    /// Already-hashed password; repositories never hash.
    pub password_hash: String,
    pub roles: Vec<String>,
    pub verification_token_hash: Option<String>,
    pub verification_expires_at: Option<DateTime<Utc>>,
}
