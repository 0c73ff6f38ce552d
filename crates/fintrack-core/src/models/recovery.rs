//! Password-reset recovery token domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An outstanding password-reset link token. Only the hash is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryToken {
    pub owner_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RecoveryToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecoveryToken {
    pub owner_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}
