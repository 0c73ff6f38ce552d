//! Step-up (OTP) challenge domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a challenge authorizes once verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengePurpose {
    /// Second factor after a successful password check.
    Login,
    /// "Forgot password" reset by emailed code.
    PasswordReset,
}

impl ChallengePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::PasswordReset => "PasswordReset",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Login" => Some(Self::Login),
            "PasswordReset" => Some(Self::PasswordReset),
            _ => None,
        }
    }
}

/// The single active OTP challenge of a principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepUpChallenge {
    pub id: Uuid,
    pub owner_id: Uuid,
    /// SHA-256 hex digest of the 6-digit code.
    pub code_hash: String,
    pub purpose: ChallengePurpose,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl StepUpChallenge {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChallenge {
    pub owner_id: Uuid,
    pub code_hash: String,
    pub purpose: ChallengePurpose,
    pub expires_at: DateTime<Utc>,
}
