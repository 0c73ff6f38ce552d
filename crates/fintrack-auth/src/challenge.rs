//! Step-up (OTP) challenge issuance and verification.
//!
//! Each principal has at most one live challenge. Issuing a new one
//! overwrites the previous one in a single owner-keyed write, and a
//! matching code is consumed by an atomic delete, so a code can be
//! redeemed at most once even under concurrent requests.

use std::sync::Arc;

use chrono::{Duration, Utc};
use fintrack_core::models::challenge::{ChallengePurpose, CreateChallenge};
use fintrack_core::models::principal::Principal;
use fintrack_core::repository::ChallengeRepository;
use rand::Rng;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::error::{AuthError, ChallengeError};
use crate::mailer::{self, OutboundMailer};
use crate::token::hash_token;

/// Uniformly random 6-digit code, zero-padded.
pub fn generate_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:06}")
}

pub struct StepUpChallengeStore<C: ChallengeRepository> {
    repo: C,
    mailer: Arc<dyn OutboundMailer>,
    login_ttl: Duration,
    reset_ttl: Duration,
}

impl<C: ChallengeRepository> StepUpChallengeStore<C> {
    pub fn new(
        repo: C,
        mailer: Arc<dyn OutboundMailer>,
        config: &AuthConfig,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            repo,
            mailer,
            login_ttl: AuthConfig::lifetime(config.login_otp_lifetime_secs)?,
            reset_ttl: AuthConfig::lifetime(config.reset_otp_lifetime_secs)?,
        })
    }

    pub fn ttl(&self, purpose: ChallengePurpose) -> Duration {
        match purpose {
            ChallengePurpose::Login => self.login_ttl,
            ChallengePurpose::PasswordReset => self.reset_ttl,
        }
    }

    pub fn repository(&self) -> &C {
        &self.repo
    }

    /// Issue a fresh code for `principal`, superseding any live one, and
    /// mail it. Returns the plaintext code.
    pub async fn generate_for(
        &self,
        principal: &Principal,
        purpose: ChallengePurpose,
    ) -> Result<String, AuthError> {
        let code = generate_code();
        let challenge = self
            .repo
            .upsert_for_owner(CreateChallenge {
                owner_id: principal.id,
                code_hash: hash_token(&code),
                purpose,
                expires_at: Utc::now() + self.ttl(purpose),
            })
            .await?;

        mailer::log_failure(
            "otp",
            &principal.email,
            self.mailer.send_otp(&principal.email, &code),
        );

        info!(
            principal_id = %principal.id,
            challenge_id = %challenge.id,
            purpose = purpose.as_str(),
            "step-up challenge issued"
        );
        Ok(code)
    }

    /// Redeem `code` for `principal`.
    ///
    /// A match is deleted whether or not it has expired; an expired
    /// match reports [`ChallengeError::Expired`]. A code issued for a
    /// different purpose does not match.
    pub async fn verify(
        &self,
        principal: &Principal,
        code: &str,
        purpose: ChallengePurpose,
    ) -> Result<(), AuthError> {
        let taken = self
            .repo
            .take_matching(principal.id, &hash_token(code), purpose)
            .await?;

        let Some(challenge) = taken else {
            warn!(principal_id = %principal.id, purpose = purpose.as_str(), "invalid OTP");
            return Err(ChallengeError::InvalidCode.into());
        };

        if challenge.is_expired(Utc::now()) {
            warn!(principal_id = %principal.id, challenge_id = %challenge.id, "expired OTP");
            return Err(ChallengeError::Expired.into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..1000 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn codes_vary() {
        let codes: std::collections::HashSet<_> = (0..50).map(|_| generate_code()).collect();
        assert!(codes.len() > 1);
    }
}
