//! Password-reset link tokens.
//!
//! A principal has at most one outstanding link token. The raw token
//! only ever exists in the email; the store keeps its SHA-256 hash.

use std::sync::Arc;

use chrono::{Duration, Utc};
use fintrack_core::models::principal::Principal;
use fintrack_core::models::recovery::CreateRecoveryToken;
use fintrack_core::repository::{PrincipalRepository, RecoveryTokenRepository};
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::error::{AuthError, RecoveryError};
use crate::mailer::{self, OutboundMailer};
use crate::token::{generate_opaque_token, hash_token};

pub struct RecoveryTokenStore<T: RecoveryTokenRepository> {
    repo: T,
    mailer: Arc<dyn OutboundMailer>,
    ttl: Duration,
    config: AuthConfig,
}

impl<T: RecoveryTokenRepository> RecoveryTokenStore<T> {
    pub fn new(
        repo: T,
        mailer: Arc<dyn OutboundMailer>,
        config: AuthConfig,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            repo,
            mailer,
            ttl: AuthConfig::lifetime(config.reset_token_lifetime_secs)?,
            config,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn repository(&self) -> &T {
        &self.repo
    }

    /// Mint a reset token for `principal`, replacing any outstanding one,
    /// and mail the link. Returns the raw token.
    pub async fn request_reset(&self, principal: &Principal) -> Result<String, AuthError> {
        let token = generate_opaque_token();
        self.repo
            .upsert_for_owner(CreateRecoveryToken {
                owner_id: principal.id,
                token_hash: hash_token(&token),
                expires_at: Utc::now() + self.ttl(),
            })
            .await?;

        let link = self.config.password_reset_link(&token);
        mailer::log_failure(
            "password_reset",
            &principal.email,
            self.mailer.send_password_reset(&principal.email, &link),
        );

        info!(principal_id = %principal.id, "password reset token issued");
        Ok(token)
    }

    /// Consume `token` and store `new_password_hash` as the owner's
    /// credential.
    ///
    /// The token is removed before anything else happens, so it cannot
    /// be replayed even if the credential update fails.
    pub async fn confirm_reset<P: PrincipalRepository>(
        &self,
        principals: &P,
        token: &str,
        new_password_hash: String,
    ) -> Result<Principal, AuthError> {
        let Some(record) = self.repo.take_by_hash(&hash_token(token)).await? else {
            return Err(RecoveryError::InvalidToken.into());
        };

        if record.is_expired(Utc::now()) {
            warn!(principal_id = %record.owner_id, "expired password reset token");
            return Err(RecoveryError::Expired.into());
        }

        let mut principal = match principals.get_by_id(record.owner_id).await {
            Ok(p) => p,
            Err(e) if e.is_not_found() => return Err(RecoveryError::InvalidToken.into()),
            Err(e) => return Err(e.into()),
        };
        principal.password_hash = new_password_hash;
        let principal = principals.save(&principal).await?;

        info!(principal_id = %principal.id, "password reset via link");
        Ok(principal)
    }
}
