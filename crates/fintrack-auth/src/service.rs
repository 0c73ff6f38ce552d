//! Session orchestration: signup, email verification, login with OTP
//! step-up, logout and both password-recovery paths.

use std::sync::Arc;

use chrono::{Duration, Utc};
use fintrack_core::error::FintrackError;
use fintrack_core::models::challenge::ChallengePurpose;
use fintrack_core::models::principal::{CreatePrincipal, Principal};
use fintrack_core::models::role::ROLE_USER;
use fintrack_core::repository::{
    ChallengeRepository, PrincipalRepository, RecoveryTokenRepository, RevocationRegistry,
    RoleRepository,
};
use tracing::{info, warn};

use crate::challenge::StepUpChallengeStore;
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthenticationError, ChallengeError, RecoveryError, TokenError};
use crate::gate::AuthenticationGate;
use crate::mailer::{self, OutboundMailer};
use crate::password;
use crate::recovery::RecoveryTokenStore;
use crate::token::{self, TokenCodec};

/// Input for account registration.
#[derive(Debug)]
pub struct SignupInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Token handed out by login and OTP verification.
#[derive(Debug)]
pub struct LoginOutput {
    /// Signed bearer token.
    pub token: String,
    pub roles: Vec<String>,
    /// `false` for the provisional token issued at the password step,
    /// `true` once an OTP has been redeemed.
    pub verified: bool,
}

/// Input for the "forgot password" OTP flow.
#[derive(Debug)]
pub struct OtpPasswordResetInput {
    pub email: String,
    pub otp: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Session service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct SessionService<P, R, C, T, V>
where
    P: PrincipalRepository,
    R: RoleRepository,
    C: ChallengeRepository,
    T: RecoveryTokenRepository,
    V: RevocationRegistry,
{
    principals: P,
    roles: R,
    challenges: StepUpChallengeStore<C>,
    recovery: RecoveryTokenStore<T>,
    revocations: V,
    codec: TokenCodec,
    mailer: Arc<dyn OutboundMailer>,
    verification_ttl: Duration,
    config: AuthConfig,
}

impl<P, R, C, T, V> SessionService<P, R, C, T, V>
where
    P: PrincipalRepository,
    R: RoleRepository,
    C: ChallengeRepository,
    T: RecoveryTokenRepository,
    V: RevocationRegistry,
{
    /// Fails when the signing secret is unusable or a configured
    /// lifetime is out of range.
    pub fn new(
        principals: P,
        roles: R,
        challenges: C,
        recovery_tokens: T,
        revocations: V,
        mailer: Arc<dyn OutboundMailer>,
        config: AuthConfig,
    ) -> Result<Self, AuthError> {
        let codec = TokenCodec::new(&config)?;
        Ok(Self {
            principals,
            roles,
            challenges: StepUpChallengeStore::new(challenges, mailer.clone(), &config)?,
            recovery: RecoveryTokenStore::new(recovery_tokens, mailer.clone(), config.clone())?,
            verification_ttl: AuthConfig::lifetime(config.verification_token_lifetime_secs)?,
            revocations,
            codec,
            mailer,
            config,
        })
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn challenges(&self) -> &StepUpChallengeStore<C> {
        &self.challenges
    }

    pub fn recovery(&self) -> &RecoveryTokenStore<T> {
        &self.recovery
    }

    /// A request gate sharing this service's principals, revocation
    /// registry and token codec.
    pub fn gate(&self) -> AuthenticationGate<P, V>
    where
        P: Clone,
        V: Clone,
    {
        AuthenticationGate::new(
            self.principals.clone(),
            self.revocations.clone(),
            self.codec.clone(),
            self.config.require_step_up,
        )
    }

    fn validate_password(&self, password: &str) -> Result<(), AuthError> {
        if password.chars().count() < self.config.min_password_length {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters.",
                self.config.min_password_length
            )));
        }
        Ok(())
    }

    async fn principal_by_email(&self, email: &str) -> Result<Principal, AuthError> {
        match self.principals.get_by_email(email).await {
            Ok(p) => Ok(p),
            Err(e) if e.is_not_found() => Err(AuthenticationError::AccountNotFound.into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Register an unverified account and mail its verification link.
    pub async fn signup(&self, input: SignupInput) -> Result<Principal, AuthError> {
        let email = input.email.trim();
        if input.name.trim().is_empty() {
            return Err(AuthError::Validation("Name is required.".into()));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::Validation("A valid email is required.".into()));
        }
        self.validate_password(&input.password)?;

        if self.principals.exists_by_email(email).await? {
            return Err(AuthError::AlreadyRegistered);
        }

        let role = self.roles.get_by_name(ROLE_USER).await?;
        let password_hash = password::hash_password(&input.password, self.config.pepper.as_deref())?;

        let raw_token = token::generate_opaque_token();
        let principal = self
            .principals
            .create(CreatePrincipal {
                name: input.name.trim().to_owned(),
                email: email.to_owned(),
                password_hash,
                roles: vec![role.name],
                verification_token_hash: Some(token::hash_token(&raw_token)),
                verification_expires_at: Some(Utc::now() + self.verification_ttl),
            })
            .await
            .map_err(|e| match e {
                FintrackError::AlreadyExists { .. } => AuthError::AlreadyRegistered,
                other => other.into(),
            })?;

        let link = self.config.verification_link(&raw_token);
        mailer::log_failure(
            "verification",
            &principal.email,
            self.mailer.send_verification(&principal.email, &link),
        );

        info!(principal_id = %principal.id, "account registered");
        Ok(principal)
    }

    /// Redeem an email verification token.
    ///
    /// The token is single-use; an expired token is discarded and the
    /// account stays unverified.
    pub async fn verify_email(&self, raw_token: &str) -> Result<Principal, AuthError> {
        let mut principal = match self
            .principals
            .get_by_verification_token_hash(&token::hash_token(raw_token))
            .await
        {
            Ok(p) => p,
            Err(e) if e.is_not_found() => return Err(RecoveryError::InvalidToken.into()),
            Err(e) => return Err(e.into()),
        };

        if principal.verification_expired(Utc::now()) {
            principal.clear_verification_token();
            self.principals.save(&principal).await?;
            warn!(principal_id = %principal.id, "expired verification token");
            return Err(RecoveryError::Expired.into());
        }

        principal.mark_email_verified();
        let principal = self.principals.save(&principal).await?;
        info!(principal_id = %principal.id, "email verified");
        Ok(principal)
    }

    /// Password step of login.
    ///
    /// On success issues a provisional token and mails a login OTP.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutput, AuthError> {
        let principal = self.principal_by_email(email).await?;

        if !principal.email_verified {
            return Err(AuthenticationError::EmailUnverified.into());
        }

        let valid = password::verify_password(
            password,
            &principal.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            warn!(principal_id = %principal.id, "login rejected: bad credentials");
            return Err(AuthenticationError::BadCredentials.into());
        }

        let token = self.codec.issue(&principal, false)?;
        self.challenges
            .generate_for(&principal, ChallengePurpose::Login)
            .await?;

        info!(principal_id = %principal.id, "password accepted, OTP sent");
        Ok(LoginOutput {
            token,
            roles: principal.roles,
            verified: false,
        })
    }

    /// Issue (or re-issue) a login OTP. Any earlier code stops working.
    pub async fn send_otp(&self, email: &str) -> Result<(), AuthError> {
        let principal = self.principal_by_email(email).await?;
        self.challenges
            .generate_for(&principal, ChallengePurpose::Login)
            .await?;
        Ok(())
    }

    /// Redeem a login OTP for a fully trusted token.
    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<LoginOutput, AuthError> {
        let principal = match self.principals.get_by_email(email).await {
            Ok(p) => p,
            Err(e) if e.is_not_found() => return Err(ChallengeError::NotFound.into()),
            Err(e) => return Err(e.into()),
        };

        self.challenges
            .verify(&principal, code, ChallengePurpose::Login)
            .await?;

        let token = self.codec.issue(&principal, true)?;
        info!(principal_id = %principal.id, "OTP verified");
        Ok(LoginOutput {
            token,
            roles: principal.roles,
            verified: true,
        })
    }

    /// Revoke the bearer token carried in an `Authorization` header value.
    ///
    /// The token is revoked as presented, whether or not it would
    /// validate.
    pub async fn logout(&self, authorization: Option<&str>) -> Result<(), AuthError> {
        let Some(token) = authorization
            .and_then(token::bearer_token)
            .filter(|token| !token.is_empty())
        else {
            return Err(TokenError::Malformed.into());
        };
        self.revocations.revoke(token).await?;
        info!("bearer token revoked");
        Ok(())
    }

    /// Start the link-based password reset.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let principal = self.principal_by_email(email).await?;
        self.recovery.request_reset(&principal).await?;
        Ok(())
    }

    /// Finish the link-based password reset.
    pub async fn confirm_password_reset(
        &self,
        raw_token: &str,
        new_password: &str,
    ) -> Result<Principal, AuthError> {
        self.validate_password(new_password)?;
        let hash = password::hash_password(new_password, self.config.pepper.as_deref())?;
        self.recovery
            .confirm_reset(&self.principals, raw_token, hash)
            .await
    }

    /// Start the OTP-based password reset.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let principal = self.principal_by_email(email).await?;
        self.challenges
            .generate_for(&principal, ChallengePurpose::PasswordReset)
            .await?;
        Ok(())
    }

    /// Finish the OTP-based password reset.
    pub async fn reset_password_with_otp(
        &self,
        input: OtpPasswordResetInput,
    ) -> Result<Principal, AuthError> {
        if input.new_password != input.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        self.validate_password(&input.new_password)?;

        let mut principal = self.principal_by_email(&input.email).await?;
        self.challenges
            .verify(&principal, &input.otp, ChallengePurpose::PasswordReset)
            .await?;

        principal.password_hash =
            password::hash_password(&input.new_password, self.config.pepper.as_deref())?;
        let principal = self.principals.save(&principal).await?;

        info!(principal_id = %principal.id, "password reset via OTP");
        Ok(principal)
    }
}
