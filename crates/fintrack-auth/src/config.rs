//! Authentication configuration.

use chrono::Duration;

use crate::error::AuthError;

/// Configuration for the authentication core.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared HMAC-SHA256 secret for signing bearer tokens.
    pub jwt_secret: String,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Bearer token lifetime in seconds (default: 86_400 = 24 hours).
    pub access_token_lifetime_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Minimum password length accepted at signup and reset.
    pub min_password_length: usize,
    /// Login OTP lifetime in seconds (default: 300 = 5 minutes).
    pub login_otp_lifetime_secs: u64,
    /// "Forgot password" OTP lifetime in seconds (default: 900 = 15 minutes).
    pub reset_otp_lifetime_secs: u64,
    /// Password-reset link lifetime in seconds (default: 3600 = 1 hour).
    pub reset_token_lifetime_secs: u64,
    /// Email verification link lifetime in seconds (default: 86_400).
    pub verification_token_lifetime_secs: u64,
    /// Base URL of the web client; links in emails are built from it.
    pub app_base_url: String,
    /// Refuse tokens issued before OTP step-up on protected routes.
    ///
    /// Off by default: a provisional login token is accepted like any
    /// other valid token.
    pub require_step_up: bool,
}

impl AuthConfig {
    /// Smallest accepted `jwt_secret`, in bytes.
    pub const MIN_SECRET_LEN: usize = 32;

    /// Convert a configured lifetime in seconds into a [`Duration`].
    ///
    /// Fails for values chrono cannot represent.
    pub fn lifetime(secs: u64) -> Result<Duration, AuthError> {
        i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| AuthError::Validation(format!("lifetime of {secs}s is out of range")))
    }

    pub fn verification_link(&self, token: &str) -> String {
        format!(
            "{}/verify-email?token={token}",
            self.app_base_url.trim_end_matches('/')
        )
    }

    pub fn password_reset_link(&self, token: &str) -> String {
        format!(
            "{}/reset-password?token={token}",
            self.app_base_url.trim_end_matches('/')
        )
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_issuer: "fintrack".into(),
            access_token_lifetime_secs: 86_400,
            pepper: None,
            min_password_length: 1,
            login_otp_lifetime_secs: 300,
            reset_otp_lifetime_secs: 900,
            reset_token_lifetime_secs: 3600,
            verification_token_lifetime_secs: 86_400,
            app_base_url: "http://localhost:5173".into(),
            require_step_up: false,
        }
    }
}
