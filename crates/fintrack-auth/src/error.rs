//! Authentication error taxonomy.
//!
//! Every failure here is per-request; none is retried and none is
//! fatal to the process.

use fintrack_core::error::FintrackError;
use thiserror::Error;

/// Failures of the password step of login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthenticationError {
    #[error("Invalid email or password.")]
    BadCredentials,

    #[error("Please verify your email before logging in.")]
    EmailUnverified,

    #[error("User not found.")]
    AccountNotFound,
}

/// Failures validating a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Invalid or malformed token.")]
    Malformed,

    #[error("Token has expired.")]
    Expired,

    #[error("Token signature mismatch.")]
    SignatureMismatch,

    #[error("Token has been revoked.")]
    Revoked,
}

/// Failures verifying a step-up (OTP) code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChallengeError {
    #[error("Invalid OTP.")]
    InvalidCode,

    #[error("OTP expired.")]
    Expired,

    #[error("No account found for this OTP.")]
    NotFound,
}

/// Failures consuming a recovery or verification token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecoveryError {
    #[error("Invalid token.")]
    InvalidToken,

    #[error("Token expired.")]
    Expired,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Challenge(#[from] ChallengeError),

    #[error(transparent)]
    Recovery(#[from] RecoveryError),

    #[error("Email already registered.")]
    AlreadyRegistered,

    #[error("Passwords do not match.")]
    PasswordMismatch,

    #[error("{0}")]
    Validation(String),

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error(transparent)]
    Repository(#[from] FintrackError),
}

impl AuthError {
    /// True for failures caused by the caller's input rather than by
    /// storage or crypto faults.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Crypto(_) | Self::Repository(_))
    }
}
