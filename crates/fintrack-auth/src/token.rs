//! Bearer session token issuance/validation and opaque one-shot token
//! generation.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use fintrack_core::models::principal::Principal;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{AuthError, TokenError};

/// JWT claims embedded in every bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the principal's email.
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID (UUID string).
    pub jti: String,
    /// Role names of the principal at issuance.
    pub roles: Vec<String>,
    /// `true` only for tokens minted after OTP verification.
    pub step_up: bool,
}

/// Stateless HS256 signer/verifier for bearer tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    lifetime_secs: i64,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Build a codec from the shared secret in `config`.
    ///
    /// Rejects secrets shorter than [`AuthConfig::MIN_SECRET_LEN`] bytes.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let secret = config.jwt_secret.as_bytes();
        if secret.len() < AuthConfig::MIN_SECRET_LEN {
            return Err(AuthError::Crypto(format!(
                "jwt secret must be at least {} bytes",
                AuthConfig::MIN_SECRET_LEN
            )));
        }
        let lifetime_secs = AuthConfig::lifetime(config.access_token_lifetime_secs)?.num_seconds();

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: config.jwt_issuer.clone(),
            lifetime_secs,
        })
    }

    /// Issue a token for `principal` carrying its current roles.
    pub fn issue(&self, principal: &Principal, step_up: bool) -> Result<String, AuthError> {
        self.issue_at(&principal.email, &principal.roles, step_up, Utc::now())
    }

    /// Issue a token as if at `issued_at`.
    pub fn issue_at(
        &self,
        subject: &str,
        roles: &[String],
        step_up: bool,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let iat = issued_at.timestamp();
        let claims = SessionClaims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            iat,
            exp: iat + self.lifetime_secs,
            jti: Uuid::new_v4().to_string(),
            roles: roles.to_vec(),
            step_up,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
    }

    /// Verify signature, issuer and expiry of an untrusted token.
    ///
    /// Never panics; every failure is reported as a [`TokenError`].
    pub fn validate(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
                _ => TokenError::Malformed,
            })
    }
}

/// Split `Authorization: Bearer <token>` into the raw token.
///
/// Returns `None` for any other scheme. The token is returned verbatim,
/// so `"Bearer "` yields an empty token that fails validation.
pub fn bearer_token(authorization: &str) -> Option<&str> {
    authorization.strip_prefix("Bearer ")
}

/// Generate a cryptographically random opaque token
/// (32 bytes → base64url-encoded, no padding).
pub fn generate_opaque_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hash of a one-shot secret, hex-encoded.
///
/// This is the value stored in place of verification tokens, reset
/// tokens and OTP codes.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
