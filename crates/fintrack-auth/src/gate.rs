//! Per-request authentication gate.
//!
//! Framework-free: the HTTP layer hands over the raw `Authorization`
//! header value and a slot for the request's identity, and maps a
//! [`GateRejection`] onto a response.

use fintrack_core::error::FintrackError;
use fintrack_core::models::identity::AuthenticatedIdentity;
use fintrack_core::repository::{PrincipalRepository, RevocationRegistry};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::TokenError;
use crate::token::{TokenCodec, bearer_token};

#[derive(Debug, Error)]
pub enum GateRejection {
    #[error(transparent)]
    Token(TokenError),

    #[error("Token subject does not match an account.")]
    UnknownSubject,

    #[error("OTP verification required.")]
    StepUpRequired,

    #[error(transparent)]
    Repository(#[from] FintrackError),
}

impl GateRejection {
    /// Revoked tokens are "not authenticated"; every other rejection
    /// is "authenticated but refused".
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Token(TokenError::Revoked))
    }
}

#[derive(Clone)]
pub struct AuthenticationGate<P: PrincipalRepository, V: RevocationRegistry> {
    principals: P,
    revocations: V,
    codec: TokenCodec,
    require_step_up: bool,
}

impl<P: PrincipalRepository, V: RevocationRegistry> AuthenticationGate<P, V> {
    pub fn new(principals: P, revocations: V, codec: TokenCodec, require_step_up: bool) -> Self {
        Self {
            principals,
            revocations,
            codec,
            require_step_up,
        }
    }

    /// Run the gate for one request.
    ///
    /// Without a bearer token the request proceeds unauthenticated and
    /// `slot` is left as is. With one, the token must be unrevoked and
    /// valid; its principal is then resolved and bound into `slot`
    /// unless an identity is already bound there.
    pub async fn bind(
        &self,
        slot: &mut Option<AuthenticatedIdentity>,
        authorization: Option<&str>,
    ) -> Result<(), GateRejection> {
        let Some(token) = authorization.and_then(bearer_token) else {
            return Ok(());
        };

        if self.revocations.is_revoked(token).await? {
            warn!("blocked request: token is revoked");
            return Err(GateRejection::Token(TokenError::Revoked));
        }

        let claims = self.codec.validate(token).map_err(|e| {
            warn!(error = %e, "bearer token rejected");
            GateRejection::Token(e)
        })?;

        if slot.is_some() {
            return Ok(());
        }

        let principal = match self.principals.get_by_email(&claims.sub).await {
            Ok(p) => p,
            Err(e) if e.is_not_found() => {
                warn!("bearer token subject has no account");
                return Err(GateRejection::UnknownSubject);
            }
            Err(e) => return Err(e.into()),
        };

        debug!(principal_id = %principal.id, step_up = claims.step_up, "request authenticated");
        *slot = Some(AuthenticatedIdentity::from_principal(
            &principal,
            claims.step_up,
        ));
        Ok(())
    }

    /// Decide whether a bound identity may use a protected route.
    ///
    /// Provisional identities are refused only when step-up is required.
    /// Public routes never call this, so a provisional token can still
    /// log out or request a fresh code.
    pub fn admit(&self, identity: &AuthenticatedIdentity) -> Result<(), GateRejection> {
        if self.require_step_up && !identity.step_up {
            debug!(principal_id = %identity.principal_id, "provisional token refused");
            return Err(GateRejection::StepUpRequired);
        }
        Ok(())
    }

    /// Convenience wrapper for callers without a pre-existing identity.
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
    ) -> Result<Option<AuthenticatedIdentity>, GateRejection> {
        let mut slot = None;
        self.bind(&mut slot, authorization).await?;
        Ok(slot)
    }
}
